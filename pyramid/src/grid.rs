//! Discovery of externally produced tile grids.
//!
//! Input layout is `<root>/<outer>/<inner>.<ext>` where the meaning of `outer`
//! and `inner` is given by [`AxisOrder`]. Names are parsed as integers, so
//! zero-padded names such as `0034` are accepted; anything else is ignored.

use std::path::{Path, PathBuf};

use common::file_utils::{numeric_files, numeric_subdirs};
use hashbrown::HashMap;

use crate::config::AxisOrder;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTile {
    pub col: u32,
    pub row: u32,
    pub path: PathBuf,
}

/// Sparse set of tiles found under a root directory.
#[derive(Debug, Clone)]
pub struct TileGrid {
    root: PathBuf,
    axis_order: AxisOrder,
    /// One past the largest outer index.
    outer_dim: u32,
    /// One past the largest inner index.
    inner_dim: u32,
    tiles: HashMap<(u32, u32), PathBuf>,
}

impl TileGrid {
    pub fn scan(root: &Path, axis_order: AxisOrder, extension: &str) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::MissingBaseDir {
                path: root.to_path_buf(),
            });
        }

        let outer_dirs = numeric_subdirs(root).map_err(|e| Error::io(root, e))?;
        if outer_dirs.is_empty() {
            return Err(Error::EmptyBaseGrid {
                path: root.to_path_buf(),
            });
        }

        let mut tiles = HashMap::new();
        let mut outer_dim = 0;
        let mut inner_dim = 0;
        for (outer, dir) in outer_dirs {
            outer_dim = outer_dim.max(outer + 1);
            let files = numeric_files(&dir, extension).map_err(|e| Error::io(&dir, e))?;
            for (inner, path) in files {
                inner_dim = inner_dim.max(inner + 1);
                let (col, row) = axis_order.join(outer, inner);
                if let Some(previous) = tiles.insert((col, row), path) {
                    return Err(Error::InconsistentGrid {
                        path: previous,
                        reason: format!("more than one file for column {col}, row {row}"),
                    });
                }
            }
        }

        tracing::debug!(
            "Scanned '{}': {} tiles, {}x{} outer x inner",
            root.display(),
            tiles.len(),
            outer_dim,
            inner_dim
        );

        Ok(Self {
            root: root.to_path_buf(),
            axis_order,
            outer_dim,
            inner_dim,
            tiles,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn axis_order(&self) -> AxisOrder {
        self.axis_order
    }

    /// Columns spanned by the grid, counting from zero.
    pub fn width(&self) -> u32 {
        self.axis_order.join(self.outer_dim, self.inner_dim).0
    }

    /// Rows spanned by the grid, counting from zero.
    pub fn height(&self) -> u32 {
        self.axis_order.join(self.outer_dim, self.inner_dim).1
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn source_for(&self, col: u32, row: u32) -> Option<&Path> {
        self.tiles.get(&(col, row)).map(PathBuf::as_path)
    }

    /// Present tiles in row-major order.
    pub fn tiles(&self) -> Vec<GridTile> {
        let mut tiles: Vec<GridTile> = self
            .tiles
            .iter()
            .map(|(&(col, row), path)| GridTile {
                col,
                row,
                path: path.clone(),
            })
            .collect();
        tiles.sort_by_key(|t| (t.row, t.col));
        tiles
    }

    /// Level of the pyramid this grid forms the base of. The outer dimension sets
    /// the grid size and must be a power of two; inner indices must fit within it.
    pub fn base_level(&self) -> Result<u32> {
        let dim = self.outer_dim;
        if !dim.is_power_of_two() {
            return Err(Error::NonPowerOfTwoGrid { dim });
        }
        if self.inner_dim > dim {
            return Err(Error::InconsistentGrid {
                path: self.root.clone(),
                reason: format!(
                    "inner index {} is outside a grid of {dim}",
                    self.inner_dim - 1
                ),
            });
        }
        Ok(dim.trailing_zeros())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(root: &Path, outer: &str, inner: &str) {
        let dir = root.join(outer);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{inner}.png")), b"").unwrap();
    }

    #[test]
    fn missing_root_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        let err = TileGrid::scan(&dir.path().join("nope"), AxisOrder::ColumnMajor, "png")
            .unwrap_err();
        assert!(matches!(err, Error::MissingBaseDir { .. }));
    }

    #[test]
    fn root_without_numeric_dirs_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("thumbs")).unwrap();
        let err = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap_err();
        assert!(matches!(err, Error::EmptyBaseGrid { .. }));
    }

    #[test]
    fn column_major_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0", "0");
        touch(dir.path(), "3", "1");
        touch(dir.path(), "3", "notes");

        let grid = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap();

        assert_eq!(grid.tile_count(), 2);
        assert_eq!((grid.width(), grid.height()), (4, 2));
        assert!(grid.source_for(3, 1).is_some());
        assert!(grid.source_for(1, 3).is_none());
        assert_eq!(grid.base_level().unwrap(), 2);
    }

    #[test]
    fn row_major_scan_swaps_axes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1", "5");

        let grid = TileGrid::scan(dir.path(), AxisOrder::RowMajor, "png").unwrap();

        assert_eq!(grid.source_for(5, 1), Some(dir.path().join("1/5.png").as_path()));
        assert_eq!((grid.width(), grid.height()), (6, 2));
    }

    #[test]
    fn zero_padded_names_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001", "0000");

        let grid = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap();
        assert!(grid.source_for(1, 0).is_some());
        assert_eq!(grid.base_level().unwrap(), 1);
    }

    #[test]
    fn duplicate_index_is_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0", "1");
        touch(dir.path(), "0", "01");

        let err = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap_err();
        assert!(matches!(err, Error::InconsistentGrid { .. }));
    }

    #[test]
    fn non_power_of_two_outer_dim() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "2046", "0");

        let grid = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap();
        let err = grid.base_level().unwrap_err();
        assert!(matches!(err, Error::NonPowerOfTwoGrid { dim: 2047 }));
    }

    #[test]
    fn inner_index_outside_grid() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1", "2");

        let grid = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap();
        assert!(matches!(
            grid.base_level().unwrap_err(),
            Error::InconsistentGrid { .. }
        ));
    }

    #[test]
    fn tiles_are_row_major() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1", "0");
        touch(dir.path(), "0", "1");
        touch(dir.path(), "0", "0");

        let grid = TileGrid::scan(dir.path(), AxisOrder::ColumnMajor, "png").unwrap();
        let order: Vec<(u32, u32)> = grid.tiles().iter().map(|t| (t.col, t.row)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (0, 1)]);
    }
}
