//! Staging of the base level.
//!
//! Every cell of the `2^level x 2^level` base grid ends up materialized: linked
//! from its source tile when one exists, linked to the blank otherwise.

use crate::blank::BlankTile;
use crate::coord::TileCoord;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::grid::TileGrid;
use crate::report::{LevelReport, TileOutcome};
use crate::store::{Materialized, TileStore};

pub fn stage_base_level(
    grid: &TileGrid,
    level: u32,
    store: &TileStore,
    blank: &BlankTile,
    dispatcher: &Dispatcher,
) -> LevelReport {
    tracing::info!(
        "Staging base level {level} from '{}' ({} source tiles)",
        grid.root().display(),
        grid.tile_count()
    );
    dispatcher.run_level(level, |coord| stage_tile(grid, store, blank, coord))
}

fn stage_tile(
    grid: &TileGrid,
    store: &TileStore,
    blank: &BlankTile,
    coord: TileCoord,
) -> Result<TileOutcome> {
    let (source, outcome) = match grid.source_for(coord.col, coord.row) {
        Some(path) => (path, TileOutcome::LinkedSource),
        None => (blank.path(), TileOutcome::LinkedBlank),
    };

    match store.materialize(coord, source)? {
        Materialized::Existing => Ok(TileOutcome::Skipped),
        Materialized::Linked(_) | Materialized::Written => Ok(outcome),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::blank::BlankSingleton;
    use crate::config::AxisOrder;
    use crate::raster::{ImaginariumRaster, RasterAdapter};
    use imaginarium::{ColorFormat, Image, ImageDesc};

    #[test]
    fn fills_missing_cells_with_blank() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let raster = ImaginariumRaster::new(1).unwrap();

        fs::create_dir_all(input.path().join("1")).unwrap();
        let source = input.path().join("1/0.png");
        let red = Image::new_filled(ImageDesc::new(4, 4, ColorFormat::RGBA_U8), &[255, 0, 0, 255])
            .unwrap();
        raster.write(&red, &source).unwrap();

        let grid = TileGrid::scan(input.path(), AxisOrder::ColumnMajor, "png").unwrap();
        let store = TileStore::new(output.path(), "png");
        let blank = BlankSingleton::new()
            .get_or_create(&store, &raster, 4, 4)
            .unwrap();
        let dispatcher = Dispatcher::new(2).unwrap();

        let report = stage_base_level(&grid, 1, &store, &blank, &dispatcher);

        assert!(report.is_complete());
        assert_eq!(report.linked_source, 1);
        assert_eq!(report.blank, 3);
        assert!(!blank.is_blank(&store.path_for(TileCoord::new(1, 1, 0))));
        assert!(blank.is_blank(&store.path_for(TileCoord::new(1, 0, 1))));
        assert_eq!(
            raster.load_rgba(&store.path_for(TileCoord::new(1, 1, 0))).unwrap(),
            red
        );

        let again = stage_base_level(&grid, 1, &store, &blank, &dispatcher);
        assert_eq!(again.skipped, 4);
    }
}
