//! Derivation of coarser levels from finer ones.
//!
//! A parent tile is the 2x2 join of its children halved with nearest-neighbour
//! sampling. Parents whose four children are all the blank are linked to the
//! blank without touching pixel data.

use std::io;
use std::path::PathBuf;

use imaginarium::Image;

use crate::blank::BlankTile;
use crate::coord::TileCoord;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::raster::RasterAdapter;
use crate::report::{LevelReport, TileOutcome};
use crate::store::{Materialized, TileIdentity, TileStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChildTile {
    Blank,
    Tile(PathBuf),
}

pub struct Reducer<'a> {
    store: &'a TileStore,
    blank: &'a BlankTile,
    raster: &'a dyn RasterAdapter,
    tile_size: u32,
}

impl<'a> Reducer<'a> {
    pub fn new(
        store: &'a TileStore,
        blank: &'a BlankTile,
        raster: &'a dyn RasterAdapter,
        tile_size: u32,
    ) -> Self {
        Self {
            store,
            blank,
            raster,
            tile_size,
        }
    }

    /// Builds levels `base_level - 1` down to `min_level`, one level at a time.
    pub fn build_levels(
        &self,
        base_level: u32,
        min_level: u32,
        dispatcher: &Dispatcher,
    ) -> Vec<LevelReport> {
        (min_level..base_level)
            .rev()
            .map(|level| dispatcher.run_level(level, |coord| self.reduce_tile(coord)))
            .collect()
    }

    pub fn reduce_tile(&self, coord: TileCoord) -> Result<TileOutcome> {
        let dst = self.store.path_for(coord);
        if dst.exists() {
            return Ok(TileOutcome::Skipped);
        }

        let children = coord.children();
        let mut resolved = Vec::with_capacity(children.len());
        for child in children {
            resolved.push(self.resolve_child(child)?);
        }

        self.store.ensure_directory(coord.level, coord.col)?;

        if resolved.iter().all(|c| *c == ChildTile::Blank) {
            return match self.store.materialize(coord, self.blank.path())? {
                Materialized::Existing => Ok(TileOutcome::Skipped),
                _ => Ok(TileOutcome::LinkedBlank),
            };
        }

        let mut images = Vec::with_capacity(children.len());
        for (child, tile) in children.into_iter().zip(&resolved) {
            images.push(self.load_child(child, tile)?);
        }

        let joined = self
            .raster
            .join_2x2([&images[0], &images[1], &images[2], &images[3]])
            .map_err(|e| Error::raster(&dst, e))?;
        drop(images);
        let parent = self
            .raster
            .shrink2(&joined)
            .map_err(|e| Error::raster(&dst, e))?;
        drop(joined);

        let written = self.store.write_atomic(&dst, |tmp| {
            self.raster
                .write(&parent, tmp)
                .map_err(|e| Error::raster(tmp, e))
        })?;

        Ok(match written {
            Materialized::Existing => TileOutcome::Skipped,
            _ => TileOutcome::Rendered,
        })
    }

    fn resolve_child(&self, child: TileCoord) -> Result<ChildTile> {
        let path = self.store.path_for(child);
        match TileIdentity::of(&path) {
            Ok(identity) if self.blank.is_blank_identity(&identity) => Ok(ChildTile::Blank),
            Ok(_) => Ok(ChildTile::Tile(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ChildTile::Blank),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn load_child(&self, child: TileCoord, tile: &ChildTile) -> Result<Image> {
        match tile {
            ChildTile::Blank => self
                .raster
                .blank(self.tile_size, self.tile_size)
                .map_err(|e| Error::raster(self.blank.path(), e)),
            ChildTile::Tile(path) => {
                let image = self
                    .raster
                    .load_rgba(path)
                    .map_err(|e| Error::raster(path, e))?;
                let desc = image.desc();
                if desc.width != self.tile_size || desc.height != self.tile_size {
                    return Err(Error::TileSize {
                        coord: child,
                        width: desc.width,
                        height: desc.height,
                        expected: self.tile_size,
                    });
                }
                Ok(image)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blank::BlankSingleton;
    use crate::raster::ImaginariumRaster;
    use imaginarium::{ColorFormat, ImageDesc};

    const T: u32 = 4;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: TileStore,
        raster: ImaginariumRaster,
        blank: BlankTile,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = TileStore::new(dir.path(), "png");
            let raster = ImaginariumRaster::new(1).unwrap();
            let blank = BlankSingleton::new()
                .get_or_create(&store, &raster, T, T)
                .unwrap();
            Self {
                _dir: dir,
                store,
                raster,
                blank,
            }
        }

        fn reducer(&self) -> Reducer<'_> {
            Reducer::new(&self.store, &self.blank, &self.raster, T)
        }

        fn put(&self, coord: TileCoord, image: &Image) {
            self.store.ensure_directory(coord.level, coord.col).unwrap();
            self.raster.write(image, &self.store.path_for(coord)).unwrap();
        }

        fn link_blank(&self, coord: TileCoord) {
            self.store.materialize(coord, self.blank.path()).unwrap();
        }

        fn load(&self, coord: TileCoord) -> Image {
            self.raster.load_rgba(&self.store.path_for(coord)).unwrap()
        }
    }

    fn solid(size: u32, pixel: [u8; 4]) -> Image {
        Image::new_filled(ImageDesc::new(size, size, ColorFormat::RGBA_U8), &pixel).unwrap()
    }

    #[test]
    fn all_blank_children_link_parent_to_blank() {
        let fx = Fixture::new();
        let parent = TileCoord::new(0, 0, 0);
        for child in parent.children() {
            fx.link_blank(child);
        }

        let outcome = fx.reducer().reduce_tile(parent).unwrap();

        assert_eq!(outcome, TileOutcome::LinkedBlank);
        assert!(fx.blank.is_blank(&fx.store.path_for(parent)));
    }

    #[test]
    fn missing_children_count_as_blank() {
        let fx = Fixture::new();
        let outcome = fx.reducer().reduce_tile(TileCoord::new(2, 1, 3)).unwrap();
        assert_eq!(outcome, TileOutcome::LinkedBlank);
    }

    #[test]
    fn quadrants_keep_their_colors() {
        let fx = Fixture::new();
        let parent = TileCoord::new(0, 0, 0);
        let colors = [
            [255, 0, 0, 255],
            [0, 255, 0, 255],
            [0, 0, 255, 255],
            [255, 255, 0, 255],
        ];
        for (child, color) in parent.children().into_iter().zip(colors) {
            fx.put(child, &solid(T, color));
        }

        assert_eq!(fx.reducer().reduce_tile(parent).unwrap(), TileOutcome::Rendered);

        let image = fx.load(parent);
        assert_eq!((image.desc().width, image.desc().height), (T, T));
        let half = T / 2;
        for y in 0..T {
            for x in 0..T {
                let quadrant = (y / half * 2 + x / half) as usize;
                assert_eq!(image.pixel(x, y), &colors[quadrant], "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn blank_children_are_transparent_in_parent() {
        let fx = Fixture::new();
        let parent = TileCoord::new(0, 0, 0);
        let [tl, tr, bl, _] = parent.children();
        fx.put(tl, &solid(T, [10, 20, 30, 255]));
        fx.link_blank(tr);
        fx.link_blank(bl);

        fx.reducer().reduce_tile(parent).unwrap();

        let image = fx.load(parent);
        assert_eq!(image.pixel(0, 0), &[10, 20, 30, 255]);
        assert_eq!(image.pixel(T - 1, 0), &[0, 0, 0, 0]);
        assert_eq!(image.pixel(T - 1, T - 1), &[0, 0, 0, 0]);
    }

    #[test]
    fn existing_parent_is_skipped() {
        let fx = Fixture::new();
        let parent = TileCoord::new(0, 0, 0);
        fx.put(parent, &solid(T, [1, 1, 1, 255]));
        fx.put(parent.children()[0], &solid(T, [9, 9, 9, 255]));

        assert_eq!(fx.reducer().reduce_tile(parent).unwrap(), TileOutcome::Skipped);
        assert_eq!(fx.load(parent).pixel(0, 0), &[1, 1, 1, 255]);
    }

    #[test]
    fn wrong_child_size_fails_only_that_tile() {
        let fx = Fixture::new();
        let parent = TileCoord::new(0, 0, 0);
        fx.put(parent.children()[3], &solid(T * 2, [1, 2, 3, 255]));

        let err = fx.reducer().reduce_tile(parent).unwrap_err();

        assert!(matches!(err, Error::TileSize { coord, .. } if coord == TileCoord::new(1, 1, 1)));
        assert!(!fx.store.exists(parent));
    }

    #[test]
    fn undecodable_child_leaves_no_parent() {
        let fx = Fixture::new();
        let parent = TileCoord::new(0, 0, 0);
        let child = parent.children()[1];
        fx.store.ensure_directory(child.level, child.col).unwrap();
        std::fs::write(fx.store.path_for(child), b"not a png").unwrap();

        let err = fx.reducer().reduce_tile(parent).unwrap_err();

        assert!(matches!(err, Error::Raster { .. }));
        assert!(!fx.store.exists(parent));
    }

    #[test]
    fn build_levels_runs_coarsest_last() {
        let fx = Fixture::new();
        fx.put(TileCoord::new(2, 0, 0), &solid(T, [200, 0, 0, 255]));
        let dispatcher = Dispatcher::new(2).unwrap();

        let reports = fx.reducer().build_levels(2, 0, &dispatcher);

        let levels: Vec<u32> = reports.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![1, 0]);
        assert_eq!(reports[0].rendered, 1);
        assert_eq!(reports[0].blank, 3);
        assert_eq!(reports[1].rendered, 1);
        assert_eq!(fx.load(TileCoord::new(0, 0, 0)).pixel(0, 0), &[200, 0, 0, 255]);
    }
}
