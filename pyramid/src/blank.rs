//! The shared transparent tile.
//!
//! One file per store, created on first use and referenced by hard link (or
//! symlink) from every empty tile. Blank detection compares [`TileIdentity`]
//! handles, so a tile linked to the blank is recognized without decoding. A
//! transparent tile written independently is not recognized; it is reduced like
//! any other tile and yields a transparent parent.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::raster::RasterAdapter;
use crate::store::{TileIdentity, TileStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankTile {
    path: PathBuf,
    identity: TileIdentity,
    width: u32,
    height: u32,
}

impl BlankTile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn identity(&self) -> &TileIdentity {
        &self.identity
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when `path` resolves to the blank file itself. Missing files are not
    /// blank.
    pub fn is_blank(&self, path: &Path) -> bool {
        TileIdentity::of(path).is_ok_and(|id| id == self.identity)
    }

    pub fn is_blank_identity(&self, identity: &TileIdentity) -> bool {
        *identity == self.identity
    }
}

/// Hands out one [`BlankTile`] per store. Concurrent first callers block until
/// the first one has created (or adopted) the file.
#[derive(Debug, Default)]
pub struct BlankSingleton {
    slot: Mutex<Option<BlankTile>>,
}

impl BlankSingleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        store: &TileStore,
        raster: &dyn RasterAdapter,
        width: u32,
        height: u32,
    ) -> Result<BlankTile> {
        let mut slot = self.slot.lock();
        if let Some(blank) = slot.as_ref() {
            if blank.width != width || blank.height != height {
                return Err(Error::BlankSizeMismatch {
                    path: blank.path.clone(),
                    width,
                    height,
                    actual_width: blank.width,
                    actual_height: blank.height,
                });
            }
            return Ok(blank.clone());
        }

        let blank = create_or_adopt(store, raster, width, height)?;
        *slot = Some(blank.clone());
        Ok(blank)
    }
}

fn create_or_adopt(
    store: &TileStore,
    raster: &dyn RasterAdapter,
    width: u32,
    height: u32,
) -> Result<BlankTile> {
    let path = store.blank_path();
    std::fs::create_dir_all(store.root()).map_err(|e| Error::io(store.root(), e))?;

    // Another process may win the race; its file is adopted below.
    let created = store.write_atomic(&path, |tmp| {
        let image = raster.blank(width, height).map_err(|e| Error::raster(tmp, e))?;
        raster.write(&image, tmp).map_err(|e| Error::raster(tmp, e))
    })?;

    let existing = raster.load_rgba(&path).map_err(|e| Error::raster(&path, e))?;
    let (actual_width, actual_height) = (existing.desc().width, existing.desc().height);
    if actual_width != width || actual_height != height {
        return Err(Error::BlankSizeMismatch {
            path,
            width,
            height,
            actual_width,
            actual_height,
        });
    }

    let identity = TileIdentity::of(&path).map_err(|e| Error::io(&path, e))?;
    tracing::debug!("Blank tile {:?} at '{}'", created, path.display());

    Ok(BlankTile {
        path,
        identity,
        width,
        height,
    })
}
