//! Filesystem tile store.
//!
//! Layout: `<root>/<level>/<col>/<row>.<ext>` plus the shared blank tile at
//! `<root>/blank.<ext>`. Every write is idempotent: a destination that already
//! exists is left alone and reported as [`Materialized::Existing`].

mod identity;
mod strategy;


use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use parking_lot::Mutex;

pub use identity::TileIdentity;
pub use strategy::{MaterializePolicy, MaterializeStrategy, Materialized};

use crate::coord::TileCoord;
use crate::error::{Error, Result};

const BLANK_STEM: &str = "blank";

#[derive(Debug)]
pub struct TileStore {
    root: PathBuf,
    extension: String,
    policy: MaterializePolicy,
    created_dirs: Mutex<HashSet<(u32, u32)>>,
}

impl TileStore {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
            policy: MaterializePolicy::default(),
            created_dirs: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_policy(mut self, policy: MaterializePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn policy(&self) -> &MaterializePolicy {
        &self.policy
    }

    pub fn blank_path(&self) -> PathBuf {
        self.root.join(format!("{BLANK_STEM}.{}", self.extension))
    }

    pub fn level_dir(&self, level: u32) -> PathBuf {
        self.root.join(level.to_string())
    }

    /// Location of a tile. Pure path arithmetic, no I/O.
    pub fn path_for(&self, coord: TileCoord) -> PathBuf {
        self.level_dir(coord.level)
            .join(coord.col.to_string())
            .join(format!("{}.{}", coord.row, self.extension))
    }

    pub fn exists(&self, coord: TileCoord) -> bool {
        self.path_for(coord).exists()
    }

    /// Creates `<root>/<level>/<col>` once per store. Concurrent callers for the
    /// same directory all succeed.
    pub fn ensure_directory(&self, level: u32, col: u32) -> Result<()> {
        if self.created_dirs.lock().contains(&(level, col)) {
            return Ok(());
        }

        let dir = self.level_dir(level).join(col.to_string());
        // create_dir_all succeeds when a peer created the directory first
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        self.created_dirs.lock().insert((level, col));
        Ok(())
    }

    /// Makes the tile at `coord` hold the content of `source`, trying the
    /// store's strategies in order.
    pub fn materialize(&self, coord: TileCoord, source: &Path) -> Result<Materialized> {
        let dst = self.path_for(coord);
        if dst.exists() {
            return Ok(Materialized::Existing);
        }
        self.ensure_directory(coord.level, coord.col)?;
        self.policy.materialize(source, &dst)
    }

    /// Runs `write` against a temporary sibling of `dst` and publishes the result
    /// without clobbering. Readers never observe a partially written tile.
    pub fn write_atomic<F>(&self, dst: &Path, write: F) -> Result<Materialized>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if dst.exists() {
            return Ok(Materialized::Existing);
        }

        let tmp = strategy::temp_path_for(dst);
        if let Err(e) = write(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        match strategy::publish(&tmp, dst) {
            Ok(true) => Ok(Materialized::Written),
            Ok(false) => Ok(Materialized::Existing),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(Error::io(dst, e))
            }
        }
    }

    /// Identity of the file behind `path`, or `None` if it does not exist.
    pub fn identity(&self, path: &Path) -> Option<TileIdentity> {
        TileIdentity::of(path).ok()
    }
}
