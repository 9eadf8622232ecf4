//! Error types for pyramid building.
//!
//! Structural and configuration errors abort a run before any tile is touched.
//! Tile-scoped errors are collected into [`crate::LevelReport`] instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::coord::TileCoord;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Base directory '{path}' does not exist or is not a directory")]
    MissingBaseDir { path: PathBuf },

    #[error("No numeric tile directories found in '{path}'")]
    EmptyBaseGrid { path: PathBuf },

    #[error("Base grid size must be a power of two, found {dim}")]
    NonPowerOfTwoGrid { dim: u32 },

    #[error("Inconsistent tile grid at '{path}': {reason}")]
    InconsistentGrid { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("Blank tile '{path}' is {actual_width}x{actual_height}, expected {width}x{height}")]
    BlankSizeMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Tile {coord} is {width}x{height}, expected {expected}x{expected}")]
    TileSize {
        coord: TileCoord,
        width: u32,
        height: u32,
        expected: u32,
    },

    #[error("No tiles to stitch")]
    NothingToStitch,

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Raster operation failed for '{path}': {source}")]
    Raster {
        path: PathBuf,
        #[source]
        source: imaginarium::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn raster(path: impl Into<PathBuf>, source: imaginarium::Error) -> Self {
        Error::Raster {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
