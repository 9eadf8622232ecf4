//! Build configuration.
//!
//! Values come from [`PyramidConfig::default`], an optional YAML file and the
//! process environment, in that order of increasing precedence:
//!
//! | Variable           | Field              |
//! |--------------------|--------------------|
//! | `TILE_JOBS`        | `workers`          |
//! | `RASTER_THREADS`   | `raster_threads`   |
//! | `TILE_SIZE`        | `tile_size`        |
//! | `MIN_LEVEL`        | `min_level`        |
//! | `EXPORT_TILE_SIZE` | `export_tile_size` |

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use imaginarium::LayoutOptions;

use crate::error::{Error, Result};
use crate::mosaic::StitchConfig;

/// Upper bound for the default raster thread count.
const MAX_DEFAULT_RASTER_THREADS: usize = 4;

/// How base tiles are nested below the input root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    /// `<input>/<col>/<row>.<ext>`
    #[default]
    ColumnMajor,
    /// `<input>/<row>/<col>.<ext>`
    RowMajor,
}

impl AxisOrder {
    /// Maps `(col, row)` to `(outer, inner)` path components.
    pub fn split(self, col: u32, row: u32) -> (u32, u32) {
        match self {
            AxisOrder::ColumnMajor => (col, row),
            AxisOrder::RowMajor => (row, col),
        }
    }

    /// Maps `(outer, inner)` path components back to `(col, row)`.
    pub fn join(self, outer: u32, inner: u32) -> (u32, u32) {
        // The mapping is its own inverse.
        self.split(outer, inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    /// Tile tasks running at once within a level.
    pub workers: usize,
    /// Threads used by the raster adapter for row-parallel kernels.
    pub raster_threads: usize,
    /// Width and height of every tile in pixels.
    pub tile_size: u32,
    /// Coarsest level to build, inclusive.
    pub min_level: u32,
    /// Tile file extension. Must name a format with an alpha channel.
    pub extension: String,
    /// Nesting of the input base tiles.
    pub axis_order: AxisOrder,
    /// Tile size of DeepZoom/Google exports.
    pub export_tile_size: u32,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        let workers = (common::parallel::default_worker_count() * 3 / 2).max(1);
        Self {
            workers,
            raster_threads: workers.min(MAX_DEFAULT_RASTER_THREADS),
            tile_size: 1000,
            min_level: 0,
            extension: "png".to_string(),
            axis_order: AxisOrder::default(),
            export_tile_size: 256,
        }
    }
}

impl PyramidConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads a YAML config file. Missing fields keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides fields from environment-style `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = parse_var(&lookup, "TILE_JOBS")? {
            self.workers = workers;
        }
        if let Some(threads) = parse_var(&lookup, "RASTER_THREADS")? {
            self.raster_threads = threads;
        }
        if let Some(tile_size) = parse_var(&lookup, "TILE_SIZE")? {
            self.tile_size = tile_size;
        }
        if let Some(min_level) = parse_var(&lookup, "MIN_LEVEL")? {
            self.min_level = min_level;
        }
        if let Some(size) = parse_var(&lookup, "EXPORT_TILE_SIZE")? {
            self.export_tile_size = size;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be > 0".to_string()));
        }
        if self.raster_threads == 0 {
            return Err(Error::Config("raster_threads must be > 0".to_string()));
        }
        if self.tile_size == 0 {
            return Err(Error::Config("tile_size must be > 0".to_string()));
        }
        if self.export_tile_size == 0 {
            return Err(Error::Config("export_tile_size must be > 0".to_string()));
        }
        let ext = self.extension.to_ascii_lowercase();
        if !imaginarium::SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::Config(format!(
                "unsupported tile extension '{}'",
                self.extension
            )));
        }
        if ext == "jpg" || ext == "jpeg" {
            return Err(Error::Config(format!(
                "tile extension '{}' has no alpha channel",
                self.extension
            )));
        }
        Ok(())
    }

    /// Stitch settings matching this build: same tiles, `workers` decode threads.
    pub fn stitch_config(&self, limit: Option<usize>) -> StitchConfig {
        StitchConfig {
            tile_size: self.tile_size,
            limit,
            threads: self.workers,
            max_in_flight: self.workers,
            axis_order: self.axis_order,
            extension: self.extension.clone(),
            ..Default::default()
        }
    }

    pub fn layout_options(&self, skip_blanks: Option<u8>) -> LayoutOptions {
        LayoutOptions {
            tile_size: self.export_tile_size,
            skip_blanks,
            extension: self.extension.clone(),
            ..Default::default()
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key}='{raw}' is not a valid number"))),
    }
}
