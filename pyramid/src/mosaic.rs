//! Stitching of a sparse tile set into one canvas.
//!
//! The canvas spans the tight bounding box of the selected tiles; cells without
//! a tile stay transparent. Tiles are placed without blending, so the order in
//! which they arrive does not matter.

use std::path::{Path, PathBuf};

use imaginarium::{Image, LayoutOptions, LayoutReport, TileLayout};

use crate::config::AxisOrder;
use crate::error::{Error, Result};
use crate::grid::{GridTile, TileGrid};
use crate::raster::RasterAdapter;

/// Inclusive rectangle of tile indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub min_col: u32,
    pub min_row: u32,
    pub max_col: u32,
    pub max_row: u32,
}

impl TileRegion {
    pub fn contains(&self, col: u32, row: u32) -> bool {
        (self.min_col..=self.max_col).contains(&col) && (self.min_row..=self.max_row).contains(&row)
    }

    pub fn cols(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    pub fn rows(&self) -> u32 {
        self.max_row - self.min_row + 1
    }
}

/// Tight bounds of a tile set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox(pub TileRegion);

impl BoundingBox {
    pub fn of(tiles: &[GridTile]) -> Option<Self> {
        let first = tiles.first()?;
        let mut region = TileRegion {
            min_col: first.col,
            min_row: first.row,
            max_col: first.col,
            max_row: first.row,
        };
        for tile in &tiles[1..] {
            region.min_col = region.min_col.min(tile.col);
            region.min_row = region.min_row.min(tile.row);
            region.max_col = region.max_col.max(tile.col);
            region.max_row = region.max_row.max(tile.row);
        }
        Some(Self(region))
    }

    pub fn region(&self) -> &TileRegion {
        &self.0
    }

    /// Canvas size in pixels, or `None` if it does not fit in `u32`.
    pub fn pixel_size(&self, tile_size: u32) -> Option<(u32, u32)> {
        let width = self.0.cols().checked_mul(tile_size)?;
        let height = self.0.rows().checked_mul(tile_size)?;
        Some((width, height))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchConfig {
    pub tile_size: u32,
    /// Only tiles inside this region are stitched.
    pub region: Option<TileRegion>,
    /// Keep at most this many tiles, first in row-major order.
    pub limit: Option<usize>,
    /// Decode threads.
    pub threads: usize,
    /// Decoded tiles alive at once.
    pub max_in_flight: usize,
    pub axis_order: AxisOrder,
    pub extension: String,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            tile_size: 1000,
            region: None,
            limit: None,
            threads: common::parallel::default_worker_count(),
            max_in_flight: common::parallel::default_worker_count(),
            axis_order: AxisOrder::default(),
            extension: "png".to_string(),
        }
    }
}

impl StitchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(Error::Config("tile_size must be > 0".to_string()));
        }
        if self.threads == 0 {
            return Err(Error::Config("threads must be > 0".to_string()));
        }
        if self.max_in_flight == 0 {
            return Err(Error::Config("max_in_flight must be > 0".to_string()));
        }
        if let Some(region) = &self.region {
            if region.min_col > region.max_col || region.min_row > region.max_row {
                return Err(Error::Config(format!("empty stitch region {region:?}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct StitchFailure {
    pub col: u32,
    pub row: u32,
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug)]
pub struct Mosaic {
    pub image: Image,
    pub bounds: BoundingBox,
    pub tile_size: u32,
    pub placed: usize,
    pub failures: Vec<StitchFailure>,
}

impl Mosaic {
    pub fn save(&self, path: &Path, raster: &dyn RasterAdapter) -> Result<()> {
        raster
            .write(&self.image, path)
            .map_err(|e| Error::raster(path, e))?;
        tracing::info!("Saved mosaic to '{}'", path.display());
        Ok(())
    }

    /// Re-tiles the canvas into a standard viewer layout.
    pub fn export(
        &self,
        dir: &Path,
        name: &str,
        layout: TileLayout,
        options: &LayoutOptions,
        raster: &dyn RasterAdapter,
    ) -> Result<LayoutReport> {
        let report = raster
            .export_layout(&self.image, dir, name, layout, options)
            .map_err(|e| Error::raster(dir, e))?;
        tracing::info!(
            "Exported {layout:?} '{name}': {} levels, {} tiles written, {} blank tiles skipped",
            report.levels,
            report.written,
            report.skipped_blank
        );
        Ok(report)
    }
}

/// Applies the region filter and the row-major limit of `config` to `grid`.
pub fn select_tiles(grid: &TileGrid, config: &StitchConfig) -> Vec<GridTile> {
    let selected = grid
        .tiles()
        .into_iter()
        .filter(|t| config.region.is_none_or(|r| r.contains(t.col, t.row)));
    match config.limit {
        Some(limit) => selected.take(limit).collect(),
        None => selected.collect(),
    }
}

/// Scans `root` and stitches the selected tiles.
pub fn stitch_dir(root: &Path, config: &StitchConfig, raster: &dyn RasterAdapter) -> Result<Mosaic> {
    config.validate()?;
    let grid = TileGrid::scan(root, config.axis_order, &config.extension)?;
    let tiles = select_tiles(&grid, config);
    stitch(&tiles, config, raster)
}

pub fn stitch(tiles: &[GridTile], config: &StitchConfig, raster: &dyn RasterAdapter) -> Result<Mosaic> {
    config.validate()?;
    let bounds = BoundingBox::of(tiles).ok_or(Error::NothingToStitch)?;
    let region = *bounds.region();
    let (width, height) = bounds.pixel_size(config.tile_size).ok_or_else(|| {
        Error::Config(format!(
            "{}x{} tiles of {} px do not fit in one image",
            region.cols(),
            region.rows(),
            config.tile_size
        ))
    })?;

    tracing::info!(
        "Stitching {} tiles, columns {}..={}, rows {}..={}, into {width}x{height}",
        tiles.len(),
        region.min_col,
        region.max_col,
        region.min_row,
        region.max_row
    );

    let mut canvas = raster
        .blank(width, height)
        .map_err(|e| Error::raster("<canvas>", e))?;
    let mut placed = 0;
    let mut failures = Vec::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|index| format!("stitch-{index}"))
        .build()?;
    pool.install(|| {
        common::parallel::par_map_consume(
            tiles,
            config.max_in_flight,
            |tile| load_tile(tile, config.tile_size, raster),
            |index, loaded| {
                let tile = &tiles[index];
                let placed_result = loaded.and_then(|image| {
                    let x = (tile.col - region.min_col) * config.tile_size;
                    let y = (tile.row - region.min_row) * config.tile_size;
                    raster
                        .insert(&mut canvas, &image, x, y)
                        .map_err(|e| Error::raster(&tile.path, e))
                });
                match placed_result {
                    Ok(()) => placed += 1,
                    Err(error) => {
                        tracing::warn!("Skipping tile {},{}: {error}", tile.col, tile.row);
                        failures.push(StitchFailure {
                            col: tile.col,
                            row: tile.row,
                            path: tile.path.clone(),
                            error,
                        });
                    }
                }
            },
        );
    });

    Ok(Mosaic {
        image: canvas,
        bounds,
        tile_size: config.tile_size,
        placed,
        failures,
    })
}

fn load_tile(tile: &GridTile, tile_size: u32, raster: &dyn RasterAdapter) -> Result<Image> {
    let image = raster
        .load_rgba(&tile.path)
        .map_err(|e| Error::raster(&tile.path, e))?;
    let desc = image.desc();
    if desc.width != tile_size || desc.height != tile_size {
        return Err(Error::InconsistentGrid {
            path: tile.path.clone(),
            reason: format!(
                "tile is {}x{}, expected {tile_size}x{tile_size}",
                desc.width, desc.height
            ),
        });
    }
    Ok(image)
}
