use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use imaginarium::TileLayout;
use tile_pyramid::mosaic::stitch_dir;
use tile_pyramid::vrt::{write_vrt, VrtOptions};
use tile_pyramid::{
    BuildReport, ImaginariumRaster, LevelProgress, ProgressCallback, PyramidBuilder, PyramidConfig,
};

const USAGE: &str = "\
usage:
  tile-pyramid build <input_dir> <output_dir>
  tile-pyramid reduce <output_dir> <base_level>
  tile-pyramid stitch <tiles_dir> <output_image> [limit]
  tile-pyramid export <tiles_dir> <out_dir> <name> <deepzoom|google> [skip_blank_threshold]
  tile-pyramid vrt <tiles_dir> <output.vrt>

Settings come from the YAML file named by TILE_PYRAMID_CONFIG, then from
TILE_JOBS, RASTER_THREADS, TILE_SIZE, MIN_LEVEL and EXPORT_TILE_SIZE.";

fn main() -> Result<()> {
    let level = if common::is_debug() { "debug" } else { "info" };
    common::log_setup::setup_logging(level, Path::new("logs"), "tile-pyramid")
        .context("Failed to set up logging")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("{USAGE}");
    };
    let config = load_config()?;

    match (command.as_str(), &args[1..]) {
        ("build", [input, output]) => build(config, input.as_ref(), output.as_ref()),
        ("reduce", [output, base_level]) => {
            let base_level: u32 = base_level
                .parse()
                .with_context(|| format!("Invalid base level '{base_level}'"))?;
            reduce(config, output.as_ref(), base_level)
        }
        ("stitch", [tiles, image, rest @ ..]) if rest.len() <= 1 => {
            let limit = rest
                .first()
                .map(|s| s.parse::<usize>())
                .transpose()
                .context("Invalid tile limit")?;
            stitch(config, tiles.as_ref(), image.as_ref(), limit)
        }
        ("export", [tiles, out_dir, name, layout, rest @ ..]) if rest.len() <= 1 => {
            let layout = parse_layout(layout)?;
            let skip_blanks = rest
                .first()
                .map(|s| s.parse::<u8>())
                .transpose()
                .context("Invalid blank threshold")?;
            export(config, tiles.as_ref(), out_dir.as_ref(), name, layout, skip_blanks)
        }
        ("vrt", [tiles, vrt]) => {
            let options = VrtOptions {
                tile_size: config.tile_size,
                extension: config.extension.clone(),
                ..Default::default()
            };
            write_vrt(tiles.as_ref(), vrt.as_ref(), &options)?;
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

fn load_config() -> Result<PyramidConfig> {
    let mut config = match std::env::var_os("TILE_PYRAMID_CONFIG") {
        Some(path) => PyramidConfig::from_yaml_file(&PathBuf::from(path))?,
        None => PyramidConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    tracing::debug!("Using {config:?}");
    Ok(config)
}

fn progress_logger() -> ProgressCallback {
    Arc::new(|p: LevelProgress| {
        let step = (p.total / 20).max(1);
        if p.done % step == 0 || p.done == p.total {
            tracing::info!(
                "Level {}: {}/{} ({:.0}%)",
                p.level,
                p.done,
                p.total,
                p.done as f64 * 100.0 / p.total as f64
            );
        }
    })
}

fn build(config: PyramidConfig, input: &Path, output: &Path) -> Result<()> {
    let builder = PyramidBuilder::new(config)?.with_progress(progress_logger());
    let report = builder.build(input, output)?;
    finish(&report)
}

fn reduce(config: PyramidConfig, output: &Path, base_level: u32) -> Result<()> {
    let builder = PyramidBuilder::new(config)?.with_progress(progress_logger());
    let report = builder.reduce_existing(output, base_level)?;
    finish(&report)
}

fn finish(report: &BuildReport) -> Result<()> {
    for failure in report.failures() {
        tracing::error!("{failure}");
    }
    if !report.is_complete() {
        bail!(
            "{} tiles failed; re-run the same command to retry them",
            report.failure_count()
        );
    }
    Ok(())
}

fn raster(config: &PyramidConfig) -> Result<ImaginariumRaster> {
    Ok(ImaginariumRaster::new(config.raster_threads)?)
}

fn stitch(config: PyramidConfig, tiles: &Path, image: &Path, limit: Option<usize>) -> Result<()> {
    let raster = raster(&config)?;
    let mosaic = stitch_dir(tiles, &config.stitch_config(limit), &raster)?;
    mosaic.save(image, &raster)?;
    if !mosaic.failures.is_empty() {
        bail!("{} tiles could not be placed", mosaic.failures.len());
    }
    Ok(())
}

fn export(
    config: PyramidConfig,
    tiles: &Path,
    out_dir: &Path,
    name: &str,
    layout: TileLayout,
    skip_blanks: Option<u8>,
) -> Result<()> {
    let raster = raster(&config)?;
    let mosaic = stitch_dir(tiles, &config.stitch_config(None), &raster)?;
    let options = config.layout_options(skip_blanks);
    mosaic.export(out_dir, name, layout, &options, &raster)?;
    Ok(())
}

fn parse_layout(name: &str) -> Result<TileLayout> {
    match name.to_ascii_lowercase().as_str() {
        "deepzoom" | "dz" => Ok(TileLayout::DeepZoom),
        "google" => Ok(TileLayout::Google),
        other => bail!("Unknown layout '{other}', expected deepzoom or google"),
    }
}
