//! Export of one large image as a standard tile pyramid.
//!
//! DeepZoom:
//! ```text
//! <dir>/<name>.dzi
//! <dir>/<name>_files/<level>/<col>_<row>.<ext>
//! ```
//! Google maps:
//! ```text
//! <dir>/<name>/<z>/<y>/<x>.<ext>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::ops::{crop, insert, is_blank, shrink2_nearest};
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileLayout {
    /// Level `n` holds the full-size image, each lower level is half the size,
    /// level 0 is 1x1 pixel.
    #[default]
    DeepZoom,
    /// The image is padded to a square of `tile_size * 2^z`; level 0 is one tile.
    Google,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub tile_size: u32,
    /// Pixels shared with each neighbouring tile (DeepZoom only).
    pub overlap: u32,
    /// Skip tiles whose channels are all within this distance of transparent black
    /// (Google only; DeepZoom viewers expect every tile).
    pub skip_blanks: Option<u8>,
    /// Output file extension, e.g. `png`.
    pub extension: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            overlap: 0,
            skip_blanks: None,
            extension: "png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub levels: u32,
    pub written: usize,
    pub skipped_blank: usize,
}

/// Writes `image` under `dir` in the given layout.
pub fn export_layout(
    image: &Image,
    dir: &Path,
    name: &str,
    layout: TileLayout,
    options: &LayoutOptions,
) -> Result<LayoutReport> {
    if options.tile_size == 0 {
        return Err(Error::DimensionMismatch("tile size must be > 0".to_string()));
    }
    if image.desc().width == 0 || image.desc().height == 0 {
        return Err(Error::DimensionMismatch(format!(
            "cannot export empty image {}",
            image.desc()
        )));
    }

    fs::create_dir_all(dir)?;

    match layout {
        TileLayout::DeepZoom => export_deepzoom(image, dir, name, options),
        TileLayout::Google => export_google(image, dir, name, options),
    }
}

/// Smallest `n` with `2^n >= value`.
fn ceil_log2(value: u32) -> u32 {
    value.next_power_of_two().trailing_zeros()
}

fn export_deepzoom(
    image: &Image,
    dir: &Path,
    name: &str,
    options: &LayoutOptions,
) -> Result<LayoutReport> {
    let (width, height) = (image.desc().width, image.desc().height);
    let max_level = ceil_log2(width.max(height));
    let files_dir = dir.join(format!("{name}_files"));
    let ts = options.tile_size;

    let mut report = LayoutReport {
        levels: max_level + 1,
        ..Default::default()
    };

    let mut level_image = std::borrow::Cow::Borrowed(image);
    for level in (0..=max_level).rev() {
        let level_dir = files_dir.join(level.to_string());
        fs::create_dir_all(&level_dir)?;

        let (lw, lh) = (level_image.desc().width, level_image.desc().height);
        let cols = lw.div_ceil(ts);
        let rows = lh.div_ceil(ts);
        let coords: Vec<(u32, u32)> = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (col, row)))
            .collect();

        coords.par_iter().try_for_each(|&(col, row)| {
            let x0 = (col * ts).saturating_sub(if col > 0 { options.overlap } else { 0 });
            let y0 = (row * ts).saturating_sub(if row > 0 { options.overlap } else { 0 });
            let x1 = ((col + 1) * ts + options.overlap).min(lw);
            let y1 = ((row + 1) * ts + options.overlap).min(lh);

            let tile = crop(&level_image, x0, y0, x1 - x0, y1 - y0)?;
            tile.save_file(level_dir.join(format!("{col}_{row}.{}", options.extension)))
        })?;

        report.written += coords.len();
        tracing::debug!("DeepZoom level {level}: {cols}x{rows} tiles");

        if level > 0 {
            level_image = std::borrow::Cow::Owned(shrink2_nearest(&level_image)?);
        }
    }

    write_dzi(&dir.join(format!("{name}.dzi")), width, height, options)?;

    Ok(report)
}

fn write_dzi(path: &Path, width: u32, height: u32, options: &LayoutOptions) -> Result<()> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008" Format="{}" Overlap="{}" TileSize="{}">
  <Size Width="{}" Height="{}"/>
</Image>
"#,
        options.extension, options.overlap, options.tile_size, width, height
    );
    fs::write(path, xml)?;
    Ok(())
}

fn export_google(
    image: &Image,
    dir: &Path,
    name: &str,
    options: &LayoutOptions,
) -> Result<LayoutReport> {
    let ts = options.tile_size;
    let longest = image.desc().width.max(image.desc().height);
    let max_zoom = ceil_log2(longest.div_ceil(ts));
    let side = ts << max_zoom;

    let mut level_image =
        Image::new_empty(ImageDesc::new(side, side, image.desc().color_format))?;
    insert(&mut level_image, image, 0, 0)?;

    let root = dir.join(name);
    let mut report = LayoutReport {
        levels: max_zoom + 1,
        ..Default::default()
    };

    for zoom in (0..=max_zoom).rev() {
        let dim = 1u32 << zoom;
        let coords: Vec<(u32, u32)> = (0..dim)
            .flat_map(|y| (0..dim).map(move |x| (x, y)))
            .collect();

        let written: Vec<bool> = coords
            .par_iter()
            .map(|&(x, y)| write_google_tile(&level_image, &root, zoom, x, y, options))
            .collect::<Result<_>>()?;

        let level_written = written.iter().filter(|&&w| w).count();
        report.written += level_written;
        report.skipped_blank += written.len() - level_written;
        tracing::debug!("Google zoom {zoom}: {level_written} of {} tiles written", written.len());

        if zoom > 0 {
            level_image = shrink2_nearest(&level_image)?;
        }
    }

    Ok(report)
}

fn write_google_tile(
    level_image: &Image,
    root: &Path,
    zoom: u32,
    x: u32,
    y: u32,
    options: &LayoutOptions,
) -> Result<bool> {
    let ts = options.tile_size;
    let tile = crop(level_image, x * ts, y * ts, ts, ts)?;

    if let Some(threshold) = options.skip_blanks {
        if is_blank(&tile, threshold) {
            return Ok(false);
        }
    }

    let path: PathBuf = root
        .join(zoom.to_string())
        .join(y.to_string())
        .join(format!("{x}.{}", options.extension));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    tile.save_file(path)?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_image(width: u32, height: u32) -> Image {
        Image::new_filled(
            ImageDesc::new(width, height, ColorFormat::RGBA_U8),
            &[255, 0, 0, 255],
        )
        .unwrap()
    }

    #[test]
    fn ceil_log2_values() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(8), 3);
        assert_eq!(ceil_log2(9), 4);
    }

    #[test]
    fn deepzoom_writes_every_level_and_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let options = LayoutOptions {
            tile_size: 4,
            ..Default::default()
        };

        let report =
            export_layout(&red_image(6, 3), dir.path(), "mosaic", TileLayout::DeepZoom, &options)
                .unwrap();

        // 6 -> levels 0..=3
        assert_eq!(report.levels, 4);
        assert!(dir.path().join("mosaic.dzi").is_file());
        let top = dir.path().join("mosaic_files").join("3");
        assert!(top.join("0_0.png").is_file());
        assert!(top.join("1_0.png").is_file());
        assert!(!top.join("0_1.png").exists());
        assert!(dir.path().join("mosaic_files/0/0_0.png").is_file());

        let edge = Image::read_file(top.join("1_0.png")).unwrap();
        assert_eq!(edge.desc().width, 2);
        assert_eq!(edge.desc().height, 3);

        let dzi = fs::read_to_string(dir.path().join("mosaic.dzi")).unwrap();
        assert!(dzi.contains(r#"Width="6""#));
        assert!(dzi.contains(r#"TileSize="4""#));
    }

    #[test]
    fn deepzoom_overlap_extends_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let options = LayoutOptions {
            tile_size: 4,
            overlap: 1,
            ..Default::default()
        };

        export_layout(&red_image(8, 8), dir.path(), "m", TileLayout::DeepZoom, &options).unwrap();

        let inner = Image::read_file(dir.path().join("m_files/3/0_0.png")).unwrap();
        assert_eq!(inner.desc().width, 5);
        let outer = Image::read_file(dir.path().join("m_files/3/1_1.png")).unwrap();
        assert_eq!(outer.desc().width, 5);
        assert_eq!(outer.desc().height, 5);
    }

    #[test]
    fn google_skips_blank_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let options = LayoutOptions {
            tile_size: 4,
            skip_blanks: Some(0),
            ..Default::default()
        };

        // 4x5 of content padded to an 8x8 square: only the left column of
        // zoom 1 has content
        let report =
            export_layout(&red_image(4, 5), dir.path(), "g", TileLayout::Google, &options).unwrap();

        assert_eq!(report.levels, 2);
        assert_eq!(report.written, 3);
        assert_eq!(report.skipped_blank, 2);
        assert!(dir.path().join("g/1/0/0.png").is_file());
        assert!(dir.path().join("g/1/1/0.png").is_file());
        assert!(!dir.path().join("g/1/0/1.png").exists());
        assert!(dir.path().join("g/0/0/0.png").is_file());
    }

    #[test]
    fn google_without_skip_writes_all_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let options = LayoutOptions {
            tile_size: 4,
            ..Default::default()
        };

        let report =
            export_layout(&red_image(5, 2), dir.path(), "g", TileLayout::Google, &options).unwrap();
        assert_eq!(report.written, 4 + 1);
        assert_eq!(report.skipped_blank, 0);
    }

    #[test]
    fn zero_tile_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = LayoutOptions {
            tile_size: 0,
            ..Default::default()
        };
        assert!(
            export_layout(&red_image(2, 2), dir.path(), "x", TileLayout::Google, &options).is_err()
        );
    }
}
