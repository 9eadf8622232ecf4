//! GDAL VRT manifest over a flat tile directory.
//!
//! Each present tile contributes one `SimpleSource` per band, so GDAL tools can
//! read the whole grid as a single RGBA raster. Absent tiles are left out and
//! read as transparent.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use crate::config::AxisOrder;
use crate::error::{Error, Result};
use crate::grid::TileGrid;

const BANDS: [&str; 4] = ["Red", "Green", "Blue", "Alpha"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrtOptions {
    pub tile_size: u32,
    /// Grid size in tiles as `(columns, rows)`. Defaults to the scanned extent.
    pub grid: Option<(u32, u32)>,
    /// Tiles are `<row>/<col>.<ext>` by default.
    pub axis_order: AxisOrder,
    pub extension: String,
}

impl Default for VrtOptions {
    fn default() -> Self {
        Self {
            tile_size: 1000,
            grid: None,
            axis_order: AxisOrder::RowMajor,
            extension: "png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrtDocument {
    pub xml: String,
    /// Tiles referenced by the manifest.
    pub sources: usize,
}

/// Renders the manifest for `grid`. Source paths are written relative to
/// `vrt_dir`.
pub fn render_vrt(grid: &TileGrid, vrt_dir: &Path, options: &VrtOptions) -> Result<VrtDocument> {
    if options.tile_size == 0 {
        return Err(Error::Config("tile_size must be > 0".to_string()));
    }
    let tile = options.tile_size;
    let (cols, rows) = options.grid.unwrap_or((grid.width(), grid.height()));
    let (width, height) = match (cols.checked_mul(tile), rows.checked_mul(tile)) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(Error::Config(format!(
                "{cols}x{rows} tiles of {tile} px exceed the VRT raster size"
            )))
        }
    };

    let tiles: Vec<_> = grid
        .tiles()
        .into_iter()
        .filter(|t| t.col < cols && t.row < rows)
        .collect();
    let sources = tiles
        .iter()
        .map(|t| {
            let rel = relative_path(vrt_dir, &t.path).map_err(|e| Error::io(&t.path, e))?;
            Ok((t.col, t.row, format!("vrt://{}?expand=rgba", to_slash(&rel))))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut xml = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        xml,
        r#"<VRTDataset rasterXSize="{width}" rasterYSize="{height}">"#
    );
    let _ = writeln!(xml, "  <GeoTransform>0,1,0,0,0,1</GeoTransform>");
    for (band, name) in BANDS.iter().enumerate() {
        let band = band + 1;
        let _ = writeln!(xml, r#"  <VRTRasterBand dataType="Byte" band="{band}">"#);
        let _ = writeln!(xml, "    <ColorInterp>{name}</ColorInterp>");
        for (col, row, source) in &sources {
            let _ = writeln!(xml, "    <SimpleSource>");
            let _ = writeln!(
                xml,
                r#"      <SourceFilename relativeToVRT="1">{}</SourceFilename>"#,
                escape_xml(source)
            );
            let _ = writeln!(xml, "      <SourceBand>{band}</SourceBand>");
            let _ = writeln!(
                xml,
                r#"      <SrcRect xOff="0" yOff="0" xSize="{tile}" ySize="{tile}" />"#
            );
            let _ = writeln!(
                xml,
                r#"      <DstRect xOff="{}" yOff="{}" xSize="{tile}" ySize="{tile}" />"#,
                u64::from(*col) * u64::from(tile),
                u64::from(*row) * u64::from(tile)
            );
            let _ = writeln!(xml, "    </SimpleSource>");
        }
        let _ = writeln!(xml, "  </VRTRasterBand>");
    }
    let _ = writeln!(xml, "</VRTDataset>");

    tracing::debug!("VRT {width}x{height} with {} tile sources", sources.len());
    Ok(VrtDocument {
        xml,
        sources: sources.len(),
    })
}

/// Scans `tiles_root` and writes the manifest to `vrt_path`. Returns the number
/// of tiles referenced.
pub fn write_vrt(tiles_root: &Path, vrt_path: &Path, options: &VrtOptions) -> Result<usize> {
    let grid = TileGrid::scan(tiles_root, options.axis_order, &options.extension)?;
    let vrt_dir = vrt_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let document = render_vrt(&grid, vrt_dir, options)?;
    std::fs::write(vrt_path, &document.xml).map_err(|e| Error::io(vrt_path, e))?;

    tracing::info!(
        "Wrote '{}' referencing {} tiles",
        vrt_path.display(),
        document.sources
    );
    Ok(document.sources)
}

/// Path of `target` relative to directory `base`. Both are made absolute first.
fn relative_path(base: &Path, target: &Path) -> std::io::Result<PathBuf> {
    let base = std::path::absolute(base)?;
    let target = std::path::absolute(target)?;
    let base: Vec<Component> = base.components().filter(|c| *c != Component::CurDir).collect();
    let target: Vec<Component> = target
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    Ok(rel)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
