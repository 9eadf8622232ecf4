//! Multi-resolution tile pyramid builder.
//!
//! A base level of `2^n x 2^n` tiles is staged into `<root>/<level>/<col>/<row>.<ext>`
//! and reduced level by level: each parent is the 2x2 join of its children,
//! halved with nearest-neighbour sampling. Empty regions are hard links to one
//! shared transparent tile and are never decoded.

pub mod blank;
pub mod config;
pub mod coord;
pub mod dispatcher;
pub mod error;
pub mod grid;
pub mod materializer;
pub mod mosaic;
pub mod pipeline;
pub mod raster;
pub mod reducer;
pub mod report;
pub mod store;
pub mod vrt;

pub use blank::{BlankSingleton, BlankTile};
pub use config::{AxisOrder, PyramidConfig};
pub use coord::TileCoord;
pub use dispatcher::{Dispatcher, LevelProgress, ProgressCallback};
pub use error::{Error, Result};
pub use grid::{GridTile, TileGrid};
pub use mosaic::{BoundingBox, Mosaic, StitchConfig, StitchFailure, TileRegion};
pub use pipeline::PyramidBuilder;
pub use raster::{ImaginariumRaster, RasterAdapter};
pub use reducer::Reducer;
pub use report::{BuildReport, LevelReport, TileFailure, TileOutcome};
pub use store::{MaterializePolicy, MaterializeStrategy, Materialized, TileIdentity, TileStore};
pub use vrt::{VrtDocument, VrtOptions};
