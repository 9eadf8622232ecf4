//! CPU raster operations. Row loops run on the current rayon pool, so callers
//! control parallelism with `ThreadPool::install`.

mod compose;
mod resize;
mod tile_layout;

pub use compose::{crop, insert, join_grid};
pub use resize::{is_blank, shrink2_nearest};
pub use tile_layout::{export_layout, LayoutOptions, LayoutReport, TileLayout};
