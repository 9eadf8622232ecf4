// Color formats
pub use crate::common::{ChannelCount, ChannelSize, ColorFormat};

// Error handling
pub use crate::common::{Error, Result};

// Image types
pub use crate::image::{Image, ImageDesc, SUPPORTED_EXTENSIONS};

// Operations
pub use crate::ops::{LayoutOptions, LayoutReport, TileLayout};
