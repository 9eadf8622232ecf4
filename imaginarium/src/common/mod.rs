pub(crate) mod color_format;
pub(crate) mod conversion;
pub(crate) mod error;

// Public API
pub use color_format::{ChannelCount, ChannelSize, ColorFormat};
pub use error::{Error, Result};
