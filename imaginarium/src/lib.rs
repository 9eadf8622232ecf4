mod common;
mod image;
pub mod ops;

pub mod prelude;

pub use prelude::*;
