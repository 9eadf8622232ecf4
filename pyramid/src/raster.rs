//! The raster capability the pyramid core depends on.

use std::path::Path;

use imaginarium::ops::{self, LayoutOptions, LayoutReport, TileLayout};
use imaginarium::{ColorFormat, Image, ImageDesc};

/// Image operations used by the reducer, the materializer and the stitcher.
/// Every image crossing this boundary is `RGBA_U8`.
pub trait RasterAdapter: Send + Sync {
    /// Decodes a file and normalizes it to RGBA, padding an opaque alpha channel
    /// when the source has none.
    fn load_rgba(&self, path: &Path) -> imaginarium::Result<Image>;

    /// A fully transparent image.
    fn blank(&self, width: u32, height: u32) -> imaginarium::Result<Image>;

    /// Joins four equally sized images as `[top-left, top-right, bottom-left,
    /// bottom-right]` into one of twice the size.
    fn join_2x2(&self, quads: [&Image; 4]) -> imaginarium::Result<Image>;

    /// Halves both dimensions without blending pixels.
    fn shrink2(&self, image: &Image) -> imaginarium::Result<Image>;

    /// Places `tile` on `canvas` at `(x, y)`, replacing pixels.
    fn insert(&self, canvas: &mut Image, tile: &Image, x: u32, y: u32)
        -> imaginarium::Result<()>;

    fn write(&self, image: &Image, path: &Path) -> imaginarium::Result<()>;

    fn export_layout(
        &self,
        image: &Image,
        dir: &Path,
        name: &str,
        layout: TileLayout,
        options: &LayoutOptions,
    ) -> imaginarium::Result<LayoutReport>;
}

/// [`RasterAdapter`] backed by `imaginarium`.
///
/// Called from a rayon worker (a tile task or a stitch decode), kernels run on
/// that worker's pool. Called from any other thread, they run on a private pool
/// of `threads` workers. Waiting on a foreign pool from a worker would let the
/// waiting worker pick up further tile tasks on the same stack.
pub struct ImaginariumRaster {
    pool: rayon::ThreadPool,
}

impl ImaginariumRaster {
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("raster-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn run<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        if rayon::current_thread_index().is_some() {
            op()
        } else {
            self.pool.install(op)
        }
    }
}

impl std::fmt::Debug for ImaginariumRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImaginariumRaster")
            .field("threads", &self.threads())
            .finish()
    }
}

impl RasterAdapter for ImaginariumRaster {
    fn load_rgba(&self, path: &Path) -> imaginarium::Result<Image> {
        let image = Image::read_file(path)?;
        self.run(|| image.convert(ColorFormat::RGBA_U8))
    }

    fn blank(&self, width: u32, height: u32) -> imaginarium::Result<Image> {
        Image::new_empty(ImageDesc::new(width, height, ColorFormat::RGBA_U8))
    }

    fn join_2x2(&self, quads: [&Image; 4]) -> imaginarium::Result<Image> {
        self.run(|| ops::join_grid(&quads, 2))
    }

    fn shrink2(&self, image: &Image) -> imaginarium::Result<Image> {
        self.run(|| ops::shrink2_nearest(image))
    }

    fn insert(
        &self,
        canvas: &mut Image,
        tile: &Image,
        x: u32,
        y: u32,
    ) -> imaginarium::Result<()> {
        self.run(|| ops::insert(canvas, tile, x, y))
    }

    fn write(&self, image: &Image, path: &Path) -> imaginarium::Result<()> {
        image.save_file(path)
    }

    fn export_layout(
        &self,
        image: &Image,
        dir: &Path,
        name: &str,
        layout: TileLayout,
        options: &LayoutOptions,
    ) -> imaginarium::Result<LayoutReport> {
        self.run(|| ops::export_layout(image, dir, name, layout, options))
    }
}
