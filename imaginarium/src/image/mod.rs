mod io;

#[cfg(test)]
mod tests;

use std::path::Path;

/// Supported image file extensions for reading and writing.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

use crate::common::conversion::convert_image;
use crate::common::{ColorFormat, Error, Result};

/// Image geometry. Rows are tightly packed: stride always equals `row_bytes()`.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub color_format: ColorFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    desc: ImageDesc,
    bytes: Vec<u8>,
}

impl Image {
    /// Returns the image descriptor.
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Returns the image bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the image bytes as a mutable slice.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Creates a zero-filled image. For formats with alpha this is fully transparent.
    pub fn new_empty(desc: ImageDesc) -> Result<Image> {
        let bytes = vec![0; desc.size_in_bytes()];

        Ok(Image { desc, bytes })
    }

    pub fn new_with_data(desc: ImageDesc, bytes: Vec<u8>) -> Result<Image> {
        if bytes.len() != desc.size_in_bytes() {
            return Err(Error::InvalidColorFormat(format!(
                "bytes length {} does not match expected size {}",
                bytes.len(),
                desc.size_in_bytes()
            )));
        }

        Ok(Image { desc, bytes })
    }

    /// Creates an image where every pixel has the given value. `pixel` must be
    /// exactly one pixel of `desc.color_format`.
    pub fn new_filled(desc: ImageDesc, pixel: &[u8]) -> Result<Image> {
        if pixel.len() != desc.color_format.byte_count() as usize {
            return Err(Error::InvalidColorFormat(format!(
                "fill pixel has {} bytes, format {} needs {}",
                pixel.len(),
                desc.color_format,
                desc.color_format.byte_count()
            )));
        }

        let bytes = pixel.repeat(desc.width as usize * desc.height as usize);

        Ok(Image { desc, bytes })
    }

    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<Image> {
        let extension = file_extension(filename.as_ref())?;

        let image = match extension.as_str() {
            "png" | "jpeg" | "jpg" => io::load_png_jpeg(filename)?,

            _ => return Err(Error::InvalidExtension(extension)),
        };

        Ok(image)
    }

    pub fn save_file<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let extension = file_extension(filename.as_ref())?;

        match extension.as_str() {
            "png" => io::save_png(self, filename)?,
            "jpeg" | "jpg" => io::save_jpg(self, filename)?,

            _ => return Err(Error::InvalidExtension(extension)),
        };

        Ok(())
    }

    pub fn convert(self, color_format: ColorFormat) -> Result<Image> {
        if self.desc.color_format == color_format {
            return Ok(self);
        }

        let desc = ImageDesc::new(self.desc.width, self.desc.height, color_format);

        let mut result = Image::new_empty(desc)?;

        convert_image(&self, &mut result)?;

        Ok(result)
    }

    pub fn bytes_per_pixel(&self) -> u8 {
        self.desc.color_format.byte_count()
    }

    /// Returns the bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let row_bytes = self.desc.row_bytes();
        let start = y as usize * row_bytes;
        &self.bytes[start..start + row_bytes]
    }

    /// Returns the bytes of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.bytes_per_pixel() as usize;
        let start = y as usize * self.desc.row_bytes() + x as usize * bpp;
        &self.bytes[start..start + bpp]
    }
}

impl ImageDesc {
    pub fn new(width: u32, height: u32, color_format: ColorFormat) -> Self {
        Self {
            width,
            height,
            color_format,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.height as usize * self.row_bytes()
    }

    /// Returns the number of bytes per row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.color_format.byte_count() as usize
    }
}

impl std::fmt::Display for ImageDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.color_format)
    }
}

fn file_extension(filename: &Path) -> Result<String> {
    Ok(filename
        .extension()
        .and_then(|os_str| os_str.to_str())
        .ok_or_else(|| Error::InvalidExtension("missing extension".to_string()))?
        .to_ascii_lowercase())
}
