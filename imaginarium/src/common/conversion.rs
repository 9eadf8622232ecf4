use rayon::prelude::*;

use crate::common::color_format::{ChannelCount, ChannelSize, ColorFormat};
use crate::common::error::{Error, Result};
use crate::image::Image;

// =============================================================================
// Channel conversion
// =============================================================================

pub(crate) trait ChannelConvert<To>: Copy {
    fn convert(self) -> To;
}

impl ChannelConvert<u16> for u8 {
    // Replicate bits so 0xFF maps to 0xFFFF.
    #[inline]
    fn convert(self) -> u16 {
        (self as u16) << 8 | (self as u16)
    }
}

impl ChannelConvert<u8> for u16 {
    // Take high bits.
    #[inline]
    fn convert(self) -> u8 {
        (self >> 8) as u8
    }
}

/// Rec. 709 (sRGB) luminance in 16-bit precision.
#[inline]
fn luminance(r: u16, g: u16, b: u16) -> u16 {
    let l = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
    l.round().clamp(0.0, u16::MAX as f32) as u16
}

#[inline]
fn read_channel(px: &[u8], index: usize, size: ChannelSize) -> u16 {
    match size {
        ChannelSize::_8bit => px[index].convert(),
        ChannelSize::_16bit => u16::from_ne_bytes([px[index * 2], px[index * 2 + 1]]),
    }
}

#[inline]
fn write_channel(px: &mut [u8], index: usize, size: ChannelSize, value: u16) {
    match size {
        ChannelSize::_8bit => px[index] = value.convert(),
        ChannelSize::_16bit => {
            px[index * 2..index * 2 + 2].copy_from_slice(&value.to_ne_bytes());
        }
    }
}

/// Reads one pixel as 16-bit RGBA. Missing alpha is opaque.
#[inline]
fn read_rgba(px: &[u8], format: ColorFormat) -> [u16; 4] {
    let size = format.channel_size;
    match format.channel_count {
        ChannelCount::L => {
            let l = read_channel(px, 0, size);
            [l, l, l, u16::MAX]
        }
        ChannelCount::LA => {
            let l = read_channel(px, 0, size);
            [l, l, l, read_channel(px, 1, size)]
        }
        ChannelCount::Rgb => [
            read_channel(px, 0, size),
            read_channel(px, 1, size),
            read_channel(px, 2, size),
            u16::MAX,
        ],
        ChannelCount::Rgba => [
            read_channel(px, 0, size),
            read_channel(px, 1, size),
            read_channel(px, 2, size),
            read_channel(px, 3, size),
        ],
    }
}

#[inline]
fn write_rgba(px: &mut [u8], format: ColorFormat, rgba: [u16; 4]) {
    let size = format.channel_size;
    match format.channel_count {
        ChannelCount::L => write_channel(px, 0, size, luminance(rgba[0], rgba[1], rgba[2])),
        ChannelCount::LA => {
            write_channel(px, 0, size, luminance(rgba[0], rgba[1], rgba[2]));
            write_channel(px, 1, size, rgba[3]);
        }
        ChannelCount::Rgb => {
            for c in 0..3 {
                write_channel(px, c, size, rgba[c]);
            }
        }
        ChannelCount::Rgba => {
            for (c, &value) in rgba.iter().enumerate() {
                write_channel(px, c, size, value);
            }
        }
    }
}

/// Converts `from` into the color format of `to`. Both images must have the same
/// dimensions.
pub(crate) fn convert_image(from: &Image, to: &mut Image) -> Result<()> {
    let src_desc = *from.desc();
    let dst_desc = *to.desc();

    if src_desc.width != dst_desc.width || src_desc.height != dst_desc.height {
        return Err(Error::DimensionMismatch(format!(
            "cannot convert {} into {}",
            src_desc, dst_desc
        )));
    }
    if src_desc.width == 0 || src_desc.height == 0 {
        return Ok(());
    }

    let src_bpp = src_desc.color_format.byte_count() as usize;
    let dst_bpp = dst_desc.color_format.byte_count() as usize;

    to.bytes_mut()
        .par_chunks_mut(dst_desc.row_bytes())
        .zip(from.bytes().par_chunks(src_desc.row_bytes()))
        .for_each(|(dst_row, src_row)| {
            for (dst_px, src_px) in dst_row
                .chunks_exact_mut(dst_bpp)
                .zip(src_row.chunks_exact(src_bpp))
            {
                let rgba = read_rgba(src_px, src_desc.color_format);
                write_rgba(dst_px, dst_desc.color_format, rgba);
            }
        });

    Ok(())
}
