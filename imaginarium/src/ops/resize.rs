use rayon::prelude::*;

use crate::prelude::*;

/// Halves the image with nearest-neighbour sampling: output pixel `(x, y)` is
/// input pixel `(2x, 2y)`. No two source pixels are ever mixed, so flat-color
/// content keeps exact colors and alpha edges stay hard. Odd sizes round up.
pub fn shrink2_nearest(image: &Image) -> Result<Image> {
    let src = *image.desc();
    let desc = ImageDesc::new(src.width.div_ceil(2), src.height.div_ceil(2), src.color_format);
    let mut shrunk = Image::new_empty(desc)?;
    if desc.size_in_bytes() == 0 {
        return Ok(shrunk);
    }

    let bpp = src.color_format.byte_count() as usize;

    shrunk
        .bytes_mut()
        .par_chunks_mut(desc.row_bytes())
        .enumerate()
        .for_each(|(y, dst_row)| {
            let src_row = image.row(y as u32 * 2);
            for (x, dst_px) in dst_row.chunks_exact_mut(bpp).enumerate() {
                let start = x * 2 * bpp;
                dst_px.copy_from_slice(&src_row[start..start + bpp]);
            }
        });

    Ok(shrunk)
}

/// Returns true when every channel of every pixel is at most `threshold`, i.e.
/// the image is transparent black within tolerance.
pub fn is_blank(image: &Image, threshold: u8) -> bool {
    image
        .bytes()
        .par_chunks(image.desc().row_bytes().max(1))
        .all(|row| row.iter().all(|&b| b <= threshold))
}
