use rayon::prelude::*;

use crate::prelude::*;

fn ensure_same_format(a: &ImageDesc, b: &ImageDesc) -> Result<()> {
    if a.color_format != b.color_format {
        return Err(Error::InvalidColorFormat(format!(
            "color formats differ: {} vs {}",
            a.color_format, b.color_format
        )));
    }
    Ok(())
}

/// Copies `tile` into `canvas` with its top-left corner at `(x, y)`. Pixels are
/// replaced, not blended. Parts of the tile outside the canvas are clipped.
pub fn insert(canvas: &mut Image, tile: &Image, x: u32, y: u32) -> Result<()> {
    let canvas_desc = *canvas.desc();
    let tile_desc = *tile.desc();
    ensure_same_format(&canvas_desc, &tile_desc)?;

    if x >= canvas_desc.width || y >= canvas_desc.height {
        return Ok(());
    }

    let bpp = canvas_desc.color_format.byte_count() as usize;
    let copy_width = tile_desc.width.min(canvas_desc.width - x) as usize;
    let copy_height = tile_desc.height.min(canvas_desc.height - y) as usize;
    let copy_bytes = copy_width * bpp;
    let dst_offset = x as usize * bpp;
    let canvas_row_bytes = canvas_desc.row_bytes();

    canvas
        .bytes_mut()
        .par_chunks_mut(canvas_row_bytes)
        .skip(y as usize)
        .take(copy_height)
        .enumerate()
        .for_each(|(ty, dst_row)| {
            let src_row = tile.row(ty as u32);
            dst_row[dst_offset..dst_offset + copy_bytes].copy_from_slice(&src_row[..copy_bytes]);
        });

    Ok(())
}

/// Arranges equally sized images into a grid `across` images wide, in row-major
/// order. `[a, b, c, d]` with `across = 2` gives `a b` over `c d`.
pub fn join_grid(images: &[&Image], across: usize) -> Result<Image> {
    let first = match images.first() {
        Some(first) => *first.desc(),
        None => {
            return Err(Error::DimensionMismatch("nothing to join".to_string()));
        }
    };
    if across == 0 || !images.len().is_multiple_of(across) {
        return Err(Error::DimensionMismatch(format!(
            "{} images cannot fill rows of {}",
            images.len(),
            across
        )));
    }
    for image in images.iter().skip(1) {
        if *image.desc() != first {
            return Err(Error::DimensionMismatch(format!(
                "cannot join {} with {}",
                image.desc(),
                first
            )));
        }
    }

    let down = images.len() / across;
    let desc = ImageDesc::new(
        first.width * across as u32,
        first.height * down as u32,
        first.color_format,
    );
    let mut joined = Image::new_empty(desc)?;

    let tile_row_bytes = first.row_bytes();
    let tile_height = first.height as usize;

    joined
        .bytes_mut()
        .par_chunks_mut(desc.row_bytes())
        .enumerate()
        .for_each(|(y, dst_row)| {
            let grid_row = y / tile_height;
            let src_y = (y % tile_height) as u32;
            for (col, dst) in dst_row.chunks_exact_mut(tile_row_bytes).enumerate() {
                dst.copy_from_slice(images[grid_row * across + col].row(src_y));
            }
        });

    Ok(joined)
}

/// Extracts the `width x height` region at `(x, y)`. The region is clipped to the
/// image bounds.
pub fn crop(image: &Image, x: u32, y: u32, width: u32, height: u32) -> Result<Image> {
    let src = *image.desc();
    if x >= src.width || y >= src.height {
        return Err(Error::DimensionMismatch(format!(
            "crop origin {}x{} outside {}",
            x, y, src
        )));
    }

    let width = width.min(src.width - x);
    let height = height.min(src.height - y);
    let desc = ImageDesc::new(width, height, src.color_format);
    let mut cropped = Image::new_empty(desc)?;

    let bpp = src.color_format.byte_count() as usize;
    let start = x as usize * bpp;
    let row_bytes = desc.row_bytes();

    cropped
        .bytes_mut()
        .par_chunks_mut(row_bytes.max(1))
        .enumerate()
        .for_each(|(row, dst)| {
            let src_row = image.row(y + row as u32);
            dst.copy_from_slice(&src_row[start..start + row_bytes]);
        });

    Ok(cropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: u32, rgba: [u8; 4]) -> Image {
        Image::new_filled(ImageDesc::new(size, size, ColorFormat::RGBA_U8), &rgba).unwrap()
    }

    #[test]
    fn join_grid_places_images_row_major() {
        let a = solid(2, [1, 0, 0, 255]);
        let b = solid(2, [2, 0, 0, 255]);
        let c = solid(2, [3, 0, 0, 255]);
        let d = solid(2, [4, 0, 0, 255]);

        let joined = join_grid(&[&a, &b, &c, &d], 2).unwrap();
        assert_eq!(joined.desc().width, 4);
        assert_eq!(joined.desc().height, 4);
        assert_eq!(joined.pixel(0, 0)[0], 1);
        assert_eq!(joined.pixel(3, 1)[0], 2);
        assert_eq!(joined.pixel(1, 2)[0], 3);
        assert_eq!(joined.pixel(3, 3)[0], 4);
    }

    #[test]
    fn join_grid_rejects_mismatched_sizes() {
        let a = solid(2, [1, 0, 0, 255]);
        let b = solid(3, [2, 0, 0, 255]);
        assert!(matches!(
            join_grid(&[&a, &b], 2),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn join_grid_rejects_ragged_grid() {
        let a = solid(2, [1, 0, 0, 255]);
        assert!(join_grid(&[&a, &a, &a], 2).is_err());
        assert!(join_grid(&[], 2).is_err());
    }

    #[test]
    fn insert_overwrites_without_blending() {
        let mut canvas = solid(4, [9, 9, 9, 255]);
        let tile = solid(2, [0, 0, 0, 0]);

        insert(&mut canvas, &tile, 1, 1).unwrap();

        assert_eq!(canvas.pixel(0, 0), &[9, 9, 9, 255]);
        assert_eq!(canvas.pixel(1, 1), &[0, 0, 0, 0]);
        assert_eq!(canvas.pixel(2, 2), &[0, 0, 0, 0]);
        assert_eq!(canvas.pixel(3, 3), &[9, 9, 9, 255]);
    }

    #[test]
    fn insert_clips_at_canvas_edge() {
        let mut canvas = Image::new_empty(ImageDesc::new(3, 3, ColorFormat::RGBA_U8)).unwrap();
        let tile = solid(2, [5, 5, 5, 255]);

        insert(&mut canvas, &tile, 2, 2).unwrap();
        assert_eq!(canvas.pixel(2, 2), &[5, 5, 5, 255]);
        assert_eq!(canvas.pixel(1, 1), &[0, 0, 0, 0]);

        insert(&mut canvas, &tile, 3, 0).unwrap();
    }

    #[test]
    fn insert_rejects_format_mismatch() {
        let mut canvas = solid(4, [0, 0, 0, 0]);
        let tile = Image::new_empty(ImageDesc::new(2, 2, ColorFormat::RGB_U8)).unwrap();
        assert!(insert(&mut canvas, &tile, 0, 0).is_err());
    }

    #[test]
    fn crop_clips_to_bounds() {
        let mut canvas = Image::new_empty(ImageDesc::new(5, 5, ColorFormat::RGBA_U8)).unwrap();
        insert(&mut canvas, &solid(1, [7, 7, 7, 255]), 4, 4).unwrap();

        let cropped = crop(&canvas, 3, 3, 10, 10).unwrap();
        assert_eq!(cropped.desc().width, 2);
        assert_eq!(cropped.desc().height, 2);
        assert_eq!(cropped.pixel(1, 1), &[7, 7, 7, 255]);
        assert!(crop(&canvas, 5, 0, 1, 1).is_err());
    }
}
