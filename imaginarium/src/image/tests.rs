use crate::prelude::*;

fn gradient_rgba(width: u32, height: u32) -> Image {
    let desc = ImageDesc::new(width, height, ColorFormat::RGBA_U8);
    let mut bytes = Vec::with_capacity(desc.size_in_bytes());
    for y in 0..height {
        for x in 0..width {
            bytes.extend_from_slice(&[(x * 10) as u8, (y * 10) as u8, 7, (x + y) as u8 * 20]);
        }
    }
    Image::new_with_data(desc, bytes).unwrap()
}

// =============================================================================
// Construction tests
// =============================================================================

#[test]
fn new_empty_is_transparent() {
    let img = Image::new_empty(ImageDesc::new(4, 3, ColorFormat::RGBA_U8)).unwrap();
    assert_eq!(img.bytes().len(), 4 * 3 * 4);
    assert!(img.bytes().iter().all(|&b| b == 0));
}

#[test]
fn new_with_data_rejects_wrong_length() {
    let desc = ImageDesc::new(2, 2, ColorFormat::RGB_U8);
    let result = Image::new_with_data(desc, vec![0; 11]);
    assert!(matches!(result, Err(Error::InvalidColorFormat(_))));
}

#[test]
fn new_filled_repeats_pixel() {
    let desc = ImageDesc::new(3, 2, ColorFormat::RGBA_U8);
    let img = Image::new_filled(desc, &[255, 0, 0, 255]).unwrap();
    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(img.pixel(x, y), &[255, 0, 0, 255]);
        }
    }
}

#[test]
fn row_and_pixel_accessors() {
    let img = gradient_rgba(3, 2);
    assert_eq!(img.row(1).len(), 12);
    assert_eq!(img.pixel(2, 1), &[20, 10, 7, 60]);
}

// =============================================================================
// File reading tests
// =============================================================================

#[test]
fn read_missing_file_returns_error() {
    let result = Image::read_file("/nonexistent/does_not_exist.png");
    assert!(result.is_err());
}

#[test]
fn read_invalid_extension_returns_error() {
    let result = Image::read_file("/nonexistent/file.xyz");
    assert!(matches!(result, Err(Error::InvalidExtension(_))));
}

#[test]
fn read_case_insensitive_extension() {
    // Should fail because the file is missing, not because of the extension
    let result = Image::read_file("/nonexistent/does_not_exist.PNG");
    assert!(matches!(result, Err(Error::Io(_)) | Err(Error::Encoding(_))));
}

// =============================================================================
// File saving tests
// =============================================================================

#[test]
fn save_and_reload_png_rgba() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");

    let original = gradient_rgba(5, 4);
    original.save_file(&path).unwrap();

    let reloaded = Image::read_file(&path).unwrap();
    assert_eq!(original, reloaded);
}

#[test]
fn save_and_reload_png_rgb_keeps_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgb.png");

    let original = gradient_rgba(5, 4).convert(ColorFormat::RGB_U8).unwrap();
    original.save_file(&path).unwrap();

    let reloaded = Image::read_file(&path).unwrap();
    assert_eq!(reloaded.desc().color_format, ColorFormat::RGB_U8);
    assert_eq!(original.bytes(), reloaded.bytes());
}

#[test]
fn save_jpg_rejects_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let result = gradient_rgba(2, 2).save_file(dir.path().join("alpha.jpg"));
    assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
}

#[test]
fn save_unknown_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = gradient_rgba(2, 2).save_file(dir.path().join("tile.bmp"));
    assert!(matches!(result, Err(Error::InvalidExtension(_))));
}
