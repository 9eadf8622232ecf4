use std::path::Path;

use image_lib::DynamicImage;

use crate::prelude::*;

pub(crate) fn load_png_jpeg<P: AsRef<Path>>(filename: P) -> Result<Image> {
    let img = image_lib::open(filename)?;
    let (width, height) = (img.width(), img.height());

    let (color_format, bytes) = match img {
        DynamicImage::ImageLuma8(buf) => (ColorFormat::L_U8, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (ColorFormat::LA_U8, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (ColorFormat::RGB_U8, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (ColorFormat::RGBA_U8, buf.into_raw()),
        DynamicImage::ImageLuma16(buf) => (ColorFormat::L_U16, u16_bytes(buf.into_raw())),
        DynamicImage::ImageLumaA16(buf) => (ColorFormat::LA_U16, u16_bytes(buf.into_raw())),
        DynamicImage::ImageRgb16(buf) => (ColorFormat::RGB_U16, u16_bytes(buf.into_raw())),
        DynamicImage::ImageRgba16(buf) => (ColorFormat::RGBA_U16, u16_bytes(buf.into_raw())),
        other => return Err(Error::UnsupportedColorType(format!("{:?}", other.color()))),
    };

    Image::new_with_data(ImageDesc::new(width, height, color_format), bytes)
}

fn u16_bytes(samples: Vec<u16>) -> Vec<u8> {
    bytemuck::cast_slice(&samples).to_vec()
}

pub(crate) fn save_jpg<P: AsRef<Path>>(image: &Image, filename: P) -> Result<()> {
    let color_type = match image.desc().color_format {
        ColorFormat::L_U8 => image_lib::ColorType::L8,
        ColorFormat::RGB_U8 => image_lib::ColorType::Rgb8,

        other => {
            return Err(Error::UnsupportedFormat(format!("JPEG color format: {}", other)));
        }
    };

    image_lib::save_buffer_with_format(
        filename,
        image.bytes(),
        image.desc().width,
        image.desc().height,
        color_type,
        image_lib::ImageFormat::Jpeg,
    )?;

    Ok(())
}

pub(crate) fn save_png<P: AsRef<Path>>(image: &Image, filename: P) -> Result<()> {
    let color_type = match image.desc().color_format.channel_size {
        ChannelSize::_8bit => match image.desc().color_format.channel_count {
            ChannelCount::L => image_lib::ColorType::L8,
            ChannelCount::LA => image_lib::ColorType::La8,
            ChannelCount::Rgb => image_lib::ColorType::Rgb8,
            ChannelCount::Rgba => image_lib::ColorType::Rgba8,
        },
        ChannelSize::_16bit => match image.desc().color_format.channel_count {
            ChannelCount::L => image_lib::ColorType::L16,
            ChannelCount::LA => image_lib::ColorType::La16,
            ChannelCount::Rgb => image_lib::ColorType::Rgb16,
            ChannelCount::Rgba => image_lib::ColorType::Rgba16,
        },
    };

    image_lib::save_buffer_with_format(
        filename,
        image.bytes(),
        image.desc().width,
        image.desc().height,
        color_type,
        image_lib::ImageFormat::Png,
    )?;

    Ok(())
}
