#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, Default)]
#[repr(u8)]
pub enum ChannelCount {
    L = 1,
    LA = 2,
    Rgb = 3,
    #[default]
    Rgba = 4,
}

#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, Default)]
#[repr(u8)]
pub enum ChannelSize {
    #[default]
    _8bit = 1,
    _16bit = 2,
}

/// Unsigned integer pixel layout. Tiles are always normalized to `RGBA_U8`
/// before composition.
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq)]
pub struct ColorFormat {
    pub channel_count: ChannelCount,
    pub channel_size: ChannelSize,
}

impl ChannelCount {
    pub fn channel_count(&self) -> u8 {
        *self as u8
    }
}

impl ChannelSize {
    pub fn byte_count(&self) -> u8 {
        *self as u8
    }
}

impl ColorFormat {
    pub const L_U8: ColorFormat = ColorFormat::new(ChannelCount::L, ChannelSize::_8bit);
    pub const LA_U8: ColorFormat = ColorFormat::new(ChannelCount::LA, ChannelSize::_8bit);
    pub const RGB_U8: ColorFormat = ColorFormat::new(ChannelCount::Rgb, ChannelSize::_8bit);
    pub const RGBA_U8: ColorFormat = ColorFormat::new(ChannelCount::Rgba, ChannelSize::_8bit);
    pub const L_U16: ColorFormat = ColorFormat::new(ChannelCount::L, ChannelSize::_16bit);
    pub const LA_U16: ColorFormat = ColorFormat::new(ChannelCount::LA, ChannelSize::_16bit);
    pub const RGB_U16: ColorFormat = ColorFormat::new(ChannelCount::Rgb, ChannelSize::_16bit);
    pub const RGBA_U16: ColorFormat = ColorFormat::new(ChannelCount::Rgba, ChannelSize::_16bit);

    pub const fn new(channel_count: ChannelCount, channel_size: ChannelSize) -> Self {
        Self {
            channel_count,
            channel_size,
        }
    }

    /// Bytes per pixel.
    pub fn byte_count(&self) -> u8 {
        self.channel_count.channel_count() * self.channel_size.byte_count()
    }
}

impl std::fmt::Display for ChannelCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelCount::L => write!(f, "L"),
            ChannelCount::LA => write!(f, "LA"),
            ChannelCount::Rgb => write!(f, "RGB"),
            ChannelCount::Rgba => write!(f, "RGBA"),
        }
    }
}

impl std::fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} u{}",
            self.channel_count,
            self.channel_size.byte_count() * 8
        )
    }
}

