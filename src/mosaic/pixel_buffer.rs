//! Plain 8-bit interleaved pixel storage

use std::fmt;
use image::{DynamicImage, ImageBuffer, Rgb, Rgba};

use crate::errors::{MosaicError, MosaicResult};

/// Channel layout of a [`PixelBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// Opaque, 3 channels
    Rgb,
    /// 4 channels, last one alpha
    Rgba,
}

impl ChannelMode {
    pub fn channels(&self) -> usize {
        match self {
            ChannelMode::Rgb => 3,
            ChannelMode::Rgba => 4,
        }
    }

    pub fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            3 => Some(ChannelMode::Rgb),
            4 => Some(ChannelMode::Rgba),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelMode::Rgb => write!(f, "RGB"),
            ChannelMode::Rgba => write!(f, "RGBA"),
        }
    }
}

/// Row-major, channel-interleaved 8-bit pixels
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    mode: ChannelMode,
    data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelBuffer({}x{} {})", self.width, self.height, self.mode)
    }
}

impl PixelBuffer {
    /// Zero-filled buffer (transparent black for RGBA)
    pub fn new_blank(width: u32, height: u32, mode: ChannelMode) -> Self {
        PixelBuffer {
            width,
            height,
            mode,
            data: vec![0u8; width as usize * height as usize * mode.channels()],
        }
    }

    /// Wrap existing pixel data, checking its length
    pub fn from_raw(width: u32, height: u32, mode: ChannelMode, data: Vec<u8>) -> MosaicResult<Self> {
        let expected = width as usize * height as usize * mode.channels();
        if data.len() != expected {
            return Err(MosaicError::Image(image::ImageError::Parameter(
                image::error::ParameterError::from_kind(image::error::ParameterErrorKind::DimensionMismatch),
            )));
        }
        Ok(PixelBuffer { width, height, mode, data })
    }

    /// Decode an encoded image (PNG, JPEG, WebP, ...)
    ///
    /// 8-bit RGB stays RGB; every other layout is expanded to RGBA.
    pub fn decode(bytes: &[u8]) -> image::ImageResult<Self> {
        Ok(Self::from_dynamic(image::load_from_memory(bytes)?))
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(rgb) => {
                let (width, height) = rgb.dimensions();
                PixelBuffer { width, height, mode: ChannelMode::Rgb, data: rgb.into_raw() }
            }
            other => {
                let rgba = other.into_rgba8();
                let (width, height) = rgba.dimensions();
                PixelBuffer { width, height, mode: ChannelMode::Rgba, data: rgba.into_raw() }
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn channels(&self) -> usize {
        self.mode.channels()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of one row
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * self.channels();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Channels of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels();
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Convert to another channel mode
    ///
    /// RGB to RGBA adds an opaque alpha; RGBA to RGB drops alpha.
    pub fn to_mode(&self, mode: ChannelMode) -> PixelBuffer {
        if mode == self.mode {
            return self.clone();
        }

        let data = match mode {
            ChannelMode::Rgba => self.data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            ChannelMode::Rgb => self.data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };

        PixelBuffer { width: self.width, height: self.height, mode, data }
    }

    /// Every channel of every pixel is 0
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// No alpha channel, or alpha is 255 everywhere
    pub fn is_fully_opaque(&self) -> bool {
        match self.mode {
            ChannelMode::Rgb => true,
            ChannelMode::Rgba => self.data.chunks_exact(4).all(|px| px[3] == 255),
        }
    }

    /// Copy of the rectangle at `(x, y)`, clipped to the buffer
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> PixelBuffer {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);

        let c = self.channels();
        let mut data = Vec::with_capacity(width as usize * height as usize * c);
        for row in y..y + height {
            let start = (row as usize * self.width as usize + x as usize) * c;
            data.extend_from_slice(&self.data[start..start + width as usize * c]);
        }

        PixelBuffer { width, height, mode: self.mode, data }
    }

    /// Overwrite pixels with `src` placed at `(x, y)`
    ///
    /// `src` must have the same mode; parts outside this buffer are dropped.
    pub fn paste(&mut self, src: &PixelBuffer, x: u32, y: u32) {
        debug_assert_eq!(src.mode, self.mode);
        if x >= self.width || y >= self.height {
            return;
        }

        let c = self.channels();
        let copy_w = src.width.min(self.width - x) as usize;
        let copy_h = src.height.min(self.height - y);

        for row in 0..copy_h {
            let src_start = row as usize * src.width as usize * c;
            let dst_start = ((y + row) as usize * self.width as usize + x as usize) * c;
            self.data[dst_start..dst_start + copy_w * c]
                .copy_from_slice(&src.data[src_start..src_start + copy_w * c]);
        }
    }

    /// Half-size copy, each output pixel the mean of a 2x2 block
    ///
    /// Odd edges average over the pixels that exist.
    pub fn downsample_half(&self) -> PixelBuffer {
        let width = self.width.div_ceil(2).max(1);
        let height = self.height.div_ceil(2).max(1);
        let c = self.channels();
        let mut data = Vec::with_capacity(width as usize * height as usize * c);

        for oy in 0..height {
            for ox in 0..width {
                let mut sums = [0u32; 4];
                let mut count = 0u32;
                for sy in (oy * 2)..(oy * 2 + 2).min(self.height) {
                    for sx in (ox * 2)..(ox * 2 + 2).min(self.width) {
                        for (sum, v) in sums.iter_mut().zip(self.pixel(sx, sy)) {
                            *sum += *v as u32;
                        }
                        count += 1;
                    }
                }
                let count = count.max(1);
                data.extend(sums[..c].iter().map(|s| ((s + count / 2) / count) as u8));
            }
        }

        PixelBuffer { width, height, mode: self.mode, data }
    }

    pub fn into_dynamic_image(self) -> MosaicResult<DynamicImage> {
        let (width, height) = (self.width, self.height);
        let image = match self.mode {
            ChannelMode::Rgb => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgb8),
            ChannelMode::Rgba => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, self.data)
                .map(DynamicImage::ImageRgba8),
        };
        image.ok_or_else(|| MosaicError::Image(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(image::error::ParameterErrorKind::DimensionMismatch),
        )))
    }
}
