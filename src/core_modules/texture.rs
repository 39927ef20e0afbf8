// THEORY:
// The `Texture` module owns the decoded raster that backs a 3D asset's surface.
// Like the `Pixel` it is made of, a `TextureBuffer` is a "dumb" data container: it
// knows its shape and how to hand out pixels, and nothing about clustering or
// recoloring.
//
// Key architectural principles:
// 1.  **Validated Shape**: A buffer can only be built when `width * height * channels`
//     equals the byte length and `channels` is 3 (RGB) or 4 (RGBA). Every consumer
//     can index without bounds anxiety.
// 2.  **Alpha on the Side**: Pixels handed out are RGB. When an alpha channel exists
//     it is never read by analysis and is copied verbatim by the transformation.
// 3.  **Ownership Transfer**: Analysis borrows the buffer; transformation returns a
//     new buffer of the same shape. The original stays recoverable until the caller
//     decides to replace it.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{RecolorError, Result};
use image::{DynamicImage, RgbImage, RgbaImage};

/// An owned, raster-ordered RGB or RGBA texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl TextureBuffer {
    /// Wraps raw interleaved bytes after checking them against the dimensions.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if channels != 3 && channels != 4 {
            return Err(RecolorError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(RecolorError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Builds an RGB buffer from pixels in raster order.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Pixel]) -> Result<Self> {
        let data = pixels.iter().flat_map(|p| p.to_array()).collect();
        Self::from_raw(width, height, 3, data)
    }

    /// Keeps alpha when the decoded image has it, otherwise stores RGB.
    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        if image.color().has_alpha() {
            Self {
                width,
                height,
                channels: 4,
                data: image.to_rgba8().into_raw(),
            }
        } else {
            Self {
                width,
                height,
                channels: 3,
                data: image.to_rgb8().into_raw(),
            }
        }
    }

    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let image = match self.channels {
            4 => RgbaImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgba8),
            _ => RgbImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgb8),
        };
        image.ok_or(RecolorError::BufferLength {
            expected: self.pixel_count() * self.channels as usize,
            actual: self.data.len(),
        })
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

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGB value of the pixel at raster `index`.
    ///
    /// Panics if `index >= pixel_count()`.
    pub fn pixel(&self, index: usize) -> Pixel {
        let start = index * self.channels as usize;
        Pixel::new(self.data[start], self.data[start + 1], self.data[start + 2])
    }

    /// Alpha of the pixel at raster `index`, if the buffer carries one.
    pub fn alpha(&self, index: usize) -> Option<u8> {
        self.has_alpha().then(|| self.data[index * 4 + 3])
    }

    /// All pixels in raster order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        pixels_of(&self.data, self.channels)
    }

    /// Every `stride`-th pixel in raster order, starting with the first.
    /// A stride of 0 is treated as 1.
    pub fn sample(&self, stride: usize) -> Vec<Pixel> {
        self.pixels().step_by(stride.max(1)).collect()
    }

    /// Byte range of rows `start_row..end_row`, clamped to the buffer height.
    pub fn row_bytes(&self, start_row: u32, end_row: u32) -> &[u8] {
        let row_len = self.width as usize * self.channels as usize;
        let start = start_row.min(self.height) as usize * row_len;
        let end = end_row.min(self.height) as usize * row_len;
        &self.data[start..end.max(start)]
    }

    /// Same shape, new bytes. Callers produce `data` from this buffer's own bytes.
    pub(crate) fn with_bytes(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data,
        }
    }
}

/// Iterates the RGB part of interleaved 3- or 4-channel bytes.
pub(crate) fn pixels_of(bytes: &[u8], channels: u8) -> impl Iterator<Item = Pixel> + '_ {
    bytes
        .chunks_exact(channels as usize)
        .map(|px| Pixel::new(px[0], px[1], px[2]))
}
