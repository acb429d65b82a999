//! Image buffers.
//!
//! This module provides:
//!
//! - [`RawImage`], an 8-bit decoded image with 1, 3, or 4 interleaved channels, as it comes out of
//!   a decoder.
//! - [`Frame`], the canonical 8-bit RGB image every later pipeline stage works on. A [`RawImage`]
//!   is turned into a [`Frame`] by [`normalize`].
//! - [`Color`], an opaque RGB color.
//! - A few [`draw`] functions for annotating frames.

pub mod draw;
mod normalize;
mod resolution;


use std::{fmt, path::Path};

use anyhow::Context;
use embedded_graphics::{pixelcolor::raw::RawU24, prelude::PixelColor};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};

pub use normalize::*;
pub use resolution::*;

use crate::Error;

/// Lowercase file extensions of the image formats that can be loaded and saved.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Returns whether images with file extension `ext` can be loaded (case-insensitive, without the
/// leading `.`).
pub fn is_supported_extension(ext: &str) -> bool {
    ImageFormat::from_extension(ext).is_some()
}

#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
        {
            Some(format) => Ok(format),
            None => anyhow::bail!(
                "invalid image path '{}' (must have one of the extensions {})",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", "),
            ),
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

/// A decoded 8-bit image with interleaved channels.
///
/// No constraints are placed on the channel count here; [`normalize`] rejects everything that is
/// not grayscale, RGB, or RGBA.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

impl RawImage {
    /// Wraps an interleaved pixel buffer.
    ///
    /// Fails with [`Error::InvalidParameter`] if `data` does not hold exactly
    /// `width * height * channels` bytes.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, Error> {
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(Error::invalid_parameter(
                "data",
                format!(
                    "buffer holds {} bytes, but a {}x{} image with {} channels needs {}",
                    data.len(),
                    width,
                    height,
                    channels,
                    expected,
                ),
            ));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Converts a decoded image into its 8-bit representation.
    ///
    /// Grayscale images stay single-channel and RGB images stay 3-channel. Anything carrying an
    /// alpha channel (including grayscale with alpha) becomes RGBA; higher bit depths are reduced
    /// to 8 bits.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let (channels, data) = match image {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            other if other.color().has_alpha() => (4, other.to_rgba8().into_raw()),
            other if other.color().channel_count() == 1 => (1, other.to_luma8().into_raw()),
            other => (3, other.to_rgb8().into_raw()),
        };

        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Loads and decodes an image from the filesystem.
    ///
    /// The path must have one of the [`SUPPORTED_EXTENSIONS`], in any case.
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let format = ImageFormat::from_path(path)?;
        let data =
            std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
        let image = image::load_from_memory_with_format(&data, format.to_image_format())
            .with_context(|| format!("failed to decode '{}'", path.display()))?;
        Ok(Self::from_dynamic(image))
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Returns the number of interleaved channels per pixel.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} RawImage",
            self.width, self.height, self.channels
        )
    }
}

impl From<Frame> for RawImage {
    fn from(frame: Frame) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            channels: 3,
            data: frame.buf.into_raw(),
        }
    }
}

/// An 8-bit RGB image.
///
/// Every buffer derived from a frame (render output, masks, depth) shares the frame's
/// [`Resolution`].
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub(crate) buf: RgbImage,
}

impl Frame {
    /// Creates a black frame of a specified size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates a frame of the given resolution, filled with `color`.
    pub fn filled(res: Resolution, color: Color) -> Self {
        Self {
            buf: ImageBuffer::from_pixel(res.width(), res.height(), Rgb(color.0)),
        }
    }

    /// Creates a frame from packed RGB data.
    ///
    /// # Panics
    ///
    /// This will panic if `buf` does not hold exactly `3 * width * height` bytes.
    pub fn from_rgb8(res: Resolution, buf: &[u8]) -> Self {
        let expected_size = res.num_pixels() as usize * 3;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} frame (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );

        Self {
            buf: ImageBuffer::from_fn(res.width(), res.height(), |x, y| {
                let i = (y as usize * res.width() as usize + x as usize) * 3;
                Rgb([buf[i], buf[i + 1], buf[i + 2]])
            }),
        }
    }

    /// Saves a frame to the file system.
    ///
    /// The path must have one of the [`SUPPORTED_EXTENSIONS`], in any case.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        self.save_impl(path.as_ref())
    }

    fn save_impl(&self, path: &Path) -> anyhow::Result<()> {
        let format = ImageFormat::from_path(path)?;
        self.buf
            .save_with_format(path, format.to_image_format())
            .with_context(|| format!("failed to write '{}'", path.display()))
    }

    /// Returns the width of this frame, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this frame, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this frame.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Gets the color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this frame.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this frame.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgb(color.0);
    }

    /// Places `right` next to `self`, returning a frame as wide as both together.
    ///
    /// Both frames must have the same height.
    pub fn hconcat(&self, right: &Frame) -> Result<Frame, Error> {
        if self.height() != right.height() {
            return Err(Error::ShapeMismatch {
                what: "right-hand frame",
                expected: Resolution::new(right.width(), self.height()),
                actual: right.resolution(),
            });
        }

        let left_width = self.width();
        let buf = ImageBuffer::from_fn(left_width + right.width(), self.height(), |x, y| {
            if x < left_width {
                self.buf[(x, y)]
            } else {
                right.buf[(x - left_width, y)]
            }
        });
        Ok(Frame { buf })
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Frame", self.width(), self.height())
    }
}

/// An 8-bit RGB color.
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct Color(pub(crate) [u8; 3]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0]);
    pub const WHITE: Self = Self([255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const BLUE: Self = Self([0, 0, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

// FIXME leaks `embedded-graphics` dependency
impl PixelColor for Color {
    type Raw = RawU24;
}
