use image::{ImageBuffer, Rgb};

use crate::Error;

use super::{Frame, RawImage};

/// Converts a decoded image into a canonical RGB [`Frame`].
///
/// - Grayscale images have their single channel replicated into R, G and B.
/// - RGBA images are flattened against a white background, using the 4th channel as alpha.
/// - RGB images are passed through unchanged.
///
/// Fails with [`Error::InvalidImageShape`] for any other channel count, or if the image is empty.
pub fn normalize(raw: &RawImage) -> Result<Frame, Error> {
    let (width, height, channels) = (raw.width(), raw.height(), raw.channels());
    if width == 0 || height == 0 || !matches!(channels, 1 | 3 | 4) {
        return Err(Error::InvalidImageShape {
            width,
            height,
            channels,
        });
    }

    let data = raw.data();
    let buf = ImageBuffer::from_fn(width, height, |x, y| {
        let i = (y as usize * width as usize + x as usize) * channels;
        match channels {
            1 => Rgb([data[i]; 3]),
            3 => Rgb([data[i], data[i + 1], data[i + 2]]),
            _ => {
                let alpha = data[i + 3];
                Rgb([
                    flatten_on_white(data[i], alpha),
                    flatten_on_white(data[i + 1], alpha),
                    flatten_on_white(data[i + 2], alpha),
                ])
            }
        }
    });

    Ok(Frame { buf })
}

/// Composites one non-premultiplied channel value over a white background.
fn flatten_on_white(value: u8, alpha: u8) -> u8 {
    let a = f32::from(alpha) / 255.0;
    let c = f32::from(value) / 255.0;
    let out = 255.0 * (c * a + 1.0 * (1.0 - a));
    out.round().clamp(0.0, 255.0) as u8
}
