//! Drawing primitives operating on [`Frame`]s.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};

use super::{Color, Frame};

/// Guard returned by [`text`]; draws the text when dropped and allows customization.
pub struct DrawText<'a> {
    frame: &'a mut Frame,
    x: i32,
    y: i32,
    text: &'a str,
    color: Color,
    scale: f32,
    thickness: u32,
}

impl<'a> DrawText<'a> {
    /// Sets the text color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the factor by which glyph geometry is scaled.
    ///
    /// A scale of 1 draws the 6x10 pixel base font unscaled.
    pub fn scale(&mut self, scale: f32) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Sets the stroke thickness, in pixels.
    ///
    /// By default, a thickness of 1 is used. Strokes are never thinner than the scale factor.
    pub fn thickness(&mut self, thickness: u32) -> &mut Self {
        assert!(thickness != 0, "stroke thickness must be greater than zero");
        self.thickness = thickness;
        self
    }
}

impl Drop for DrawText<'_> {
    fn drop(&mut self) {
        // Rasterize at the base font size with the baseline at y=0, then stamp every lit font
        // pixel as a square at its scaled position. The square is at least `ceil(scale)` wide so
        // neighboring font pixels stay connected at fractional scales.
        let mut glyphs = GlyphPixels(Vec::new());
        let style = MonoTextStyle::new(&ascii::FONT_6X10, BinaryColor::On);
        match Text::with_baseline(self.text, Point::zero(), style, Baseline::Alphabetic)
            .draw(&mut glyphs)
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }

        let side = self.thickness.max(self.scale.ceil() as u32);
        let size = Size::new(side, side);
        let fill = PrimitiveStyle::with_fill(self.color);
        let mut target = Target(&mut *self.frame);
        for point in glyphs.0 {
            let top_left = Point::new(
                self.x + (point.x as f32 * self.scale).floor() as i32,
                self.y + (point.y as f32 * self.scale).floor() as i32,
            );
            match Rectangle::new(top_left, size)
                .into_styled(fill)
                .draw(&mut target)
            {
                Ok(_) => {}
                Err(infallible) => match infallible {},
            }
        }
    }
}

/// Draws a text string onto a frame.
///
/// `x` is the left edge of the text and `y` its baseline. Text that does not fit into the frame
/// is clipped.
pub fn text<'a>(frame: &'a mut Frame, x: i32, y: i32, text: &'a str) -> DrawText<'a> {
    DrawText {
        frame,
        x,
        y,
        text,
        color: Color::from_rgb8(255, 0, 0),
        scale: 1.0,
        thickness: 1,
    }
}

/// Collects the lit pixels of a rendered font string.
struct GlyphPixels(Vec<Point>);

impl Dimensions for GlyphPixels {
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(
            Point::new(i32::MIN / 2, i32::MIN / 2),
            Size::new(u32::MAX / 2, u32::MAX / 2),
        )
    }
}

impl DrawTarget for GlyphPixels {
    type Color = BinaryColor;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.0.extend(
            pixels
                .into_iter()
                .filter(|Pixel(_, color)| color.is_on())
                .map(|Pixel(point, _)| point),
        );
        Ok(())
    }
}

struct Target<'a>(&'a mut Frame);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.0.width(), self.0.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < self.0.width()
                && point.y >= 0
                && (point.y as u32) < self.0.height()
            {
                self.0.set(point.x as _, point.y as _, color);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_pixels(frame: &Frame, color: Color) -> Vec<(u32, u32)> {
        (0..frame.height())
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.get(x, y) == color)
            .collect()
    }

    #[test]
    fn text_sits_on_baseline() {
        let mut frame = Frame::new(40, 20);
        text(&mut frame, 2, 12, "H").color(Color::WHITE);

        let lit = lit_pixels(&frame, Color::WHITE);
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&(x, y)| x >= 2 && x < 8 && y >= 2 && y <= 12));
    }

    #[test]
    fn scaled_text_is_larger() {
        let mut small = Frame::new(100, 100);
        text(&mut small, 2, 40, "H").color(Color::WHITE);
        let mut large = Frame::new(100, 100);
        text(&mut large, 2, 40, "H")
            .color(Color::WHITE)
            .scale(3.0)
            .thickness(3);

        let small = lit_pixels(&small, Color::WHITE).len();
        let large = lit_pixels(&large, Color::WHITE).len();
        assert!(large > small * 4, "{large} vs {small}");
    }

    #[test]
    fn fractional_scale_has_no_gaps() {
        let mut frame = Frame::new(60, 60);
        text(&mut frame, 4, 40, "H")
            .color(Color::WHITE)
            .scale(2.4)
            .thickness(1);

        let lit = lit_pixels(&frame, Color::WHITE);
        let left = lit.iter().map(|&(x, _)| x).min().unwrap();
        let column: Vec<u32> = lit
            .iter()
            .filter(|&&(x, _)| x == left)
            .map(|&(_, y)| y)
            .collect();
        let (top, bottom) = (column[0], column[column.len() - 1]);
        assert!(bottom - top > 10, "{column:?}");
        assert_eq!(column.len() as u32, bottom - top + 1, "{column:?}");
    }

    #[test]
    fn clipped_at_frame_edges() {
        let mut frame = Frame::new(8, 8);
        text(&mut frame, -3, 4, "a long line of text")
            .color(Color::GREEN)
            .scale(2.0)
            .thickness(2);
        assert!(!lit_pixels(&frame, Color::GREEN).is_empty());
    }
}
