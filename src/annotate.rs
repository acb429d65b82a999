//! Text annotations in the top left corner of a frame.

use crate::{
    hand::{Detections, HandSide},
    image::{draw, Color, Frame},
};

/// Left edge of annotation text, in pixels.
pub const TEXT_X: i32 = 2;

/// Line pitch, in multiples of the font scale.
const LINE_HEIGHT: f32 = 15.0;

/// One line of annotation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    pub color: Color,
}

impl TextLine {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Computes the font scale for a frame of the given height.
///
/// Text height is proportional to frame height: a 2880 pixel tall frame uses a scale of 10.
pub fn font_scale(height: u32) -> f32 {
    10.0 / 2880.0 * height as f32
}

/// Returns the baseline of line `line` (0-based) for a given font scale.
pub fn baseline_y(line: usize, font_scale: f32) -> i32 {
    1 + (LINE_HEIGHT * font_scale * (line + 1) as f32).floor() as i32
}

/// Returns the stroke thickness used at a given font scale.
pub fn stroke_thickness(font_scale: f32) -> u32 {
    (font_scale.round() as u32).max(1)
}

/// Draws `lines` top to bottom in the top left corner of `canvas`.
///
/// Each line is drawn twice at the same position: first in black as a backing for legibility,
/// then in its own color. Text running past the right edge is clipped.
pub fn annotate(canvas: &mut Frame, lines: &[TextLine]) {
    let scale = font_scale(canvas.height());
    let thickness = stroke_thickness(scale);

    for (i, line) in lines.iter().enumerate() {
        let y = baseline_y(i, scale);
        for color in [Color::BLACK, line.color] {
            draw::text(canvas, TEXT_X, y, &line.text)
                .color(color)
                .scale(scale)
                .thickness(thickness);
        }
    }
}

/// Builds the standard detection count lines: `"L detections: N"` then `"R detections: N"`.
pub fn detection_lines(detections: &Detections, left: Color, right: Color) -> [TextLine; 2] {
    let line = |side: HandSide, color| {
        TextLine::new(
            format!(
                "{} detections: {}",
                side.abbreviation(),
                detections.count(side)
            ),
            color,
        )
    };
    [line(HandSide::Left, left), line(HandSide::Right, right)]
}
