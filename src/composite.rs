//! Layering rendered hands onto a base frame.
//!
//! Compositing is a pure per-pixel select: every output pixel is either the base pixel, a border
//! color, or a rendered color. Nothing is blended.

use crate::{
    image::{Color, Frame},
    mask::{extract_border, Mask},
    render::RenderResult,
    Error,
};

/// One rendered hand and the color of the outline drawn around it.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub render: RenderResult,
    pub border_color: Color,
}

impl Layer {
    pub fn new(render: RenderResult, border_color: Color) -> Self {
        Self {
            render,
            border_color,
        }
    }
}

/// Composites `layers` onto a copy of `base`.
///
/// Layers are applied in order. For each layer, its `border_width` outline ring is painted with
/// the layer's border color, then its silhouette is painted with its rendered colors. Both are
/// opaque overwrites, so later layers always cover earlier ones where they overlap, regardless of
/// depth.
///
/// With no layers, the result is an exact copy of `base`.
///
/// Fails with [`Error::InvalidParameter`] if `border_width` is 0 and with [`Error::ShapeMismatch`]
/// if any layer's resolution differs from `base`'s; in both cases nothing is painted.
pub fn composite(base: &Frame, layers: &[Layer], border_width: u32) -> Result<Frame, Error> {
    if border_width == 0 {
        return Err(Error::invalid_parameter(
            "border_width",
            "border width must be at least 1",
        ));
    }
    for layer in layers {
        Error::check_resolution("rendered hand", base.resolution(), layer.render.resolution())?;
    }

    let mut canvas = base.clone();
    for layer in layers {
        let mask = layer.render.mask();
        let border = extract_border(mask, border_width)?;
        fill(&mut canvas, &border, layer.border_color);
        copy_masked(&mut canvas, mask, layer.render.rgb());
    }

    Ok(canvas)
}

fn fill(canvas: &mut Frame, mask: &Mask, color: Color) {
    for (x, y) in mask.iter_set() {
        canvas.set(x, y, color);
    }
}

fn copy_masked(canvas: &mut Frame, mask: &Mask, src: &Frame) {
    for (x, y) in mask.iter_set() {
        canvas.set(x, y, src.get(x, y));
    }
}
