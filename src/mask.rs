//! Boolean per-pixel masks and morphological border extraction.

use std::fmt;

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};

use crate::{image::Resolution, Error};

/// Side length of the square structuring element used to outline rendered hands.
pub const DEFAULT_BORDER_WIDTH: u32 = 15;

/// A boolean per-pixel mask, indexed by `(x, y)`.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    /// Indexed as `[row, column]`.
    data: Array2<bool>,
}

impl Mask {
    /// Creates a mask of the given resolution with every pixel unset.
    pub fn new(res: Resolution) -> Self {
        Self {
            data: Array2::from_elem(res.shape(), false),
        }
    }

    /// Creates a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(res: Resolution, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            data: Array2::from_shape_fn(res.shape(), |(row, col)| f(col as u32, row as u32)),
        }
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::from_shape(self.data.dim())
    }

    /// Returns whether the pixel at `(x, y)` is set.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this mask.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[[y as usize, x as usize]]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[[y as usize, x as usize]] = value;
    }

    /// Returns the number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Returns an iterator over the `(x, y)` coordinates of all set pixels, in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.data
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|((row, col), _)| (col as u32, row as u32))
    }

    /// Returns a mask of the pixels set in `self` but not in `other`.
    pub fn and_not(&self, other: &Mask) -> Result<Mask, Error> {
        Error::check_resolution("mask", self.resolution(), other.resolution())?;
        Ok(Self {
            data: Zip::from(&self.data)
                .and(&other.data)
                .map_collect(|&a, &b| a && !b),
        })
    }

    /// Returns `true` if no pixel is set in both `self` and `other`.
    pub fn is_disjoint(&self, other: &Mask) -> bool {
        self.data.dim() == other.data.dim()
            && Zip::from(&self.data).and(&other.data).all(|&a, &b| !(a && b))
    }

    /// Binary dilation with a `width x width` square structuring element.
    ///
    /// For even widths the mask grows one pixel further towards the top left than towards the
    /// bottom right. Pixels beyond the frame edge are treated as unset.
    pub fn dilate(&self, width: u32) -> Result<Mask, Error> {
        if width == 0 {
            return Err(Error::invalid_parameter(
                "width",
                "dilation width must be at least 1",
            ));
        }

        let before = (width as usize - 1) / 2;
        let after = width as usize / 2;

        // A square element is separable: dilate all rows, then all columns.
        let rows = dilate_lanes(&self.data, Axis(1), before, after);
        let data = dilate_lanes(&rows, Axis(0), before, after);
        Ok(Self { data })
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Mask ({} set)", self.resolution(), self.count())
    }
}

fn dilate_lanes(src: &Array2<bool>, axis: Axis, before: usize, after: usize) -> Array2<bool> {
    let mut dest = Array2::from_elem(src.dim(), false);
    let mut prefix = Vec::with_capacity(src.len_of(axis) + 1);
    Zip::from(src.lanes(axis))
        .and(dest.lanes_mut(axis))
        .for_each(|src, dest| dilate_lane(src, dest, before, after, &mut prefix));
    dest
}

fn dilate_lane(
    src: ArrayView1<'_, bool>,
    mut dest: ArrayViewMut1<'_, bool>,
    before: usize,
    after: usize,
    prefix: &mut Vec<usize>,
) {
    let len = src.len();
    prefix.clear();
    prefix.push(0);
    for &v in src.iter() {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + usize::from(v));
    }

    for (i, out) in dest.iter_mut().enumerate() {
        let lo = i.saturating_sub(before);
        let hi = (i + after + 1).min(len);
        *out = prefix[hi] > prefix[lo];
    }
}

/// Computes the outline ring of `mask`.
///
/// The result contains exactly the pixels that a `width x width` square dilation adds to `mask`,
/// so it never overlaps `mask` itself. Fails with [`Error::InvalidParameter`] if `width` is 0.
pub fn extract_border(mask: &Mask, width: u32) -> Result<Mask, Error> {
    mask.dilate(width)?.and_not(mask)
}
