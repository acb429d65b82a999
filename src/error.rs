//! Errors produced by the rendering and compositing core.

use thiserror::Error;

use crate::image::Resolution;

/// Failure of one image's pipeline.
///
/// Every variant is local to a single image: the batch driver reports it and moves on to the next
/// input. None of them are transient, so nothing is ever retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The decoded image has an unsupported channel count or an empty dimension.
    #[error("invalid image shape {width}x{height} with {channels} channels (expected 1, 3 or 4 channels and a non-empty image)")]
    InvalidImageShape {
        width: u32,
        height: u32,
        channels: usize,
    },

    /// A buffer derived from an image does not match that image's resolution.
    #[error("shape mismatch: {what} is {actual}, but the target frame is {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: Resolution,
        actual: Resolution,
    },

    /// A hand instance index past the end of a detection.
    #[error("hand index {index} is out of range (detection holds {len} instances)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A scalar argument outside of its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn check_resolution(
        what: &'static str,
        expected: Resolution,
        actual: Resolution,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = Error::IndexOutOfRange { index: 2, len: 1 };
        assert_eq!(
            err.to_string(),
            "hand index 2 is out of range (detection holds 1 instances)"
        );

        let err = Error::check_resolution(
            "mask",
            Resolution::new(4, 4),
            Resolution::new(4, 3),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "shape mismatch: mask is 4x3, but the target frame is 4x4"
        );
    }
}
