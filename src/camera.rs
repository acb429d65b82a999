//! Pinhole camera model used to project hand meshes into a frame.
//!
//! Camera space follows the image conventions of the pose model: X points right, Y points *down*,
//! and Z points from the camera into the scene. The principal point is always the center of the
//! frame.

use nalgebra::{Point2, Point3};

use crate::{image::Resolution, Error};

/// Focal length (in pixels) the pose model assumes for its square input crop.
pub const MODEL_FOCAL_LENGTH: f32 = 5000.0;

/// Side length of the pose model's square input crop.
pub const MODEL_INPUT_SIZE: f32 = 256.0;

/// Points closer to the camera than this are not projected.
const NEAR_PLANE: f32 = 1e-4;

/// How the focal length of a frame is determined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FocalLength {
    /// Scales the pose model's crop focal length to the frame:
    /// `MODEL_FOCAL_LENGTH / MODEL_INPUT_SIZE * max(width, height)`.
    #[default]
    Default,
    /// A fixed focal length in pixels, independent of the frame size.
    Fixed(f32),
    /// A sensor/field-of-view calibration: `k / reference_width * width`.
    Calibrated { k: f32, reference_width: f32 },
}

impl FocalLength {
    /// Computes the focal length, in pixels, for a frame of resolution `res`.
    ///
    /// Fails with [`Error::InvalidParameter`] if the result is not a positive, finite number.
    pub fn resolve(&self, res: Resolution) -> Result<f32, Error> {
        let f = match *self {
            FocalLength::Default => {
                MODEL_FOCAL_LENGTH / MODEL_INPUT_SIZE * res.width().max(res.height()) as f32
            }
            FocalLength::Fixed(f) => f,
            FocalLength::Calibrated { k, reference_width } => {
                k / reference_width * res.width() as f32
            }
        };

        if f.is_finite() && f > 0.0 {
            Ok(f)
        } else {
            Err(Error::invalid_parameter(
                "focal_length",
                format!("{self:?} resolves to {f} for a {res} frame"),
            ))
        }
    }
}

/// Intrinsics of the camera a frame was captured with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    focal_length: f32,
    resolution: Resolution,
}

impl CameraParams {
    /// Creates camera parameters for a frame of resolution `res`.
    pub fn new(res: Resolution, focal_length: FocalLength) -> Result<Self, Error> {
        if res.is_empty() {
            return Err(Error::invalid_parameter(
                "resolution",
                format!("camera image size must be non-empty, got {res}"),
            ));
        }

        Ok(Self {
            focal_length: focal_length.resolve(res)?,
            resolution: res,
        })
    }

    #[inline]
    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Returns the principal point `(width / 2, height / 2)`.
    #[inline]
    pub fn principal_point(&self) -> Point2<f32> {
        Point2::new(
            self.resolution.width() as f32 / 2.0,
            self.resolution.height() as f32 / 2.0,
        )
    }

    /// Projects a camera-space point into continuous pixel coordinates.
    ///
    /// Returns `[x, y, depth]`, where pixel `(px, py)` covers `[px, px + 1) x [py, py + 1)`, or
    /// `None` if the point lies behind (or on) the near plane.
    pub fn project(&self, point: &Point3<f32>) -> Option<Point3<f32>> {
        if point.z <= NEAR_PLANE {
            return None;
        }

        let c = self.principal_point();
        Some(Point3::new(
            self.focal_length * point.x / point.z + c.x,
            self.focal_length * point.y / point.z + c.y,
            point.z,
        ))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn default_focal_length_scales_with_frame() {
        let f = FocalLength::Default
            .resolve(Resolution::new(640, 480))
            .unwrap();
        assert_relative_eq!(f, 12500.0);

        let f = FocalLength::Default
            .resolve(Resolution::new(480, 1280))
            .unwrap();
        assert_relative_eq!(f, 25000.0);
    }

    #[test]
    fn calibrated_focal_length() {
        let f = FocalLength::Calibrated {
            k: 1000.0,
            reference_width: 500.0,
        }
        .resolve(Resolution::new(250, 100))
        .unwrap();
        assert_relative_eq!(f, 500.0);
    }

    #[test]
    fn invalid_focal_length() {
        let res = Resolution::new(10, 10);
        for f in [
            FocalLength::Fixed(0.0),
            FocalLength::Fixed(-3.0),
            FocalLength::Fixed(f32::NAN),
            FocalLength::Calibrated {
                k: 1.0,
                reference_width: 0.0,
            },
        ] {
            assert!(
                matches!(f.resolve(res), Err(Error::InvalidParameter { .. })),
                "{f:?}"
            );
        }
        assert!(CameraParams::new(Resolution::new(0, 10), FocalLength::Default).is_err());
    }

    #[test]
    fn projection() {
        let cam = CameraParams::new(Resolution::new(100, 50), FocalLength::Fixed(10.0)).unwrap();
        assert_eq!(cam.principal_point(), Point2::new(50.0, 25.0));

        let p = cam.project(&Point3::new(0.0, 0.0, 2.0)).unwrap();
        assert_relative_eq!(p, Point3::new(50.0, 25.0, 2.0));

        let p = cam.project(&Point3::new(1.0, -2.0, 2.0)).unwrap();
        assert_relative_eq!(p, Point3::new(55.0, 15.0, 2.0));

        assert!(cam.project(&Point3::new(0.0, 0.0, 0.0)).is_none());
        assert!(cam.project(&Point3::new(0.0, 0.0, -1.0)).is_none());
    }
}
