//! Synthetic fixtures shared by unit tests.

use nalgebra::{Point3, Vector3};

use crate::{
    hand::{
        estimator::{DetectParams, PoseEstimator},
        Detections, HandDetection, HandInstance, HandSide,
    },
    image::{Frame, Resolution},
    mask::Mask,
};

/// Focal length attached to the detections built here.
pub const FOCAL_LENGTH: f32 = 100.0;

/// Builds a flat square hand mesh that projects onto the pixel square `[x, x + size) x [y, y +
/// size)` of a `res` frame when rendered with [`FOCAL_LENGTH`].
pub fn square_hand(
    side: HandSide,
    res: Resolution,
    x: f32,
    y: f32,
    size: f32,
    depth: f32,
) -> HandDetection {
    let (cx, cy) = (res.width() as f32 / 2.0, res.height() as f32 / 2.0);
    let unproject = |u: f32, v: f32| {
        Point3::new(
            (u - cx) * depth / FOCAL_LENGTH,
            (v - cy) * depth / FOCAL_LENGTH,
            0.0,
        )
    };
    let vertices = vec![
        unproject(x, y),
        unproject(x + size, y),
        unproject(x + size, y + size),
        unproject(x, y + size),
    ];

    HandDetection::new(
        side,
        vec![[0, 1, 2], [0, 2, 3]],
        vec![HandInstance::new(vertices, Vector3::new(0.0, 0.0, depth))],
    )
    .unwrap()
    .with_focal_length(FOCAL_LENGTH)
}

pub fn square_mask(res: Resolution, x: u32, y: u32, size: u32) -> Mask {
    Mask::from_fn(res, |px, py| {
        (x..x + size).contains(&px) && (y..y + size).contains(&py)
    })
}

/// Returns the same detections for every frame.
#[derive(Debug, Clone, Default)]
pub struct FixedDetections(pub Detections);

impl PoseEstimator for FixedDetections {
    fn detect(&mut self, _frame: &Frame, _params: &DetectParams<'_>) -> anyhow::Result<Detections> {
        Ok(self.0.clone())
    }
}
