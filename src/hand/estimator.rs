//! Pose-estimation backends.
//!
//! The compositing pipeline only talks to the [`PoseEstimator`] trait. Model inference itself runs
//! outside of this crate; [`SidecarEstimator`] picks up its results from JSON files written next
//! to (or in a tree mirroring) the input images.

use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use nalgebra::{Point3, Vector3};
use serde::Deserialize;

use crate::image::Frame;

use super::{Detections, HandDetection, HandInstance, HandSide};

/// File name suffix of detection sidecar files (`photo.jpg` -> `photo.jpg.hands.json`).
pub const SIDECAR_SUFFIX: &str = ".hands.json";

/// Per-frame information passed to a [`PoseEstimator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectParams<'a> {
    /// Focal length to assume for the frame, in pixels. `None` lets the estimator decide.
    pub focal_length: Option<f32>,
    /// Path the frame was loaded from, if any.
    pub image_path: Option<&'a Path>,
    /// Path of the frame relative to the batch input directory, if any.
    pub relative_path: Option<&'a Path>,
}

/// A hand pose-estimation model.
///
/// Implementations return at most one [`HandDetection`] per side, possibly holding several hand
/// instances. Finding no hands is a regular result, errors are reserved for failures of the model
/// itself.
pub trait PoseEstimator {
    fn detect(&mut self, frame: &Frame, params: &DetectParams<'_>) -> anyhow::Result<Detections>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for &mut E {
    fn detect(&mut self, frame: &Frame, params: &DetectParams<'_>) -> anyhow::Result<Detections> {
        (**self).detect(frame, params)
    }
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn detect(&mut self, frame: &Frame, params: &DetectParams<'_>) -> anyhow::Result<Detections> {
        (**self).detect(frame, params)
    }
}

/// An estimator that never finds any hands.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHands;

impl PoseEstimator for NoHands {
    fn detect(&mut self, _frame: &Frame, _params: &DetectParams<'_>) -> anyhow::Result<Detections> {
        Ok(Detections::none())
    }
}

/// Reads precomputed detections from JSON sidecar files.
///
/// Without a sidecar directory, the detections for `dir/photo.jpg` are read from
/// `dir/photo.jpg.hands.json`. With one, they are read from `<sidecar dir>/<relative path>` plus
/// the same suffix. A missing sidecar file means that no hands were detected.
///
/// ```json
/// {
///   "focal_length": 1800.0,
///   "left": {
///     "faces": [[0, 1, 2]],
///     "instances": [
///       { "vertices": [[0.0, 0.0, 0.0], [0.01, 0.0, 0.0], [0.0, 0.01, 0.0]],
///         "camera_translation": [0.0, 0.0, 0.5] }
///     ]
///   },
///   "right": null
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SidecarEstimator {
    dir: Option<PathBuf>,
}

impl SidecarEstimator {
    /// Looks for sidecar files next to the images.
    pub fn new() -> Self {
        Self { dir: None }
    }

    /// Looks for sidecar files in a tree below `dir` that mirrors the input tree.
    pub fn with_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Computes the sidecar path for an image.
    pub fn sidecar_path(&self, params: &DetectParams<'_>) -> anyhow::Result<PathBuf> {
        let (base, path) = match (&self.dir, params.relative_path, params.image_path) {
            (Some(dir), Some(rel), _) => (dir.as_path(), rel),
            (Some(dir), None, Some(image)) => match image.file_name() {
                Some(name) => (dir.as_path(), Path::new(name)),
                None => bail!("image path '{}' has no file name", image.display()),
            },
            (None, _, Some(image)) => match image.parent() {
                Some(parent) => (parent, image),
                None => bail!("image path '{}' has no parent", image.display()),
            },
            (_, _, None) => bail!("sidecar detections require the path of the input image"),
        };

        let Some(name) = path.file_name() else {
            bail!("image path '{}' has no file name", path.display());
        };
        let mut name = name.to_os_string();
        name.push(SIDECAR_SUFFIX);
        let rel_dir = path.parent().filter(|_| self.dir.is_some());
        Ok(match rel_dir {
            Some(rel_dir) => base.join(rel_dir).join(name),
            None => base.join(name),
        })
    }
}

impl PoseEstimator for SidecarEstimator {
    fn detect(&mut self, _frame: &Frame, params: &DetectParams<'_>) -> anyhow::Result<Detections> {
        let path = self.sidecar_path(params)?;
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::trace!("no sidecar at '{}', assuming no hands", path.display());
                return Ok(Detections::none());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read '{}'", path.display()))
            }
        };

        parse_sidecar(&json).with_context(|| format!("invalid sidecar '{}'", path.display()))
    }
}

#[derive(Deserialize)]
struct SidecarFile {
    #[serde(default)]
    focal_length: Option<f32>,
    #[serde(default)]
    left: Option<SidecarHand>,
    #[serde(default)]
    right: Option<SidecarHand>,
}

#[derive(Deserialize)]
struct SidecarHand {
    faces: Vec<[u32; 3]>,
    instances: Vec<SidecarInstance>,
}

#[derive(Deserialize)]
struct SidecarInstance {
    vertices: Vec<[f32; 3]>,
    camera_translation: [f32; 3],
}

/// Parses the contents of a detection sidecar file.
pub fn parse_sidecar(json: &str) -> anyhow::Result<Detections> {
    let file: SidecarFile = serde_json::from_str(json)?;

    let convert = |hand: Option<SidecarHand>, side| -> anyhow::Result<Option<HandDetection>> {
        let Some(hand) = hand else { return Ok(None) };
        if hand.instances.is_empty() {
            return Ok(None);
        }

        let instances = hand
            .instances
            .into_iter()
            .map(|inst| {
                HandInstance::new(
                    inst.vertices.into_iter().map(Point3::from).collect(),
                    Vector3::from(inst.camera_translation),
                )
            })
            .collect();
        let mut det = HandDetection::new(side, hand.faces, instances)?;
        if let Some(f) = file.focal_length {
            det = det.with_focal_length(f);
        }
        Ok(Some(det))
    };

    Ok(Detections {
        left: convert(file.left, HandSide::Left)?,
        right: convert(file.right, HandSide::Right)?,
    })
}
