//! Hand detections as produced by a pose-estimation model.
//!
//! A [`HandDetection`] holds every instance the model found for one [`HandSide`]. All instances of
//! a detection share a single mesh topology; only their vertex positions and camera translations
//! differ.

pub mod estimator;

use std::{fmt, sync::Arc};

use nalgebra::{Point3, Vector3};

use crate::Error;

/// Which hand a detection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Single-letter label used in annotations.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            HandSide::Left => "L",
            HandSide::Right => "R",
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandSide::Left => "left",
            HandSide::Right => "right",
        })
    }
}

/// One posed hand mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct HandInstance {
    vertices: Vec<Point3<f32>>,
    camera_translation: Vector3<f32>,
}

impl HandInstance {
    /// Creates an instance from mesh vertices and the translation that moves them into camera
    /// space.
    pub fn new(vertices: Vec<Point3<f32>>, camera_translation: Vector3<f32>) -> Self {
        Self {
            vertices,
            camera_translation,
        }
    }

    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    pub fn camera_translation(&self) -> Vector3<f32> {
        self.camera_translation
    }

    /// Returns the vertices translated into camera space.
    pub fn camera_space_vertices(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.vertices.iter().map(|v| v + self.camera_translation)
    }
}

/// All instances of one hand side found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    side: HandSide,
    faces: Arc<[[u32; 3]]>,
    instances: Vec<HandInstance>,
    focal_length: Option<f32>,
}

impl HandDetection {
    /// Creates a detection.
    ///
    /// Fails with [`Error::InvalidParameter`] if `instances` is empty or if a face references a
    /// vertex that some instance does not have.
    pub fn new(
        side: HandSide,
        faces: impl Into<Arc<[[u32; 3]]>>,
        instances: Vec<HandInstance>,
    ) -> Result<Self, Error> {
        let faces = faces.into();
        if instances.is_empty() {
            return Err(Error::invalid_parameter(
                "instances",
                format!("{side} hand detection has no instances"),
            ));
        }

        let needed = faces
            .iter()
            .flatten()
            .map(|&i| i as usize + 1)
            .max()
            .unwrap_or(0);
        if let Some((index, inst)) = instances
            .iter()
            .enumerate()
            .find(|(_, inst)| inst.vertices.len() < needed)
        {
            return Err(Error::invalid_parameter(
                "faces",
                format!(
                    "faces reference {} vertices, but {side} instance {} has only {}",
                    needed,
                    index,
                    inst.vertices.len(),
                ),
            ));
        }

        Ok(Self {
            side,
            faces,
            instances,
            focal_length: None,
        })
    }

    /// Attaches the focal length the model estimated this detection with.
    pub fn with_focal_length(mut self, focal_length: f32) -> Self {
        self.focal_length = Some(focal_length);
        self
    }

    #[inline]
    pub fn side(&self) -> HandSide {
        self.side
    }

    /// Returns the mesh topology shared by all instances.
    #[inline]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Returns the number of hand instances in this detection.
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns whether there are no hand instances. Detections built with
    /// [`HandDetection::new`] always have at least one.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[HandInstance] {
        &self.instances
    }

    /// Returns the instance at `hand_index`, or [`Error::IndexOutOfRange`].
    pub fn instance(&self, hand_index: usize) -> Result<&HandInstance, Error> {
        self.instances
            .get(hand_index)
            .ok_or(Error::IndexOutOfRange {
                index: hand_index,
                len: self.instances.len(),
            })
    }

    #[inline]
    pub fn focal_length(&self) -> Option<f32> {
        self.focal_length
    }
}

/// The detections of one frame: at most one [`HandDetection`] per side.
///
/// A missing side means no hand of that side was found; it is not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub left: Option<HandDetection>,
    pub right: Option<HandDetection>,
}

impl Detections {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, side: HandSide) -> Option<&HandDetection> {
        match side {
            HandSide::Left => self.left.as_ref(),
            HandSide::Right => self.right.as_ref(),
        }
    }

    /// Returns the number of hand instances found for `side`, 0 if the side is absent.
    pub fn count(&self, side: HandSide) -> usize {
        self.get(side).map_or(0, HandDetection::len)
    }

    /// Iterates over the present detections, left before right.
    pub fn iter(&self) -> impl Iterator<Item = &HandDetection> + '_ {
        self.left.iter().chain(self.right.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> Vec<Point3<f32>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn validates_topology() {
        let inst = HandInstance::new(tri(), Vector3::zeros());
        assert!(HandDetection::new(HandSide::Left, vec![[0, 1, 2]], vec![inst.clone()]).is_ok());
        assert!(matches!(
            HandDetection::new(HandSide::Left, vec![[0, 1, 3]], vec![inst]),
            Err(Error::InvalidParameter { name: "faces", .. })
        ));
        assert!(matches!(
            HandDetection::new(HandSide::Right, vec![[0, 1, 2]], vec![]),
            Err(Error::InvalidParameter {
                name: "instances",
                ..
            })
        ));
    }

    #[test]
    fn instance_lookup() {
        let inst = HandInstance::new(tri(), Vector3::new(0.0, 0.0, 1.0));
        let det =
            HandDetection::new(HandSide::Right, vec![[0, 1, 2]], vec![inst.clone(), inst]).unwrap();
        assert_eq!(det.len(), 2);
        assert!(!det.is_empty());
        assert!(det.instance(1).is_ok());
        assert_eq!(
            det.instance(2).unwrap_err(),
            Error::IndexOutOfRange { index: 2, len: 2 }
        );

        let moved: Vec<_> = det.instance(0).unwrap().camera_space_vertices().collect();
        assert_eq!(moved[1], Point3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn counts() {
        let inst = HandInstance::new(tri(), Vector3::zeros());
        let det = HandDetection::new(HandSide::Right, vec![[0, 1, 2]], vec![inst]).unwrap();
        let dets = Detections {
            left: None,
            right: Some(det),
        };
        assert_eq!(dets.count(HandSide::Left), 0);
        assert_eq!(dets.count(HandSide::Right), 1);
        assert_eq!(dets.iter().count(), 1);
        assert_eq!(Detections::none().iter().count(), 0);
    }
}
