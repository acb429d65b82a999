//! Software rasterization of hand meshes.
//!
//! [`render_detection`] projects one hand instance into a frame-sized color buffer, depth buffer
//! and silhouette [`Mask`]. Color and depth are only meaningful where the mask is set; outside of
//! it, color is black and depth is `+∞`.

use nalgebra::{Point3, Vector3};
use ndarray::Array2;

use crate::{
    camera::{CameraParams, FocalLength},
    hand::HandDetection,
    image::{Color, Frame, Resolution},
    mask::Mask,
    Error,
};

/// Light blue mesh color.
pub const DEFAULT_MESH_COLOR: Color = Color::from_rgb8(166, 189, 219);

/// The rendered color, depth and silhouette of one hand instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    rgb: Frame,
    /// Camera-space Z, indexed as `[row, column]`.
    depth: Array2<f32>,
    mask: Mask,
}

impl RenderResult {
    /// Assembles a render result from its buffers.
    ///
    /// Fails with [`Error::ShapeMismatch`] unless all three buffers have the same resolution.
    pub fn new(rgb: Frame, depth: Array2<f32>, mask: Mask) -> Result<Self, Error> {
        let res = rgb.resolution();
        Error::check_resolution("depth buffer", res, Resolution::from_shape(depth.dim()))?;
        Error::check_resolution("silhouette mask", res, mask.resolution())?;
        Ok(Self { rgb, depth, mask })
    }

    /// Creates a render result that covers `mask` with a flat `color` at the given `depth`.
    pub fn flat(mask: Mask, color: Color, depth: f32) -> Self {
        let res = mask.resolution();
        let mut rgb = Frame::new(res.width(), res.height());
        let mut depths = Array2::from_elem(res.shape(), f32::INFINITY);
        for (x, y) in mask.iter_set() {
            rgb.set(x, y, color);
            depths[[y as usize, x as usize]] = depth;
        }
        Self {
            rgb,
            depth: depths,
            mask,
        }
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.rgb.resolution()
    }

    /// Returns the rendered colors. Only pixels inside [`RenderResult::mask`] are meaningful.
    #[inline]
    pub fn rgb(&self) -> &Frame {
        &self.rgb
    }

    #[inline]
    pub fn depth(&self) -> &Array2<f32> {
        &self.depth
    }

    /// Returns the silhouette of the rendered mesh.
    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }
}

/// Flat shading with a headlight: a directional light shining along the optical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shading {
    color: Color,
    ambient: f32,
    diffuse: f32,
}

impl Default for Shading {
    fn default() -> Self {
        Self {
            color: DEFAULT_MESH_COLOR,
            ambient: 0.4,
            diffuse: 0.6,
        }
    }
}

impl Shading {
    /// Sets the base color of the mesh.
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the ambient and diffuse light intensities.
    ///
    /// A face pointing straight at the camera is lit with `ambient + diffuse`.
    pub fn intensities(mut self, ambient: f32, diffuse: f32) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self
    }

    fn shade(&self, normal: &Vector3<f32>) -> Color {
        // Two-sided: mesh winding is not guaranteed to be consistent across models.
        let intensity = self.ambient + self.diffuse * normal.z.abs();
        let channel = |c: u8| (f32::from(c) * intensity).round().clamp(0.0, 255.0) as u8;
        Color::from_rgb8(
            channel(self.color.r()),
            channel(self.color.g()),
            channel(self.color.b()),
        )
    }
}

/// Renders hand detections with a fixed focal length policy and shading model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Renderer {
    focal_length: FocalLength,
    shading: Shading,
}

impl Renderer {
    pub fn new(focal_length: FocalLength, shading: Shading) -> Self {
        Self {
            focal_length,
            shading,
        }
    }

    /// Returns the focal length policy used when neither the caller nor the detection supply one.
    pub fn focal_length(&self) -> FocalLength {
        self.focal_length
    }

    pub fn shading(&self) -> Shading {
        self.shading
    }

    /// Determines the focal length a detection is rendered with.
    ///
    /// An explicit `focal_length` wins over the one stored in `detection`, which wins over this
    /// renderer's default policy.
    pub fn camera_for(
        &self,
        detection: &HandDetection,
        res: Resolution,
        focal_length: Option<f32>,
    ) -> Result<CameraParams, Error> {
        let focal_length = match focal_length.or(detection.focal_length()) {
            Some(f) => FocalLength::Fixed(f),
            None => self.focal_length,
        };
        CameraParams::new(res, focal_length)
    }

    /// Rasterizes instance `hand_index` of `detection` into a frame of resolution `res`.
    ///
    /// Every pixel whose center lies inside a projected triangle is covered; the nearest triangle
    /// wins. Fails with [`Error::IndexOutOfRange`] if `hand_index` is not an instance of
    /// `detection`.
    pub fn render(
        &self,
        detection: &HandDetection,
        hand_index: usize,
        res: Resolution,
        focal_length: Option<f32>,
    ) -> Result<RenderResult, Error> {
        let instance = detection.instance(hand_index)?;
        let camera = self.camera_for(detection, res, focal_length)?;

        let vertices: Vec<Point3<f32>> = instance.camera_space_vertices().collect();
        let projected: Vec<Option<Point3<f32>>> =
            vertices.iter().map(|v| camera.project(v)).collect();

        let mut raster = Raster::new(res);
        for face in detection.faces() {
            let [a, b, c] = face.map(|i| i as usize);
            let (Some(pa), Some(pb), Some(pc)) = (projected[a], projected[b], projected[c]) else {
                // Triangles crossing the near plane are dropped instead of clipped.
                continue;
            };

            let normal = (vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a]));
            let Some(normal) = normal.try_normalize(f32::EPSILON) else {
                continue;
            };

            raster.triangle([pa, pb, pc], self.shading.shade(&normal));
        }

        log::trace!(
            "rendered {} hand #{} with f={:.1}: {} pixels covered",
            detection.side(),
            hand_index,
            camera.focal_length(),
            raster.mask.count(),
        );

        Ok(RenderResult {
            rgb: raster.rgb,
            depth: raster.depth,
            mask: raster.mask,
        })
    }
}

/// Renders instance `hand_index` of `detection` with the default [`Renderer`].
///
/// When `focal_length` is `None`, the detection's own focal length is used, falling back to
/// [`FocalLength::Default`].
pub fn render_detection(
    detection: &HandDetection,
    hand_index: usize,
    res: Resolution,
    focal_length: Option<f32>,
) -> Result<RenderResult, Error> {
    Renderer::default().render(detection, hand_index, res, focal_length)
}

struct Raster {
    rgb: Frame,
    depth: Array2<f32>,
    mask: Mask,
}

impl Raster {
    fn new(res: Resolution) -> Self {
        Self {
            rgb: Frame::new(res.width(), res.height()),
            depth: Array2::from_elem(res.shape(), f32::INFINITY),
            mask: Mask::new(res),
        }
    }

    /// Fills a triangle given in continuous pixel coordinates with camera-space depth in `z`.
    fn triangle(&mut self, [a, b, c]: [Point3<f32>; 3], color: Color) {
        let area = edge(&a, &b, &c);
        if area.abs() <= f32::EPSILON {
            return;
        }

        let res = self.mask.resolution();
        // Pixel `p` is sampled at its center `p + 0.5`.
        let min_x = (a.x.min(b.x).min(c.x) - 0.5).ceil().max(0.0);
        let min_y = (a.y.min(b.y).min(c.y) - 0.5).ceil().max(0.0);
        let max_x = (a.x.max(b.x).max(c.x) - 0.5)
            .floor()
            .min(res.width() as f32 - 1.0);
        let max_y = (a.y.max(b.y).max(c.y) - 0.5)
            .floor()
            .min(res.height() as f32 - 1.0);
        if min_x > max_x || min_y > max_y {
            return;
        }

        for y in min_y as u32..=max_y as u32 {
            for x in min_x as u32..=max_x as u32 {
                let p = Point3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let wa = edge(&b, &c, &p) / area;
                let wb = edge(&c, &a, &p) / area;
                let wc = edge(&a, &b, &p) / area;
                if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                    continue;
                }

                // Screen-space barycentrics interpolate 1/z linearly.
                let z = 1.0 / (wa / a.z + wb / b.z + wc / c.z);
                let depth = &mut self.depth[[y as usize, x as usize]];
                if z < *depth {
                    *depth = z;
                    self.rgb.set(x, y, color);
                    self.mask.set(x, y, true);
                }
            }
        }
    }
}

/// Twice the signed area of the triangle `(a, b, p)` in the XY plane.
fn edge(a: &Point3<f32>, b: &Point3<f32>, p: &Point3<f32>) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}
