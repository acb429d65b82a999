//! The per-image pipeline: normalize, detect, render, composite, annotate.

use std::sync::Arc;

use crate::{
    annotate::{annotate, detection_lines},
    camera::FocalLength,
    composite::{composite, Layer},
    hand::{
        estimator::{DetectParams, PoseEstimator},
        Detections, HandSide,
    },
    image::{normalize, Color, Frame, RawImage, Resolution},
    mask::DEFAULT_BORDER_WIDTH,
    render::{Renderer, Shading},
    timer::Timer,
    Error,
};

/// Outline color of left hands.
pub const LEFT_BORDER_COLOR: Color = Color::from_rgb8(255, 100, 100);

/// Outline color of right hands.
pub const RIGHT_BORDER_COLOR: Color = Color::from_rgb8(100, 100, 255);

/// Settings for rendering and compositing detections.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    border_width: u32,
    left_color: Color,
    right_color: Color,
    focal_length: FocalLength,
    shading: Shading,
    annotate: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            border_width: DEFAULT_BORDER_WIDTH,
            left_color: LEFT_BORDER_COLOR,
            right_color: RIGHT_BORDER_COLOR,
            focal_length: FocalLength::Default,
            shading: Shading::default(),
            annotate: true,
        }
    }
}

impl RenderConfig {
    /// Sets the width of the outline drawn around each hand.
    pub fn border_width(mut self, width: u32) -> Self {
        self.border_width = width;
        self
    }

    /// Sets the outline and annotation color of left hands.
    pub fn left_color(mut self, color: Color) -> Self {
        self.left_color = color;
        self
    }

    /// Sets the outline and annotation color of right hands.
    pub fn right_color(mut self, color: Color) -> Self {
        self.right_color = color;
        self
    }

    /// Sets the focal length policy.
    ///
    /// With [`FocalLength::Default`], the estimator is not told a focal length, and detections are
    /// rendered with the one the estimator reports (or the default rule if it reports none). Any
    /// other policy is resolved per frame and used for both detection and rendering.
    pub fn focal_length(mut self, focal_length: FocalLength) -> Self {
        self.focal_length = focal_length;
        self
    }

    pub fn shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }

    /// Enables or disables the detection count annotation.
    pub fn annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn get_border_width(&self) -> u32 {
        self.border_width
    }

    pub fn border_color(&self, side: HandSide) -> Color {
        match side {
            HandSide::Left => self.left_color,
            HandSide::Right => self.right_color,
        }
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(self.focal_length, self.shading)
    }

    /// Returns the focal length to pass on explicitly for a frame, if the policy prescribes one.
    pub fn explicit_focal_length(&self, res: Resolution) -> Result<Option<f32>, Error> {
        match self.focal_length {
            FocalLength::Default => Ok(None),
            policy => policy.resolve(res).map(Some),
        }
    }
}

/// Renders every instance of every present detection, left hand first.
pub fn render_layers(
    detections: &Detections,
    res: Resolution,
    config: &RenderConfig,
    focal_length: Option<f32>,
) -> Result<Vec<Layer>, Error> {
    let renderer = config.renderer();
    let mut layers = Vec::new();
    for det in detections.iter() {
        for hand_index in 0..det.len() {
            let render = renderer.render(det, hand_index, res, focal_length)?;
            layers.push(Layer::new(render, config.border_color(det.side())));
        }
    }
    Ok(layers)
}

/// Renders `detections` onto a copy of `frame`, outlines them, and annotates the detection counts
/// if enabled in `config`.
///
/// `focal_length` overrides the focal length of every detection; see [`Renderer::camera_for`].
pub fn process_frame(
    frame: &Frame,
    detections: &Detections,
    config: &RenderConfig,
    focal_length: Option<f32>,
) -> Result<Frame, Error> {
    let layers = render_layers(detections, frame.resolution(), config, focal_length)?;
    let mut canvas = composite(frame, &layers, config.border_width)?;
    if config.annotate {
        let lines = detection_lines(detections, config.left_color, config.right_color);
        annotate(&mut canvas, &lines);
    }
    Ok(canvas)
}

/// The outcome of running the pipeline on one image.
#[derive(Debug, Clone)]
pub struct Processed {
    /// The normalized input.
    pub original: Frame,
    /// The input with all detections composited and annotated.
    pub composited: Frame,
    pub detections: Detections,
}

impl Processed {
    /// Places the original and the composited frame next to each other.
    pub fn side_by_side(&self) -> Result<Frame, Error> {
        self.original.hconcat(&self.composited)
    }
}

/// Timers for the stages of a [`Pipeline`].
///
/// Several pipelines, for example one per worker thread, can record into the same set.
#[derive(Debug)]
pub struct StageTimers {
    detect: Timer,
    composite: Timer,
}

impl Default for StageTimers {
    fn default() -> Self {
        Self {
            detect: Timer::new("detect"),
            composite: Timer::new("composite"),
        }
    }
}

impl StageTimers {
    /// Returns the timers in stage order. Displaying a timer resets it.
    pub fn iter(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.detect, &self.composite].into_iter()
    }
}

/// Runs a [`PoseEstimator`] and composites its detections onto every image passed to
/// [`Pipeline::process`].
pub struct Pipeline<E> {
    estimator: E,
    config: RenderConfig,
    timers: Arc<StageTimers>,
}

impl<E: PoseEstimator> Pipeline<E> {
    pub fn new(estimator: E, config: RenderConfig) -> Self {
        Self::with_timers(estimator, config, Arc::default())
    }

    /// Creates a pipeline that records its stage timings into `timers`.
    pub fn with_timers(estimator: E, config: RenderConfig, timers: Arc<StageTimers>) -> Self {
        Self {
            estimator,
            config,
            timers,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Normalizes `raw`, detects hands in it, and composites them.
    ///
    /// `params` identifies the image to the estimator; its focal length is overwritten according
    /// to the configured policy.
    pub fn process(
        &mut self,
        raw: &RawImage,
        params: &DetectParams<'_>,
    ) -> anyhow::Result<Processed> {
        let original = normalize(raw)?;
        let res = original.resolution();
        let focal_length = self.config.explicit_focal_length(res)?;

        let params = DetectParams {
            focal_length,
            ..*params
        };
        let detections = self
            .timers
            .detect
            .time(|| self.estimator.detect(&original, &params))?;
        log::debug!(
            "{}x L, {}x R",
            detections.count(HandSide::Left),
            detections.count(HandSide::Right)
        );

        let composited = self.timers.composite.time(|| {
            process_frame(&original, &detections, &self.config, focal_length)
        })?;

        Ok(Processed {
            original,
            composited,
            detections,
        })
    }

    pub fn timers(&self) -> &StageTimers {
        &self.timers
    }
}
