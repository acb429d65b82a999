//! Renders 3D hand mesh detections on top of photographs.
//!
//! For every image, hands found by a [`PoseEstimator`] are rasterized, outlined with a per-side
//! border color, pasted over the photo, and the number of detections per side is written into the
//! top left corner.
//!
//! # Coordinates
//!
//! 2D coordinates are in pixels, with the origin at the top left corner of the image, X pointing
//! right and Y pointing down. 2D buffers indexed as arrays use `[row, column]` order.
//!
//! 3D coordinates are camera-space, using the same X and Y axes as images, with Z pointing from the
//! camera into the scene. Meshes are projected with a pinhole camera whose principal point is the
//! image center.
//!
//! # Environment Variables
//!
//! * `RUST_LOG`: overrides the log filter set up by [`init_logger!`], using the [`env_logger`]
//!   syntax.
//!
//! [`PoseEstimator`]: hand::estimator::PoseEstimator
//! [`env_logger`]: https://docs.rs/env_logger

use log::LevelFilter;

pub mod annotate;
pub mod batch;
pub mod camera;
pub mod composite;
mod error;
pub mod hand;
pub mod image;
pub mod mask;
pub mod pipeline;
pub mod render;
pub mod timer;

#[cfg(test)]
mod test;

pub use error::Error;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library will log at *debug* level. `RUST_LOG` takes precedence.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
