//! Post-processing and compositing for click-to-segment masks.
//!
//! A SAM-style decoder emits a few low-resolution mask candidates per click.
//! This crate turns that raw output into display masks (extract, smooth,
//! rescale, threshold) and draws them onto an RGBA canvas, either as a
//! translucent overlay or as an outline.

pub mod error;
pub mod postprocess;
pub mod render;
pub mod segmentation;

pub use error::MaskError;
