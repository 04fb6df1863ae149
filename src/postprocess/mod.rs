mod extract;
mod grid;
mod rescale;
mod smooth;

pub use extract::extract_masks;
pub use grid::MaskGrid;
pub use rescale::{process_masks, rescale_and_threshold, PostprocessConfig};
pub use smooth::{
    fill_enclosed, smooth_mask, SmoothingParams, DEFAULT_JAGGEDNESS_THRESHOLD,
    DEFAULT_SMOOTHING_RADIUS,
};
