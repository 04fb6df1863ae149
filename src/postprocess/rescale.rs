use super::grid::MaskGrid;
use super::smooth::{smooth_mask, SmoothingParams};
use crate::error::{check_threshold, MaskError, Result};
use crate::segmentation::{ProbabilityBuffer, MODEL_INPUT_SIZE};

/// Nearest-neighbour upscale `grid` to `out_width × out_height` and binarize
/// against `threshold` in the same pass.
///
/// Source coordinates use integer floor division,
/// `src = floor(dst · in / out)`, independently per axis. Output cells are
/// exactly `1.0` where the sampled value is strictly above `threshold` and
/// `0.0` elsewhere.
pub fn rescale_and_threshold(
    grid: &MaskGrid,
    out_width: usize,
    out_height: usize,
    threshold: f32,
) -> Result<MaskGrid> {
    check_threshold(threshold)?;
    if out_width == 0 || out_height == 0 {
        return Err(MaskError::ZeroDimension);
    }

    let _span = tracing::debug_span!("rescale").entered();

    let (in_width, in_height) = grid.dimensions();
    let mut data = Vec::with_capacity(out_width * out_height);

    for y in 0..out_height {
        let src_y = y * in_height / out_height;
        for x in 0..out_width {
            let src_x = x * in_width / out_width;
            data.push(if grid.get(src_x, src_y) > threshold {
                1.0
            } else {
                0.0
            });
        }
    }

    tracing::debug!(
        "Rescaled {}x{} -> {}x{} at threshold {}",
        in_width,
        in_height,
        out_width,
        out_height,
        threshold
    );

    MaskGrid::new(out_width, out_height, data)
}

/// Settings for [`process_masks`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessConfig {
    pub threshold: f32,
    /// `None` skips the smoothing pass and thresholds the raw decoder values.
    pub smoothing: Option<SmoothingParams>,
    pub output_width: usize,
    pub output_height: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            smoothing: None,
            output_width: MODEL_INPUT_SIZE,
            output_height: MODEL_INPUT_SIZE,
        }
    }
}

impl PostprocessConfig {
    pub fn with_smoothing(mut self, params: SmoothingParams) -> Self {
        self.smoothing = Some(params);
        self
    }
}

/// Turn every decoder mask into a binary display-resolution mask:
/// extract, optionally smooth, then rescale and threshold.
pub fn process_masks(buffer: &ProbabilityBuffer, config: &PostprocessConfig) -> Result<Vec<MaskGrid>> {
    check_threshold(config.threshold)?;

    buffer
        .extract_all()?
        .into_iter()
        .map(|mask| {
            let mask = match &config.smoothing {
                Some(params) => smooth_mask(&mask, params),
                None => mask,
            };
            rescale_and_threshold(
                &mask,
                config.output_width,
                config.output_height,
                config.threshold,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: usize) -> MaskGrid {
        MaskGrid::from_fn(size, size, |x, y| ((x + y) % 2) as f32).unwrap()
    }

    #[test]
    fn output_is_strictly_binary() {
        let grid = MaskGrid::from_fn(5, 5, |x, y| (x as f32 - 2.0) * 3.7 + y as f32 * 0.01).unwrap();
        let out = rescale_and_threshold(&grid, 13, 7, 0.25).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn integer_factor_gives_uniform_blocks() {
        let k = 4;
        let grid = checkerboard(8);
        let out = rescale_and_threshold(&grid, 8 * k, 8 * k, 0.5).unwrap();
        for y in 0..8 * k {
            for x in 0..8 * k {
                assert_eq!(out.get(x, y), grid.get(x / k, y / k), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn floor_sampling_not_rounding() {
        // 3 -> 4: dst 1 maps to floor(3/4) = 0, where rounding would give 1.
        let grid = MaskGrid::new(3, 1, vec![0.0, 1.0, 0.0]).unwrap();
        let out = rescale_and_threshold(&grid, 4, 1, 0.5).unwrap();
        assert_eq!(out.as_slice(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn independent_axes() {
        let grid = MaskGrid::new(2, 1, vec![1.0, 0.0]).unwrap();
        let out = rescale_and_threshold(&grid, 4, 3, 0.5).unwrap();
        assert_eq!(out.dimensions(), (4, 3));
        for y in 0..3 {
            assert_eq!(&out.as_slice()[y * 4..y * 4 + 4], &[1.0, 1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn threshold_is_strict() {
        let grid = MaskGrid::new(2, 1, vec![0.5, 0.6]).unwrap();
        let out = rescale_and_threshold(&grid, 2, 1, 0.5).unwrap();
        assert_eq!(out.as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let grid = checkerboard(2);
        assert!(matches!(
            rescale_and_threshold(&grid, 4, 4, f32::NAN),
            Err(MaskError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn process_masks_returns_one_grid_per_mask() {
        let mut data = vec![-1.0f32; 3 * 4 * 4];
        // Second mask: right half positive.
        for y in 0..4 {
            for x in 2..4 {
                data[16 + y * 4 + x] = 2.0;
            }
        }
        let buffer = ProbabilityBuffer::new(data, 3, 4, 4).unwrap();
        let config = PostprocessConfig {
            output_width: 8,
            output_height: 8,
            ..PostprocessConfig::default()
        };
        let masks = process_masks(&buffer, &config).unwrap();
        assert_eq!(masks.len(), 3);
        assert_eq!(masks[0].count_above(0.5), 0);
        assert_eq!(masks[1].count_above(0.5), 32);
        assert_eq!(masks[1].bounding_box(0.5), Some((4, 0, 7, 7)));
        assert_eq!(masks[2].count_above(0.5), 0);
    }

    #[test]
    fn process_masks_with_smoothing_removes_specks() {
        let mut data = vec![0.0f32; 8 * 8];
        data[3 * 8 + 3] = 1.0;
        let buffer = ProbabilityBuffer::new(data, 1, 8, 8).unwrap();
        let config = PostprocessConfig {
            threshold: 0.5,
            output_width: 16,
            output_height: 16,
            ..PostprocessConfig::default()
        };

        let raw = process_masks(&buffer, &config).unwrap();
        assert_eq!(raw[0].count_above(0.5), 4);

        let smoothed = process_masks(&buffer, &config.clone().with_smoothing(SmoothingParams::default())).unwrap();
        assert_eq!(smoothed[0].count_above(0.5), 0);
    }
}
