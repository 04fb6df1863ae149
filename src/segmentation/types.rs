use crate::error::{MaskError, Result as MaskResult};
use anyhow::Result;
use ndarray::Array4;

use super::prompt::DecoderInputs;

/// Number of candidate masks the SAM-family decoder emits per prompt.
pub const NUM_MASKS: usize = 3;

/// Native side length of each decoder mask.
pub const NATIVE_MASK_SIZE: usize = 256;

/// Side length of the square model input, and of the display masks.
pub const MODEL_INPUT_SIZE: usize = 1024;

/// Raw decoder output: `num_masks` stacked masks, stored as an NCHW tensor of
/// shape `[1, num_masks, height, width]`. Values are logits or probabilities,
/// whichever the caller's model emits.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityBuffer {
    tensor: Array4<f32>,
}

impl ProbabilityBuffer {
    pub fn new(data: Vec<f32>, num_masks: usize, height: usize, width: usize) -> MaskResult<Self> {
        if num_masks == 0 || height == 0 || width == 0 {
            return Err(MaskError::ZeroDimension);
        }
        let actual = data.len();
        let expected = num_masks
            .checked_mul(height)
            .and_then(|v| v.checked_mul(width))
            .ok_or(MaskError::ShapeMismatch {
                expected: usize::MAX,
                actual,
            })?;
        let tensor = Array4::from_shape_vec((1, num_masks, height, width), data)
            .map_err(|_| MaskError::ShapeMismatch { expected, actual })?;
        Ok(Self { tensor })
    }

    /// Build from a runtime-reported output shape, either `[1, N, H, W]` or
    /// `[N, H, W]`.
    pub fn from_tensor(shape: &[i64], data: Vec<f32>) -> MaskResult<Self> {
        let dims: Vec<usize> = shape
            .iter()
            .map(|&d| usize::try_from(d).unwrap_or(0))
            .collect();
        let (n, h, w) = match dims.as_slice() {
            [1, n, h, w] | [n, h, w] => (*n, *h, *w),
            _ => {
                return Err(MaskError::ShapeMismatch {
                    expected: dims.iter().product(),
                    actual: data.len(),
                })
            }
        };
        Self::new(data, n, h, w)
    }

    pub fn num_masks(&self) -> usize {
        self.tensor.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.tensor.shape()[2]
    }

    pub fn width(&self) -> usize {
        self.tensor.shape()[3]
    }

    /// Returns (num_masks, height, width)
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.num_masks(), self.height(), self.width())
    }

    pub(crate) fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }
}

/// Trait for mask decoders
/// Allows swapping between a live inference session and precomputed outputs
pub trait MaskDecoder {
    /// Run the decoder on prepared feeds and return its stacked masks
    fn decode(&mut self, inputs: &DecoderInputs) -> Result<ProbabilityBuffer>;

    /// Get the shape of the decoder output
    ///
    /// Returns (num_masks, height, width)
    fn output_dims(&self) -> (usize, usize, usize);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tensor_reads_nchw_shape() {
        let buffer = ProbabilityBuffer::from_tensor(&[1, 3, 4, 2], vec![0.0; 24]).unwrap();
        assert_eq!(buffer.dims(), (3, 4, 2));
    }

    #[test]
    fn from_tensor_accepts_unbatched_shape() {
        let buffer = ProbabilityBuffer::from_tensor(&[2, 2, 2], vec![0.0; 8]).unwrap();
        assert_eq!(buffer.dims(), (2, 2, 2));
    }

    #[test]
    fn from_tensor_rejects_batched_output() {
        assert!(matches!(
            ProbabilityBuffer::from_tensor(&[2, 3, 4, 4], vec![0.0; 96]),
            Err(MaskError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn new_rejects_overflowing_dimensions() {
        assert_eq!(
            ProbabilityBuffer::new(vec![0.0; 4], usize::MAX, 2, 2),
            Err(MaskError::ShapeMismatch {
                expected: usize::MAX,
                actual: 4
            })
        );
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert_eq!(
            ProbabilityBuffer::new(vec![0.0; 10], 3, 2, 2),
            Err(MaskError::ShapeMismatch {
                expected: 12,
                actual: 10
            })
        );
    }
}
