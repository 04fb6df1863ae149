use super::grid::MaskGrid;
use crate::error::{MaskError, Result};
use crate::segmentation::ProbabilityBuffer;
use ndarray::s;

/// Split a flat buffer of `num_masks` stacked `size × size` masks into
/// independent grids. Mask `i` is the slice `[i·size², (i+1)·size²)`.
///
/// Dimensions whose product overflows `usize` report `expected: usize::MAX`.
pub fn extract_masks(buffer: &[f32], num_masks: usize, size: usize) -> Result<Vec<MaskGrid>> {
    let expected = num_masks
        .checked_mul(size)
        .and_then(|v| v.checked_mul(size))
        .unwrap_or(usize::MAX);
    if buffer.len() != expected {
        return Err(MaskError::ShapeMismatch {
            expected,
            actual: buffer.len(),
        });
    }
    let buffer = ProbabilityBuffer::new(buffer.to_vec(), num_masks, size, size)?;
    buffer.extract_all()
}

impl ProbabilityBuffer {
    /// Copy mask `index` out of the buffer.
    pub fn select(&self, index: usize) -> Result<MaskGrid> {
        let (count, height, width) = self.dims();
        if index >= count {
            return Err(MaskError::MaskIndex { index, count });
        }
        let data: Vec<f32> = self
            .tensor()
            .slice(s![0, index, .., ..])
            .iter()
            .copied()
            .collect();
        MaskGrid::new(width, height, data)
    }

    /// Copy every mask out of the buffer, in order.
    pub fn extract_all(&self) -> Result<Vec<MaskGrid>> {
        let _span = tracing::debug_span!("extract").entered();

        let masks = (0..self.num_masks())
            .map(|i| self.select(i))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Extracted {} masks of {}x{}",
            masks.len(),
            self.width(),
            self.height()
        );
        Ok(masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    #[test]
    fn concatenated_masks_rebuild_the_buffer() {
        let data = ramp(3 * 4 * 4);
        let masks = extract_masks(&data, 3, 4).unwrap();
        assert_eq!(masks.len(), 3);

        let rebuilt: Vec<f32> = masks
            .iter()
            .flat_map(|m| m.as_slice().iter().copied())
            .collect();
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn masks_do_not_share_memory() {
        let data = ramp(3 * 2 * 2);
        let masks = extract_masks(&data, 3, 2).unwrap();
        for i in 0..masks.len() {
            for j in 0..masks.len() {
                if i != j {
                    assert_ne!(masks[i].as_slice().as_ptr(), masks[j].as_slice().as_ptr());
                }
            }
            assert_ne!(masks[i].as_slice().as_ptr(), data.as_ptr());
        }
    }

    #[test]
    fn second_mask_is_second_slice() {
        let data = ramp(2 * 3 * 3);
        let masks = extract_masks(&data, 2, 3).unwrap();
        assert_eq!(masks[1].get(0, 0), 9.0);
        assert_eq!(masks[1].get(2, 1), 14.0);
        assert_eq!(masks[1].dimensions(), (3, 3));
    }

    #[test]
    fn wrong_length_is_a_shape_mismatch() {
        assert_eq!(
            extract_masks(&[0.0; 10], 3, 2),
            Err(MaskError::ShapeMismatch {
                expected: 12,
                actual: 10
            })
        );
    }

    #[test]
    fn overflowing_dimensions_are_a_shape_mismatch() {
        assert_eq!(
            extract_masks(&[0.0; 4], 3, usize::MAX / 2),
            Err(MaskError::ShapeMismatch {
                expected: usize::MAX,
                actual: 4
            })
        );
    }

    #[test]
    fn select_out_of_range() {
        let buffer = ProbabilityBuffer::new(vec![0.0; 8], 2, 2, 2).unwrap();
        assert_eq!(
            buffer.select(2),
            Err(MaskError::MaskIndex { index: 2, count: 2 })
        );
    }

    #[test]
    fn select_rectangular_mask() {
        let buffer = ProbabilityBuffer::new(ramp(2 * 2 * 3), 2, 2, 3).unwrap();
        let mask = buffer.select(1).unwrap();
        assert_eq!(mask.dimensions(), (3, 2));
        assert_eq!(mask.as_slice(), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }
}
