use crate::error::{MaskError, Result};

/// A single mask at a fixed resolution, flattened in row-major order.
///
/// Values are either continuous (logits or probabilities straight from the
/// decoder) or binarized to exactly `0.0`/`1.0` after thresholding.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl MaskGrid {
    /// Wrap `data` as a `width × height` grid.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MaskError::ZeroDimension);
        }
        let expected = width.checked_mul(height).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(MaskError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn zeros(width: usize, height: usize) -> Result<Self> {
        Self::new(width, height, vec![0.0; width * height])
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Largest value in the grid.
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Number of cells strictly above `threshold`.
    pub fn count_above(&self, threshold: f32) -> usize {
        self.data.iter().filter(|&&v| v > threshold).count()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of cells above `threshold`,
    /// inclusive. `None` when no cell qualifies.
    pub fn bounding_box(&self, threshold: f32) -> Option<(usize, usize, usize, usize)> {
        let mut bbox: Option<(usize, usize, usize, usize)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) > threshold {
                    bbox = Some(match bbox {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        bbox
    }
}
