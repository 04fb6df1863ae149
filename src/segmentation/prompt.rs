use ndarray::{Array1, Array2, Array3, Array4};

use super::types::{MODEL_INPUT_SIZE, NATIVE_MASK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLabel {
    Background,
    Foreground,
}

impl PointLabel {
    fn as_f32(self) -> f32 {
        match self {
            PointLabel::Background => 0.0,
            PointLabel::Foreground => 1.0,
        }
    }
}

/// A click, in model input space (`[0, 1024)` on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptPoint {
    pub x: f32,
    pub y: f32,
    pub label: PointLabel,
}

/// The points a user has placed for one decode request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderPrompt {
    points: Vec<PromptPoint>,
}

impl DecoderPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single foreground click, already in model space.
    pub fn foreground(x: f32, y: f32) -> Self {
        let mut prompt = Self::new();
        prompt.push(x, y, PointLabel::Foreground);
        prompt
    }

    /// A single foreground click on a square display canvas of side
    /// `display_size`, rescaled into model space.
    pub fn from_display_click(x: f32, y: f32, display_size: f32) -> Self {
        let scale = MODEL_INPUT_SIZE as f32 / display_size;
        Self::foreground(x * scale, y * scale)
    }

    pub fn push(&mut self, x: f32, y: f32, label: PointLabel) {
        self.points.push(PromptPoint { x, y, label });
    }

    pub fn points(&self) -> &[PromptPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Decoder feeds derived from a prompt. The image embeddings come from the
/// encoder and are passed alongside these by the inference host.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderInputs {
    /// Shape [1, n, 2]
    pub point_coords: Array3<f32>,
    /// Shape [1, n]
    pub point_labels: Array2<f32>,
    /// Shape [1, 1, 256, 256], all zeros: no previous mask is fed back.
    pub mask_input: Array4<f32>,
    /// Shape [1]
    pub has_mask_input: Array1<f32>,
}

impl DecoderInputs {
    /// Number of prompt points, read from `point_coords`.
    pub fn num_points(&self) -> usize {
        self.point_coords.shape()[1]
    }

    pub fn from_prompt(prompt: &DecoderPrompt) -> Self {
        let n = prompt.points().len();
        let mut point_coords = Array3::<f32>::zeros((1, n, 2));
        let mut point_labels = Array2::<f32>::zeros((1, n));

        for (i, point) in prompt.points().iter().enumerate() {
            point_coords[[0, i, 0]] = point.x;
            point_coords[[0, i, 1]] = point.y;
            point_labels[[0, i]] = point.label.as_f32();
        }

        Self {
            point_coords,
            point_labels,
            mask_input: Array4::zeros((1, 1, NATIVE_MASK_SIZE, NATIVE_MASK_SIZE)),
            has_mask_input: Array1::zeros(1),
        }
    }
}
