use anyhow::{bail, Result};
use image::{imageops, Rgba, RgbaImage};
use ndarray::Array4;

use super::types::MODEL_INPUT_SIZE;

/// ImageNet channel statistics the encoder was trained with.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Where a source image landed inside the square model canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f64,
    pub offset_x: u32,
    pub offset_y: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl Letterbox {
    /// Map a point from source-image pixels to model-canvas pixels.
    pub fn to_model(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale + self.offset_x as f64,
            y * self.scale + self.offset_y as f64,
        )
    }

    /// Map a point from model-canvas pixels back to source-image pixels.
    pub fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.offset_x as f64) / self.scale,
            (y - self.offset_y as f64) / self.scale,
        )
    }
}

/// Preprocessor for fitting uploaded images into the encoder's square input
pub struct Preprocessor {
    target_size: u32,
    background: Rgba<u8>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(MODEL_INPUT_SIZE as u32)
    }
}

impl Preprocessor {
    pub fn new(target_size: u32) -> Self {
        Self {
            target_size,
            background: Rgba([255, 255, 255, 255]),
        }
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    /// Fit an image into a `target_size` square canvas
    ///
    /// Steps:
    /// 1. Scale by `min(target/w, target/h)`, preserving aspect ratio
    /// 2. Centre on a white canvas
    ///
    /// Returns the canvas and the placement used
    pub fn letterbox(&self, image: &RgbaImage) -> Result<(RgbaImage, Letterbox)> {
        let _span = tracing::debug_span!("letterbox").entered();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            bail!("Cannot letterbox an empty {}x{} image", width, height);
        }

        let target = self.target_size as f64;
        let scale = (target / width as f64).min(target / height as f64);
        let scaled_width = ((width as f64 * scale).round() as u32).clamp(1, self.target_size);
        let scaled_height = ((height as f64 * scale).round() as u32).clamp(1, self.target_size);
        let offset_x = (self.target_size - scaled_width) / 2;
        let offset_y = (self.target_size - scaled_height) / 2;

        // Resize if needed
        let resized = if (width, height) != (scaled_width, scaled_height) {
            imageops::resize(image, scaled_width, scaled_height, imageops::FilterType::Lanczos3)
        } else {
            image.clone()
        };

        let mut canvas = RgbaImage::from_pixel(self.target_size, self.target_size, self.background);
        imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

        tracing::debug!(
            "Letterboxed {}x{} to {}x{} at ({}, {}) in {}x{}",
            width,
            height,
            scaled_width,
            scaled_height,
            offset_x,
            offset_y,
            self.target_size,
            self.target_size
        );

        Ok((
            canvas,
            Letterbox {
                scale,
                offset_x,
                offset_y,
                scaled_width,
                scaled_height,
            },
        ))
    }

    /// Convert a letterboxed canvas into the encoder's NCHW input tensor
    ///
    /// Each channel is scaled to [0, 1] then normalized with ImageNet mean/std.
    /// Alpha is dropped.
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn to_tensor(&self, image: &RgbaImage) -> Array4<f32> {
        let _span = tracing::debug_span!("to_tensor").entered();

        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - MEAN[c]) / STD[c];
            }
        }

        tensor
    }
}
