use super::prompt::DecoderInputs;
use super::types::{MaskDecoder, ProbabilityBuffer};
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Decoder output captured ahead of time and stored as raw little-endian
/// `f32` values in `[mask][row][col]` order.
///
/// Stands in for a live inference session: every prompt yields the same
/// stored buffer.
pub struct RawMaskFile {
    buffer: ProbabilityBuffer,
}

impl RawMaskFile {
    /// Load a raw mask dump
    ///
    /// # Arguments
    /// * `path` - File holding `num_masks * size * size` little-endian f32 values
    /// * `num_masks` - Number of stacked masks
    /// * `size` - Side length of each square mask
    pub fn open<P: AsRef<Path>>(path: P, num_masks: usize, size: usize) -> Result<Self> {
        let path = path.as_ref();

        tracing::info!("Loading decoder output from {}", path.display());

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read mask buffer from {}", path.display()))?;
        let values = decode_f32_le(&bytes)
            .with_context(|| format!("Malformed mask buffer in {}", path.display()))?;

        let buffer = ProbabilityBuffer::new(values, num_masks, size, size)
            .with_context(|| format!("Unexpected mask buffer size in {}", path.display()))?;

        tracing::info!("Loaded {} masks of {}x{}", num_masks, size, size);

        Ok(Self { buffer })
    }
}

impl MaskDecoder for RawMaskFile {
    fn decode(&mut self, inputs: &DecoderInputs) -> Result<ProbabilityBuffer> {
        let points = inputs.num_points();
        if inputs.point_coords.shape()[2] != 2 || inputs.point_labels.shape() != [1, points] {
            bail!(
                "point_coords {:?} does not match point_labels {:?}",
                inputs.point_coords.shape(),
                inputs.point_labels.shape()
            );
        }
        if points == 0 {
            bail!("decoder prompt has no points");
        }

        tracing::debug!(
            "Returning stored decoder output for {} prompt points",
            points
        );
        Ok(self.buffer.clone())
    }

    fn output_dims(&self) -> (usize, usize, usize) {
        self.buffer.dims()
    }
}

fn decode_f32_le(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        bail!("length {} is not a multiple of 4 bytes", bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Write values in the layout [`RawMaskFile`] reads.
pub fn write_f32_le<P: AsRef<Path>>(path: P, values: &[f32]) -> Result<()> {
    let path = path.as_ref();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::DecoderPrompt;
    use ndarray::Array2;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("clickmask-{}-{}", std::process::id(), name))
    }

    #[test]
    fn reads_back_written_buffer() {
        let path = temp_path("roundtrip.f32");
        let values: Vec<f32> = (0..2 * 3 * 3).map(|i| i as f32 - 4.5).collect();
        write_f32_le(&path, &values).unwrap();

        let mut decoder = RawMaskFile::open(&path, 2, 3).unwrap();
        assert_eq!(decoder.output_dims(), (2, 3, 3));

        let inputs = DecoderInputs::from_prompt(&DecoderPrompt::foreground(1.0, 1.0));
        let buffer = decoder.decode(&inputs).unwrap();
        let second = buffer.select(1).unwrap();
        assert_eq!(second.get(0, 0), 4.5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn mismatched_point_feeds_are_rejected() {
        let path = temp_path("feeds.f32");
        write_f32_le(&path, &[0.0; 4]).unwrap();
        let mut decoder = RawMaskFile::open(&path, 1, 2).unwrap();

        let mut prompt = DecoderPrompt::foreground(1.0, 1.0);
        prompt.push(2.0, 2.0, crate::segmentation::PointLabel::Background);
        let mut inputs = DecoderInputs::from_prompt(&prompt);
        inputs.point_labels = Array2::zeros((1, 1));
        let err = decoder.decode(&inputs).err().unwrap();
        assert!(err.to_string().contains("does not match"));

        let empty = DecoderInputs::from_prompt(&DecoderPrompt::new());
        assert!(decoder.decode(&empty).is_err());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn wrong_size_is_reported() {
        let path = temp_path("short.f32");
        write_f32_le(&path, &[0.0; 5]).unwrap();
        let err = RawMaskFile::open(&path, 3, 2).err().unwrap();
        assert!(format!("{err:#}").contains("shape mismatch"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn truncated_value_is_rejected() {
        assert!(decode_f32_le(&[0, 0, 128]).is_err());
        assert_eq!(decode_f32_le(&1.5f32.to_le_bytes()).unwrap(), vec![1.5]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(RawMaskFile::open(temp_path("missing.f32"), 3, 256).is_err());
    }
}
