mod preprocess;
mod prompt;
mod raw;
pub mod types;

pub use preprocess::{Letterbox, Preprocessor};
pub use prompt::{DecoderInputs, DecoderPrompt, PointLabel, PromptPoint};
pub use raw::{write_f32_le, RawMaskFile};
pub use types::{MaskDecoder, ProbabilityBuffer, MODEL_INPUT_SIZE, NATIVE_MASK_SIZE, NUM_MASKS};

use anyhow::Result;
use std::path::Path;

/// Open a decoder backed by a raw dump of `num_masks` stacked `size × size` masks.
pub fn open_decoder(path: &Path, num_masks: usize, size: usize) -> Result<Box<dyn MaskDecoder>> {
    let decoder = RawMaskFile::open(path, num_masks, size)?;
    Ok(Box::new(decoder))
}
