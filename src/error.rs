use thiserror::Error;

/// Errors raised by the mask post-processing and compositing stages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MaskError {
    /// A buffer's length does not match the dimensions it was declared with.
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid threshold: {0}")]
    InvalidThreshold(f32),

    #[error("invalid alpha {0}: must be within [0, 1]")]
    InvalidAlpha(f64),

    #[error("mask index {index} out of range ({count} masks)")]
    MaskIndex { index: usize, count: usize },

    #[error("grid and target dimensions must be non-zero")]
    ZeroDimension,
}

pub type Result<T> = std::result::Result<T, MaskError>;

/// Thresholds may be any ordered value, including infinities. NaN is rejected
/// because every comparison against it is false.
pub(crate) fn check_threshold(threshold: f32) -> Result<()> {
    if threshold.is_nan() {
        return Err(MaskError::InvalidThreshold(threshold));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_threshold_is_rejected() {
        assert_eq!(
            check_threshold(f32::NAN).map_err(|e| matches!(e, MaskError::InvalidThreshold(_))),
            Err(true)
        );
    }

    #[test]
    fn infinite_threshold_is_accepted() {
        assert!(check_threshold(f32::INFINITY).is_ok());
        assert!(check_threshold(f32::NEG_INFINITY).is_ok());
        assert!(check_threshold(-3.5).is_ok());
    }

    #[test]
    fn shape_mismatch_message() {
        let err = MaskError::ShapeMismatch {
            expected: 196_608,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch: expected 196608 values, got 10"
        );
    }
}
