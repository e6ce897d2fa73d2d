use crate::params::ImageType;

/// Errors reported by matcher construction and configuration validation.
///
/// All variants are detected before any matching state is built; a failed
/// `process` call leaves no partial output behind.
#[derive(thiserror::Error, Debug)]
pub enum SgmError {
    #[error("census mask radius {0} out of range [1, 7]")]
    MaskRadius(usize),
    #[error("image type {0:?} is not supported")]
    UnsupportedImageType(ImageType),
    #[error("image payload does not match configured image type {expected:?}")]
    ImageTypeMismatch { expected: ImageType },
    #[error("{side} image is {got_rows}x{got_cols}, configuration says {rows}x{cols}")]
    DimensionMismatch {
        side: &'static str,
        got_rows: usize,
        got_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}
