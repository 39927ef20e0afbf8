// THEORY:
// Every failure the recoloring core can produce is structural: a value outside its
// documented range, a buffer whose shape disagrees with its dimensions, or an I/O
// failure at the codec boundary. None of them are retryable, so they are collected
// into a single enum that callers match on to re-prompt the operator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecolorError {
    #[error("invalid hex color {0:?}, expected #RRGGBB")]
    InvalidHex(String),

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid brightness range: min {min} is greater than max {max}")]
    InvalidRange { min: u8, max: u8 },

    #[error("multi-cluster selection needs at least one target color")]
    NoTargets,

    #[error("no color group with id {0}")]
    UnknownGroup(usize),

    #[error("texture is {actual_width}x{actual_height} but the analysis was run on {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("buffer holds {actual} bytes, {expected} expected for the given dimensions")]
    BufferLength { expected: usize, actual: usize },

    #[error("unsupported channel count {0}, expected 3 (RGB) or 4 (RGBA)")]
    UnsupportedChannels(u8),

    #[error("asset document has no image at index {0}")]
    MissingImage(usize),

    #[error("image {0} has no URI; buffer-view images are not supported")]
    MissingImageUri(usize),

    #[error("unsupported image data URI, expected data:image/<type>;base64,<payload>")]
    UnsupportedDataUri,

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Document(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, RecolorError>;
