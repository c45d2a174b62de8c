//! Typed errors for detection operations.

use thiserror::Error;

/// Errors that can occur while classifying an image.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Image file could not be read
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    /// Image bytes could not be decoded
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, DetectError>;
