//! Error type of the vision façade

use handcv_core::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    /// Malformed or out-of-range input (dimensions, channel counts, element types).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Stride, channel-order or origin reconciliation failed.
    #[error("conversion failed: {0}")]
    Conversion(String),
    /// The vision backend could not be initialized.
    #[error("vision library unavailable: {0}")]
    LibraryUnavailable(String),
    /// A failure inside the vision backend, passed through untouched.
    #[error(transparent)]
    Library(#[from] anyhow::Error),
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<BridgeError> for VisionError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::InvalidInput(msg) => VisionError::InvalidInput(msg),
            BridgeError::Conversion(msg) => VisionError::Conversion(msg),
        }
    }
}

impl VisionError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, VisionError::InvalidInput(_))
    }
}
