//! Errors raised at the bitmap/matrix boundary

use thiserror::Error;

/// Failure while crossing the bridge between platform bitmaps and library matrices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Malformed or out-of-range dimensions, channel counts or element types.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Stride, channel-order or origin could not be reconciled.
    #[error("conversion failed: {0}")]
    Conversion(String),
}

impl BridgeError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
