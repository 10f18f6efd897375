//! Error types for Strongroom Core.

use thiserror::Error;

/// Errors that can occur while building an ACL or encoding policies.
#[derive(Debug, Error)]
pub enum AclError {
    #[error("invalid capability bitmap {bits:#x} on path {path:?}")]
    InvalidCapabilities { path: String, bits: u32 },

    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, AclError>;
