//! Error types for the keyring.

use thiserror::Error;

/// Errors that can occur while mutating, persisting or sealing a keyring.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// A different key is already installed at this term.
    #[error("conflicting key for term {term} already installed")]
    ConflictingKey { term: u32 },

    /// The active key cannot be removed.
    #[error("cannot remove active key (term {term})")]
    ActiveKeyRemoval { term: u32 },

    /// Persisted keyring data is malformed.
    #[error("invalid keyring data: {0}")]
    Validation(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl KeyringError {
    /// Whether this error is a conflict with the current keyring state.
    ///
    /// Conflicts are never retried automatically.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            KeyringError::ConflictingKey { .. } | KeyringError::ActiveKeyRemoval { .. }
        )
    }
}

/// Result type for keyring operations.
pub type Result<T> = std::result::Result<T, KeyringError>;
