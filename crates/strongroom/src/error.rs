//! Error types for Strongroom.

use strongroom_core::AclError;
use strongroom_keyring::KeyringError;
use strongroom_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Strongroom operations.
#[derive(Debug, Error)]
pub enum StrongroomError {
    /// ACL construction or policy encoding error.
    #[error("acl error: {0}")]
    Acl(#[from] AclError),

    /// Keyring error.
    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The policy cannot be modified.
    #[error("cannot modify policy {0:?}")]
    ImmutablePolicy(String),

    /// Policy name is empty or unusable as a storage key.
    #[error("invalid policy name {0:?}")]
    InvalidPolicyName(String),

    /// A keyring already exists in storage.
    #[error("keyring already initialized")]
    AlreadyInitialized,

    /// No keyring exists in storage.
    #[error("keyring not initialized")]
    NotInitialized,

    /// The keyring is not loaded.
    #[error("keyring is sealed")]
    Sealed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StrongroomError {
    /// Whether this error is a conflict with current state rather than a
    /// failure of the operation itself.
    pub fn is_conflict(&self) -> bool {
        match self {
            StrongroomError::Keyring(e) => e.is_conflict(),
            StrongroomError::ImmutablePolicy(_) | StrongroomError::AlreadyInitialized => true,
            _ => false,
        }
    }
}

/// Result type for Strongroom operations.
pub type Result<T> = std::result::Result<T, StrongroomError>;
