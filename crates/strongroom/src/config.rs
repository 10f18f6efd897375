//! Configuration for Strongroom.

use strongroom_keyring::KeyRotationConfig;

use crate::error::{Result, StrongroomError};

/// Configuration for a [`crate::Strongroom`] instance.
#[derive(Debug, Clone)]
pub struct StrongroomConfig {
    /// Storage key of the sealed keyring.
    pub keyring_path: String,
    /// Storage prefix under which policies are kept.
    pub policy_prefix: String,
    /// Size in bytes of generated encryption keys.
    pub key_size: usize,
    /// Rotation policy installed when the keyring is initialized.
    pub rotation: KeyRotationConfig,
    /// Number of cached ACLs before the cache is cleared.
    pub acl_cache_capacity: usize,
}

impl Default for StrongroomConfig {
    fn default() -> Self {
        Self {
            keyring_path: "core/keyring".to_string(),
            policy_prefix: "sys/policy/".to_string(),
            key_size: 32,
            rotation: KeyRotationConfig::default(),
            acl_cache_capacity: 1024,
        }
    }
}

impl StrongroomConfig {
    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.keyring_path.is_empty() || self.keyring_path.contains("..") {
            return Err(StrongroomError::InvalidConfig(format!(
                "keyring_path {:?} is not a valid storage key",
                self.keyring_path
            )));
        }
        if self.policy_prefix.contains("..") {
            return Err(StrongroomError::InvalidConfig(format!(
                "policy_prefix {:?} is not a valid storage prefix",
                self.policy_prefix
            )));
        }
        if self.key_size < 16 {
            return Err(StrongroomError::InvalidConfig(format!(
                "key_size must be at least 16 bytes, got {}",
                self.key_size
            )));
        }
        if self.acl_cache_capacity == 0 {
            return Err(StrongroomError::InvalidConfig(
                "acl_cache_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
