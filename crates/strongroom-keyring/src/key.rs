//! A single term-versioned encryption key.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::encoding::{base64_bytes, install_time};
use crate::error::{KeyringError, Result};

/// Version stamped on keys created by this crate.
pub const KEY_VERSION: i64 = 1;

/// An encryption key installed at a given term.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Generation number of this key.
    #[serde(rename = "Term")]
    pub term: u32,

    #[serde(rename = "Version")]
    pub version: i64,

    /// Raw key bytes.
    #[serde(rename = "Value", with = "base64_bytes")]
    pub value: Vec<u8>,

    /// When the key was installed. `None` until a keyring installs it.
    #[serde(rename = "InstallTime", with = "install_time", default)]
    pub install_time: Option<DateTime<Utc>>,

    /// Encryptions performed with this key while it was active.
    #[serde(rename = "encryptions", default, skip_serializing_if = "is_zero")]
    pub encryptions: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Key {
    /// Create a key at `term` with no install time.
    pub fn new(term: u32, value: impl Into<Vec<u8>>) -> Self {
        Self {
            term,
            version: KEY_VERSION,
            value: value.into(),
            install_time: None,
            encryptions: 0,
        }
    }

    /// Set the install time.
    pub fn installed_at(mut self, time: DateTime<Utc>) -> Self {
        self.install_time = Some(time);
        self
    }

    /// Short, non-secret identifier for logs.
    pub fn fingerprint(&self) -> String {
        let digest = blake3::hash(&self.value);
        hex::encode(&digest.as_bytes()[..8])
    }

    /// Encode this key on its own.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| KeyringError::SerializationError(e.to_string()))
    }

    /// Decode a key produced by [`Key::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| KeyringError::Validation(e.to_string()))
    }
}

impl Zeroize for Key {
    fn zeroize(&mut self) {
        self.value.zeroize();
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("term", &self.term)
            .field("version", &self.version)
            .field("value", &format_args!("<redacted {}>", self.fingerprint()))
            .field("install_time", &self.install_time)
            .field("encryptions", &self.encryptions)
            .finish()
    }
}
