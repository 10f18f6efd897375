//! The copy-on-write key ledger.
//!
//! A [`Keyring`] is never mutated through a shared reference: every
//! operation that changes it returns a new value and leaves the receiver
//! untouched, so readers holding an older snapshot keep a consistent view
//! while a writer installs a new one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::encoding::base64_bytes;
use crate::error::{KeyringError, Result};
use crate::key::Key;
use crate::rotation::{KeyRotationConfig, RotationReason, LEGACY_KEY_AGE};

/// Versioned set of encryption keys plus the master key that protects it.
#[derive(Clone, Default)]
pub struct Keyring {
    master_key: Vec<u8>,
    keys: BTreeMap<u32, Key>,
    active_term: u32,
    rotation_config: KeyRotationConfig,
}

/// Persisted shape of a keyring.
#[derive(Serialize, Deserialize)]
struct EncodedKeyring {
    #[serde(rename = "MasterKey", with = "base64_bytes", default)]
    master_key: Vec<u8>,

    #[serde(rename = "Keys", default)]
    keys: Vec<Key>,

    #[serde(rename = "RotationConfig", default)]
    rotation_config: KeyRotationConfig,
}

impl Keyring {
    /// Create an empty keyring with the default rotation policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `key`, returning the new keyring.
    ///
    /// Re-adding an identical key is a no-op. A different value at an
    /// existing term is a conflict. A key without an install time is stamped
    /// with the current time.
    pub fn add_key(&self, key: Key) -> Result<Keyring> {
        if let Some(existing) = self.keys.get(&key.term) {
            if existing.value != key.value {
                return Err(KeyringError::ConflictingKey { term: key.term });
            }
            return Ok(self.clone());
        }

        let mut key = key;
        if key.install_time.is_none() {
            key.install_time = Some(Utc::now());
        }

        let mut next = self.clone();
        next.active_term = next.active_term.max(key.term);
        next.keys.insert(key.term, key);
        next.reset_inactive_encryptions();
        Ok(next)
    }

    /// Remove the key at `term`, returning the new keyring.
    ///
    /// Removing an absent term is a no-op.
    pub fn remove_key(&self, term: u32) -> Result<Keyring> {
        if term == self.active_term {
            return Err(KeyringError::ActiveKeyRemoval { term });
        }
        if !self.keys.contains_key(&term) {
            return Ok(self.clone());
        }

        let mut next = self.clone();
        if let Some(mut removed) = next.keys.remove(&term) {
            removed.zeroize();
        }
        Ok(next)
    }

    /// Replace the master key with a copy of `master_key`.
    pub fn set_master_key(&self, master_key: &[u8]) -> Keyring {
        let mut next = self.clone();
        next.master_key.zeroize();
        next.master_key = master_key.to_vec();
        next
    }

    /// Install a sanitized rotation policy.
    pub fn with_rotation_config(&self, config: KeyRotationConfig) -> Keyring {
        let mut next = self.clone();
        next.rotation_config = config.sanitized();
        next
    }

    /// Add `count` encryptions to the active key's counter.
    pub fn record_encryptions(&self, count: u64) -> Keyring {
        let mut next = self.clone();
        if let Some(active) = next.keys.get_mut(&next.active_term) {
            active.encryptions = active.encryptions.saturating_add(count);
        }
        next
    }

    /// Term used for new encryptions. Zero while the keyring is empty.
    pub fn active_term(&self) -> u32 {
        self.active_term
    }

    /// The key used for new encryptions.
    pub fn active_key(&self) -> Option<&Key> {
        self.keys.get(&self.active_term)
    }

    /// The key installed at `term`, used to decrypt older data.
    pub fn term_key(&self, term: u32) -> Option<&Key> {
        self.keys.get(&term)
    }

    pub fn master_key(&self) -> &[u8] {
        &self.master_key
    }

    pub fn rotation_config(&self) -> KeyRotationConfig {
        self.rotation_config
    }

    /// All installed keys in ascending term order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.values()
    }

    /// Number of installed keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Decide whether the active key is due for rotation at `now`.
    ///
    /// `unaccounted` is the number of encryptions performed since the
    /// active key's counter was last updated.
    pub fn rotation_reason(&self, now: DateTime<Utc>, unaccounted: u64) -> Option<RotationReason> {
        if self.rotation_config.disabled {
            return None;
        }
        let active = self.active_key()?;

        // An unset install time counts as infinitely old.
        let age = active
            .install_time
            .map(|installed| (now - installed).to_std().unwrap_or_default());
        let older_than = |limit| age.map_or(true, |age| age > limit);

        let operations = active.encryptions.saturating_add(unaccounted);
        let max_operations = u64::try_from(self.rotation_config.max_operations).unwrap_or(0);

        if active.encryptions == 0 && age.is_some() && older_than(LEGACY_KEY_AGE) {
            Some(RotationReason::Legacy)
        } else if operations > max_operations {
            Some(RotationReason::MaxOperations)
        } else if !self.rotation_config.interval.is_zero()
            && older_than(self.rotation_config.interval)
        {
            Some(RotationReason::Interval)
        } else {
            None
        }
    }

    /// Encode the keyring for persistence.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let encoded = EncodedKeyring {
            master_key: self.master_key.clone(),
            keys: self.keys.values().cloned().collect(),
            rotation_config: self.rotation_config,
        };
        let bytes = serde_json::to_vec(&encoded)
            .map_err(|e| KeyringError::SerializationError(e.to_string()));

        let EncodedKeyring {
            mut master_key,
            mut keys,
            ..
        } = encoded;
        master_key.zeroize();
        keys.iter_mut().for_each(Zeroize::zeroize);

        bytes
    }

    /// Decode a keyring produced by [`Keyring::serialize`].
    ///
    /// The active term is recomputed as the highest term present and the
    /// rotation policy is sanitized. Two different values at the same term
    /// are rejected.
    pub fn deserialize(bytes: &[u8]) -> Result<Keyring> {
        let encoded: EncodedKeyring =
            serde_json::from_slice(bytes).map_err(|e| KeyringError::Validation(e.to_string()))?;

        let mut keyring = Keyring {
            master_key: encoded.master_key,
            keys: BTreeMap::new(),
            active_term: 0,
            rotation_config: encoded.rotation_config.sanitized(),
        };

        for key in encoded.keys {
            if let Some(existing) = keyring.keys.get(&key.term) {
                if existing.value != key.value {
                    return Err(KeyringError::Validation(format!(
                        "duplicate term {} with different values",
                        key.term
                    )));
                }
                continue;
            }
            keyring.active_term = keyring.active_term.max(key.term);
            keyring.keys.insert(key.term, key);
        }

        Ok(keyring)
    }

    /// Overwrite the master key, and optionally every key value, in place.
    ///
    /// This is best effort. Earlier clones, serialized copies and buffers
    /// the allocator moved are not reached, and memory is not locked.
    pub fn zeroize(&mut self, keys_too: bool) {
        self.master_key.zeroize();
        if keys_too {
            self.keys.values_mut().for_each(Zeroize::zeroize);
        }
    }

    fn reset_inactive_encryptions(&mut self) {
        let active_term = self.active_term;
        for key in self.keys.values_mut().filter(|key| key.term != active_term) {
            key.encryptions = 0;
        }
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("active_term", &self.active_term)
            .field("terms", &self.keys.keys().collect::<Vec<_>>())
            .field("rotation_config", &self.rotation_config)
            .finish_non_exhaustive()
    }
}
