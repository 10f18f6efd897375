//! # Strongroom Keyring
//!
//! Versioned encryption-key ledger used by the encrypted storage layer.
//!
//! ## Overview
//!
//! A [`Keyring`] holds every retained encryption key by term, the master
//! key that protects the keyring itself, and the rotation policy. New data
//! is encrypted with the key at the highest term; older terms stay
//! available to decrypt what they wrote.
//!
//! Keyrings are copy-on-write. `add_key`, `remove_key`, `set_master_key`
//! and the other mutators return a new keyring, so a reader can hold a
//! snapshot for as long as it needs while a writer installs the next one.
//!
//! ## Persistence
//!
//! [`Keyring::serialize`] produces a JSON record with base64 byte strings
//! and RFC 3339 timestamps. [`SealedKeyring`] wraps that record in
//! ChaCha20-Poly1305 under a key derived from the master key.
//!
//! ## Zeroization
//!
//! [`Keyring::zeroize`] clears key bytes in place. It is best effort: it
//! cannot reach clones, serialized copies, or memory the allocator moved.
//!
//! ## Usage
//!
//! ```rust
//! use strongroom_keyring::{Key, Keyring, SealedKeyring};
//!
//! let master = [7u8; 32];
//! let ring = Keyring::new()
//!     .set_master_key(&master)
//!     .add_key(Key::new(1, vec![1u8; 32]))
//!     .unwrap();
//!
//! let sealed = SealedKeyring::seal(&ring, &master).unwrap();
//! let opened = sealed.open(&master).unwrap();
//! assert_eq!(opened.active_term(), 1);
//! ```

mod encoding;
pub mod error;
pub mod key;
pub mod keyring;
pub mod rotation;
pub mod seal;

pub use error::{KeyringError, Result};
pub use key::{Key, KEY_VERSION};
pub use keyring::Keyring;
pub use rotation::{
    KeyRotationConfig, RotationReason, ABSOLUTE_OPERATION_MAXIMUM, ABSOLUTE_OPERATION_MINIMUM,
    LEGACY_KEY_AGE, MINIMUM_ROTATION_INTERVAL,
};
pub use seal::{SealFormat, SealedKeyring};
