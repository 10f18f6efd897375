//! Sealed keyring envelope.
//!
//! The keyring is persisted encrypted under a key derived from the master
//! key. The envelope carries the cipher identifier and nonce so it can be
//! opened with nothing but the master key.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KeyringError, Result};
use crate::keyring::Keyring;

/// Domain separation context for the envelope key.
const SEAL_CONTEXT: &str = "strongroom keyring seal v1";

/// Cipher used for a sealed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SealFormat {
    /// ChaCha20-Poly1305 with a BLAKE3-derived 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// Symmetric key derived from a master key. Cleared on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SealKey([u8; 32]);

impl SealKey {
    fn derive(master_key: &[u8]) -> Self {
        Self(blake3::derive_key(SEAL_CONTEXT, master_key))
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeyringError::EncryptionError(e.to_string()))
    }
}

/// An encrypted, serialized keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeyring {
    /// Cipher used.
    pub format: SealFormat,

    /// Nonce used for this envelope (unique per seal).
    pub nonce: [u8; 12],

    /// The encrypted keyring (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl SealedKeyring {
    /// Encrypt `keyring` under `master_key`.
    pub fn seal(keyring: &Keyring, master_key: &[u8]) -> Result<Self> {
        let mut plaintext = keyring.serialize()?;

        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let key = SealKey::derive(master_key);
        let sealed = key
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| KeyringError::EncryptionError(e.to_string()));
        plaintext.zeroize();

        Ok(Self {
            format: SealFormat::ChaCha20Poly1305,
            nonce,
            ciphertext: sealed?,
        })
    }

    /// Decrypt with `master_key` and decode the keyring.
    ///
    /// Fails if the envelope was sealed under another key, was tampered
    /// with, or holds a keyring whose own master key differs.
    pub fn open(&self, master_key: &[u8]) -> Result<Keyring> {
        let key = SealKey::derive(master_key);
        let mut plaintext = match self.format {
            SealFormat::ChaCha20Poly1305 => key
                .cipher()?
                .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
                .map_err(|e| KeyringError::DecryptionError(e.to_string()))?,
        };

        let keyring = Keyring::deserialize(&plaintext);
        plaintext.zeroize();
        let keyring = keyring?;

        if keyring.master_key() != master_key {
            return Err(KeyringError::Validation(
                "keyring master key does not match unseal key".to_string(),
            ));
        }
        Ok(keyring)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| KeyringError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| KeyringError::Validation(e.to_string()))
    }
}
