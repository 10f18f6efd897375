//! Ownership of the live keyring.
//!
//! The manager holds the current keyring snapshot behind an `Arc`. Readers
//! clone the `Arc` under a short read lock and keep using it for as long as
//! they need; writers build a new keyring, persist it sealed, and swap it in.
//! Writers are serialized by an async mutex so two rotations never race on
//! the same source snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use strongroom_keyring::{Key, KeyRotationConfig, Keyring, RotationReason, SealedKeyring};
use strongroom_store::{Storage, StorageExt};

use crate::config::StrongroomConfig;
use crate::error::{Result, StrongroomError};

/// Holds, persists and rotates the keyring.
pub struct KeyringManager<S: Storage + ?Sized> {
    storage: Arc<S>,
    keyring_path: String,
    key_size: usize,
    initial_rotation: KeyRotationConfig,
    /// `None` while sealed.
    current: RwLock<Option<Arc<Keyring>>>,
    writer: Mutex<()>,
    /// Encryptions not yet recorded on the active key.
    unaccounted: AtomicU64,
}

impl<S: Storage + ?Sized> KeyringManager<S> {
    /// Create a sealed manager over `storage`.
    pub fn new(storage: Arc<S>, config: &StrongroomConfig) -> Self {
        Self {
            storage,
            keyring_path: config.keyring_path.clone(),
            key_size: config.key_size,
            initial_rotation: config.rotation,
            current: RwLock::new(None),
            writer: Mutex::new(()),
            unaccounted: AtomicU64::new(0),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether a keyring exists in storage.
    pub async fn is_initialized(&self) -> Result<bool> {
        Ok(self.storage.get(&self.keyring_path).await?.is_some())
    }

    pub fn is_sealed(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Create the first keyring, protected by `master_key`, and leave the
    /// manager unsealed.
    pub async fn initialize(&self, master_key: &[u8]) -> Result<Arc<Keyring>> {
        let _guard = self.writer.lock().await;
        if self.is_initialized().await? {
            return Err(StrongroomError::AlreadyInitialized);
        }

        let keyring = Keyring::new()
            .set_master_key(master_key)
            .with_rotation_config(self.initial_rotation)
            .add_key(Key::new(1, self.generate_key()))?;

        self.persist(&keyring).await?;
        info!(term = keyring.active_term(), "initialized keyring");
        Ok(self.install(keyring))
    }

    /// Load the keyring from storage and open it with `master_key`.
    pub async fn unseal(&self, master_key: &[u8]) -> Result<Arc<Keyring>> {
        let _guard = self.writer.lock().await;
        let bytes = self
            .storage
            .get_value(&self.keyring_path)
            .await?
            .ok_or(StrongroomError::NotInitialized)?;

        let keyring = SealedKeyring::from_bytes(&bytes)?.open(master_key)?;
        info!(
            term = keyring.active_term(),
            keys = keyring.len(),
            "unsealed keyring"
        );
        Ok(self.install(keyring))
    }

    /// Drop the live keyring and clear its key material where possible.
    ///
    /// Sealing an already sealed manager does nothing.
    pub async fn seal(&self) {
        let _guard = self.writer.lock().await;
        let taken = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.unaccounted.store(0, Ordering::Release);

        let Some(snapshot) = taken else {
            return;
        };
        match Arc::try_unwrap(snapshot) {
            Ok(mut keyring) => keyring.zeroize(true),
            Err(shared) => warn!(
                readers = Arc::strong_count(&shared) - 1,
                "keyring still referenced at seal, key material not cleared"
            ),
        }
        info!("sealed keyring");
    }

    /// The current keyring snapshot.
    pub fn snapshot(&self) -> Result<Arc<Keyring>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StrongroomError::Sealed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Install a new random key at the next term. Returns the new term.
    pub async fn rotate(&self) -> Result<u32> {
        let _guard = self.writer.lock().await;
        let current = self.snapshot()?;

        let term = current.active_term() + 1;
        let next = current.add_key(Key::new(term, self.generate_key()))?;
        self.persist(&next).await?;
        self.install(next);
        info!(term, "rotated keyring");
        Ok(term)
    }

    /// Remove an inactive term.
    pub async fn remove_term(&self, term: u32) -> Result<()> {
        let _guard = self.writer.lock().await;
        let next = self.snapshot()?.remove_key(term)?;
        self.persist(&next).await?;
        self.replace(next);
        info!(term, "removed keyring term");
        Ok(())
    }

    /// Change the rotation policy.
    ///
    /// Nothing is persisted when the new policy compares equal to the
    /// current one under [`KeyRotationConfig::equals`].
    pub async fn set_rotation_config(&self, config: KeyRotationConfig) -> Result<()> {
        let _guard = self.writer.lock().await;
        let current = self.snapshot()?;
        if config.sanitized().equals(&current.rotation_config()) {
            return Ok(());
        }

        let next = current.with_rotation_config(config);
        self.persist(&next).await?;
        info!(config = ?next.rotation_config(), "updated rotation config");
        self.replace(next);
        Ok(())
    }

    /// Replace the master key and re-seal the keyring under it.
    pub async fn rekey(&self, new_master_key: &[u8]) -> Result<()> {
        let _guard = self.writer.lock().await;
        let next = self.snapshot()?.set_master_key(new_master_key);
        self.persist(&next).await?;
        self.replace(next);
        info!("rekeyed keyring");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encryption accounting
    // ─────────────────────────────────────────────────────────────────────────

    /// Count encryptions made with the active key.
    pub fn add_encryptions(&self, count: u64) {
        self.unaccounted.fetch_add(count, Ordering::AcqRel);
    }

    /// Encryptions counted since they were last persisted.
    pub fn unaccounted_encryptions(&self) -> u64 {
        self.unaccounted.load(Ordering::Acquire)
    }

    /// Move unaccounted encryptions onto the active key and persist.
    pub async fn persist_encryptions(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        let pending = self.unaccounted.load(Ordering::Acquire);
        if pending == 0 {
            return Ok(());
        }

        let next = self.snapshot()?.record_encryptions(pending);
        self.persist(&next).await?;
        self.replace(next);
        self.unaccounted.fetch_sub(pending, Ordering::AcqRel);
        debug!(pending, "persisted encryption count");
        Ok(())
    }

    /// Whether the active key is due for rotation at `now`.
    pub fn rotation_reason(&self, now: DateTime<Utc>) -> Result<Option<RotationReason>> {
        Ok(self
            .snapshot()?
            .rotation_reason(now, self.unaccounted_encryptions()))
    }

    /// Periodic check: report a due rotation, otherwise persist the
    /// encryption count.
    pub async fn check_rotation(&self, now: DateTime<Utc>) -> Result<Option<RotationReason>> {
        if let Some(reason) = self.rotation_reason(now)? {
            return Ok(Some(reason));
        }
        self.persist_encryptions().await?;
        Ok(None)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn generate_key(&self) -> Vec<u8> {
        let mut key = vec![0u8; self.key_size];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    async fn persist(&self, keyring: &Keyring) -> Result<()> {
        let sealed = SealedKeyring::seal(keyring, keyring.master_key())?;
        self.storage
            .put_value(&self.keyring_path, sealed.to_bytes()?)
            .await?;
        Ok(())
    }

    /// Swap in a keyring whose active term differs from the live one.
    fn install(&self, keyring: Keyring) -> Arc<Keyring> {
        self.unaccounted.store(0, Ordering::Release);
        self.replace(keyring)
    }

    /// Swap in a keyring with the same active term.
    fn replace(&self, keyring: Keyring) -> Arc<Keyring> {
        let snapshot = Arc::new(keyring);
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(snapshot.clone());

        // The new snapshot owns its own copies of every key.
        if let Some(Ok(mut old)) = previous.map(Arc::try_unwrap) {
            old.zeroize(true);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strongroom_keyring::{ABSOLUTE_OPERATION_MAXIMUM, MINIMUM_ROTATION_INTERVAL};
    use strongroom_store::MemoryStorage;

    const MASTER: [u8; 32] = [0x5a; 32];

    fn manager() -> KeyringManager<MemoryStorage> {
        KeyringManager::new(Arc::new(MemoryStorage::new()), &StrongroomConfig::default())
    }

    #[tokio::test]
    async fn test_initialize_and_unseal() {
        let manager = manager();
        assert!(manager.is_sealed());
        assert!(matches!(manager.snapshot(), Err(StrongroomError::Sealed)));

        let ring = manager.initialize(&MASTER).await.unwrap();
        assert_eq!(ring.active_term(), 1);
        assert_eq!(ring.active_key().unwrap().value.len(), 32);
        assert!(!manager.is_sealed());

        manager.seal().await;
        assert!(manager.is_sealed());

        let reopened = manager.unseal(&MASTER).await.unwrap();
        assert_eq!(reopened.active_term(), 1);
        assert_eq!(reopened.term_key(1), ring.term_key(1));
    }

    #[tokio::test]
    async fn test_initialize_twice_fails() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();
        let err = manager.initialize(&MASTER).await.unwrap_err();
        assert!(matches!(err, StrongroomError::AlreadyInitialized));
    }

    #[tokio::test]
    async fn test_unseal_uninitialized() {
        let manager = manager();
        assert!(matches!(
            manager.unseal(&MASTER).await,
            Err(StrongroomError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_unseal_wrong_key() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();
        manager.seal().await;

        assert!(manager.unseal(&[0u8; 32]).await.is_err());
        assert!(manager.is_sealed());
    }

    #[tokio::test]
    async fn test_seal_is_idempotent() {
        let manager = manager();
        manager.seal().await;
        manager.seal().await;
        assert!(manager.is_sealed());
    }

    #[tokio::test]
    async fn test_reader_snapshot_survives_rotation() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();

        let held = manager.snapshot().unwrap();
        let term = manager.rotate().await.unwrap();

        assert_eq!(term, 2);
        assert_eq!(held.active_term(), 1);
        assert_eq!(manager.snapshot().unwrap().active_term(), 2);
        assert!(manager.snapshot().unwrap().term_key(1).is_some());
    }

    #[tokio::test]
    async fn test_remove_term() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();
        manager.rotate().await.unwrap();

        let err = manager.remove_term(2).await.unwrap_err();
        assert!(err.is_conflict());

        manager.remove_term(1).await.unwrap();
        manager.seal().await;
        let ring = manager.unseal(&MASTER).await.unwrap();
        assert!(ring.term_key(1).is_none());
        assert_eq!(ring.active_term(), 2);
    }

    #[tokio::test]
    async fn test_encryption_accounting() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();

        manager.add_encryptions(10);
        manager.add_encryptions(5);
        assert_eq!(manager.unaccounted_encryptions(), 15);

        manager.persist_encryptions().await.unwrap();
        assert_eq!(manager.unaccounted_encryptions(), 0);
        assert_eq!(manager.snapshot().unwrap().active_key().unwrap().encryptions, 15);

        manager.seal().await;
        let ring = manager.unseal(&MASTER).await.unwrap();
        assert_eq!(ring.active_key().unwrap().encryptions, 15);
    }

    #[tokio::test]
    async fn test_check_rotation_on_max_operations() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();
        let now = Utc::now();

        manager.add_encryptions(3);
        assert_eq!(manager.check_rotation(now).await.unwrap(), None);
        assert_eq!(manager.unaccounted_encryptions(), 0);

        manager.add_encryptions(ABSOLUTE_OPERATION_MAXIMUM as u64);
        assert_eq!(
            manager.check_rotation(now).await.unwrap(),
            Some(RotationReason::MaxOperations)
        );

        manager.rotate().await.unwrap();
        assert_eq!(manager.unaccounted_encryptions(), 0);
        assert_eq!(manager.rotation_reason(now).unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_rotation_config_ignores_disabled_only_change() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();

        let toggled = KeyRotationConfig {
            disabled: true,
            ..manager.snapshot().unwrap().rotation_config()
        };
        manager.set_rotation_config(toggled).await.unwrap();
        assert!(!manager.snapshot().unwrap().rotation_config().disabled);

        let interval = KeyRotationConfig {
            disabled: false,
            max_operations: 0,
            interval: Duration::from_secs(60),
        };
        manager.set_rotation_config(interval).await.unwrap();
        manager.seal().await;

        let ring = manager.unseal(&MASTER).await.unwrap();
        assert_eq!(ring.rotation_config().interval, MINIMUM_ROTATION_INTERVAL);
    }

    #[tokio::test]
    async fn test_rekey() {
        let manager = manager();
        manager.initialize(&MASTER).await.unwrap();
        let new_master = [0x77u8; 32];

        manager.rekey(&new_master).await.unwrap();
        manager.seal().await;

        assert!(manager.unseal(&MASTER).await.is_err());
        let ring = manager.unseal(&new_master).await.unwrap();
        assert_eq!(ring.master_key(), &new_master);
    }
}
