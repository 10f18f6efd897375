//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde_json::json;

use strongroom_core::{Capability, Permissions, Policy};
use strongroom_keyring::{Key, Keyring};
use strongroom_store::{Entry, Storage, StorageExt};

/// 2026-01-14T12:00:00Z, the install time stamped on fixture keys.
pub const FIXTURE_EPOCH: i64 = 1_768_392_000;

/// The install time stamped on fixture keys.
pub fn fixture_time() -> DateTime<Utc> {
    DateTime::from_timestamp(FIXTURE_EPOCH, 0).unwrap_or_default()
}

/// Every capability except deny and sudo.
pub fn read_write() -> Permissions {
    Permissions::new([
        Capability::Create,
        Capability::Read,
        Capability::Update,
        Capability::Delete,
        Capability::List,
    ])
}

/// A small, realistic policy set.
///
/// - `dev`: read/write under `secret/dev/`, read-only `secret/shared/`
/// - `ops`: sudo on `sys/`, but `sys/seal` denied
/// - `ci`: may write `secret/ci/deploy` only with an allowed `env` and never
///   a `force` flag; wrapped responses between 1 and 60 minutes
/// - `auditor`: list everything, read `sys/audit`
pub fn reference_policies() -> Vec<Policy> {
    vec![
        Policy::new("dev")
            .with_path("secret/dev/*", read_write())
            .with_path("secret/shared/*", Permissions::new([Capability::Read, Capability::List])),
        Policy::new("ops")
            .with_path(
                "sys/*",
                Permissions::new([Capability::Sudo, Capability::Read, Capability::Update]),
            )
            .with_path("sys/seal", Permissions::deny()),
        Policy::new("ci").with_path(
            "secret/ci/deploy",
            Permissions::new([Capability::Create, Capability::Update])
                .allow_parameter("env", vec![json!("staging"), json!("prod-*")])
                .allow_parameter("version", vec![])
                .deny_parameter("force", vec![])
                .require_parameter("version")
                .with_wrapping_ttl(
                    Some(std::time::Duration::from_secs(60)),
                    Some(std::time::Duration::from_secs(3600)),
                ),
        ),
        Policy::new("auditor")
            .with_path("*", Permissions::new([Capability::List]))
            .with_path("sys/audit", Permissions::new([Capability::Read])),
    ]
}

/// Deterministic keyrings built from a seed.
#[derive(Debug, Clone)]
pub struct KeyringFixture {
    seed: u64,
}

impl KeyringFixture {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().next_u64())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// 32-byte master key for this seed.
    pub fn master_key(&self) -> Vec<u8> {
        self.bytes(0)
    }

    /// Key for `term`, installed at [`fixture_time`].
    pub fn key(&self, term: u32) -> Key {
        Key::new(term, self.bytes(term)).installed_at(fixture_time())
    }

    /// Keyring holding terms `1..=terms` under [`KeyringFixture::master_key`].
    pub fn keyring(&self, terms: u32) -> Keyring {
        let mut keyring = Keyring::new().set_master_key(&self.master_key());
        for term in 1..=terms {
            keyring = match keyring.add_key(self.key(term)) {
                Ok(next) => next,
                Err(e) => panic!("fixture key {term} rejected: {e}"),
            };
        }
        keyring
    }

    fn bytes(&self, term: u32) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ (u64::from(term) << 32));
        let mut bytes = vec![0u8; 32];
        rng.fill_bytes(&mut bytes);
        bytes
    }
}

impl Default for KeyringFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Exercise the behaviour every [`Storage`] backend must share.
///
/// The storage must start empty. Panics on the first violation.
pub async fn storage_conformance<S: Storage + ?Sized>(storage: &S) {
    assert_eq!(storage.get_value("missing").await.ok(), Some(None), "get of absent key");
    assert!(storage.delete("missing").await.is_ok(), "delete of absent key");

    for key in ["a", "b/c", "b/d/e", "bee"] {
        storage
            .put(Entry::new(key, key.as_bytes().to_vec()))
            .await
            .unwrap_or_else(|e| panic!("put {key}: {e}"));
    }

    let value = storage.get_value("b/c").await.ok().flatten();
    assert_eq!(value.as_deref(), Some(&b"b/c"[..]), "get after put");

    storage
        .put(Entry::new("a", b"replaced".to_vec()))
        .await
        .unwrap_or_else(|e| panic!("overwrite: {e}"));
    let value = storage.get_value("a").await.ok().flatten();
    assert_eq!(value.as_deref(), Some(&b"replaced"[..]), "overwrite");

    let mut root = storage.list("").await.unwrap_or_default();
    root.sort();
    assert_eq!(root, vec!["a", "b/", "bee"], "list of root");

    let mut nested = storage.list("b/").await.unwrap_or_default();
    nested.sort();
    assert_eq!(nested, vec!["c", "d/"], "list of prefix");

    storage
        .delete("b/c")
        .await
        .unwrap_or_else(|e| panic!("delete: {e}"));
    assert_eq!(storage.get_value("b/c").await.ok(), Some(None), "get after delete");
    assert_eq!(
        storage.list("b/").await.unwrap_or_default(),
        vec!["d/"],
        "list after delete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongroom_core::Acl;

    #[test]
    fn test_fixture_is_deterministic() {
        let a = KeyringFixture::with_seed(42);
        let b = KeyringFixture::with_seed(42);
        assert_eq!(a.master_key(), b.master_key());
        assert_eq!(a.key(3), b.key(3));
        assert_ne!(a.key(1).value, a.key(2).value);
        assert_ne!(a.master_key(), KeyringFixture::with_seed(43).master_key());
    }

    #[test]
    fn test_fixture_keyring() {
        let keyring = KeyringFixture::with_seed(1).keyring(4);
        assert_eq!(keyring.len(), 4);
        assert_eq!(keyring.active_term(), 4);
        assert_eq!(keyring.master_key().len(), 32);
        assert_eq!(keyring.active_key().unwrap().install_time, Some(fixture_time()));
    }

    #[test]
    fn test_reference_policies_build() {
        let policies = reference_policies();
        let acl = Acl::new(&policies).unwrap();
        assert!(!acl.is_root());
        assert_eq!(acl.capabilities("sys/seal"), vec!["deny"]);
    }
}
