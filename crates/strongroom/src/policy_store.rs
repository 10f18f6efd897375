//! Durable policies and the ACL cache built from them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use strongroom_core::{Acl, Policy, ROOT_POLICY};
use strongroom_store::{Storage, StorageExt, StorageView};

use crate::config::StrongroomConfig;
use crate::error::{Result, StrongroomError};

/// Resolves policy names to policies.
///
/// Unknown names resolve to `None`; that is not an error.
#[async_trait]
pub trait PolicyResolver: Send + Sync {
    async fn resolve(&self, names: &[String]) -> Result<Vec<Option<Policy>>>;
}

/// Policies persisted under a storage prefix, with a cache of compiled
/// ACLs keyed by policy-name set.
pub struct PolicyStore<S: Storage + ?Sized> {
    view: StorageView<S>,
    cache: RwLock<HashMap<Vec<String>, Arc<Acl>>>,
    capacity: usize,
    /// Bumped on every write so builds racing a write are not cached.
    generation: AtomicU64,
}

impl<S: Storage + ?Sized> PolicyStore<S> {
    /// Create a policy store over `storage`.
    pub fn new(storage: Arc<S>, config: &StrongroomConfig) -> Self {
        Self {
            view: StorageView::new(storage, config.policy_prefix.clone()),
            cache: RwLock::new(HashMap::new()),
            capacity: config.acl_cache_capacity,
            generation: AtomicU64::new(0),
        }
    }

    /// Load a policy by name. `root` always resolves to the built-in root
    /// policy.
    pub async fn get_policy(&self, name: &str) -> Result<Option<Policy>> {
        let name = normalize_name(name)?;
        if name == ROOT_POLICY {
            return Ok(Some(Policy::root()));
        }

        let Some(bytes) = self.view.get_value(&name).await? else {
            return Ok(None);
        };
        Ok(Some(Policy::from_bytes(&bytes)?))
    }

    /// Store a policy, replacing any policy with the same name.
    pub async fn set_policy(&self, mut policy: Policy) -> Result<()> {
        policy.name = normalize_name(&policy.name)?;
        if policy.name == ROOT_POLICY {
            return Err(StrongroomError::ImmutablePolicy(policy.name));
        }

        // Reject rules the ACL builder would refuse before they are stored.
        Acl::new([&policy])?;

        let bytes = policy.to_bytes()?;
        self.view.put_value(&policy.name, bytes).await?;
        self.invalidate();
        debug!(policy = %policy.name, rules = policy.paths.len(), "stored policy");
        Ok(())
    }

    /// Delete a policy. Deleting an unknown policy succeeds.
    pub async fn delete_policy(&self, name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        if name == ROOT_POLICY {
            return Err(StrongroomError::ImmutablePolicy(name));
        }

        self.view.delete(&name).await?;
        self.invalidate();
        debug!(policy = %name, "deleted policy");
        Ok(())
    }

    /// Names of all policies, including `root`, sorted.
    pub async fn list_policies(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .view
            .list("")
            .await?
            .into_iter()
            .filter(|name| !name.ends_with('/'))
            .collect();
        names.push(ROOT_POLICY.to_string());
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Build, or fetch from cache, the ACL for a set of policy names.
    ///
    /// Name order, case and duplicates do not matter. Unknown names are
    /// ignored.
    pub async fn acl<N: AsRef<str>>(&self, names: &[N]) -> Result<Arc<Acl>> {
        let mut key = names
            .iter()
            .map(|name| normalize_name(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        key.sort();
        key.dedup();

        if let Some(acl) = self.cached(&key) {
            debug!(policies = ?key, "acl cache hit");
            return Ok(acl);
        }
        debug!(policies = ?key, "acl cache miss");

        let generation = self.generation.load(Ordering::Acquire);
        let policies = self.resolve(&key).await?;
        let acl = Arc::new(Acl::new(policies.iter().map(Option::as_ref))?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::Acquire) == generation {
            if cache.len() >= self.capacity {
                cache.clear();
            }
            cache.insert(key, acl.clone());
        }
        Ok(acl)
    }

    /// Drop every cached ACL.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached ACLs.
    pub fn cached_acls(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, key: &[String]) -> Option<Arc<Acl>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl<S: Storage + ?Sized> PolicyResolver for PolicyStore<S> {
    async fn resolve(&self, names: &[String]) -> Result<Vec<Option<Policy>>> {
        let mut policies = Vec::with_capacity(names.len());
        for name in names {
            policies.push(self.get_policy(name).await?);
        }
        Ok(policies)
    }
}

/// Lower-case a policy name and check it can be used as a storage key.
fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Err(StrongroomError::InvalidPolicyName(name));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongroom_core::{Capability, Permissions};
    use strongroom_store::MemoryStorage;

    fn store() -> PolicyStore<MemoryStorage> {
        PolicyStore::new(Arc::new(MemoryStorage::new()), &StrongroomConfig::default())
    }

    fn reader(name: &str) -> Policy {
        Policy::new(name).with_path("secret/*", Permissions::new([Capability::Read]))
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = store();
        store.set_policy(reader("Ops")).await.unwrap();

        let policy = store.get_policy("OPS").await.unwrap().unwrap();
        assert_eq!(policy.name, "ops");
        assert_eq!(policy.paths.len(), 1);

        store.delete_policy("ops").await.unwrap();
        assert!(store.get_policy("ops").await.unwrap().is_none());
        store.delete_policy("ops").await.unwrap();
    }

    #[tokio::test]
    async fn test_root_is_immutable() {
        let store = store();

        let err = store.set_policy(Policy::new("ROOT")).await.unwrap_err();
        assert!(matches!(err, StrongroomError::ImmutablePolicy(_)));
        assert!(store.delete_policy("root").await.is_err());
        assert!(store.get_policy("root").await.unwrap().unwrap().is_root());
    }

    #[tokio::test]
    async fn test_invalid_names() {
        let store = store();
        for name in ["", "  ", "a/b", "..", "../keyring"] {
            assert!(matches!(
                store.get_policy(name).await,
                Err(StrongroomError::InvalidPolicyName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_list_policies() {
        let store = store();
        store.set_policy(reader("b")).await.unwrap();
        store.set_policy(reader("a")).await.unwrap();

        assert_eq!(store.list_policies().await.unwrap(), vec!["a", "b", "root"]);
    }

    #[tokio::test]
    async fn test_acl_cache_by_name_set() {
        let store = store();
        store.set_policy(reader("a")).await.unwrap();

        let first = store.acl(&["a", "missing"]).await.unwrap();
        let second = store.acl(&["MISSING", "a", "a"]).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.cached_acls(), 1);
        assert_eq!(first.capabilities("secret/x"), vec!["read"]);
    }

    #[tokio::test]
    async fn test_write_invalidates_cache() {
        let store = store();
        store.set_policy(reader("a")).await.unwrap();
        let before = store.acl(&["a"]).await.unwrap();

        store
            .set_policy(Policy::new("a").with_path("secret/*", Permissions::deny()))
            .await
            .unwrap();
        assert_eq!(store.cached_acls(), 0);

        let after = store.acl(&["a"]).await.unwrap();
        assert_eq!(before.capabilities("secret/x"), vec!["read"]);
        assert_eq!(after.capabilities("secret/x"), vec!["deny"]);
    }

    #[tokio::test]
    async fn test_cache_capacity() {
        let config = StrongroomConfig {
            acl_cache_capacity: 2,
            ..Default::default()
        };
        let store = PolicyStore::new(Arc::new(MemoryStorage::new()), &config);

        store.acl(&["a"]).await.unwrap();
        store.acl(&["b"]).await.unwrap();
        assert_eq!(store.cached_acls(), 2);
        store.acl(&["c"]).await.unwrap();
        assert_eq!(store.cached_acls(), 1);
    }

    #[tokio::test]
    async fn test_resolver_returns_none_for_unknown() {
        let store = store();
        store.set_policy(reader("a")).await.unwrap();

        let resolved = store
            .resolve(&["a".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert!(resolved[0].is_some());
        assert!(resolved[1].is_none());
    }
}
