//! The Strongroom facade: one storage backend, the policies kept in it, and
//! the keyring that protects it.

use std::sync::Arc;

use strongroom_core::{Acl, Authorization, Request};
use strongroom_store::Storage;

use crate::config::StrongroomConfig;
use crate::error::Result;
use crate::keyring_manager::KeyringManager;
use crate::policy_store::PolicyStore;

/// Unified entry point.
///
/// Provides:
/// - Policy management and ACL construction via [`PolicyStore`]
/// - Authorization decisions for a token's policy names
/// - Keyring lifecycle via [`KeyringManager`]
pub struct Strongroom<S: Storage + ?Sized> {
    storage: Arc<S>,
    config: StrongroomConfig,
    policies: PolicyStore<S>,
    keyring: KeyringManager<S>,
}

impl<S: Storage> Strongroom<S> {
    /// Create an instance over `storage`. The keyring starts sealed.
    pub fn new(storage: S, config: StrongroomConfig) -> Result<Self> {
        Self::with_shared_storage(Arc::new(storage), config)
    }
}

impl<S: Storage + ?Sized> Strongroom<S> {
    /// Create an instance over storage shared with other components.
    pub fn with_shared_storage(storage: Arc<S>, config: StrongroomConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            policies: PolicyStore::new(storage.clone(), &config),
            keyring: KeyringManager::new(storage.clone(), &config),
            storage,
            config,
        })
    }

    pub fn config(&self) -> &StrongroomConfig {
        &self.config
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn policies(&self) -> &PolicyStore<S> {
        &self.policies
    }

    pub fn keyring(&self) -> &KeyringManager<S> {
        &self.keyring
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// The (cached) ACL for a set of policy names.
    pub async fn acl<N: AsRef<str>>(&self, policy_names: &[N]) -> Result<Arc<Acl>> {
        self.policies.acl(policy_names).await
    }

    /// Capability names granted on `path` by the given policies.
    pub async fn capabilities<N: AsRef<str>>(
        &self,
        policy_names: &[N],
        path: &str,
    ) -> Result<Vec<&'static str>> {
        Ok(self.acl(policy_names).await?.capabilities(path))
    }

    /// Decide `request` against the given policies.
    ///
    /// A denial is returned as `Ok` with `allowed == false`.
    pub async fn authorize<N: AsRef<str>>(
        &self,
        policy_names: &[N],
        request: &Request,
    ) -> Result<Authorization> {
        let acl = self.acl(policy_names).await?;
        let decision = acl.allow_operation(request);
        tracing::debug!(
            path = %request.path,
            operation = ?request.operation,
            allowed = decision.allowed,
            sudo = decision.sudo,
            "authorized request"
        );
        Ok(decision)
    }
}
