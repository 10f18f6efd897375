//! Storage trait: the key/value interface policies and the keyring persist
//! through.
//!
//! Keys are `/`-separated paths. Listing is hierarchical: `list("a/")`
//! returns the immediate children of `a/`, with sub-folders reported once
//! and suffixed with `/`.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;

/// A stored key and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The Storage trait: async key/value persistence.
///
/// Implementations must be safe to share between tasks. A missing key is
/// not an error: `get` returns `None` and `delete` succeeds.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the entry at `key`.
    async fn get(&self, key: &str) -> Result<Option<Entry>>;

    /// Insert or replace an entry.
    async fn put(&self, entry: Entry) -> Result<()>;

    /// Remove the entry at `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Immediate children of `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Convenience helpers available on every [`Storage`].
pub trait StorageExt: Storage {
    /// Fetch only the value at `key`.
    fn get_value(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store `value` at `key`.
    fn put_value(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<S: Storage + ?Sized> StorageExt for S {
    async fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get(key).await?.map(|entry| entry.value))
    }

    async fn put_value(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.put(Entry::new(key, value)).await
    }
}

/// Reduce full keys under `prefix` to the prefix's immediate children.
pub(crate) fn immediate_children<'a>(
    prefix: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let children: BTreeSet<String> = keys
        .into_iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .map(|rest| match rest.find('/') {
            Some(idx) => rest[..=idx].to_string(),
            None => rest.to_string(),
        })
        .collect();
    children.into_iter().collect()
}
