//! Prefix-scoped view over another storage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::{Entry, Storage};

/// A [`Storage`] that transparently prefixes every key.
///
/// Keys containing `..` are rejected so a view can never address entries
/// outside its prefix.
pub struct StorageView<S: ?Sized> {
    inner: Arc<S>,
    prefix: String,
}

impl<S: ?Sized> Clone for StorageView<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

impl<S: Storage + ?Sized> StorageView<S> {
    /// Create a view of `inner` rooted at `prefix`.
    pub fn new(inner: Arc<S>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn expand(&self, key: &str) -> Result<String> {
        if key.contains("..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(format!("{}{}", self.prefix, key))
    }

    fn truncate(&self, key: String) -> Result<String> {
        key.strip_prefix(&self.prefix)
            .map(str::to_string)
            .ok_or(StoreError::InvalidKey(key))
    }
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for StorageView<S> {
    async fn get(&self, key: &str) -> Result<Option<Entry>> {
        let Some(entry) = self.inner.get(&self.expand(key)?).await? else {
            return Ok(None);
        };
        Ok(Some(Entry {
            key: self.truncate(entry.key)?,
            value: entry.value,
        }))
    }

    async fn put(&self, entry: Entry) -> Result<()> {
        let key = self.expand(&entry.key)?;
        self.inner.put(Entry { key, ..entry }).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(&self.expand(key)?).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(&self.expand(prefix)?).await
    }
}
