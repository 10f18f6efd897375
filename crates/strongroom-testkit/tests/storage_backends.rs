//! Every storage backend passes the shared conformance check.

use std::sync::Arc;

use strongroom_store::{MemoryStorage, SqliteStorage, StorageView};
use strongroom_testkit::storage_conformance;

#[tokio::test]
async fn test_memory_storage_conformance() {
    storage_conformance(&MemoryStorage::new()).await;
}

#[tokio::test]
async fn test_sqlite_memory_conformance() {
    storage_conformance(&SqliteStorage::open_memory().unwrap()).await;
}

#[tokio::test]
async fn test_sqlite_file_conformance() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::open(dir.path().join("strongroom.db")).unwrap();
    storage_conformance(&storage).await;
}

#[tokio::test]
async fn test_view_conformance() {
    let view = StorageView::new(Arc::new(MemoryStorage::new()), "scoped/");
    storage_conformance(&view).await;
}

#[tokio::test]
async fn test_dyn_storage_conformance() {
    let storage: Arc<dyn strongroom_store::Storage> = Arc::new(MemoryStorage::new());
    storage_conformance(storage.as_ref()).await;
}
