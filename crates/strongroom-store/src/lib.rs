//! # Strongroom Store
//!
//! Key/value storage abstraction for Strongroom. Policies and the sealed
//! keyring persist through the [`Storage`] trait; nothing else in the
//! system touches a backend directly.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait every backend implements
//! - [`SqliteStorage`] - SQLite-based persistent storage
//! - [`MemoryStorage`] - In-memory storage for tests
//! - [`StorageView`] - Prefix-scoped view over another storage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strongroom_store::{SqliteStorage, Storage, StorageExt, StorageView};
//!
//! async fn example() {
//!     let storage = Arc::new(SqliteStorage::open("strongroom.db").unwrap());
//!     let policies = StorageView::new(storage, "sys/policy/");
//!
//!     policies.put_value("ops", b"...".to_vec()).await.unwrap();
//!     let names = policies.list("").await.unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;
pub mod view;

pub use error::{Result, StoreError};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Entry, Storage, StorageExt};
pub use view::StorageView;
