//! # Strongroom
//!
//! Access control and key management for an encrypted secrets store.
//!
//! ## Overview
//!
//! Strongroom answers two questions on every request:
//!
//! - **May this caller do this?** Named policies are merged into an ACL
//!   that decides an operation on a path, including parameter-level
//!   allow/deny filtering and sudo.
//! - **Which key encrypts this?** A versioned keyring holds every
//!   encryption key by term, rotates on policy, and is persisted sealed
//!   under a master key.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use strongroom::{Strongroom, StrongroomConfig};
//! use strongroom::core::{Capability, Operation, Permissions, Policy, Request};
//! use strongroom::store::SqliteStorage;
//!
//! async fn example() {
//!     let storage = SqliteStorage::open("strongroom.db").unwrap();
//!     let strongroom = Strongroom::new(storage, StrongroomConfig::default()).unwrap();
//!
//!     // Keyring lifecycle
//!     let master_key = [0u8; 32];
//!     strongroom.keyring().initialize(&master_key).await.unwrap();
//!     strongroom.keyring().rotate().await.unwrap();
//!
//!     // Policies and decisions
//!     strongroom
//!         .policies()
//!         .set_policy(
//!             Policy::new("reader")
//!                 .with_path("secret/*", Permissions::new([Capability::Read])),
//!         )
//!         .await
//!         .unwrap();
//!
//!     let decision = strongroom
//!         .authorize(&["reader"], &Request::new(Operation::Read, "secret/app"))
//!         .await
//!         .unwrap();
//!     assert!(decision.allowed);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `strongroom::core` - Permissions, policies, ACL
//! - `strongroom::keyring` - Keys, keyring, rotation policy, sealing
//! - `strongroom::store` - Storage abstraction and backends

pub mod config;
pub mod error;
pub mod keyring_manager;
pub mod policy_store;
pub mod strongroom;

// Re-export component crates
pub use strongroom_core as core;
pub use strongroom_keyring as keyring;
pub use strongroom_store as store;

// Re-export main types for convenience
pub use config::StrongroomConfig;
pub use error::{Result, StrongroomError};
pub use keyring_manager::KeyringManager;
pub use policy_store::{PolicyResolver, PolicyStore};
pub use strongroom::Strongroom;

pub use strongroom_core::{Acl, Authorization, Capability, Operation, Permissions, Policy, Request};
pub use strongroom_keyring::{Key, KeyRotationConfig, Keyring, RotationReason};
