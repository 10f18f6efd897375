//! # Strongroom Testkit
//!
//! Testing utilities for Strongroom.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Keyring vectors**: Encoded keyrings in the shared persisted format,
//!   with the values a decoder must recover from them
//! - **Generators**: Proptest strategies for permissions, policies and keys
//! - **Fixtures**: Reference policies, deterministic keyrings and a storage
//!   conformance check
//!
//! ## Keyring Vectors
//!
//! ```rust
//! use strongroom_testkit::vectors::{all_vectors, verify_vector};
//!
//! for vector in all_vectors() {
//!     verify_vector(&vector).unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use strongroom_testkit::generators::permissions;
//! use strongroom_core::{merge_permissions, Permissions};
//!
//! proptest! {
//!     #[test]
//!     fn deny_wins(perms in permissions()) {
//!         let merged = merge_permissions(&perms, &Permissions::deny());
//!         prop_assert!(merged.is_deny());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use strongroom_testkit::fixtures::KeyringFixture;
//!
//! let fixture = KeyringFixture::with_seed(7);
//! let keyring = fixture.keyring(3);
//! assert_eq!(keyring.active_term(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{reference_policies, storage_conformance, KeyringFixture};
pub use vectors::{all_vectors, verify_all_vectors, verify_vector, KeyringVector};
