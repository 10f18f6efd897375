//! # Strongroom Core
//!
//! Access-control primitives for Strongroom: capabilities, permissions,
//! policies, and the compiled ACL that merges them and decides requests.
//!
//! This crate contains no I/O and no storage. Policies are loaded elsewhere
//! and handed to [`Acl::new`]; the resulting ACL is immutable and can be
//! shared across threads.
//!
//! ## Key Types
//!
//! - [`Capability`] / [`CapabilityBits`] - Operation classes and their bitmap
//! - [`Permissions`] - What a single path rule grants
//! - [`Policy`] / [`PathRule`] - Named rule lists
//! - [`Acl`] - Merged exact and glob rule trees
//! - [`Request`] / [`Authorization`] - Input and output of a decision
//!
//! ## Example
//!
//! ```
//! use strongroom_core::{Acl, Capability, Operation, Permissions, Policy, Request};
//!
//! let policy = Policy::new("reader")
//!     .with_path("secret/*", Permissions::new([Capability::Read, Capability::List]));
//! let acl = Acl::new([&policy]).unwrap();
//!
//! assert_eq!(acl.capabilities("secret/app"), vec!["read", "list"]);
//! assert!(acl.allow_operation(&Request::new(Operation::Read, "secret/app")).allowed);
//! assert!(!acl.allow_operation(&Request::new(Operation::Update, "secret/app")).allowed);
//! ```

pub mod acl;
pub mod capability;
pub mod error;
pub mod merge;
pub mod permissions;
pub mod policy;
pub mod radix;
pub mod request;

pub use acl::Acl;
pub use capability::{Capability, CapabilityBits};
pub use error::{AclError, Result};
pub use merge::merge_permissions;
pub use permissions::{ParameterMap, Permissions, WILDCARD};
pub use policy::{PathRule, Policy, ROOT_POLICY};
pub use radix::RadixTree;
pub use request::{Authorization, Operation, Request};
