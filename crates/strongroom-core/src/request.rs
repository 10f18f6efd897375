//! The request view the decision engine evaluates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::Capability;

/// Kind of operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
    /// Help text lookup; always allowed.
    Help,
    Revoke,
    Renew,
    Rollback,
    /// Partial update. Has no capability bit and is never allowed.
    Patch,
    /// Recovery from a snapshot. Has no capability bit and is never allowed.
    Recover,
}

impl Operation {
    /// The capability bit an operation requires, if it has one.
    ///
    /// Lease and rollback lifecycle operations reuse the update bit.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            Operation::Read => Some(Capability::Read),
            Operation::List => Some(Capability::List),
            Operation::Update | Operation::Revoke | Operation::Renew | Operation::Rollback => {
                Some(Capability::Update)
            }
            Operation::Delete => Some(Capability::Delete),
            Operation::Create => Some(Capability::Create),
            Operation::Help | Operation::Patch | Operation::Recover => None,
        }
    }

    /// Whether the operation may carry a request body subject to
    /// parameter filtering.
    pub fn carries_body(self) -> bool {
        matches!(
            self,
            Operation::Update | Operation::Delete | Operation::Create
        )
    }
}

/// An incoming request as seen by the ACL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: Operation,
    pub path: String,
    /// Request body parameters.
    pub data: Map<String, Value>,
    /// Response-wrapping TTL requested by the caller, if any.
    pub wrap_ttl: Option<Duration>,
}

impl Request {
    /// Create a request with an empty body.
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            data: Map::new(),
            wrap_ttl: None,
        }
    }

    /// Add a body parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    /// Request response wrapping with the given TTL.
    pub fn with_wrap_ttl(mut self, ttl: Duration) -> Self {
        self.wrap_ttl = Some(ttl);
        self
    }
}

/// Outcome of evaluating a request against an ACL.
///
/// A denial is an ordinary result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Authorization {
    /// Whether the operation is permitted.
    pub allowed: bool,
    /// Whether the matched rule grants sudo.
    pub sudo: bool,
}

impl Authorization {
    pub const DENIED: Self = Self {
        allowed: false,
        sudo: false,
    };

    pub const ROOT: Self = Self {
        allowed: true,
        sudo: true,
    };

    pub const fn new(allowed: bool, sudo: bool) -> Self {
        Self { allowed, sudo }
    }
}
