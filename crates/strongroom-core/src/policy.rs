//! Policies and the path rules they carry.
//!
//! Policies are durable objects: they are loaded by name from the policy
//! store and handed to [`crate::Acl::new`]. Parsing policy source text is
//! not handled here; policies are built programmatically or decoded from
//! their CBOR storage form.

use serde::{Deserialize, Serialize};

use crate::error::{AclError, Result};
use crate::permissions::Permissions;

/// Name of the built-in superuser policy.
pub const ROOT_POLICY: &str = "root";

/// A path prefix together with its permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRule {
    /// Path, or path prefix for glob rules (without the trailing `*`).
    pub prefix: String,

    /// Whether this rule matches by longest prefix instead of equality.
    pub glob: bool,

    /// What the rule permits.
    pub permissions: Permissions,
}

impl PathRule {
    /// A rule matching exactly `path`.
    pub fn exact(path: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            prefix: path.into(),
            glob: false,
            permissions,
        }
    }

    /// A rule matching every path starting with `prefix`.
    pub fn glob(prefix: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            prefix: prefix.into(),
            glob: true,
            permissions,
        }
    }

    /// Build a rule from a policy path pattern.
    ///
    /// A trailing `*` makes a glob rule over the preceding prefix; anything
    /// else is an exact rule.
    pub fn from_pattern(pattern: &str, permissions: Permissions) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Self::glob(prefix, permissions),
            None => Self::exact(pattern, permissions),
        }
    }
}

/// A named, ordered list of path rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub paths: Vec<PathRule>,
}

impl Policy {
    /// Create an empty policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
        }
    }

    /// The built-in superuser policy.
    pub fn root() -> Self {
        Self::new(ROOT_POLICY)
    }

    /// Append a rule.
    pub fn with_rule(mut self, rule: PathRule) -> Self {
        self.paths.push(rule);
        self
    }

    /// Append a rule built from a path pattern.
    pub fn with_path(self, pattern: &str, permissions: Permissions) -> Self {
        self.with_rule(PathRule::from_pattern(pattern, permissions))
    }

    /// Whether this is the superuser policy.
    pub fn is_root(&self) -> bool {
        self.name == ROOT_POLICY
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| AclError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| AclError::DecodingError(e.to_string()))
    }
}
