//! The compiled access-control list.
//!
//! An [`Acl`] is built once from a set of policies and then evaluated on
//! every request. It is immutable after construction and can be shared
//! freely between threads.
//!
//! ## Evaluation
//!
//! 1. A root policy short-circuits everything.
//! 2. An exact rule for the path wins over any glob rule.
//! 3. Otherwise the longest glob prefix of the path applies.
//! 4. No matching rule means deny.

use serde_json::Value;

use crate::capability::Capability;
use crate::error::{AclError, Result};
use crate::merge::merge_permissions;
use crate::permissions::Permissions;
use crate::policy::Policy;
use crate::radix::RadixTree;
use crate::request::{Authorization, Operation, Request};

/// Compiled decision structure built from a list of policies.
#[derive(Debug, Clone, Default)]
pub struct Acl {
    /// Rules matched by path equality.
    exact_rules: RadixTree<Permissions>,
    /// Rules matched by longest prefix.
    glob_rules: RadixTree<Permissions>,
    /// Set when the root policy was part of the input.
    root: bool,
}

impl Acl {
    /// Build an ACL from an ordered list of policies.
    ///
    /// Accepts anything that yields `&Policy` or `Option<&Policy>`; `None`
    /// entries (unknown policy names) are skipped. An empty list yields an
    /// ACL that denies everything.
    pub fn new<'a, I, P>(policies: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<&'a Policy>>,
    {
        let mut acl = Acl::default();

        for policy in policies.into_iter().filter_map(Into::into) {
            if policy.is_root() {
                acl.root = true;
                continue;
            }

            for rule in &policy.paths {
                let bits = rule.permissions.capabilities;
                if bits.unknown_bits() != 0 {
                    return Err(AclError::InvalidCapabilities {
                        path: rule.prefix.clone(),
                        bits: bits.bits(),
                    });
                }

                let tree = if rule.glob {
                    &mut acl.glob_rules
                } else {
                    &mut acl.exact_rules
                };

                let incoming = rule.permissions.clone().normalized();
                let merged = match tree.get(&rule.prefix) {
                    Some(existing) => merge_permissions(existing, &incoming),
                    None => incoming,
                };
                tree.insert(&rule.prefix, merged);
            }
        }

        Ok(acl)
    }

    /// Whether this ACL carries root privilege.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// The merged permissions stored for an exact rule.
    pub fn exact_rule(&self, path: &str) -> Option<&Permissions> {
        self.exact_rules.get(path)
    }

    /// The merged permissions stored for a glob prefix.
    pub fn glob_rule(&self, prefix: &str) -> Option<&Permissions> {
        self.glob_rules.get(prefix)
    }

    /// Resolve the permissions governing `path`.
    pub fn permissions_for(&self, path: &str) -> Option<&Permissions> {
        self.exact_rules
            .get(path)
            .or_else(|| self.glob_rules.longest_prefix(path).map(|(_, perms)| perms))
    }

    /// Capability names that apply to `path`.
    ///
    /// Returns `["root"]` for a root ACL and `["deny"]` when nothing is
    /// granted. Otherwise names appear in the order sudo, read, list,
    /// update, delete, create.
    pub fn capabilities(&self, path: &str) -> Vec<&'static str> {
        if self.root {
            return vec!["root"];
        }

        let Some(perms) = self.permissions_for(path) else {
            return vec![Capability::Deny.as_str()];
        };

        let names = perms.capabilities.names();
        if perms.is_deny() || names.is_empty() {
            return vec![Capability::Deny.as_str()];
        }
        names
    }

    /// Decide whether `request` is allowed and whether sudo is granted.
    pub fn allow_operation(&self, request: &Request) -> Authorization {
        if self.root {
            return Authorization::ROOT;
        }

        if request.operation == Operation::Help {
            return Authorization::new(true, false);
        }

        let Some(perms) = self.permissions_for(&request.path) else {
            return Authorization::DENIED;
        };
        let bits = perms.capabilities;
        let sudo = bits.contains(Capability::Sudo);

        if request.operation.required_capability().is_none() {
            return Authorization::DENIED;
        }
        if !bits.permits(request.operation) {
            return Authorization::new(false, sudo);
        }

        if !wrap_ttl_permitted(perms, request) {
            return Authorization::new(false, sudo);
        }

        if request.operation.carries_body() && !parameters_permitted(perms, request) {
            return Authorization::new(false, sudo);
        }

        Authorization::new(true, sudo)
    }
}

/// Check the requested wrapping TTL against the rule's bounds.
fn wrap_ttl_permitted(perms: &Permissions, request: &Request) -> bool {
    let min = perms.min_wrapping_ttl.filter(|d| !d.is_zero());
    let max = perms.max_wrapping_ttl.filter(|d| !d.is_zero());

    // Merging can produce an unsatisfiable window.
    if let (Some(min), Some(max)) = (min, max) {
        if max < min {
            return false;
        }
    }
    if let Some(max) = max {
        match request.wrap_ttl {
            Some(ttl) if ttl <= max => {}
            _ => return false,
        }
    }
    if let Some(min) = min {
        match request.wrap_ttl {
            Some(ttl) if ttl >= min => {}
            _ => return false,
        }
    }
    true
}

/// Apply required, denied and allowed parameter filtering.
fn parameters_permitted(perms: &Permissions, request: &Request) -> bool {
    let present = |name: &str| {
        request
            .data
            .keys()
            .any(|key| key.to_lowercase() == name)
    };
    if !perms.required_parameters.iter().all(|name| present(name)) {
        return false;
    }

    if perms.denies_all_parameters() {
        return false;
    }

    let allowed_all = perms.allows_all_parameters();
    if perms.denied_parameters.is_empty() && allowed_all {
        return true;
    }

    let restricts_allowed = !perms.allowed_parameters.is_empty() && !allowed_all;

    for (name, value) in &request.data {
        let name = name.to_lowercase();

        if let Some(denied) = perms.denied_parameters.get(&name) {
            if value_in_list(value, denied) {
                return false;
            }
        }

        if restricts_allowed {
            match perms.allowed_parameters.get(&name) {
                Some(allowed) if value_in_list(value, allowed) => {}
                _ => return false,
            }
        }
    }

    true
}

/// Whether `value` is covered by `list`. An empty list covers everything.
fn value_in_list(value: &Value, list: &[Value]) -> bool {
    list.is_empty() || list.iter().any(|candidate| value_matches(candidate, value))
}

fn value_matches(candidate: &Value, value: &Value) -> bool {
    match (candidate, value) {
        (Value::String(pattern), _) if pattern == "*" => true,
        (Value::String(pattern), Value::String(s)) => glob_match(pattern, s),
        _ => candidate == value,
    }
}

/// Match a string against a pattern where each `*` stands for any run of
/// characters, including none.
fn glob_match(pattern: &str, value: &str) -> bool {
    let Some((first, rest)) = pattern.split_once('*') else {
        return pattern == value;
    };
    let Some(remaining) = value.strip_prefix(first) else {
        return false;
    };
    let (middle, last) = rest.rsplit_once('*').unwrap_or(("", rest));
    let Some(mut remaining) = remaining.strip_suffix(last) else {
        return false;
    };

    for part in middle.split('*').filter(|part| !part.is_empty()) {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    true
}
