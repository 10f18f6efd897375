//! The permission model attached to a path rule.
//!
//! Permissions are plain data. They are combined by the merge engine in
//! [`crate::merge`] and read by the decision engine in [`crate::acl`].

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::{Capability, CapabilityBits};
use crate::merge::combine_values;

/// Parameter key that stands for "every parameter".
pub const WILDCARD: &str = "*";

/// Parameter name to the ordered list of values it applies to.
///
/// An empty list means "any value".
pub type ParameterMap = BTreeMap<String, Vec<Value>>;

/// What a path rule permits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    /// Capability bitmap.
    pub capabilities: CapabilityBits,

    /// Parameters that may be supplied. Empty means no restriction.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allowed_parameters: ParameterMap,

    /// Parameters that may not be supplied.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub denied_parameters: ParameterMap,

    /// Parameters that must be present in body-carrying requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_parameters: Vec<String>,

    /// Lowest response-wrapping TTL a request may ask for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_wrapping_ttl: Option<Duration>,

    /// Highest response-wrapping TTL a request may ask for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wrapping_ttl: Option<Duration>,
}

impl Permissions {
    /// Permissions granting the given capabilities with no parameter limits.
    pub fn new(caps: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: CapabilityBits::from_capabilities(caps),
            ..Self::default()
        }
    }

    /// Deny-only permissions.
    pub fn deny() -> Self {
        Self {
            capabilities: CapabilityBits::DENY,
            ..Self::default()
        }
    }

    /// Allow `name` with the given values (empty for any value).
    pub fn allow_parameter(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.allowed_parameters.insert(name.into(), values);
        self
    }

    /// Deny `name` with the given values (empty for every value).
    pub fn deny_parameter(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.denied_parameters.insert(name.into(), values);
        self
    }

    /// Require `name` to be present.
    pub fn require_parameter(mut self, name: impl Into<String>) -> Self {
        self.required_parameters.push(name.into());
        self
    }

    /// Bound the response-wrapping TTL.
    pub fn with_wrapping_ttl(mut self, min: Option<Duration>, max: Option<Duration>) -> Self {
        self.min_wrapping_ttl = min;
        self.max_wrapping_ttl = max;
        self
    }

    pub fn is_deny(&self) -> bool {
        self.capabilities.is_deny()
    }

    /// Whether the allowed map carries the wildcard key.
    pub fn allows_all_parameters(&self) -> bool {
        self.allowed_parameters.contains_key(WILDCARD)
    }

    /// Whether the denied map carries the wildcard key.
    pub fn denies_all_parameters(&self) -> bool {
        self.denied_parameters.contains_key(WILDCARD)
    }

    /// Bring the permissions into the form stored in an ACL.
    ///
    /// A deny rule drops every parameter-level detail; otherwise parameter
    /// names are lower-cased so lookups are case-insensitive.
    pub(crate) fn normalized(self) -> Self {
        if self.is_deny() {
            return Self::deny();
        }

        Self {
            allowed_parameters: lowercase_keys(self.allowed_parameters),
            denied_parameters: lowercase_keys(self.denied_parameters),
            required_parameters: self
                .required_parameters
                .into_iter()
                .map(|name| name.to_lowercase())
                .collect(),
            ..self
        }
    }
}

fn lowercase_keys(map: ParameterMap) -> ParameterMap {
    let mut out = ParameterMap::new();
    for (key, values) in map {
        // Keys differing only in case collapse into one entry.
        match out.entry(key.to_lowercase()) {
            Entry::Vacant(slot) => {
                slot.insert(values);
            }
            Entry::Occupied(mut slot) => combine_values(slot.get_mut(), values.into_iter()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalized_deny_clears_parameters() {
        let perms = Permissions::new([Capability::Deny, Capability::Read])
            .allow_parameter("a", vec![json!("1")])
            .deny_parameter("b", vec![])
            .require_parameter("c");

        let normalized = perms.normalized();
        assert_eq!(normalized, Permissions::deny());
    }

    #[test]
    fn test_normalized_lowercases_parameter_names() {
        let perms = Permissions::new([Capability::Update])
            .allow_parameter("ALLOW", vec![json!("good")])
            .deny_parameter("dEny", vec![json!("bad")])
            .require_parameter("Foo");

        let normalized = perms.normalized();
        assert_eq!(
            normalized.allowed_parameters.get("allow"),
            Some(&vec![json!("good")])
        );
        assert!(normalized.denied_parameters.contains_key("deny"));
        assert_eq!(normalized.required_parameters, vec!["foo".to_string()]);
    }

    #[test]
    fn test_case_collapse_with_any_value() {
        let perms = Permissions::new([Capability::Update])
            .deny_parameter("X", vec![])
            .deny_parameter("x", vec![json!("1")])
            .allow_parameter("Y", vec![json!("a")])
            .allow_parameter("y", vec![json!("b")]);

        let normalized = perms.normalized();
        assert_eq!(normalized.denied_parameters["x"], Vec::<Value>::new());
        assert_eq!(normalized.allowed_parameters["y"], vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_wildcard_detection() {
        let perms = Permissions::new([Capability::Update]).allow_parameter(WILDCARD, vec![]);
        assert!(perms.allows_all_parameters());
        assert!(!perms.denies_all_parameters());
    }
}
