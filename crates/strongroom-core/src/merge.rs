//! Merging of permissions that land on the same path.
//!
//! When several rules target the same prefix in the same tree, the ACL keeps
//! a single merged [`Permissions`] value. Deny always wins; otherwise the
//! capability bitmaps are combined and the parameter lists are unioned.
//! An empty value list stands for every value and absorbs the other side;
//! two non-empty lists are concatenated, incoming values first, without
//! deduplication.

use std::time::Duration;

use serde_json::Value;

use crate::permissions::{ParameterMap, Permissions, WILDCARD};

/// Merge `incoming` into `existing`, producing a fresh value.
pub fn merge_permissions(existing: &Permissions, incoming: &Permissions) -> Permissions {
    // An existing deny is absolute; the incoming rule contributes nothing.
    if existing.is_deny() {
        return existing.clone();
    }
    if incoming.is_deny() {
        return Permissions::deny();
    }

    Permissions {
        capabilities: existing.capabilities | incoming.capabilities,
        allowed_parameters: merge_parameters(&existing.allowed_parameters, &incoming.allowed_parameters),
        denied_parameters: merge_parameters(&existing.denied_parameters, &incoming.denied_parameters),
        required_parameters: existing
            .required_parameters
            .iter()
            .chain(&incoming.required_parameters)
            .cloned()
            .collect(),
        min_wrapping_ttl: lower_bound(existing.min_wrapping_ttl, incoming.min_wrapping_ttl),
        max_wrapping_ttl: lower_bound(existing.max_wrapping_ttl, incoming.max_wrapping_ttl),
    }
}

/// Merge one parameter map (allowed or denied).
///
/// The incoming map is the base. If the existing map is empty it is used
/// as is; if the incoming map already carries the wildcard it wins; if only
/// the existing map carries the wildcard the result collapses to just the
/// wildcard. Otherwise value lists are combined per key with
/// [`combine_values`].
fn merge_parameters(existing: &ParameterMap, incoming: &ParameterMap) -> ParameterMap {
    if existing.is_empty() || incoming.contains_key(WILDCARD) {
        return incoming.clone();
    }
    if existing.contains_key(WILDCARD) {
        return ParameterMap::from([(WILDCARD.to_string(), Vec::new())]);
    }

    let mut merged = incoming.clone();
    for (key, values) in existing {
        match merged.get_mut(key) {
            Some(slot) => combine_values(slot, values.iter().cloned()),
            None => {
                merged.insert(key.clone(), values.clone());
            }
        }
    }
    merged
}

/// Fold `other` into the value list `slot` for the same parameter.
///
/// An empty list means "any value" and absorbs the other side. Two
/// non-empty lists are concatenated, `slot` first, without deduplication.
pub(crate) fn combine_values(slot: &mut Vec<Value>, other: impl ExactSizeIterator<Item = Value>) {
    if slot.is_empty() {
        return;
    }
    if other.len() == 0 {
        slot.clear();
        return;
    }
    slot.extend(other);
}

/// Keep the lower of two optional TTL bounds, ignoring unset and zero values.
fn lower_bound(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    let a = a.filter(|d| !d.is_zero());
    let b = b.filter(|d| !d.is_zero());
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, CapabilityBits};
    use serde_json::json;

    fn write() -> Permissions {
        Permissions::new([
            Capability::Create,
            Capability::Read,
            Capability::Update,
            Capability::Delete,
            Capability::List,
        ])
    }

    #[test]
    fn test_bitmaps_are_ored() {
        let merged = merge_permissions(
            &Permissions::new([Capability::Read]),
            &Permissions::new([Capability::Update, Capability::Sudo]),
        );
        assert_eq!(
            merged.capabilities,
            CapabilityBits::from_capabilities([Capability::Read, Capability::Update, Capability::Sudo])
        );
    }

    #[test]
    fn test_deny_wins_in_both_orders() {
        let read = Permissions::new([Capability::Read]).allow_parameter("a", vec![]);
        let deny = Permissions::deny();

        assert_eq!(merge_permissions(&read, &deny), Permissions::deny());
        assert_eq!(merge_permissions(&deny, &read), Permissions::deny());
    }

    #[test]
    fn test_denied_parameters_merge() {
        let a = write().deny_parameter("baz", vec![]).require_parameter("baz");
        let b = write().deny_parameter("zip", vec![]);

        let merged = merge_permissions(&a, &b);
        assert_eq!(
            merged.denied_parameters,
            ParameterMap::from([("baz".into(), vec![]), ("zip".into(), vec![])])
        );
        assert_eq!(merged.required_parameters, vec!["baz".to_string()]);
    }

    #[test]
    fn test_incoming_allow_all_keeps_incoming_map() {
        let existing = write()
            .allow_parameter("test", vec![])
            .allow_parameter("test1", vec![json!("foo")]);
        let incoming = write().allow_parameter("*", vec![]);

        let merged = merge_permissions(&existing, &incoming);
        assert_eq!(merged.allowed_parameters, ParameterMap::from([("*".into(), vec![])]));
    }

    #[test]
    fn test_existing_allow_all_collapses_to_wildcard() {
        let existing = write().allow_parameter("*", vec![]);
        let incoming = write()
            .allow_parameter("test", vec![])
            .allow_parameter("test1", vec![json!("foo")]);

        let merged = merge_permissions(&existing, &incoming);
        assert_eq!(merged.allowed_parameters, ParameterMap::from([("*".into(), vec![])]));
    }

    #[test]
    fn test_existing_deny_all_collapses_to_wildcard() {
        let existing = write().deny_parameter("*", vec![]);
        let incoming = write().deny_parameter("test", vec![]);

        let merged = merge_permissions(&existing, &incoming);
        assert_eq!(merged.denied_parameters, ParameterMap::from([("*".into(), vec![])]));
    }

    #[test]
    fn test_values_concatenate_incoming_first() {
        let existing = write()
            .allow_parameter("test", vec![json!(1), json!(2)])
            .deny_parameter("test", vec![json!(1), json!(2)]);
        let incoming = write()
            .allow_parameter("test", vec![json!(3), json!(4)])
            .deny_parameter("test", vec![json!(3), json!(4)]);

        let merged = merge_permissions(&existing, &incoming);
        let expected = vec![json!(3), json!(4), json!(1), json!(2)];
        assert_eq!(merged.allowed_parameters["test"], expected);
        assert_eq!(merged.denied_parameters["test"], expected);
    }

    #[test]
    fn test_empty_value_list_absorbs_values() {
        let any = write()
            .allow_parameter("empty", vec![])
            .deny_parameter("empty", vec![]);
        let one = write()
            .allow_parameter("empty", vec![json!(1)])
            .deny_parameter("empty", vec![json!(1)]);
        let expected = ParameterMap::from([("empty".into(), vec![])]);

        for merged in [merge_permissions(&any, &one), merge_permissions(&one, &any)] {
            assert_eq!(merged.allowed_parameters, expected);
            assert_eq!(merged.denied_parameters, expected);
        }
    }

    #[test]
    fn test_values_are_not_deduplicated() {
        let p = write().allow_parameter("a", vec![json!("x")]);

        let once = merge_permissions(&p, &p);
        let twice = merge_permissions(&once, &p);

        assert_eq!(once.allowed_parameters["a"], vec![json!("x"); 2]);
        assert_eq!(twice.allowed_parameters["a"], vec![json!("x"); 3]);
    }

    #[test]
    fn test_wrapping_ttl_keeps_lower_bounds() {
        let a = write().with_wrapping_ttl(
            Some(Duration::from_secs(100)),
            Some(Duration::from_secs(300)),
        );
        let b = write().with_wrapping_ttl(
            Some(Duration::from_secs(50)),
            Some(Duration::from_secs(200)),
        );
        let c = write();

        let merged = merge_permissions(&a, &b);
        assert_eq!(merged.min_wrapping_ttl, Some(Duration::from_secs(50)));
        assert_eq!(merged.max_wrapping_ttl, Some(Duration::from_secs(200)));

        let merged = merge_permissions(&c, &a);
        assert_eq!(merged.min_wrapping_ttl, Some(Duration::from_secs(100)));
        assert_eq!(merged.max_wrapping_ttl, Some(Duration::from_secs(300)));
    }
}
