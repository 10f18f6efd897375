//! Proptest generators for property-based testing.

use std::time::Duration;

use proptest::prelude::*;
use serde_json::Value;

use strongroom_core::{
    Capability, CapabilityBits, Operation, ParameterMap, PathRule, Permissions, Policy,
};
use strongroom_keyring::Key;

/// Generate any capability other than deny.
pub fn grant() -> impl Strategy<Value = Capability> {
    prop_oneof![
        Just(Capability::Sudo),
        Just(Capability::Read),
        Just(Capability::List),
        Just(Capability::Update),
        Just(Capability::Delete),
        Just(Capability::Create),
    ]
}

/// Generate a non-deny capability bitmap, possibly empty.
pub fn grant_bits() -> impl Strategy<Value = CapabilityBits> {
    prop::collection::vec(grant(), 0..=6).prop_map(CapabilityBits::from_capabilities)
}

/// Generate an operation that is decided by capability bits (never help).
pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Create),
        Just(Operation::Read),
        Just(Operation::Update),
        Just(Operation::Delete),
        Just(Operation::List),
        Just(Operation::Revoke),
        Just(Operation::Renew),
        Just(Operation::Rollback),
        Just(Operation::Patch),
        Just(Operation::Recover),
    ]
}

/// Generate a parameter value.
pub fn parameter_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Value::from),
        (0i64..100).prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

/// Generate a parameter map with named keys only (no wildcard).
pub fn parameter_map() -> impl Strategy<Value = ParameterMap> {
    prop::collection::btree_map(
        "[a-d]",
        prop::collection::vec(parameter_value(), 0..4),
        0..4,
    )
}

/// Generate an optional, possibly zero, wrapping TTL.
pub fn wrapping_ttl() -> impl Strategy<Value = Option<Duration>> {
    prop::option::of((0u64..7200).prop_map(Duration::from_secs))
}

/// Generate non-deny permissions with parameter and TTL constraints.
pub fn permissions() -> impl Strategy<Value = Permissions> {
    (
        grant_bits(),
        parameter_map(),
        parameter_map(),
        prop::collection::vec("[a-d]", 0..3),
        wrapping_ttl(),
        wrapping_ttl(),
    )
        .prop_map(|(capabilities, allowed, denied, required, min, max)| Permissions {
            capabilities,
            allowed_parameters: allowed,
            denied_parameters: denied,
            required_parameters: required,
            min_wrapping_ttl: min,
            max_wrapping_ttl: max,
        })
}

/// Generate a request path of one to three segments.
pub fn path() -> impl Strategy<Value = String> {
    "[a-c]{1,3}(/[a-c]{1,3}){0,2}".prop_map(String::from)
}

/// Generate a path rule, exact or glob.
pub fn path_rule() -> impl Strategy<Value = PathRule> {
    (path(), any::<bool>(), permissions()).prop_map(|(path, glob, permissions)| {
        if glob {
            PathRule::glob(path, permissions)
        } else {
            PathRule::exact(path, permissions)
        }
    })
}

/// Generate a non-root policy.
pub fn policy() -> impl Strategy<Value = Policy> {
    ("[a-z][a-z0-9-]{0,15}", prop::collection::vec(path_rule(), 0..6))
        .prop_filter("root is built in", |(name, _)| name != "root")
        .prop_map(|(name, rules)| {
            rules
                .into_iter()
                .fold(Policy::new(name), |policy, rule| policy.with_rule(rule))
        })
}

/// Generate a key with a non-zero term and a 32-byte value.
pub fn key() -> impl Strategy<Value = Key> {
    (1u32..=u32::MAX, any::<[u8; 32]>()).prop_map(|(term, value)| Key::new(term, value.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use strongroom_core::{merge_permissions, Acl, Request};
    use strongroom_keyring::Keyring;

    proptest! {
        #[test]
        fn test_deny_is_absolute_in_merge(perms in permissions()) {
            prop_assert!(merge_permissions(&perms, &Permissions::deny()).is_deny());
            prop_assert!(merge_permissions(&Permissions::deny(), &perms).is_deny());
        }

        #[test]
        fn test_deny_rule_denies_every_operation(
            policies in prop::collection::vec(policy(), 0..4),
            target in path(),
            op in operation(),
        ) {
            let denier = Policy::new("denier").with_rule(PathRule::exact(target.clone(), Permissions::deny()));
            let mut all = policies;
            all.push(denier);

            let acl = Acl::new(&all).unwrap();
            let decision = acl.allow_operation(&Request::new(op, target.clone()));
            prop_assert!(!decision.allowed);
            prop_assert_eq!(acl.capabilities(&target), vec!["deny"]);
        }

        #[test]
        fn test_merge_keeps_every_value(existing in permissions(), incoming in permissions()) {
            prop_assume!(!existing.allowed_parameters.is_empty());
            let merged = merge_permissions(&existing, &incoming);

            for (name, values) in &merged.allowed_parameters {
                let expected = match (
                    existing.allowed_parameters.get(name),
                    incoming.allowed_parameters.get(name),
                ) {
                    (Some(a), Some(b)) if a.is_empty() || b.is_empty() => 0,
                    (a, b) => a.map_or(0, Vec::len) + b.map_or(0, Vec::len),
                };
                prop_assert_eq!(values.len(), expected);
            }
            prop_assert_eq!(
                merged.required_parameters.len(),
                existing.required_parameters.len() + incoming.required_parameters.len()
            );
        }

        #[test]
        fn test_merge_bitmap_is_union(a in grant_bits(), b in grant_bits()) {
            let merged = merge_permissions(
                &Permissions { capabilities: a, ..Default::default() },
                &Permissions { capabilities: b, ..Default::default() },
            );
            prop_assert_eq!(merged.capabilities, a | b);
        }

        #[test]
        fn test_policy_order_does_not_change_capabilities(
            policies in prop::collection::vec(policy(), 1..4),
            target in path(),
        ) {
            let forward = Acl::new(&policies).unwrap();
            let backward = Acl::new(policies.iter().rev()).unwrap();
            prop_assert_eq!(forward.capabilities(&target), backward.capabilities(&target));
        }

        #[test]
        fn test_active_term_is_highest(keys in prop::collection::vec(key(), 1..8)) {
            let mut keyring = Keyring::new();
            let mut terms = BTreeSet::new();
            for key in keys {
                let term = key.term;
                if let Ok(next) = keyring.add_key(key) {
                    keyring = next;
                    terms.insert(term);
                }
            }
            prop_assert_eq!(Some(keyring.active_term()), terms.last().copied());
            prop_assert_eq!(keyring.len(), terms.len());
        }

        #[test]
        fn test_keyring_survives_encoding(
            keys in prop::collection::vec(key(), 1..6),
            master in any::<[u8; 32]>(),
        ) {
            let mut keyring = Keyring::new().set_master_key(&master);
            for key in keys {
                if let Ok(next) = keyring.add_key(key) {
                    keyring = next;
                }
            }

            let decoded = Keyring::deserialize(&keyring.serialize().unwrap()).unwrap();
            prop_assert_eq!(decoded.master_key(), keyring.master_key());
            prop_assert_eq!(decoded.active_term(), keyring.active_term());
            prop_assert!(decoded.keys().eq(keyring.keys()));
        }
    }
}
