//! Encoded keyring vectors.
//!
//! Each vector is a keyring in the shared persisted JSON format together
//! with what a decoder must recover from it. They pin the field names,
//! base64 byte strings, RFC 3339 install times with the year-one "unset"
//! sentinel, nanosecond intervals, and rotation-policy sanitizing.

use std::time::Duration;

use chrono::{DateTime, Utc};

use strongroom_keyring::{Keyring, ABSOLUTE_OPERATION_MAXIMUM, ABSOLUTE_OPERATION_MINIMUM};

/// An encoded keyring and its expected decoding.
#[derive(Debug, Clone)]
pub struct KeyringVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Encoded keyring.
    pub json: &'static str,
    /// Expected master key (hex).
    pub master_key_hex: &'static str,
    /// Expected terms, ascending.
    pub terms: &'static [u32],
    /// Expected active term.
    pub active_term: u32,
    /// Expected encryption count of the active key.
    pub active_encryptions: u64,
    /// Expected install time of the active key (RFC 3339), if set.
    pub active_install_time: Option<&'static str>,
    /// Expected rotation policy after sanitizing.
    pub disabled: bool,
    pub max_operations: i64,
    pub interval: Duration,
}

/// Get all keyring vectors.
pub fn all_vectors() -> Vec<KeyringVector> {
    vec![
        KeyringVector {
            name: "single key without rotation policy",
            json: r#"{
                "MasterKey": "qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqo=",
                "Keys": [
                    {
                        "Term": 1,
                        "Version": 1,
                        "Value": "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=",
                        "InstallTime": "2017-06-06T13:45:51.409286-04:00"
                    }
                ]
            }"#,
            master_key_hex: "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            terms: &[1],
            active_term: 1,
            active_encryptions: 0,
            active_install_time: Some("2017-06-06T17:45:51.409286Z"),
            disabled: false,
            max_operations: ABSOLUTE_OPERATION_MAXIMUM,
            interval: Duration::ZERO,
        },
        KeyringVector {
            name: "two keys out of order with sub-minimum policy",
            json: r#"{
                "MasterKey": "qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqo=",
                "Keys": [
                    {
                        "Term": 2,
                        "Version": 1,
                        "Value": "AgICAgICAgICAgICAgICAgICAgICAgICAgICAgICAgI=",
                        "InstallTime": "2024-03-01T10:00:00Z",
                        "encryptions": 1500
                    },
                    {
                        "Term": 1,
                        "Version": 1,
                        "Value": "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=",
                        "InstallTime": "2023-03-01T10:00:00.5Z"
                    }
                ],
                "RotationConfig": {
                    "Disabled": false,
                    "MaxOperations": 0,
                    "Interval": 3600000000000
                }
            }"#,
            master_key_hex: "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            terms: &[1, 2],
            active_term: 2,
            active_encryptions: 1500,
            active_install_time: Some("2024-03-01T10:00:00Z"),
            disabled: false,
            max_operations: ABSOLUTE_OPERATION_MAXIMUM,
            interval: Duration::from_secs(24 * 60 * 60),
        },
        KeyringVector {
            name: "unset install time and null master key",
            json: r#"{
                "MasterKey": null,
                "Keys": [
                    {
                        "Term": 5,
                        "Version": 1,
                        "Value": "AwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwM=",
                        "InstallTime": "0001-01-01T00:00:00Z"
                    }
                ],
                "RotationConfig": {
                    "Disabled": true,
                    "MaxOperations": 500,
                    "Interval": -5
                }
            }"#,
            master_key_hex: "",
            terms: &[5],
            active_term: 5,
            active_encryptions: 0,
            active_install_time: None,
            disabled: true,
            max_operations: ABSOLUTE_OPERATION_MINIMUM,
            interval: Duration::ZERO,
        },
    ]
}

/// Decode a vector and check every expected field, then check the keyring
/// survives a re-encode.
pub fn verify_vector(vector: &KeyringVector) -> Result<(), String> {
    let fail = |what: &str, detail: String| Err(format!("{}: {what}: {detail}", vector.name));

    let keyring = match Keyring::deserialize(vector.json.as_bytes()) {
        Ok(keyring) => keyring,
        Err(e) => return fail("decode", e.to_string()),
    };

    if hex::encode(keyring.master_key()) != vector.master_key_hex {
        return fail("master key", hex::encode(keyring.master_key()));
    }

    let terms: Vec<u32> = keyring.keys().map(|key| key.term).collect();
    if terms != vector.terms {
        return fail("terms", format!("{terms:?}"));
    }
    if keyring.active_term() != vector.active_term {
        return fail("active term", keyring.active_term().to_string());
    }

    let Some(active) = keyring.active_key() else {
        return fail("active key", "missing".to_string());
    };
    if active.encryptions != vector.active_encryptions {
        return fail("encryptions", active.encryptions.to_string());
    }

    let expected_time = match vector.active_install_time {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(time) => Some(time.with_timezone(&Utc)),
            Err(e) => return fail("expected install time", e.to_string()),
        },
        None => None,
    };
    if active.install_time != expected_time {
        return fail("install time", format!("{:?}", active.install_time));
    }

    let config = keyring.rotation_config();
    if config.disabled != vector.disabled
        || config.max_operations != vector.max_operations
        || config.interval != vector.interval
    {
        return fail("rotation config", format!("{config:?}"));
    }

    let reencoded = match keyring.serialize() {
        Ok(bytes) => bytes,
        Err(e) => return fail("re-encode", e.to_string()),
    };
    let again = match Keyring::deserialize(&reencoded) {
        Ok(keyring) => keyring,
        Err(e) => return fail("re-decode", e.to_string()),
    };
    if again.master_key() != keyring.master_key()
        || !again.keys().eq(keyring.keys())
        || again.rotation_config() != keyring.rotation_config()
    {
        return fail("re-decode", "keyring changed".to_string());
    }

    Ok(())
}

/// Verify every vector, collecting failures.
pub fn verify_all_vectors() -> Vec<String> {
    all_vectors()
        .iter()
        .filter_map(|vector| verify_vector(vector).err())
        .collect()
}
