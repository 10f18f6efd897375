//! Automatic key rotation policy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoding::duration_nanos;

/// Upper bound on encryptions under a single key.
///
/// Roughly 2^32 * 0.9, comfortably below the safe limit for random 96-bit
/// nonces.
pub const ABSOLUTE_OPERATION_MAXIMUM: i64 = 3_865_470_566;

/// Lower bound a configured operation limit is raised to.
pub const ABSOLUTE_OPERATION_MINIMUM: i64 = 1_000_000;

/// Shortest non-zero rotation interval.
pub const MINIMUM_ROTATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Age after which a key with no recorded encryptions is rotated.
pub const LEGACY_KEY_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Thresholds that trigger automatic rotation of the active key.
///
/// The derived `PartialEq` compares every field; [`KeyRotationConfig::equals`]
/// is the change-detection comparison and ignores `disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRotationConfig {
    #[serde(rename = "Disabled")]
    pub disabled: bool,

    /// Encryptions allowed under one key before rotating.
    #[serde(rename = "MaxOperations")]
    pub max_operations: i64,

    /// Key age that triggers rotation. Zero disables time-based rotation.
    #[serde(rename = "Interval", with = "duration_nanos")]
    pub interval: Duration,
}

impl Default for KeyRotationConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            max_operations: ABSOLUTE_OPERATION_MAXIMUM,
            interval: Duration::ZERO,
        }
    }
}

impl KeyRotationConfig {
    /// Clamp the thresholds into their permitted ranges, in place.
    ///
    /// A zero or oversized operation limit becomes the absolute maximum, an
    /// undersized one the absolute minimum. A non-zero interval shorter than
    /// a day is raised to a day.
    pub fn sanitize(&mut self) {
        if self.max_operations == 0 || self.max_operations > ABSOLUTE_OPERATION_MAXIMUM {
            self.max_operations = ABSOLUTE_OPERATION_MAXIMUM;
        }
        if self.max_operations < ABSOLUTE_OPERATION_MINIMUM {
            self.max_operations = ABSOLUTE_OPERATION_MINIMUM;
        }
        if !self.interval.is_zero() && self.interval < MINIMUM_ROTATION_INTERVAL {
            self.interval = MINIMUM_ROTATION_INTERVAL;
        }
    }

    /// Owned variant of [`KeyRotationConfig::sanitize`].
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Compare operation limit and interval. `disabled` is not compared.
    pub fn equals(&self, other: &KeyRotationConfig) -> bool {
        self.max_operations == other.max_operations && self.interval == other.interval
    }
}

/// Why the active key is due for rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationReason {
    /// The key predates encryption tracking and is over a year old.
    Legacy,
    /// The operation limit was exceeded.
    MaxOperations,
    /// The key is older than the configured interval.
    Interval,
}

impl RotationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationReason::Legacy => "legacy rotation",
            RotationReason::MaxOperations => "reached max operations",
            RotationReason::Interval => "rotation interval reached",
        }
    }
}

impl fmt::Display for RotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
