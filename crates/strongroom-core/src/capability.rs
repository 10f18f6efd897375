//! Capability bits attached to path rules.
//!
//! A rule's capabilities are stored as a `u32` bitmap. The bit values match
//! the historical on-disk encoding so that compiled bitmaps can be compared
//! across implementations.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AclError;
use crate::request::Operation;

/// A single named capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Denies every operation and overrides all other capabilities.
    Deny,
    /// Elevated privilege required by protected endpoints.
    Sudo,
    Read,
    List,
    Update,
    Delete,
    Create,
}

impl Capability {
    /// Capabilities in the fixed order used when rendering a bitmap.
    pub const ORDERED: [Capability; 6] = [
        Capability::Sudo,
        Capability::Read,
        Capability::List,
        Capability::Update,
        Capability::Delete,
        Capability::Create,
    ];

    /// The bit this capability occupies.
    pub const fn bit(self) -> u32 {
        match self {
            Capability::Deny => 1 << 0,
            Capability::Create => 1 << 1,
            Capability::Read => 1 << 2,
            Capability::Update => 1 << 3,
            Capability::Delete => 1 << 4,
            Capability::List => 1 << 5,
            Capability::Sudo => 1 << 6,
        }
    }

    /// The lowercase name of this capability.
    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::Deny => "deny",
            Capability::Sudo => "sudo",
            Capability::Read => "read",
            Capability::List => "list",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Create => "create",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deny" => Ok(Capability::Deny),
            "sudo" => Ok(Capability::Sudo),
            "read" => Ok(Capability::Read),
            "list" => Ok(Capability::List),
            "update" => Ok(Capability::Update),
            "delete" => Ok(Capability::Delete),
            "create" => Ok(Capability::Create),
            other => Err(AclError::UnknownCapability(other.to_string())),
        }
    }
}

/// A bitmap of capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityBits(pub u32);

impl CapabilityBits {
    /// No capabilities at all.
    pub const EMPTY: Self = Self(0);

    /// Exactly the deny bit.
    pub const DENY: Self = Self(Capability::Deny.bit());

    /// Every bit that has a defined meaning.
    pub const MASK: u32 = Capability::Deny.bit()
        | Capability::Sudo.bit()
        | Capability::Read.bit()
        | Capability::List.bit()
        | Capability::Update.bit()
        | Capability::Delete.bit()
        | Capability::Create.bit();

    /// Build a bitmap from a list of capabilities.
    pub fn from_capabilities(caps: impl IntoIterator<Item = Capability>) -> Self {
        caps.into_iter().fold(Self::EMPTY, |acc, cap| acc | cap)
    }

    /// Raw bitmap value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether `cap` is set.
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Check whether the deny bit is set.
    pub const fn is_deny(self) -> bool {
        self.contains(Capability::Deny)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bits set outside [`Self::MASK`], if any.
    pub const fn unknown_bits(self) -> u32 {
        self.0 & !Self::MASK
    }

    /// Names of the set capabilities in the fixed output order.
    ///
    /// The deny bit is not rendered here; callers decide how deny collapses
    /// the result.
    pub fn names(self) -> Vec<&'static str> {
        Capability::ORDERED
            .iter()
            .filter(|cap| self.contains(**cap))
            .map(|cap| cap.as_str())
            .collect()
    }

    /// Whether these bits would grant `op`, ignoring parameters.
    pub fn permits(self, op: Operation) -> bool {
        match op.required_capability() {
            Some(cap) => !self.is_deny() && self.contains(cap),
            None => false,
        }
    }
}

impl BitOr for CapabilityBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<Capability> for CapabilityBits {
    type Output = Self;

    fn bitor(self, rhs: Capability) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl BitOrAssign for CapabilityBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<Capability> for CapabilityBits {
    fn from(cap: Capability) -> Self {
        Self(cap.bit())
    }
}
