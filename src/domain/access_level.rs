use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Permission tier attached to an authenticated principal.
///
/// Variants are declared from weakest to strongest so the derived `Ord`
/// gives the tier ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    NoAccess,
    Read,
    Write,
    Delete,
    Admin,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 5] = [
        AccessLevel::NoAccess,
        AccessLevel::Read,
        AccessLevel::Write,
        AccessLevel::Delete,
        AccessLevel::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::NoAccess => "no-access",
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Delete => "delete",
            AccessLevel::Admin => "admin",
        }
    }

    pub fn allows(&self, required: AccessLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessLevel::ALL
            .iter()
            .find(|level| level.as_str() == s.trim())
            .copied()
            .ok_or_else(|| ValidationError::AccessLevel(s.to_string()))
    }
}
