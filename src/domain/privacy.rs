use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// Only contacts see streams and presence.
    Contacts,
    Public,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Contacts => "contacts",
            Privacy::Public => "public",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = ValidationError;

    // The numeric forms are what older api clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contacts" | "2" => Ok(Privacy::Contacts),
            "public" | "3" => Ok(Privacy::Public),
            other => Err(ValidationError::Privacy(other.to_string())),
        }
    }
}
