use std::fmt;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NickKind {
    User,
    Channel,
}

/// A fully qualified actor nick, `name@domain` or `#name@domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nick(String);

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 16;

impl Nick {
    /// Trims, lowercases and qualifies `raw` with `ns_domain`.
    pub fn parse(raw: &str, ns_domain: &str) -> Result<Nick, ValidationError> {
        let cleaned = raw.trim().to_lowercase();
        let (prefix, rest) = match cleaned.strip_prefix('#') {
            Some(rest) => ("#", rest),
            None => ("", cleaned.as_str()),
        };
        let (name, domain) = match rest.split_once('@') {
            Some((name, domain)) => (name, domain),
            None => (rest, ns_domain),
        };
        if domain != ns_domain || !is_valid_name(name) {
            return Err(ValidationError::Nick(raw.to_string()));
        }
        Ok(Self(format!("{}{}@{}", prefix, name, domain)))
    }

    pub fn parse_user(
        raw: &str,
        ns_domain: &str,
    ) -> Result<Nick, ValidationError> {
        let nick = Self::parse(raw, ns_domain)?;
        match nick.kind() {
            NickKind::User => Ok(nick),
            NickKind::Channel => Err(ValidationError::Nick(raw.to_string())),
        }
    }

    pub fn parse_channel(
        raw: &str,
        ns_domain: &str,
    ) -> Result<Nick, ValidationError> {
        let raw_channel = if raw.trim().starts_with('#') {
            raw.trim().to_string()
        } else {
            format!("#{}", raw.trim())
        };
        Self::parse(&raw_channel, ns_domain)
    }

    pub fn kind(&self) -> NickKind {
        if self.0.starts_with('#') {
            NickKind::Channel
        } else {
            NickKind::User
        }
    }

    /// The nick without its domain, channels keep their `#`.
    pub fn display(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_is_letter = chars
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false);
    first_is_letter
        && (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.len())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

impl AsRef<str> for Nick {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
