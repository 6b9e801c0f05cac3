use validator::validate_email;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ActorEmail(String);

impl ActorEmail {
    pub fn parse(s: String) -> Result<ActorEmail, ValidationError> {
        let s = s.trim().to_string();
        if validate_email(&s) {
            Ok(Self(s))
        } else {
            Err(ValidationError::Email(s))
        }
    }

    pub fn domain(&self) -> &str {
        self.0.rsplit('@').next().unwrap_or_default()
    }
}

impl AsRef<str> for ActorEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
