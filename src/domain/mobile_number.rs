use crate::error::ValidationError;

/// An international mobile number, normalised to `+` and digits.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MobileNumber(String);

impl MobileNumber {
    pub fn parse(s: &str) -> Result<MobileNumber, ValidationError> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();
        let digits = match cleaned.strip_prefix('+') {
            Some(digits) => digits,
            None => return Err(ValidationError::Mobile(s.to_string())),
        };
        if (10..=15).contains(&digits.len())
            && digits.chars().all(|c| c.is_ascii_digit())
        {
            Ok(Self(cleaned))
        } else {
            Err(ValidationError::Mobile(s.to_string()))
        }
    }
}

impl AsRef<str> for MobileNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MobileNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
