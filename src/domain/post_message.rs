use unicode_segmentation::UnicodeSegmentation;

use crate::domain::Nick;
use crate::error::ValidationError;

pub const MAX_TITLE_LENGTH: usize = 140;

/// A posted message, split into its optional channel target and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMessage {
    pub channel: Option<Nick>,
    pub title: String,
}

impl PostMessage {
    /// `#channel rest`, `#channel@domain rest` and `#channel: rest` all
    /// address the channel. A leading token that is not a valid channel
    /// nick is kept as part of the title.
    pub fn parse(raw: &str, ns_domain: &str) -> Result<Self, ValidationError> {
        let message = raw.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let (target, rest) = message
            .split_once(char::is_whitespace)
            .unwrap_or((message, ""));
        let channel = if target.starts_with('#') {
            Nick::parse_channel(target.trim_end_matches(':'), ns_domain).ok()
        } else {
            None
        };
        let title = match channel {
            Some(_) => rest.trim(),
            None => message,
        };
        if title.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        Ok(Self {
            channel,
            title: truncate_graphemes(title, MAX_TITLE_LENGTH),
        })
    }
}

fn truncate_graphemes(s: &str, max: usize) -> String {
    s.graphemes(true).take(max).collect()
}
