use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::utils::parse_timestamp;

/// Call arguments of a json api request.
#[derive(Debug)]
pub struct ApiParams(HashMap<String, String>);

impl ApiParams {
    /// Merges `json_params`, a JSON object, over the plain parameters.
    pub fn parse(mut raw: HashMap<String, String>) -> Result<Self, ApiError> {
        if let Some(json_params) = raw.remove("json_params") {
            let object: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&json_params).map_err(|e| {
                    ApiError::InvalidArguments(format!("json_params: {}", e))
                })?;
            for (name, value) in object {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                raw.insert(name, value);
            }
        }
        Ok(Self(raw))
    }

    pub fn method(&self) -> Result<&str, ApiError> {
        self.optional("method").ok_or(ApiError::NoMethod)
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn required(&self, name: &str) -> Result<&str, ApiError> {
        self.optional(name).ok_or_else(|| {
            ApiError::InvalidArguments(format!("missing parameter {}", name))
        })
    }

    pub fn parsed<T>(&self, name: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(name)
            .map(|value| {
                value.trim().parse().map_err(|e| {
                    ApiError::InvalidArguments(format!("{}: {}", name, e))
                })
            })
            .transpose()
    }

    pub fn timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        self.optional(name)
            .map(|value| {
                parse_timestamp(value).ok_or_else(|| {
                    ApiError::InvalidArguments(format!(
                        "{} is not a timestamp: {}",
                        name, value
                    ))
                })
            })
            .transpose()
    }
}
