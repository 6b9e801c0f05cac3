//! OAuth 1.0 request signing and verification (RFC 5849).

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha1::Sha1;

use crate::api::Api;
use crate::configuration::ApiSettings;
use crate::domain::AccessLevel;
use crate::error::OAuthError;
use crate::models::Principal;

type HmacSha1 = Hmac<Sha1>;

pub const OAUTH_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    HmacSha1,
    Plaintext,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::Plaintext => "PLAINTEXT",
        }
    }

    fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
        format!(
            "{}&{}",
            urlencoding::encode(consumer_secret),
            urlencoding::encode(token_secret)
        )
    }

    /// Signs `base_string`; PLAINTEXT ignores it.
    pub fn sign(
        &self,
        base_string: &str,
        consumer_secret: &str,
        token_secret: &str,
    ) -> Result<String, OAuthError> {
        let key = Self::signing_key(consumer_secret, token_secret);
        match self {
            SignatureMethod::Plaintext => Ok(key),
            SignatureMethod::HmacSha1 => {
                let mut mac = HmacSha1::new_from_slice(key.as_bytes())
                    .map_err(|_| OAuthError::InvalidSignature)?;
                mac.update(base_string.as_bytes());
                Ok(base64::encode(mac.finalize().into_bytes()))
            }
        }
    }

    fn verify(
        &self,
        base_string: &str,
        consumer_secret: &str,
        token_secret: &str,
        signature: &str,
    ) -> bool {
        let key = Self::signing_key(consumer_secret, token_secret);
        match self {
            SignatureMethod::Plaintext => signature == key,
            SignatureMethod::HmacSha1 => {
                let tag = match base64::decode(signature) {
                    Ok(tag) => tag,
                    Err(_) => return false,
                };
                match HmacSha1::new_from_slice(key.as_bytes()) {
                    Ok(mut mac) => {
                        mac.update(base_string.as_bytes());
                        mac.verify_slice(&tag).is_ok()
                    }
                    Err(_) => false,
                }
            }
        }
    }
}

impl FromStr for SignatureMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HMAC-SHA1" => Ok(SignatureMethod::HmacSha1),
            "PLAINTEXT" => Ok(SignatureMethod::Plaintext),
            other => Err(OAuthError::UnsupportedSignatureMethod(other.to_string())),
        }
    }
}

/// Scheme, host, non default port and path; no query or fragment.
pub fn normalize_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_lowercase();
            let port = parsed
                .port()
                .map(|port| format!(":{}", port))
                .unwrap_or_default();
            format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
        }
        Err(_) => url.split(&['?', '#'][..]).next().unwrap_or(url).to_string(),
    }
}

pub fn signature_base_string(
    method: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|(name, _)| name.as_str() != "oauth_signature" && name.as_str() != "realm")
        .map(|(name, value)| {
            (
                urlencoding::encode(name).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    let normalized = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        urlencoding::encode(&method.to_uppercase()),
        urlencoding::encode(&normalize_url(url)),
        urlencoding::encode(&normalized)
    )
}

/// Parameters of an `Authorization: OAuth k="v", ...` header.
pub fn parse_authorization_header(
    header: &str,
) -> Result<Vec<(String, String)>, OAuthError> {
    let params = header
        .trim()
        .strip_prefix("OAuth")
        .ok_or(OAuthError::MalformedHeader)?;
    params
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) =
                pair.split_once('=').ok_or(OAuthError::MalformedHeader)?;
            let value = value.trim().trim_matches('"');
            let value = urlencoding::decode(value)
                .map_err(|_| OAuthError::MalformedHeader)?;
            Ok((name.trim().to_string(), value.into_owned()))
        })
        .filter(|pair| !matches!(pair, Ok((name, _)) if name == "realm"))
        .collect()
}

/// Credentials of an api client; signs outgoing requests.
pub struct OAuthClient {
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    pub token_key: String,
    pub token_secret: Secret<String>,
}

impl OAuthClient {
    /// `params` plus every `oauth_` parameter, signature included.
    pub fn sign_params(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        signature_method: SignatureMethod,
        timestamp: i64,
        nonce: &str,
    ) -> Result<Vec<(String, String)>, OAuthError> {
        let mut all: BTreeMap<String, String> = params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        all.insert("oauth_consumer_key".into(), self.consumer_key.clone());
        all.insert("oauth_token".into(), self.token_key.clone());
        all.insert(
            "oauth_signature_method".into(),
            signature_method.as_str().into(),
        );
        all.insert("oauth_timestamp".into(), timestamp.to_string());
        all.insert("oauth_nonce".into(), nonce.into());
        all.insert("oauth_version".into(), OAUTH_VERSION.into());

        let base_string = signature_base_string(method, url, &all);
        let signature = signature_method.sign(
            &base_string,
            self.consumer_secret.expose_secret(),
            self.token_secret.expose_secret(),
        )?;
        all.insert("oauth_signature".into(), signature);
        Ok(all.into_iter().collect())
    }

    /// An `Authorization` header value carrying the `oauth_` parameters of
    /// a request whose other parameters travel in the query or body.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        signature_method: SignatureMethod,
        timestamp: i64,
        nonce: &str,
    ) -> Result<String, OAuthError> {
        let signed =
            self.sign_params(method, url, params, signature_method, timestamp, nonce)?;
        let fields = signed
            .iter()
            .filter(|(name, _)| name.starts_with("oauth_"))
            .map(|(name, value)| format!("{}=\"{}\"", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth realm=\"\", {}", fields))
    }
}

/// Checks signed api requests and resolves the actor behind the token.
pub struct OAuthVerifier {
    api: Api,
    settings: ApiSettings,
    nonces: DashMap<String, DateTime<Utc>>,
}

struct Grant {
    consumer_secret: Secret<String>,
    token_secret: Secret<String>,
    actor: String,
    access_level: AccessLevel,
    root: bool,
}

fn required<'a>(
    params: &'a BTreeMap<String, String>,
    name: &'static str,
) -> Result<&'a str, OAuthError> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(OAuthError::MissingParameter(name))
}

impl OAuthVerifier {
    pub fn new(api: Api, settings: ApiSettings) -> Self {
        Self {
            api,
            settings,
            nonces: DashMap::new(),
        }
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.settings.oauth_timestamp_window_seconds)
    }

    fn grant(
        &self,
        consumer_key: &str,
        token_key: &str,
    ) -> Result<Grant, OAuthError> {
        let root_consumer = consumer_key == self.settings.root_consumer_key;
        let consumer_secret = if root_consumer {
            self.settings.root_consumer_secret.clone()
        } else {
            self.api
                .oauth_get_consumer(consumer_key)
                .ok_or_else(|| OAuthError::InvalidConsumer(consumer_key.to_string()))?
                .secret
        };

        if token_key == self.settings.root_token_key {
            if !root_consumer {
                return Err(OAuthError::InvalidToken(token_key.to_string()));
            }
            return Ok(Grant {
                consumer_secret,
                token_secret: self.settings.root_token_secret.clone(),
                actor: self.api.root_nick(),
                access_level: AccessLevel::Admin,
                root: true,
            });
        }

        let token = self
            .api
            .oauth_get_access_token(token_key)
            .filter(|token| token.consumer == consumer_key)
            .ok_or_else(|| OAuthError::InvalidToken(token_key.to_string()))?;
        Ok(Grant {
            consumer_secret,
            token_secret: token.secret,
            actor: token.actor,
            access_level: token.access_level,
            root: root_consumer,
        })
    }

    fn check_method_allowed(
        &self,
        method: SignatureMethod,
        root: bool,
    ) -> Result<(), OAuthError> {
        let allowed = match method {
            SignatureMethod::Plaintext => {
                self.settings.allow_plaintext
                    && (!root || self.settings.allow_root_plaintext)
            }
            SignatureMethod::HmacSha1 => !root || self.settings.allow_root_hmac_sha1,
        };
        if allowed {
            Ok(())
        } else {
            Err(OAuthError::SignatureMethodNotAllowed(method.as_str()))
        }
    }

    fn check_nonce(
        &self,
        consumer_key: &str,
        token_key: &str,
        timestamp: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OAuthError> {
        let window = self.window();
        self.nonces.retain(|_, seen| now - *seen <= window);
        let key = format!("{}:{}:{}:{}", consumer_key, token_key, timestamp, nonce);
        if self.nonces.contains_key(&key) {
            return Err(OAuthError::NonceReused);
        }
        self.nonces.insert(key, now);
        Ok(())
    }

    /// Verifies a request whose parameters came from its query, form body
    /// and optional `Authorization` header.
    #[tracing::instrument(name = "Verify oauth request", skip(self, params, authorization))]
    pub fn verify_request(
        &self,
        method: &str,
        url: &str,
        params: &HashMap<String, String>,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, OAuthError> {
        let mut merged: BTreeMap<String, String> = params
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if let Some(header) = authorization {
            merged.extend(parse_authorization_header(header)?);
        }

        let consumer_key = required(&merged, "oauth_consumer_key")?;
        let token_key = required(&merged, "oauth_token")?;
        let signature_method: SignatureMethod =
            required(&merged, "oauth_signature_method")?.parse()?;
        let signature = required(&merged, "oauth_signature")?;
        let timestamp = required(&merged, "oauth_timestamp")?;
        let nonce = required(&merged, "oauth_nonce")?;

        let sent_at = timestamp
            .parse::<i64>()
            .map_err(|_| OAuthError::ExpiredTimestamp)?;
        if (now.timestamp() - sent_at).abs() > self.window().num_seconds() {
            return Err(OAuthError::ExpiredTimestamp);
        }

        let grant = self.grant(consumer_key, token_key)?;
        self.check_method_allowed(signature_method, grant.root)?;

        let base_string = signature_base_string(method, url, &merged);
        if !signature_method.verify(
            &base_string,
            grant.consumer_secret.expose_secret(),
            grant.token_secret.expose_secret(),
            signature,
        ) {
            tracing::info!(consumer = consumer_key, "Signature mismatch");
            return Err(OAuthError::InvalidSignature);
        }
        self.check_nonce(consumer_key, token_key, timestamp, nonce, now)?;

        let actor = self
            .api
            .actor_for_auth(&grant.actor)
            .ok_or_else(|| OAuthError::InvalidToken(token_key.to_string()))?;
        Ok(Principal::new(actor, grant.access_level))
    }
}
