use std::collections::HashMap;
use std::sync::Arc;

use actix_web::http::header;
use actix_web::HttpRequest;

use super::{Authenticator, OAuthVerifier};
use crate::error::ApiError;
use crate::models::Principal;

/// Everything about a request that can identify its caller.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    pub cookies: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub authorization: Option<String>,
    pub method: String,
    pub url: String,
}

impl RequestCredentials {
    pub fn from_request(
        request: &HttpRequest,
        params: HashMap<String, String>,
    ) -> Self {
        let cookies = request
            .cookies()
            .map(|cookies| {
                cookies
                    .iter()
                    .map(|c| (c.name().to_string(), c.value().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let authorization = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let url = {
            let info = request.connection_info();
            format!("{}://{}{}", info.scheme(), info.host(), request.path())
        };
        Self {
            cookies,
            params,
            authorization,
            method: request.method().as_str().to_string(),
            url,
        }
    }
}

pub enum Outcome {
    /// The request carries none of this strategy's credentials.
    NotApplicable,
    /// The strategy claims the request; `None` is an anonymous caller.
    Decided(Option<Principal>),
}

pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn authenticate(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Outcome, ApiError>;
}

pub struct CookieSession {
    authenticator: Authenticator,
}

impl AuthStrategy for CookieSession {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn authenticate(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Outcome, ApiError> {
        let settings = self.authenticator.settings();
        let nick = match credentials.cookies.get(&settings.user_cookie) {
            Some(nick) => nick,
            None => return Ok(Outcome::NotApplicable),
        };
        let token = credentials
            .cookies
            .get(&settings.password_cookie)
            .map(String::as_str)
            .unwrap_or_default();
        Ok(Outcome::Decided(
            self.authenticator.authenticate_user_cookie(nick, token),
        ))
    }
}

pub struct LegacyPersonalKey {
    authenticator: Authenticator,
}

impl AuthStrategy for LegacyPersonalKey {
    fn name(&self) -> &'static str {
        "personal_key"
    }

    fn authenticate(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Outcome, ApiError> {
        match (
            credentials.params.get("user"),
            credentials.params.get("personal_key"),
        ) {
            (Some(nick), Some(key)) => Ok(Outcome::Decided(
                self.authenticator.authenticate_user_personal_key(nick, key),
            )),
            _ => Ok(Outcome::NotApplicable),
        }
    }
}

pub struct OAuthRequest {
    verifier: Arc<OAuthVerifier>,
    authenticator: Authenticator,
}

impl AuthStrategy for OAuthRequest {
    fn name(&self) -> &'static str {
        "oauth"
    }

    fn authenticate(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Outcome, ApiError> {
        let signed_params = credentials.params.contains_key("oauth_token")
            && credentials.params.contains_key("oauth_consumer_key");
        if !signed_params && credentials.authorization.is_none() {
            return Ok(Outcome::NotApplicable);
        }
        let principal = self.verifier.verify_request(
            &credentials.method,
            &credentials.url,
            &credentials.params,
            credentials.authorization.as_deref(),
            self.authenticator.api().now(),
        )?;
        Ok(Outcome::Decided(Some(principal)))
    }
}

/// Asks each strategy in turn; the first one that applies decides.
pub struct AuthResolver {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl AuthResolver {
    /// Cookie session, then legacy personal key when enabled, then OAuth.
    pub fn new(authenticator: Authenticator, verifier: Arc<OAuthVerifier>) -> Self {
        let mut strategies: Vec<Box<dyn AuthStrategy>> = vec![Box::new(CookieSession {
            authenticator: authenticator.clone(),
        })];
        if authenticator.settings().allow_legacy_auth {
            strategies.push(Box::new(LegacyPersonalKey {
                authenticator: authenticator.clone(),
            }));
        }
        strategies.push(Box::new(OAuthRequest {
            verifier,
            authenticator,
        }));
        Self { strategies }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn AuthStrategy>>) -> Self {
        Self { strategies }
    }

    /// `Ok(None)` is an anonymous caller. OAuth verification failures are
    /// errors rather than anonymity.
    #[tracing::instrument(
        name = "Resolve caller",
        skip_all,
        fields(strategy = tracing::field::Empty, nick = tracing::field::Empty)
    )]
    pub fn get_user_from_request(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Option<Principal>, ApiError> {
        for strategy in &self.strategies {
            if let Outcome::Decided(principal) = strategy.authenticate(credentials)? {
                let span = tracing::Span::current();
                span.record("strategy", &strategy.name());
                if let Some(principal) = &principal {
                    span.record("nick", &tracing::field::display(principal.nick()));
                }
                return Ok(principal);
            }
        }
        Ok(None)
    }
}
