use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

use super::legacy::authenticate_user_personal_key;
use super::password::{
    hash_password_intermediate, is_argon2_hash, verify_password_hash,
};
use super::SessionStore;
use crate::api::Api;
use crate::configuration::AuthSettings;
use crate::domain::{AccessLevel, Nick};
use crate::error::ApiError;
use crate::models::Principal;

const DEBUG_PASSWORD: &str = "password";

/// Constant-time comparison of the hash a session was issued against
/// with the actor's current one.
fn session_hash_matches(
    hmac_secret: &Secret<String>,
    issued: &Secret<String>,
    current: &Secret<String>,
) -> bool {
    let mac = |hash: &Secret<String>| {
        Hmac::<Sha256>::new_from_slice(hmac_secret.expose_secret().as_bytes())
            .map(|mut mac| {
                mac.update(hash.expose_secret().as_bytes());
                mac
            })
    };
    match (mac(current), mac(issued)) {
        (Ok(current), Ok(issued)) => {
            issued.verify_slice(&current.finalize().into_bytes()).is_ok()
        }
        _ => false,
    }
}

/// Resolves users from cookies, passwords and personal keys.
#[derive(Clone)]
pub struct Authenticator {
    api: Api,
    sessions: Arc<SessionStore>,
    settings: AuthSettings,
    hmac_secret: Secret<String>,
}

impl Authenticator {
    pub fn new(
        api: Api,
        sessions: Arc<SessionStore>,
        settings: AuthSettings,
        hmac_secret: Secret<String>,
    ) -> Self {
        Self {
            api,
            sessions,
            settings,
            hmac_secret,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// The actor named by the user cookie, if the password cookie holds a
    /// live session issued against its current password hash.
    pub fn authenticate_user_cookie(
        &self,
        nick: &str,
        token: &str,
    ) -> Option<Principal> {
        let nick = Nick::parse_user(nick, self.api.ns_domain()).ok()?;
        let actor = self.api.actor_for_auth(nick.as_str())?;
        let stored = self.sessions.lookup_user_auth_token(token, self.api.now())?;
        if !session_hash_matches(&self.hmac_secret, &stored, &actor.password_hash) {
            tracing::info!(nick = %nick, "Session predates a password change");
            return None;
        }
        Some(Principal::new(actor, AccessLevel::Delete))
    }

    pub fn authenticate_user_personal_key(
        &self,
        nick: &str,
        personal_key: &str,
    ) -> Option<Principal> {
        authenticate_user_personal_key(
            &self.api,
            &self.hmac_secret,
            nick,
            personal_key,
        )
    }

    /// Checks `password` against the stored hash of `nick`.
    ///
    /// Hashes in the intermediate format are upgraded to argon2 on the
    /// first successful login. A malformed nick is an error.
    #[tracing::instrument(name = "Authenticate login", skip(self, password))]
    pub fn authenticate_user_login(
        &self,
        nick: &str,
        password: &Secret<String>,
    ) -> Result<Option<Principal>, ApiError> {
        let nick = Nick::parse_user(nick, self.api.ns_domain())?;
        let actor = match self.api.actor_for_auth(nick.as_str()) {
            Some(actor) => actor,
            None => return Ok(None),
        };

        if self.settings.debug_password_login
            && password.expose_secret() == DEBUG_PASSWORD
        {
            tracing::warn!(nick = %nick, "Accepting debug password");
            return Ok(Some(Principal::new(actor, AccessLevel::Delete)));
        }

        if is_argon2_hash(&actor.password_hash) {
            if verify_password_hash(&actor.password_hash, password) {
                return Ok(Some(Principal::new(actor, AccessLevel::Delete)));
            }
            return Ok(None);
        }

        let stored = actor.password_hash.expose_secret();
        if stored.is_empty()
            || *stored != hash_password_intermediate(nick.as_str(), password)
        {
            return Ok(None);
        }
        tracing::info!(nick = %nick, "Upgrading intermediate password hash");
        let actor = self.api.actor_update_intermediate_password(
            &self.api.root(),
            nick.as_str(),
            password.clone(),
        )?;
        Ok(Some(Principal::new(actor, AccessLevel::Delete)))
    }

    /// `login` is tried as a nick first, then as a confirmed email.
    pub fn lookup_user_by_login(
        &self,
        login: &str,
        password: &Secret<String>,
    ) -> Option<Principal> {
        match self.authenticate_user_login(login, password) {
            Ok(Some(principal)) => return Some(principal),
            Ok(None) | Err(ApiError::Validation(_)) => {}
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Login lookup failed");
                return None;
            }
        }
        let actor = self
            .api
            .actor_lookup_email(&self.api.root(), login)
            .ok()
            .flatten()?;
        match self.authenticate_user_login(&actor.nick, password) {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Login lookup failed");
                None
            }
        }
    }
}
