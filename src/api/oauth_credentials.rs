use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use secrecy::Secret;

use super::{existing_actor, require, Api};
use crate::domain::AccessLevel;
use crate::error::ApiError;
use crate::models::{OAuthAccessToken, OAuthConsumer, Principal};

fn generate_credential(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(length)
        .collect()
}

impl Api {
    #[tracing::instrument(name = "Create oauth consumer", skip(self, caller))]
    pub fn oauth_consumer_create(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<OAuthConsumer, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        let mut db = self.store.write();
        existing_actor(&db, &nick)?;
        let consumer = OAuthConsumer {
            key: generate_credential(16),
            secret: Secret::new(generate_credential(32)),
            actor: nick.to_string(),
        };
        db.oauth_consumers
            .insert(consumer.key.clone(), consumer.clone());
        Ok(consumer)
    }

    #[tracing::instrument(name = "Create oauth access token", skip(self, caller))]
    pub fn oauth_access_token_create(
        &self,
        caller: &Principal,
        consumer: &str,
        nick: &str,
        access_level: AccessLevel,
    ) -> Result<OAuthAccessToken, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        let mut db = self.store.write();
        existing_actor(&db, &nick)?;
        if !db.oauth_consumers.contains_key(consumer) {
            return Err(ApiError::NotFound(format!("consumer {}", consumer)));
        }
        let token = OAuthAccessToken {
            key: generate_credential(16),
            secret: Secret::new(generate_credential(32)),
            consumer: consumer.to_string(),
            actor: nick.to_string(),
            access_level,
        };
        db.oauth_tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    pub(crate) fn oauth_get_consumer(&self, key: &str) -> Option<OAuthConsumer> {
        self.store.read().oauth_consumers.get(key).cloned()
    }

    pub(crate) fn oauth_get_access_token(&self, key: &str) -> Option<OAuthAccessToken> {
        self.store.read().oauth_tokens.get(key).cloned()
    }
}
