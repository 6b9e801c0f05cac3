use secrecy::{ExposeSecret, Secret};

use super::activation::upsert_activation;
use super::{existing_actor, require, require_owner, Api};
use crate::authentication::{compute_password_hash, generate_password, hash_generic};
use crate::domain::{AccessLevel, ActorEmail, Nick};
use crate::error::ApiError;
use crate::models::{ActivationKind, Actor, Principal, RelationKind};
use crate::telemetry::spawn_blocking_with_tracing;

/// Outcome of a completed password reset.
#[derive(Debug)]
pub struct PasswordReset {
    pub actor: Actor,
    pub new_password: Secret<String>,
}

impl Api {
    /// Mails a reset link to the confirmed email of the actor known by
    /// `login`, a nick or an email address.
    #[tracing::instrument(name = "Forgot password", skip(self, caller))]
    pub async fn login_forgot(
        &self,
        caller: &Principal,
        login: &str,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let (actor, email, code) = {
            let known_nick = Nick::parse_user(login, &self.ns_domain)
                .ok()
                .filter(|nick| self.actor_for_auth(nick.as_str()).is_some());
            let nick = match known_nick {
                Some(nick) => Some(nick),
                None => self
                    .actor_lookup_email(&self.root(), login)
                    .ok()
                    .flatten()
                    .and_then(|actor| Nick::parse_user(&actor.nick, &self.ns_domain).ok()),
            };
            let nick = nick.ok_or_else(|| ApiError::NotFound(login.to_string()))?;

            let mut db = self.store.write();
            let actor = existing_actor(&db, &nick)?.clone();
            let email = db
                .relation_of(RelationKind::Email, nick.as_str())
                .map(|r| r.target.clone())
                .ok_or_else(|| {
                    ApiError::Rejected(format!("{} has no confirmed email", nick))
                })?;
            let activation =
                upsert_activation(&mut db, &nick, ActivationKind::PasswordLost, &email);
            (actor, email, activation.code)
        };

        let recipient = ActorEmail::parse(email.clone())?;
        let link = format!(
            "{}/login/reset?email={}&hash={}",
            self.base_url,
            urlencoding::encode(&email),
            hash_generic(&code)
        );
        let text_body = format!(
            "Hi {},\nSomeone asked to reset your {} password.\n\
             Follow {} to receive a new one, or ignore this email.",
            actor.display_nick(),
            self.site_name,
            link
        );
        let html_body = format!(
            "Hi {},<br />Someone asked to reset your {} password.<br />\
             Click <a href=\"{}\">here</a> to receive a new one, or ignore this email.",
            htmlescape::encode_minimal(actor.display_nick()),
            htmlescape::encode_minimal(&self.site_name),
            link
        );
        self.email_client
            .send_email(&recipient, "Password reset", &html_body, &text_body)
            .await
            .map_err(|e| ApiError::UnexpectedError(e.into()))?;
        Ok(())
    }

    /// Consumes the reset activation matching `hash`, sets a random
    /// password and mails it.
    #[tracing::instrument(name = "Reset password", skip(self, caller, hash))]
    pub async fn login_reset(
        &self,
        caller: &Principal,
        email: &str,
        hash: &str,
    ) -> Result<PasswordReset, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let recipient = ActorEmail::parse(email.to_string())?;
        let nick = {
            let db = self.store.read();
            let relation = db
                .relation_owner(RelationKind::Email, recipient.as_ref())
                .ok_or_else(|| ApiError::NotFound(email.to_string()))?;
            let matches = db
                .activations_of(&relation.actor, ActivationKind::PasswordLost)
                .iter()
                .any(|a| a.content == recipient.as_ref() && hash_generic(&a.code) == hash);
            if !matches {
                return Err(ApiError::NotFound("password reset request".into()));
            }
            Nick::parse_user(&relation.actor, &self.ns_domain)?
        };

        let new_password = Secret::new(generate_password());
        let password = new_password.clone();
        let password_hash =
            spawn_blocking_with_tracing(move || compute_password_hash(password))
                .await
                .map_err(|e| ApiError::UnexpectedError(e.into()))??;
        self.replace_password_hash(nick.as_str(), password_hash)
            .ok_or_else(|| ApiError::NotFound(nick.to_string()))?;
        let actor = {
            let mut db = self.store.write();
            db.activations.retain(|a| {
                !(a.actor == nick.as_str() && a.kind == ActivationKind::PasswordLost)
            });
            existing_actor(&db, &nick)?.clone()
        };

        let text_body = format!(
            "Hi {},\nYour new {} password is {}",
            actor.display_nick(),
            self.site_name,
            new_password.expose_secret()
        );
        let html_body = format!(
            "Hi {},<br />Your new {} password is <b>{}</b>",
            htmlescape::encode_minimal(actor.display_nick()),
            htmlescape::encode_minimal(&self.site_name),
            new_password.expose_secret()
        );
        self.email_client
            .send_email(&recipient, "Your new password", &html_body, &text_body)
            .await
            .map_err(|e| ApiError::UnexpectedError(e.into()))?;
        Ok(PasswordReset {
            actor,
            new_password,
        })
    }

    #[tracing::instrument(name = "Invite by email", skip(self, caller), fields(caller = %caller.nick()))]
    pub async fn invite_request_email(
        &self,
        caller: &Principal,
        nick: &str,
        email: &str,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let recipient = ActorEmail::parse(email.to_string())?;
        let actor = {
            let db = self.store.read();
            require_owner(&db, caller, nick.as_str())?;
            existing_actor(&db, &nick)?.clone()
        };

        let subject = format!("{} invited you to {}", actor.full_name(), self.site_name);
        let join_link = format!("{}/join", self.base_url);
        let text_body = format!(
            "{} ({}) has invited you to join {}.\nSign up at {}",
            actor.full_name(),
            actor.display_nick(),
            self.site_name,
            join_link
        );
        let html_body = format!(
            "{} ({}) has invited you to join {}.<br />\
             <a href=\"{}\">Sign up</a>",
            htmlescape::encode_minimal(&actor.full_name()),
            htmlescape::encode_minimal(actor.display_nick()),
            htmlescape::encode_minimal(&self.site_name),
            join_link
        );
        self.email_client
            .send_email(&recipient, &subject, &html_body, &text_body)
            .await
            .map_err(|e| ApiError::UnexpectedError(e.into()))?;
        Ok(())
    }

    /// The confirmed email of `nick`, if any.
    pub fn email_get_actor(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<Option<String>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        Ok(db
            .relation_of(RelationKind::Email, nick.as_str())
            .map(|r| r.target.clone()))
    }
}
