use rand::Rng;

use super::{existing_actor, require, require_owner, Api};
use crate::domain::{AccessLevel, ActorEmail, MobileNumber, Nick};
use crate::error::ApiError;
use crate::models::{
    Activation, ActivationKind, ActorRelation, Principal, RelationKind,
};
use crate::store::Tables;

const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// A short code that is easy to type from a phone.
pub(crate) fn generate_activation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

impl Api {
    /// Returns the pending activation for (`nick`, `kind`, `content`),
    /// creating it on first use.
    pub fn activation_create(
        &self,
        caller: &Principal,
        nick: &str,
        kind: ActivationKind,
        content: &str,
    ) -> Result<Activation, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        let mut db = self.store.write();
        existing_actor(&db, &nick)?;
        Ok(upsert_activation(&mut db, &nick, kind, content))
    }

    pub fn activation_get(
        &self,
        caller: &Principal,
        nick: &str,
        kind: ActivationKind,
        content: &str,
    ) -> Result<Option<Activation>, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        Ok(self
            .store
            .read()
            .activations
            .iter()
            .find(|a| a.actor == nick.as_str() && a.kind == kind && a.content == content)
            .cloned())
    }

    pub fn activation_get_by_email(
        &self,
        caller: &Principal,
        email: &str,
    ) -> Result<Vec<Activation>, ApiError> {
        require(caller, AccessLevel::Admin)?;
        Ok(self
            .store
            .read()
            .activations
            .iter()
            .filter(|a| a.kind == ActivationKind::Email && a.content == email)
            .cloned()
            .collect())
    }

    pub fn activation_get_email(
        &self,
        caller: &Principal,
        nick: &str,
        email: &str,
    ) -> Result<Option<Activation>, ApiError> {
        self.activation_get(caller, nick, ActivationKind::Email, email)
    }

    pub fn activation_get_mobile(
        &self,
        caller: &Principal,
        nick: &str,
        mobile: &str,
    ) -> Result<Option<Activation>, ApiError> {
        self.activation_get(caller, nick, ActivationKind::Mobile, mobile)
    }

    pub fn activation_get_actor_email(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<Vec<Activation>, ApiError> {
        self.activations_for_owner(caller, nick, ActivationKind::Email)
    }

    pub fn activation_get_actor_mobile(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<Vec<Activation>, ApiError> {
        self.activations_for_owner(caller, nick, ActivationKind::Mobile)
    }

    fn activations_for_owner(
        &self,
        caller: &Principal,
        nick: &str,
        kind: ActivationKind,
    ) -> Result<Vec<Activation>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        Ok(db.activations_of(nick.as_str(), kind))
    }

    pub fn activation_get_code(
        &self,
        caller: &Principal,
        nick: &str,
        kind: ActivationKind,
        code: &str,
    ) -> Result<Option<Activation>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        Ok(db
            .activations_of(nick.as_str(), kind)
            .into_iter()
            .find(|a| a.code.eq_ignore_ascii_case(code.trim())))
    }

    pub fn activation_create_email(
        &self,
        caller: &Principal,
        nick: &str,
        email: &str,
    ) -> Result<Activation, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let email = ActorEmail::parse(email.to_string())?;
        self.ensure_unclaimed(RelationKind::Email, email.as_ref())?;
        self.activation_create(caller, nick, ActivationKind::Email, email.as_ref())
    }

    pub fn activation_create_mobile(
        &self,
        caller: &Principal,
        nick: &str,
        mobile: &str,
    ) -> Result<Activation, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let mobile = MobileNumber::parse(mobile)?;
        self.ensure_unclaimed(RelationKind::Mobile, mobile.as_ref())?;
        self.activation_create(caller, nick, ActivationKind::Mobile, mobile.as_ref())
    }

    fn ensure_unclaimed(
        &self,
        kind: RelationKind,
        target: &str,
    ) -> Result<(), ApiError> {
        match self.store.read().relation_owner(kind, target) {
            Some(_) => Err(ApiError::AlreadyInUse(target.to_string())),
            None => Ok(()),
        }
    }

    /// Replaces any pending email activation of `nick` and mails the new
    /// code to `email`.
    #[tracing::instrument(name = "Request email activation", skip(self, caller), fields(caller = %caller.nick()))]
    pub async fn activation_request_email(
        &self,
        caller: &Principal,
        nick: &str,
        email: &str,
    ) -> Result<Activation, ApiError> {
        let activation =
            self.replace_activation(caller, nick, ActivationKind::Email, email)?;
        let recipient = ActorEmail::parse(activation.content.clone())?;
        let link = format!("{}/confirm/email/{}", self.base_url, activation.code);
        let html_body = format!(
            "Welcome to {}!<br />Your confirmation code is <b>{}</b>.<br />\
             Click <a href=\"{}\">here</a> to confirm your email.",
            htmlescape::encode_minimal(&self.site_name),
            activation.code,
            link
        );
        let text_body = format!(
            "Welcome to {}!\nYour confirmation code is {}.\nVisit {} to confirm your email.",
            self.site_name, activation.code, link
        );
        self.email_client
            .send_email(&recipient, "Welcome! Confirm your email", &html_body, &text_body)
            .await
            .map_err(|e| ApiError::UnexpectedError(e.into()))?;
        Ok(activation)
    }

    /// Replaces any pending mobile activation of `nick` and texts the new
    /// code to `mobile`.
    #[tracing::instrument(name = "Request mobile activation", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn activation_request_mobile(
        &self,
        caller: &Principal,
        nick: &str,
        mobile: &str,
    ) -> Result<Activation, ApiError> {
        let activation =
            self.replace_activation(caller, nick, ActivationKind::Mobile, mobile)?;
        let message = format!(
            "Your {} activation code is {}",
            self.site_name, activation.code
        );
        self.sms_send(&self.root(), nick, &activation.content, &message)?;
        Ok(activation)
    }

    fn replace_activation(
        &self,
        caller: &Principal,
        nick: &str,
        kind: ActivationKind,
        content: &str,
    ) -> Result<Activation, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let (relation, content) = match kind {
            ActivationKind::Mobile => (
                RelationKind::Mobile,
                MobileNumber::parse(content)?.as_ref().to_string(),
            ),
            _ => (
                RelationKind::Email,
                ActorEmail::parse(content.to_string())?.as_ref().to_string(),
            ),
        };
        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        if db.relation_owner(relation, &content).is_some() {
            return Err(ApiError::AlreadyInUse(content));
        }
        db.activations
            .retain(|a| !(a.actor == nick.as_str() && a.kind == kind));
        Ok(upsert_activation(&mut db, &nick, kind, &content))
    }

    pub fn activation_activate_email(
        &self,
        caller: &Principal,
        nick: &str,
        code: &str,
    ) -> Result<ActorRelation, ApiError> {
        self.activate(caller, nick, ActivationKind::Email, code)
    }

    pub fn activation_activate_mobile(
        &self,
        caller: &Principal,
        nick: &str,
        code: &str,
    ) -> Result<ActorRelation, ApiError> {
        self.activate(caller, nick, ActivationKind::Mobile, code)
    }

    #[tracing::instrument(name = "Activate", skip(self, caller, code), fields(caller = %caller.nick()))]
    fn activate(
        &self,
        caller: &Principal,
        nick: &str,
        kind: ActivationKind,
        code: &str,
    ) -> Result<ActorRelation, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let relation_kind = match kind {
            ActivationKind::Mobile => RelationKind::Mobile,
            _ => RelationKind::Email,
        };

        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        let activation = db
            .activations_of(nick.as_str(), kind)
            .into_iter()
            .find(|a| a.code.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| ApiError::NotFound(format!("activation code {}", code)))?;

        if let Some(existing) = db.relation_owner(relation_kind, &activation.content) {
            if existing.actor == nick.as_str() {
                return Ok(existing.clone());
            }
            return Err(ApiError::AlreadyInUse(activation.content));
        }

        db.relations
            .retain(|r| !(r.actor == nick.as_str() && r.kind == relation_kind));
        let relation = ActorRelation {
            actor: nick.to_string(),
            kind: relation_kind,
            target: activation.content.clone(),
        };
        db.relations.push(relation.clone());
        db.activations.retain(|a| a != &activation);
        Ok(relation)
    }
}

pub(super) fn upsert_activation(
    db: &mut Tables,
    nick: &Nick,
    kind: ActivationKind,
    content: &str,
) -> Activation {
    if let Some(existing) = db
        .activations
        .iter()
        .find(|a| a.actor == nick.as_str() && a.kind == kind && a.content == content)
    {
        return existing.clone();
    }
    let activation = Activation {
        actor: nick.to_string(),
        kind,
        content: content.to_string(),
        code: generate_activation_code(),
    };
    db.activations.push(activation.clone());
    activation
}
