use chrono::{DateTime, Utc};
use secrecy::Secret;

use super::{existing_actor, insert_actor, new_actor, require, require_owner, Api};
use crate::authentication::compute_password_hash;
use crate::domain::{AccessLevel, ActorEmail, MobileNumber, NickKind, Privacy};
use crate::error::ApiError;
use crate::models::{Actor, Principal, RelationKind, SubscriptionState};
use crate::store::Tables;

/// Profile fields supplied at sign up.
#[derive(Debug, Clone)]
pub struct ActorProfile {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub privacy: Privacy,
}

impl Default for ActorProfile {
    fn default() -> Self {
        Self {
            given_name: None,
            family_name: None,
            privacy: Privacy::Public,
        }
    }
}

impl Api {
    #[tracing::instrument(name = "Create user", skip(self, caller, password, profile))]
    pub fn user_create(
        &self,
        caller: &Principal,
        nick: &str,
        password: Secret<String>,
        profile: ActorProfile,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        let password_hash = compute_password_hash(password)?;

        let mut db = self.store.write();
        if db.actors.contains_key(nick.as_str()) {
            return Err(ApiError::AlreadyExists(nick.to_string()));
        }
        let mut actor = new_actor(
            nick.to_string(),
            NickKind::User,
            profile.privacy,
            self.now(),
        );
        actor.password_hash = password_hash;
        actor.given_name = profile.given_name;
        actor.family_name = profile.family_name;
        insert_actor(&mut db, actor.clone());
        Ok(actor)
    }

    pub fn actor_get(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let nick = self.clean_nick(nick)?;
        let db = self.store.read();
        existing_actor(&db, &nick).cloned()
    }

    pub fn actor_get_safe(&self, caller: &Principal, nick: &str) -> Option<Actor> {
        self.actor_get(caller, nick).ok()
    }

    /// Every actor of `nicks` that exists, in the requested order.
    pub fn actor_get_actors(
        &self,
        caller: &Principal,
        nicks: &[&str],
    ) -> Result<Vec<Actor>, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let cleaned = nicks
            .iter()
            .map(|nick| self.clean_nick(nick))
            .collect::<Result<Vec<_>, _>>()?;
        let db = self.store.read();
        Ok(cleaned
            .iter()
            .filter_map(|nick| db.actor(nick.as_str()).cloned())
            .collect())
    }

    /// Like `actor_get` but a missing actor is `None`. A malformed nick is
    /// still an error.
    pub fn actor_lookup_nick(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<Option<Actor>, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let nick = self.clean_nick(nick)?;
        Ok(self.store.read().actor(nick.as_str()).cloned())
    }

    pub fn actor_lookup_email(
        &self,
        caller: &Principal,
        email: &str,
    ) -> Result<Option<Actor>, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let email = ActorEmail::parse(email.to_string())?;
        Ok(self.lookup_relation(RelationKind::Email, email.as_ref()))
    }

    pub fn actor_lookup_mobile(
        &self,
        caller: &Principal,
        mobile: &str,
    ) -> Result<Option<Actor>, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let mobile = MobileNumber::parse(mobile)?;
        Ok(self.lookup_relation(RelationKind::Mobile, mobile.as_ref()))
    }

    fn lookup_relation(&self, kind: RelationKind, target: &str) -> Option<Actor> {
        let db = self.store.read();
        db.relation_owner(kind, target)
            .and_then(|relation| db.actor(&relation.actor))
            .cloned()
    }

    pub fn actor_has_contact(
        &self,
        caller: &Principal,
        owner: &str,
        target: &str,
    ) -> Result<bool, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let owner = self.clean_nick(owner)?;
        let target = self.clean_nick(target)?;
        Ok(self.store.read().has_contact(owner.as_str(), target.as_str()))
    }

    #[tracing::instrument(name = "Add contact", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn actor_add_contact(
        &self,
        caller: &Principal,
        owner: &str,
        target: &str,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Write)?;
        let owner = self.clean_user_nick(owner)?;
        let target = self.clean_user_nick(target)?;

        let mut db = self.store.write();
        require_owner(&db, caller, owner.as_str())?;
        existing_actor(&db, &owner)?;
        let target_actor = existing_actor(&db, &target)?.clone();
        if owner == target {
            return Err(ApiError::Rejected(
                "cannot add yourself as a contact".into(),
            ));
        }
        if db.has_contact(owner.as_str(), target.as_str()) {
            return Ok(target_actor);
        }

        db.contacts
            .insert((owner.to_string(), target.to_string()));
        if let Some(actor) = db.actor_mut(owner.as_str()) {
            actor.contact_count += 1;
        }
        if let Some(actor) = db.actor_mut(target.as_str()) {
            actor.follower_count += 1;
        }

        let state = if target_actor.is_public()
            || db.has_contact(target.as_str(), owner.as_str())
        {
            SubscriptionState::Subscribed
        } else {
            SubscriptionState::Pending
        };
        for stream in db.streams_of(target.as_str()) {
            db.subscribe(&stream.key, owner.as_str(), state);
        }
        // target may now read owner's contacts-only streams
        for stream in db.streams_of(owner.as_str()) {
            db.set_subscription_state(
                &stream.key,
                target.as_str(),
                SubscriptionState::Subscribed,
            );
        }

        Ok(db.actor(target.as_str()).cloned().unwrap_or(target_actor))
    }

    #[tracing::instrument(name = "Remove contact", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn actor_remove_contact(
        &self,
        caller: &Principal,
        owner: &str,
        target: &str,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::Delete)?;
        let owner = self.clean_user_nick(owner)?;
        let target = self.clean_user_nick(target)?;

        let mut db = self.store.write();
        require_owner(&db, caller, owner.as_str())?;
        let owner_actor = existing_actor(&db, &owner)?.clone();
        if !db.contacts.remove(&(owner.to_string(), target.to_string())) {
            return Err(ApiError::Rejected(format!(
                "{} is not a contact of {}",
                target, owner
            )));
        }
        if let Some(actor) = db.actor_mut(owner.as_str()) {
            actor.contact_count = (actor.contact_count - 1).max(0);
        }
        if let Some(actor) = db.actor_mut(target.as_str()) {
            actor.follower_count = (actor.follower_count - 1).max(0);
        }

        for stream in db.streams_of(target.as_str()) {
            db.unsubscribe(&stream.key, owner.as_str());
        }
        if !owner_actor.is_public() {
            for stream in db.streams_of(owner.as_str()) {
                db.set_subscription_state(
                    &stream.key,
                    target.as_str(),
                    SubscriptionState::Pending,
                );
            }
        }
        Ok(())
    }

    /// `nick` and its contacts whose avatar changed after `since_time`,
    /// ordered by nick.
    pub fn actor_get_contacts_avatars_since(
        &self,
        caller: &Principal,
        nick: &str,
        limit: Option<usize>,
        since_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Actor>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;

        let mut nicks = db.contacts_of(nick.as_str());
        nicks.push(nick.to_string());
        nicks.sort();
        let actors = nicks
            .iter()
            .filter_map(|n| db.actor(n))
            .filter(|actor| match since_time {
                Some(since) => {
                    actor.avatar_updated_at.unwrap_or(actor.created_at) > since
                }
                None => true,
            })
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(actors)
    }

    pub fn settings_update_avatar(
        &self,
        caller: &Principal,
        nick: &str,
        avatar: &str,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_nick(nick)?;
        let now = self.now();
        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        let actor = db
            .actor_mut(nick.as_str())
            .ok_or_else(|| ApiError::NotFound(nick.to_string()))?;
        actor.avatar = Some(avatar.to_string());
        actor.avatar_updated_at = Some(now);
        Ok(actor.clone())
    }

    #[tracing::instrument(name = "Change privacy", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn settings_change_privacy(
        &self,
        caller: &Principal,
        nick: &str,
        privacy: Privacy,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        let actor = db
            .actor_mut(nick.as_str())
            .ok_or_else(|| ApiError::NotFound(nick.to_string()))?;
        actor.privacy = privacy;
        let actor = actor.clone();
        restate_subscriptions(&mut db, &actor);
        Ok(actor)
    }

    #[tracing::instrument(name = "Change password", skip(self, caller, password), fields(caller = %caller.nick()))]
    pub fn settings_change_password(
        &self,
        caller: &Principal,
        nick: &str,
        password: Secret<String>,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        require_owner(&self.store.read(), caller, nick.as_str())?;
        self.set_password_hash(&nick, password)
    }

    #[tracing::instrument(name = "Upgrade intermediate password", skip(self, caller, password))]
    pub fn actor_update_intermediate_password(
        &self,
        caller: &Principal,
        nick: &str,
        password: Secret<String>,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Admin)?;
        let nick = self.clean_user_nick(nick)?;
        self.set_password_hash(&nick, password)?;
        let db = self.store.read();
        existing_actor(&db, &nick).cloned()
    }

    /// Live actor record by stored nick, bypassing access checks. Used by
    /// authentication once credentials have been proven.
    pub(crate) fn actor_for_auth(&self, nick: &str) -> Option<Actor> {
        self.store.read().actor(nick).cloned()
    }

    pub(crate) fn replace_password_hash(
        &self,
        nick: &str,
        password_hash: Secret<String>,
    ) -> Option<Actor> {
        let mut db = self.store.write();
        let actor = db.actor_mut(nick)?;
        actor.password_hash = password_hash;
        Some(actor.clone())
    }

    /// Stores an argon2 hash of `password`; any outstanding session held
    /// against the previous hash stops resolving.
    pub(super) fn set_password_hash(
        &self,
        nick: &crate::domain::Nick,
        password: Secret<String>,
    ) -> Result<(), ApiError> {
        let password_hash = compute_password_hash(password)?;
        let mut db = self.store.write();
        let actor = db
            .actor_mut(nick.as_str())
            .ok_or_else(|| ApiError::NotFound(nick.to_string()))?;
        actor.password_hash = password_hash;
        Ok(())
    }
}

/// Aligns stream privacy and subscription states with `actor.privacy`.
fn restate_subscriptions(db: &mut Tables, actor: &Actor) {
    for stream in db.streams_of(&actor.nick) {
        if let Some(stored) = db.streams.get_mut(&stream.key) {
            stored.privacy = actor.privacy;
        }
        for subscription in db.subscriptions_to(&stream.key) {
            if subscription.subscriber == actor.nick {
                continue;
            }
            let state = if actor.is_public()
                || db.has_contact(&actor.nick, &subscription.subscriber)
            {
                SubscriptionState::Subscribed
            } else {
                SubscriptionState::Pending
            };
            db.set_subscription_state(&stream.key, &subscription.subscriber, state);
        }
    }
}
