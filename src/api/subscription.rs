use std::collections::HashMap;

use super::{can_view, existing_actor, require, require_owner, Api};
use crate::domain::AccessLevel;
use crate::error::ApiError;
use crate::models::{
    inbox_key, Principal, Stream, Subscription, SubscriptionState,
};

impl Api {
    #[tracing::instrument(name = "Request subscription", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn subscription_request(
        &self,
        caller: &Principal,
        topic: &str,
        target: &str,
    ) -> Result<Subscription, ApiError> {
        require(caller, AccessLevel::Write)?;
        let subscriber = target
            .strip_prefix("inbox/")
            .and_then(|rest| rest.strip_suffix("/overview"))
            .ok_or_else(|| {
                ApiError::InvalidArguments(format!("{} is not an inbox", target))
            })?;
        let subscriber = self.clean_user_nick(subscriber)?;

        let mut db = self.store.write();
        require_owner(&db, caller, subscriber.as_str())?;
        let stream = db
            .streams
            .get(topic)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(topic.to_string()))?;
        if let Some(existing) = db.subscription(topic, &inbox_key(subscriber.as_str())) {
            return Ok(existing.clone());
        }
        let state = match db.actor(&stream.owner) {
            Some(owner)
                if owner.is_public()
                    || owner.nick == subscriber.as_str()
                    || db.has_contact(&owner.nick, subscriber.as_str()) =>
            {
                SubscriptionState::Subscribed
            }
            _ => SubscriptionState::Pending,
        };
        Ok(db.subscribe(topic, subscriber.as_str(), state))
    }

    pub fn subscription_is_active(
        &self,
        caller: &Principal,
        topic: &str,
        target: &str,
    ) -> Result<bool, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        Ok(self
            .store
            .read()
            .subscription(topic, target)
            .map(Subscription::is_active)
            .unwrap_or(false))
    }

    pub fn subscription_exists(
        &self,
        caller: &Principal,
        topic: &str,
        target: &str,
    ) -> Result<bool, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        Ok(self.store.read().subscription(topic, target).is_some())
    }

    pub fn subscription_get_topic(
        &self,
        caller: &Principal,
        topic: &str,
    ) -> Result<Vec<Subscription>, ApiError> {
        require(caller, AccessLevel::Read)?;
        Ok(self.store.read().subscriptions_to(topic))
    }

    pub fn stream_get_actor(
        &self,
        caller: &Principal,
        nick: &str,
    ) -> Result<Vec<Stream>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_nick(nick)?;
        let db = self.store.read();
        existing_actor(&db, &nick)?;
        if !can_view(&db, caller, nick.as_str()) {
            return Err(ApiError::Privacy(nick.to_string()));
        }
        Ok(db.streams_of(nick.as_str()))
    }

    /// Streams by key; missing and unreadable ones are left out.
    pub fn stream_get_streams(
        &self,
        caller: &Principal,
        keys: &[&str],
    ) -> Result<HashMap<String, Stream>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let db = self.store.read();
        Ok(keys
            .iter()
            .filter_map(|key| db.streams.get(*key))
            .filter(|stream| can_view(&db, caller, &stream.owner))
            .map(|stream| (stream.key.clone(), stream.clone()))
            .collect())
    }

    /// Entry keys delivered to `nick`, newest first.
    pub fn inbox_get_actor_overview(
        &self,
        caller: &Principal,
        nick: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        Ok(db
            .inboxes
            .get(&inbox_key(nick.as_str()))
            .map(|inbox| {
                inbox
                    .iter()
                    .rev()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
