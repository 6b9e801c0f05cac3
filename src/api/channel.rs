use super::{existing_actor, insert_actor, new_actor, require, require_owner, Api};
use crate::domain::{AccessLevel, Nick, NickKind, Privacy};
use crate::error::ApiError;
use crate::models::{Actor, Principal, Stream, StreamKind, SubscriptionState};
use crate::store::Tables;

pub const DEFAULT_MEMBER_LIMIT: usize = 48;

impl Api {
    #[tracing::instrument(name = "Create channel", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn channel_create(
        &self,
        caller: &Principal,
        channel: &str,
        nick: &str,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Write)?;
        let channel = self.clean_channel_nick(channel)?;
        let nick = self.clean_user_nick(nick)?;

        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        if db.actors.contains_key(channel.as_str()) {
            return Err(ApiError::AlreadyExists(channel.to_string()));
        }

        let mut actor = new_actor(
            channel.to_string(),
            NickKind::Channel,
            Privacy::Public,
            self.now(),
        );
        actor.member_count = 1;
        actor.admin_count = 1;
        insert_actor(&mut db, actor.clone());
        add_member(&mut db, &channel, &nick, true);
        Ok(actor)
    }

    pub fn channel_get(
        &self,
        caller: &Principal,
        channel: &str,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let channel = self.clean_channel_nick(channel)?;
        let db = self.store.read();
        existing_actor(&db, &channel).cloned()
    }

    pub fn channel_has_member(
        &self,
        caller: &Principal,
        channel: &str,
        nick: &str,
    ) -> Result<bool, ApiError> {
        require(caller, AccessLevel::NoAccess)?;
        let channel = self.clean_channel_nick(channel)?;
        let nick = self.clean_user_nick(nick)?;
        Ok(self.store.read().is_member(channel.as_str(), nick.as_str()))
    }

    #[tracing::instrument(name = "Join channel", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn channel_join(
        &self,
        caller: &Principal,
        nick: &str,
        channel: &str,
    ) -> Result<Actor, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let channel = self.clean_channel_nick(channel)?;

        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        existing_actor(&db, &channel)?;
        if db.is_member(channel.as_str(), nick.as_str()) {
            return Err(ApiError::Rejected(format!(
                "{} is already a member of {}",
                nick, channel
            )));
        }
        if let Some(actor) = db.actor_mut(channel.as_str()) {
            actor.member_count += 1;
        }
        add_member(&mut db, &channel, &nick, false);
        existing_actor(&db, &channel).cloned()
    }

    #[tracing::instrument(name = "Part channel", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn channel_part(
        &self,
        caller: &Principal,
        nick: &str,
        channel: &str,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let channel = self.clean_channel_nick(channel)?;

        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &channel)?;
        let was_admin = db
            .memberships
            .remove(&(channel.to_string(), nick.to_string()))
            .ok_or_else(|| {
                ApiError::Rejected(format!(
                    "{} is not a member of {}",
                    nick, channel
                ))
            })?;
        if let Some(actor) = db.actor_mut(channel.as_str()) {
            actor.member_count = (actor.member_count - 1).max(0);
            if was_admin {
                actor.admin_count = (actor.admin_count - 1).max(0);
            }
        }
        if let Some(actor) = db.actor_mut(nick.as_str()) {
            actor.channel_count = (actor.channel_count - 1).max(0);
        }
        for kind in [StreamKind::Presence, StreamKind::Comments] {
            db.unsubscribe(&Stream::key_for(channel.as_str(), kind), nick.as_str());
        }
        Ok(())
    }

    /// Member nicks sorted, starting strictly after `offset`.
    pub fn channel_get_members(
        &self,
        caller: &Principal,
        channel: &str,
        limit: Option<usize>,
        offset: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let channel = self.clean_channel_nick(channel)?;
        let offset = offset.map(|o| self.clean_user_nick(o)).transpose()?;
        let db = self.store.read();
        existing_actor(&db, &channel)?;
        let mut members = db.members_of(channel.as_str());
        members.sort();
        Ok(members
            .into_iter()
            .filter(|member| match &offset {
                Some(offset) => member.as_str() > offset.as_str(),
                None => true,
            })
            .take(limit.unwrap_or(DEFAULT_MEMBER_LIMIT))
            .collect())
    }
}

fn add_member(db: &mut Tables, channel: &Nick, nick: &Nick, admin: bool) {
    db.memberships
        .insert((channel.to_string(), nick.to_string()), admin);
    if let Some(actor) = db.actor_mut(nick.as_str()) {
        actor.channel_count += 1;
    }
    for kind in [StreamKind::Presence, StreamKind::Comments] {
        db.subscribe(
            &Stream::key_for(channel.as_str(), kind),
            nick.as_str(),
            SubscriptionState::Subscribed,
        );
    }
}
