use chrono::{DateTime, Utc};

use super::{can_view, existing_actor, require, require_owner, Api};
use crate::domain::AccessLevel;
use crate::error::ApiError;
use crate::models::{Presence, PresenceExtra, Principal};

/// Fields of a presence update; unset ones keep their previous value.
#[derive(Debug, Clone, Default)]
pub struct PresenceUpdate {
    pub senders_timestamp: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub location: Option<String>,
}

impl Api {
    #[tracing::instrument(name = "Set presence", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn presence_set(
        &self,
        caller: &Principal,
        nick: &str,
        update: PresenceUpdate,
    ) -> Result<Presence, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        let actor = existing_actor(&db, &nick)?.clone();

        let previous = db
            .current_presence(nick.as_str())
            .map(|p| p.extra.clone())
            .unwrap_or_default();
        let presence = Presence {
            actor: nick.to_string(),
            updated_at: self.now(),
            extra: PresenceExtra {
                status: update.status.or(previous.status),
                location: update.location.or(previous.location),
                senders_timestamp: update
                    .senders_timestamp
                    .or(previous.senders_timestamp),
                given_name: actor.given_name,
                family_name: actor.family_name,
            },
        };
        db.presences
            .entry(nick.to_string())
            .or_default()
            .push(presence.clone());
        Ok(presence)
    }

    /// The latest presence of `nick` at or before `at_time`.
    pub fn presence_get(
        &self,
        caller: &Principal,
        nick: &str,
        at_time: Option<DateTime<Utc>>,
    ) -> Result<Option<Presence>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        existing_actor(&db, &nick)?;
        if !can_view(&db, caller, nick.as_str()) {
            return Err(ApiError::Privacy(nick.to_string()));
        }
        let history = match db.presences.get(nick.as_str()) {
            Some(history) => history,
            None => return Ok(None),
        };
        Ok(history
            .iter()
            .rev()
            .find(|p| at_time.map(|at| p.updated_at <= at).unwrap_or(true))
            .cloned())
    }

    /// Current presence of `nick` and its contacts updated after
    /// `since_time`, newest first.
    pub fn presence_get_contacts(
        &self,
        caller: &Principal,
        nick: &str,
        since_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Presence>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let nick = self.clean_user_nick(nick)?;
        let db = self.store.read();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;

        let mut nicks = db.contacts_of(nick.as_str());
        nicks.push(nick.to_string());
        let mut presences: Vec<Presence> = nicks
            .iter()
            .filter(|n| can_view(&db, caller, n))
            .filter_map(|n| db.current_presence(n))
            .filter(|p| since_time.map(|since| p.updated_at > since).unwrap_or(true))
            .cloned()
            .collect();
        presences.sort_by(|a, b| {
            b.updated_at.cmp(&a.updated_at).then_with(|| a.actor.cmp(&b.actor))
        });
        Ok(presences)
    }
}
