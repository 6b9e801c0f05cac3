//! The domain api.
//!
//! Every operation takes the calling [`Principal`] first and checks its
//! access level before touching the datastore. Ownership rules live in
//! [`owns`]; read visibility in [`can_view`].

mod abuse;
mod activation;
mod actor;
mod channel;
mod entry;
mod keyvalue;
mod login;
mod oauth_credentials;
mod presence;
mod sms;
mod subscription;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::Secret;

pub use actor::ActorProfile;
pub use entry::NewPost;
pub use login::PasswordReset;
pub use presence::PresenceUpdate;

use crate::clock::Clock;
use crate::domain::{AccessLevel, Nick, NickKind, Privacy};
use crate::email_client::EmailClient;
use crate::error::ApiError;
use crate::models::{Actor, Principal, StreamKind, SubscriptionState};
use crate::store::{Datastore, Tables};

pub const ROOT_NAME: &str = "root";

#[derive(Clone)]
pub struct Api {
    store: Arc<Datastore>,
    clock: Arc<dyn Clock>,
    email_client: EmailClient,
    ns_domain: String,
    site_name: String,
    base_url: String,
}

impl Api {
    pub fn new(
        store: Arc<Datastore>,
        clock: Arc<dyn Clock>,
        email_client: EmailClient,
        ns_domain: String,
        site_name: String,
        base_url: String,
    ) -> Self {
        let api = Self {
            store,
            clock,
            email_client,
            ns_domain,
            site_name,
            base_url,
        };
        api.bootstrap_root();
        api
    }

    fn bootstrap_root(&self) {
        let nick = self.root_nick();
        let mut db = self.store.write();
        if db.actors.contains_key(&nick) {
            return;
        }
        let root = new_actor(nick, NickKind::User, Privacy::Public, self.now());
        insert_actor(&mut db, root);
    }

    pub fn root_nick(&self) -> String {
        format!("{}@{}", ROOT_NAME, self.ns_domain)
    }

    /// The superuser every internal call runs as.
    pub fn root(&self) -> Principal {
        let nick = self.root_nick();
        let actor = self
            .store
            .read()
            .actors
            .get(&nick)
            .cloned()
            .unwrap_or_else(|| {
                new_actor(nick, NickKind::User, Privacy::Public, self.now())
            });
        Principal::new(actor, AccessLevel::Admin)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ns_domain(&self) -> &str {
        &self.ns_domain
    }

    fn clean_nick(&self, raw: &str) -> Result<Nick, ApiError> {
        Ok(Nick::parse(raw, &self.ns_domain)?)
    }

    fn clean_user_nick(&self, raw: &str) -> Result<Nick, ApiError> {
        Ok(Nick::parse_user(raw, &self.ns_domain)?)
    }

    fn clean_channel_nick(&self, raw: &str) -> Result<Nick, ApiError> {
        Ok(Nick::parse_channel(raw, &self.ns_domain)?)
    }
}

pub(crate) fn require(
    caller: &Principal,
    level: AccessLevel,
) -> Result<(), ApiError> {
    if caller.access_level.allows(level) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied(format!(
            "{} access required, {} has {}",
            level,
            caller.nick(),
            caller.access_level
        )))
    }
}

/// A caller owns itself, the channels it administers, and with admin
/// access everything.
pub(crate) fn owns(db: &Tables, caller: &Principal, nick: &str) -> bool {
    caller.access_level.allows(AccessLevel::Admin)
        || caller.nick() == nick
        || db.is_channel_admin(nick, caller.nick())
}

pub(crate) fn require_owner(
    db: &Tables,
    caller: &Principal,
    nick: &str,
) -> Result<(), ApiError> {
    if owns(db, caller, nick) {
        Ok(())
    } else {
        Err(ApiError::OwnerRequired(nick.to_string()))
    }
}

/// Whether `caller` may read streams and presence owned by `owner`.
pub(crate) fn can_view(db: &Tables, caller: &Principal, owner: &str) -> bool {
    if caller.access_level.allows(AccessLevel::Admin) || caller.nick() == owner
    {
        return true;
    }
    match db.actor(owner) {
        Some(actor) if actor.is_channel() || actor.is_public() => true,
        Some(_) => db.has_contact(owner, caller.nick()),
        None => false,
    }
}

pub(crate) fn new_actor(
    nick: String,
    kind: NickKind,
    privacy: Privacy,
    now: DateTime<Utc>,
) -> Actor {
    Actor {
        nick,
        kind,
        privacy,
        password_hash: Secret::new(String::new()),
        given_name: None,
        family_name: None,
        avatar: None,
        contact_count: 0,
        follower_count: 0,
        channel_count: 0,
        member_count: 0,
        admin_count: 0,
        avatar_updated_at: None,
        created_at: now,
        deleted_at: None,
    }
}

/// Stores `actor` with its streams; users follow their own streams.
pub(crate) fn insert_actor(db: &mut Tables, actor: Actor) {
    db.create_streams(&actor);
    if !actor.is_channel() {
        for kind in [StreamKind::Presence, StreamKind::Comments] {
            let topic = crate::models::Stream::key_for(&actor.nick, kind);
            db.subscribe(&topic, &actor.nick, SubscriptionState::Subscribed);
        }
    }
    db.actors.insert(actor.nick.clone(), actor);
}

pub(crate) fn existing_actor<'a>(
    db: &'a Tables,
    nick: &Nick,
) -> Result<&'a Actor, ApiError> {
    db.actor(nick.as_str())
        .ok_or_else(|| ApiError::NotFound(nick.to_string()))
}
