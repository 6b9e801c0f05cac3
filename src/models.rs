//! Records kept by the datastore and handed out by the api.

use chrono::{DateTime, Utc};
use secrecy::Secret;

use crate::domain::{AccessLevel, NickKind, Privacy};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Actor {
    pub nick: String,
    #[serde(rename = "type")]
    pub kind: NickKind,
    pub privacy: Privacy,
    #[serde(skip)]
    pub password_hash: Secret<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub avatar: Option<String>,
    pub contact_count: i64,
    pub follower_count: i64,
    pub channel_count: i64,
    pub member_count: i64,
    pub admin_count: i64,
    pub avatar_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Actor {
    pub fn display_nick(&self) -> &str {
        self.nick.split('@').next().unwrap_or(&self.nick)
    }

    /// "Given Family" when a name is on file, otherwise the display nick.
    pub fn full_name(&self) -> String {
        let name = [self.given_name.as_deref(), self.family_name.as_deref()]
            .iter()
            .flatten()
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.display_nick().to_string()
        } else {
            name
        }
    }

    pub fn is_channel(&self) -> bool {
        self.kind == NickKind::Channel
    }

    pub fn is_public(&self) -> bool {
        self.privacy == Privacy::Public
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// An actor as seen by the api for the duration of one call.
#[derive(Debug, Clone)]
pub struct Principal {
    pub actor: Actor,
    pub access_level: AccessLevel,
    /// Authenticated through a legacy personal key.
    pub legacy: bool,
}

impl Principal {
    pub fn new(actor: Actor, access_level: AccessLevel) -> Self {
        Self {
            actor,
            access_level,
            legacy: false,
        }
    }

    pub fn nick(&self) -> &str {
        &self.actor.nick
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Presence,
    Comments,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Presence => "presence",
            StreamKind::Comments => "comments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Stream {
    pub key: String,
    pub owner: String,
    #[serde(rename = "type")]
    pub kind: StreamKind,
    pub privacy: Privacy,
}

impl Stream {
    pub fn key_for(owner: &str, kind: StreamKind) -> String {
        format!("stream/{}/{}", owner, kind.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Subscribed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Subscription {
    pub topic: String,
    pub target: String,
    pub subscriber: String,
    pub state: SubscriptionState,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.state == SubscriptionState::Subscribed
    }
}

pub fn inbox_key(nick: &str) -> String {
    format!("inbox/{}/overview", nick)
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Entry {
    #[serde(skip)]
    pub seq: u64,
    pub key: String,
    pub uuid: String,
    pub stream: String,
    pub owner: String,
    pub actor: String,
    /// Key of the commented entry, set on comments only.
    pub entry: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub location: Option<String>,
    pub thumbnail_url: Option<String>,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn is_comment(&self) -> bool {
        self.entry.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EntryAndComments {
    pub entry: Entry,
    pub comments: Vec<Entry>,
}

impl EntryAndComments {
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PresenceExtra {
    pub status: Option<String>,
    pub location: Option<String>,
    pub senders_timestamp: Option<DateTime<Utc>>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Presence {
    pub actor: String,
    pub updated_at: DateTime<Utc>,
    pub extra: PresenceExtra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    Email,
    Mobile,
    PasswordLost,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Activation {
    pub actor: String,
    #[serde(rename = "type")]
    pub kind: ActivationKind,
    pub content: String,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Email,
    Mobile,
}

/// A confirmed address belonging to an actor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ActorRelation {
    pub actor: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AbuseReport {
    pub entry: String,
    /// Owner of the reported entry.
    pub actor: String,
    pub reports: Vec<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KeyValue {
    pub actor: String,
    pub keyname: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct OAuthConsumer {
    pub key: String,
    pub secret: Secret<String>,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub struct OAuthAccessToken {
    pub key: String,
    pub secret: Secret<String>,
    pub consumer: String,
    pub actor: String,
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SmsMessage {
    pub sender: String,
    pub mobile: String,
    pub message: String,
}
