use std::collections::BTreeMap;

use super::{can_view, existing_actor, owns, require, require_owner, Api};
use crate::domain::{AccessLevel, PostMessage};
use crate::error::{ApiError, ValidationError};
use crate::models::{
    inbox_key, Entry, EntryAndComments, Principal, Stream, StreamKind,
};
use crate::store::Tables;

/// Optional fields of a post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub uuid: Option<String>,
    pub location: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl Api {
    /// Posts `message` as `nick`, to a channel when the message starts with
    /// one, and delivers it to every active subscriber of the stream.
    #[tracing::instrument(name = "Post entry", skip(self, caller, message), fields(caller = %caller.nick()))]
    pub fn post(
        &self,
        caller: &Principal,
        nick: &str,
        message: &str,
        extra: NewPost,
    ) -> Result<Entry, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let now = self.now();

        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        let message = PostMessage::parse(message, &self.ns_domain)?;

        let uuid = extra
            .uuid
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_simple().to_string());
        if db.entry_uuids.contains_key(&uuid) {
            return Err(ApiError::AlreadyExists(format!("entry {}", uuid)));
        }

        let owner = match &message.channel {
            Some(channel) => {
                existing_actor(&db, channel)?;
                if !db.is_member(channel.as_str(), nick.as_str()) {
                    return Err(ApiError::Rejected(format!(
                        "{} is not a member of {}",
                        nick, channel
                    )));
                }
                channel.to_string()
            }
            None => nick.to_string(),
        };
        let location = extra.location.or_else(|| {
            db.current_presence(nick.as_str())
                .and_then(|presence| presence.extra.location.clone())
        });

        let stream = Stream::key_for(&owner, StreamKind::Presence);
        let seq = db.next_entry_id();
        let entry = Entry {
            seq,
            key: format!("{}/{}", stream, seq),
            uuid: uuid.clone(),
            stream: stream.clone(),
            owner: owner.clone(),
            actor: nick.to_string(),
            entry: None,
            title: Some(message.title),
            content: None,
            location,
            thumbnail_url: extra.thumbnail_url,
            comment_count: 0,
            created_at: now,
            deleted_at: None,
        };
        db.entries.insert(entry.key.clone(), entry.clone());
        db.entry_uuids.insert(uuid, entry.key.clone());
        // the poster hears about comments
        db.subscribe(
            &entry.key,
            nick.as_str(),
            crate::models::SubscriptionState::Subscribed,
        );

        let mut inboxes = active_inboxes(&db, &stream);
        inboxes.push(inbox_key(nick.as_str()));
        db.deliver(&entry.key, inboxes);
        Ok(entry)
    }

    pub fn entry_get(
        &self,
        caller: &Principal,
        key: &str,
    ) -> Result<Entry, ApiError> {
        require(caller, AccessLevel::Read)?;
        let db = self.store.read();
        visible_entry(&db, caller, key).cloned()
    }

    pub fn entry_get_uuid(
        &self,
        caller: &Principal,
        uuid: &str,
    ) -> Result<Entry, ApiError> {
        require(caller, AccessLevel::Read)?;
        let db = self.store.read();
        let key = db
            .entry_uuids
            .get(uuid)
            .ok_or_else(|| ApiError::NotFound(format!("entry {}", uuid)))?;
        visible_entry(&db, caller, key).cloned()
    }

    pub fn entry_get_safe(&self, caller: &Principal, key: &str) -> Option<Entry> {
        self.entry_get(caller, key).ok()
    }

    /// Visible, live entries of `keys`, in the requested order.
    pub fn entry_get_entries(
        &self,
        caller: &Principal,
        keys: &[&str],
    ) -> Result<Vec<Entry>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let db = self.store.read();
        Ok(keys
            .iter()
            .filter_map(|key| visible_entry(&db, caller, key).ok())
            .cloned()
            .collect())
    }

    pub fn entry_get_entries_dict(
        &self,
        caller: &Principal,
        keys: &[&str],
    ) -> Result<BTreeMap<String, Entry>, ApiError> {
        Ok(self
            .entry_get_entries(caller, keys)?
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect())
    }

    #[tracing::instrument(name = "Add comment", skip(self, caller, content), fields(caller = %caller.nick()))]
    pub fn entry_add_comment(
        &self,
        caller: &Principal,
        stream: &str,
        entry: &str,
        nick: &str,
        content: &str,
    ) -> Result<Entry, ApiError> {
        require(caller, AccessLevel::Write)?;
        let mut db = self.store.write();
        let parent = db
            .live_entry(entry)
            .filter(|parent| parent.stream == stream)
            .ok_or_else(|| ApiError::NotFound(entry.to_string()))?
            .key
            .clone();
        self.add_comment(&mut db, caller, &parent, nick, content)
    }

    pub fn entry_add_comment_with_entry_uuid(
        &self,
        caller: &Principal,
        entry_uuid: &str,
        nick: &str,
        content: &str,
    ) -> Result<Entry, ApiError> {
        require(caller, AccessLevel::Write)?;
        let mut db = self.store.write();
        let parent = db
            .entry_uuids
            .get(entry_uuid)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("entry {}", entry_uuid)))?;
        self.add_comment(&mut db, caller, &parent, nick, content)
    }

    fn add_comment(
        &self,
        db: &mut Tables,
        caller: &Principal,
        parent: &str,
        nick: &str,
        content: &str,
    ) -> Result<Entry, ApiError> {
        let nick = self.clean_user_nick(nick)?;
        require_owner(db, caller, nick.as_str())?;
        existing_actor(db, &nick)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let parent = visible_entry(db, caller, parent)?.clone();
        if parent.is_comment() {
            return Err(ApiError::Rejected("cannot comment on a comment".into()));
        }

        let stream = Stream::key_for(nick.as_str(), StreamKind::Comments);
        let seq = db.next_entry_id();
        let comment = Entry {
            seq,
            key: format!("{}/{}", stream, seq),
            uuid: uuid::Uuid::new_v4().to_simple().to_string(),
            stream,
            owner: parent.owner.clone(),
            actor: nick.to_string(),
            entry: Some(parent.key.clone()),
            title: None,
            content: Some(content.to_string()),
            location: None,
            thumbnail_url: None,
            comment_count: 0,
            created_at: self.now(),
            deleted_at: None,
        };
        db.entries.insert(comment.key.clone(), comment.clone());
        db.entry_uuids
            .insert(comment.uuid.clone(), comment.key.clone());
        if let Some(parent) = db.entries.get_mut(&parent.key) {
            parent.comment_count += 1;
        }
        db.subscribe(
            &parent.key,
            nick.as_str(),
            crate::models::SubscriptionState::Subscribed,
        );

        let mut inboxes = active_inboxes(db, &parent.key);
        inboxes.push(inbox_key(nick.as_str()));
        if db.actor(&parent.owner).map(|a| !a.is_channel()).unwrap_or(false) {
            inboxes.push(inbox_key(&parent.owner));
        }
        db.deliver(&comment.key, inboxes);
        Ok(comment)
    }

    /// Live comments on `entry`, oldest first.
    pub fn entry_get_comments(
        &self,
        caller: &Principal,
        entry: &str,
    ) -> Result<Vec<Entry>, ApiError> {
        require(caller, AccessLevel::Read)?;
        let db = self.store.read();
        let parent = visible_entry(&db, caller, entry)?;
        Ok(comments_of(&db, &parent.key))
    }

    pub fn entry_get_comments_with_entry_uuid(
        &self,
        caller: &Principal,
        entry_uuid: &str,
    ) -> Result<EntryAndComments, ApiError> {
        let entry = self.entry_get_uuid(caller, entry_uuid)?;
        let db = self.store.read();
        let comments = comments_of(&db, &entry.key);
        Ok(EntryAndComments { entry, comments })
    }

    #[tracing::instrument(name = "Remove entry", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn entry_remove(
        &self,
        caller: &Principal,
        entry: &str,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::Delete)?;
        let now = self.now();
        let mut db = self.store.write();
        let target = db
            .live_entry(entry)
            .filter(|e| !e.is_comment())
            .cloned()
            .ok_or_else(|| ApiError::NotFound(entry.to_string()))?;
        if !owns(&db, caller, &target.owner) && !owns(&db, caller, &target.actor)
        {
            return Err(ApiError::OwnerRequired(target.key));
        }
        for e in db.entries.values_mut() {
            if e.key == target.key || e.entry.as_deref() == Some(&target.key) {
                e.deleted_at.get_or_insert(now);
            }
        }
        Ok(())
    }

    #[tracing::instrument(name = "Remove comment", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn entry_remove_comment(
        &self,
        caller: &Principal,
        comment: &str,
    ) -> Result<(), ApiError> {
        require(caller, AccessLevel::Delete)?;
        let now = self.now();
        let mut db = self.store.write();
        let target = db
            .live_entry(comment)
            .filter(|e| e.is_comment())
            .cloned()
            .ok_or_else(|| ApiError::NotFound(comment.to_string()))?;
        if !owns(&db, caller, &target.actor) && !owns(&db, caller, &target.owner)
        {
            return Err(ApiError::OwnerRequired(target.key));
        }
        if let Some(e) = db.entries.get_mut(&target.key) {
            e.deleted_at = Some(now);
        }
        if let Some(parent_key) = &target.entry {
            if let Some(parent) = db.entries.get_mut(parent_key) {
                parent.comment_count = (parent.comment_count - 1).max(0);
            }
        }
        Ok(())
    }
}

/// A live entry `caller` may read.
pub(super) fn visible_entry<'a>(
    db: &'a Tables,
    caller: &Principal,
    key: &str,
) -> Result<&'a Entry, ApiError> {
    let entry = db
        .live_entry(key)
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;
    if can_view(db, caller, &entry.owner) {
        Ok(entry)
    } else {
        Err(ApiError::Privacy(key.to_string()))
    }
}

fn active_inboxes(db: &Tables, topic: &str) -> Vec<String> {
    db.subscriptions_to(topic)
        .into_iter()
        .filter(|s| s.is_active())
        .map(|s| s.target)
        .collect()
}

fn comments_of(db: &Tables, parent: &str) -> Vec<Entry> {
    let mut comments: Vec<Entry> = db
        .entries
        .values()
        .filter(|e| e.entry.as_deref() == Some(parent) && !e.is_deleted())
        .cloned()
        .collect();
    comments.sort_by_key(|e| e.seq);
    comments
}
