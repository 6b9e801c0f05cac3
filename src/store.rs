//! In-process datastore.
//!
//! One lock guards every table so an api call sees and leaves a consistent
//! state. Callers hold the guard for the duration of a single operation and
//! never across an `.await`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{
    inbox_key, AbuseReport, Activation, ActivationKind, Actor, ActorRelation,
    Entry, KeyValue, OAuthAccessToken, OAuthConsumer, Presence, RelationKind,
    SmsMessage, Stream, StreamKind, Subscription, SubscriptionState,
};

#[derive(Default)]
pub struct Datastore {
    tables: RwLock<Tables>,
}

impl Datastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
pub struct Tables {
    pub actors: HashMap<String, Actor>,
    /// (owner, target)
    pub contacts: BTreeSet<(String, String)>,
    /// (channel, member) -> is admin
    pub memberships: BTreeMap<(String, String), bool>,
    pub streams: BTreeMap<String, Stream>,
    /// (topic, target inbox)
    pub subscriptions: BTreeMap<(String, String), Subscription>,
    pub entries: HashMap<String, Entry>,
    pub entry_uuids: HashMap<String, String>,
    pub next_entry_id: u64,
    /// Oldest first.
    pub inboxes: HashMap<String, Vec<String>>,
    /// Per actor, oldest first.
    pub presences: HashMap<String, Vec<Presence>>,
    pub activations: Vec<Activation>,
    pub relations: Vec<ActorRelation>,
    pub abuse: HashMap<String, AbuseReport>,
    /// (actor, key)
    pub keyvalues: BTreeMap<(String, String), KeyValue>,
    pub oauth_consumers: HashMap<String, OAuthConsumer>,
    pub oauth_tokens: HashMap<String, OAuthAccessToken>,
    pub sms_outbox: Vec<SmsMessage>,
}

impl Tables {
    pub fn actor(&self, nick: &str) -> Option<&Actor> {
        self.actors.get(nick).filter(|a| !a.is_deleted())
    }

    pub fn actor_mut(&mut self, nick: &str) -> Option<&mut Actor> {
        self.actors.get_mut(nick).filter(|a| !a.is_deleted())
    }

    pub fn has_contact(&self, owner: &str, target: &str) -> bool {
        self.contacts
            .contains(&(owner.to_string(), target.to_string()))
    }

    pub fn contacts_of(&self, owner: &str) -> Vec<String> {
        self.contacts
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, target)| target.clone())
            .collect()
    }

    pub fn is_member(&self, channel: &str, member: &str) -> bool {
        self.memberships
            .contains_key(&(channel.to_string(), member.to_string()))
    }

    pub fn is_channel_admin(&self, channel: &str, member: &str) -> bool {
        self.memberships
            .get(&(channel.to_string(), member.to_string()))
            .copied()
            .unwrap_or(false)
    }

    pub fn members_of(&self, channel: &str) -> Vec<String> {
        self.memberships
            .keys()
            .filter(|(c, _)| c == channel)
            .map(|(_, member)| member.clone())
            .collect()
    }

    pub fn streams_of(&self, owner: &str) -> Vec<Stream> {
        self.streams
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect()
    }

    pub fn create_streams(&mut self, actor: &Actor) {
        for kind in [StreamKind::Presence, StreamKind::Comments] {
            let key = Stream::key_for(&actor.nick, kind);
            self.streams.insert(
                key.clone(),
                Stream {
                    key,
                    owner: actor.nick.clone(),
                    kind,
                    privacy: actor.privacy,
                },
            );
        }
    }

    pub fn subscription(
        &self,
        topic: &str,
        target: &str,
    ) -> Option<&Subscription> {
        self.subscriptions
            .get(&(topic.to_string(), target.to_string()))
    }

    pub fn subscribe(
        &mut self,
        topic: &str,
        subscriber: &str,
        state: SubscriptionState,
    ) -> Subscription {
        let target = inbox_key(subscriber);
        let subscription = Subscription {
            topic: topic.to_string(),
            target: target.clone(),
            subscriber: subscriber.to_string(),
            state,
        };
        self.subscriptions
            .insert((topic.to_string(), target), subscription.clone());
        subscription
    }

    pub fn unsubscribe(&mut self, topic: &str, subscriber: &str) {
        self.subscriptions
            .remove(&(topic.to_string(), inbox_key(subscriber)));
    }

    pub fn subscriptions_to(&self, topic: &str) -> Vec<Subscription> {
        self.subscriptions
            .values()
            .filter(|s| s.topic == topic)
            .cloned()
            .collect()
    }

    pub fn set_subscription_state(
        &mut self,
        topic: &str,
        subscriber: &str,
        state: SubscriptionState,
    ) {
        if let Some(subscription) = self
            .subscriptions
            .get_mut(&(topic.to_string(), inbox_key(subscriber)))
        {
            subscription.state = state;
        }
    }

    /// Appends `entry_key` to every inbox in `inboxes`, once each.
    pub fn deliver<I>(&mut self, entry_key: &str, inboxes: I)
    where
        I: IntoIterator<Item = String>,
    {
        let unique: BTreeSet<String> = inboxes.into_iter().collect();
        for inbox in unique {
            self.inboxes
                .entry(inbox)
                .or_default()
                .push(entry_key.to_string());
        }
    }

    pub fn live_entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key).filter(|e| !e.is_deleted())
    }

    pub fn next_entry_id(&mut self) -> u64 {
        self.next_entry_id += 1;
        self.next_entry_id
    }

    pub fn current_presence(&self, nick: &str) -> Option<&Presence> {
        self.presences.get(nick).and_then(|history| history.last())
    }

    pub fn relation_owner(
        &self,
        kind: RelationKind,
        target: &str,
    ) -> Option<&ActorRelation> {
        self.relations
            .iter()
            .find(|r| r.kind == kind && r.target == target)
    }

    pub fn relation_of(
        &self,
        kind: RelationKind,
        actor: &str,
    ) -> Option<&ActorRelation> {
        self.relations
            .iter()
            .find(|r| r.kind == kind && r.actor == actor)
    }

    pub fn activations_of(
        &self,
        actor: &str,
        kind: ActivationKind,
    ) -> Vec<Activation> {
        self.activations
            .iter()
            .filter(|a| a.actor == actor && a.kind == kind)
            .cloned()
            .collect()
    }
}
