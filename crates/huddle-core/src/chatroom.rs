//! Chatroom abstraction for Huddle.
//!
//! A chatroom is a named room holding the set of users subscribed to it.
//! Chatrooms live inside the [`Registry`](crate::Registry), whose per-key
//! locking makes every operation on a room's [`SubscriberSet`] atomic with
//! respect to other mutations of the same room.

use crate::message::ChatKind;
use std::collections::HashSet;

/// A room name.
pub type RoomName = String;

/// A user identifier.
pub type UserId = String;

/// Unordered, duplicate-free set of subscribed users.
#[derive(Debug, Default, Clone)]
pub struct SubscriberSet {
    users: HashSet<UserId>,
}

impl SubscriberSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. Returns `false` if the user was already present.
    pub fn add(&mut self, user: impl Into<UserId>) -> bool {
        self.users.insert(user.into())
    }

    /// Remove a user. Returns `false` if the user was not present.
    pub fn remove(&mut self, user: &str) -> bool {
        self.users.remove(user)
    }

    #[must_use]
    pub fn contains(&self, user: &str) -> bool {
        self.users.contains(user)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Copy of the current members, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<UserId> {
        self.users.iter().cloned().collect()
    }
}

/// A chat room.
#[derive(Debug)]
pub struct Chatroom {
    /// Room name.
    name: RoomName,
    /// Room kind.
    kind: ChatKind,
    /// Subscribed users.
    subscribers: SubscriberSet,
}

impl Chatroom {
    /// Create a room whose only subscriber is `owner`.
    #[must_use]
    pub fn new(name: impl Into<RoomName>, kind: ChatKind, owner: impl Into<UserId>) -> Self {
        let mut subscribers = SubscriberSet::new();
        subscribers.add(owner);
        Self {
            name: name.into(),
            kind,
            subscribers,
        }
    }

    /// Get the room name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the room kind.
    #[must_use]
    pub fn kind(&self) -> ChatKind {
        self.kind
    }

    /// Get the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if a user is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, user: &str) -> bool {
        self.subscribers.contains(user)
    }

    /// Subscribe a user.
    ///
    /// Returns `false` if the user was already subscribed.
    pub fn subscribe(&mut self, user: impl Into<UserId>) -> bool {
        self.subscribers.add(user)
    }

    /// Unsubscribe a user.
    ///
    /// Returns `true` if the user was subscribed.
    pub fn unsubscribe(&mut self, user: &str) -> bool {
        self.subscribers.remove(user)
    }

    /// Get all subscriber IDs.
    #[must_use]
    pub fn subscribers(&self) -> Vec<UserId> {
        self.subscribers.snapshot()
    }

    /// Check if the room is empty (no subscribers).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
