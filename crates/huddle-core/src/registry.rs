//! Room registry for Huddle.
//!
//! The registry maps room names to [`Chatroom`]s and owns their lifecycle.
//! It is backed by a `DashMap`, so each room name is guarded by its shard's
//! reader/writer lock: check-then-act sequences on one room run as a unit,
//! while unrelated rooms proceed in parallel.

use crate::chatroom::{Chatroom, RoomName, UserId};
use crate::error::ChatError;
use crate::message::ChatKind;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Name and kind of a registered room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Room name.
    pub name: RoomName,
    /// Room kind.
    pub kind: ChatKind,
}

/// Registry of live rooms.
///
/// A room present in the registry always has at least one subscriber.
#[derive(Debug, Default)]
pub struct Registry {
    rooms: DashMap<RoomName, Chatroom>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group room with `creator` as its only subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::AlreadyExists`] if the name is taken.
    pub fn create_group_chat(&self, name: &str, creator: &str) -> Result<(), ChatError> {
        match self.rooms.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ChatError::AlreadyExists(name.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(Chatroom::new(name, ChatKind::Group, creator));
                info!(room = %name, creator = %creator, "Created group chat");
                Ok(())
            }
        }
    }

    /// Subscribe `user` to an existing room.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] if the room does not exist, or
    /// [`ChatError::AlreadyMember`] if the user is already subscribed.
    pub fn join_group_chat(&self, name: &str, user: &str) -> Result<(), ChatError> {
        let mut room = self
            .rooms
            .get_mut(name)
            .ok_or_else(|| ChatError::NotFound(name.to_string()))?;

        if !room.subscribe(user) {
            return Err(ChatError::already_member(name, user));
        }

        debug!(
            room = %name,
            user = %user,
            subscribers = room.subscriber_count(),
            "Joined group chat"
        );
        Ok(())
    }

    /// Unsubscribe `user` from a room, deleting the room once it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] if the room does not exist, or
    /// [`ChatError::NotMember`] if the user is not subscribed.
    pub fn leave_group_chat(&self, name: &str, user: &str) -> Result<(), ChatError> {
        // The entry holds the shard write lock, so removal of an emptied room
        // cannot interleave with a concurrent join.
        match self.rooms.entry(name.to_string()) {
            Entry::Vacant(_) => Err(ChatError::NotFound(name.to_string())),
            Entry::Occupied(mut occupied) => {
                if !occupied.get_mut().unsubscribe(user) {
                    return Err(ChatError::not_member(name, user));
                }

                debug!(
                    room = %name,
                    user = %user,
                    subscribers = occupied.get().subscriber_count(),
                    "Left group chat"
                );

                if occupied.get().is_empty() {
                    occupied.remove();
                    info!(room = %name, "Deleted empty group chat");
                }
                Ok(())
            }
        }
    }

    /// Snapshot of every room's name and kind, unordered.
    #[must_use]
    pub fn list_channels(&self) -> Vec<ChannelInfo> {
        self.rooms
            .iter()
            .map(|room| ChannelInfo {
                name: room.name().to_string(),
                kind: room.kind(),
            })
            .collect()
    }

    /// Subscribers of `name` that should receive a message from `sender`.
    ///
    /// Membership check and snapshot happen under the same read lock; the
    /// sender is left out of the result.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] if the room does not exist, or
    /// [`ChatError::NotMember`] if `sender` is not subscribed.
    pub fn recipients(&self, name: &str, sender: &str) -> Result<Vec<UserId>, ChatError> {
        let room = self
            .rooms
            .get(name)
            .ok_or_else(|| ChatError::NotFound(name.to_string()))?;

        if !room.is_subscribed(sender) {
            return Err(ChatError::not_member(name, sender));
        }

        Ok(room
            .subscribers()
            .into_iter()
            .filter(|user| user != sender)
            .collect())
    }

    /// Check if a room exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Get the subscriber count for a room (0 if absent).
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.rooms
            .get(name)
            .map(|room| room.subscriber_count())
            .unwrap_or(0)
    }

    /// Snapshot of a room's subscribers.
    #[must_use]
    pub fn subscribers(&self, name: &str) -> Option<Vec<UserId>> {
        self.rooms.get(name).map(|room| room.subscribers())
    }

    /// Number of live rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total subscriptions across all rooms.
    #[must_use]
    pub fn total_subscriptions(&self) -> usize {
        self.rooms.iter().map(|room| room.subscriber_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sorted(mut users: Vec<UserId>) -> Vec<UserId> {
        users.sort();
        users
    }

    #[test]
    fn test_create_lists_single_group() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();

        assert_eq!(
            registry.list_channels(),
            vec![ChannelInfo {
                name: "g1".into(),
                kind: ChatKind::Group,
            }]
        );
    }

    #[test]
    fn test_create_duplicate_rejected() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();

        assert_eq!(
            registry.create_group_chat("g1", "bob"),
            Err(ChatError::AlreadyExists("g1".into()))
        );
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.subscribers("g1"), Some(vec!["alice".to_string()]));
    }

    #[test]
    fn test_join_missing_room() {
        let registry = Registry::new();
        assert_eq!(
            registry.join_group_chat("missing", "bob"),
            Err(ChatError::NotFound("missing".into()))
        );
    }

    #[test]
    fn test_creator_join_is_already_member() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();

        assert!(matches!(
            registry.join_group_chat("g1", "alice"),
            Err(ChatError::AlreadyMember { .. })
        ));
        assert_eq!(registry.subscriber_count("g1"), 1);
    }

    #[test]
    fn test_last_leave_deletes_room() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();

        registry.leave_group_chat("g1", "alice").unwrap();
        assert!(registry.list_channels().is_empty());
        assert!(!registry.exists("g1"));

        assert_eq!(
            registry.leave_group_chat("g1", "alice"),
            Err(ChatError::NotFound("g1".into()))
        );
    }

    #[test]
    fn test_leave_non_member() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();

        assert!(matches!(
            registry.leave_group_chat("g1", "bob"),
            Err(ChatError::NotMember { .. })
        ));
        assert!(registry.exists("g1"));
    }

    #[test]
    fn test_join_then_leave_restores_members() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();
        registry.join_group_chat("g1", "bob").unwrap();
        let before = sorted(registry.subscribers("g1").unwrap());

        registry.join_group_chat("g1", "carol").unwrap();
        registry.leave_group_chat("g1", "carol").unwrap();

        assert_eq!(sorted(registry.subscribers("g1").unwrap()), before);
    }

    #[test]
    fn test_recipients_exclude_sender() {
        let registry = Registry::new();
        registry.create_group_chat("g1", "alice").unwrap();
        registry.join_group_chat("g1", "bob").unwrap();
        registry.join_group_chat("g1", "carol").unwrap();

        assert_eq!(
            sorted(registry.recipients("g1", "alice").unwrap()),
            vec!["bob".to_string(), "carol".to_string()]
        );
        assert!(matches!(
            registry.recipients("g1", "eve"),
            Err(ChatError::NotMember { .. })
        ));
        assert!(matches!(
            registry.recipients("nope", "alice"),
            Err(ChatError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_joins_lose_nothing() {
        let registry = Arc::new(Registry::new());
        registry.create_group_chat("g1", "creator").unwrap();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .join_group_chat("g1", &format!("user-{i}"))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.subscriber_count("g1"), 65);
    }

    #[test]
    fn test_concurrent_duplicate_join_admits_one() {
        let registry = Arc::new(Registry::new());
        registry.create_group_chat("g1", "creator").unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.join_group_chat("g1", "bob").is_ok())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(registry.subscriber_count("g1"), 2);
    }

    #[test]
    fn test_concurrent_churn_keeps_nonempty_invariant() {
        let registry = Arc::new(Registry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let user = format!("user-{i}");
                    for _ in 0..200 {
                        if registry.join_group_chat("churn", &user).is_err() {
                            let _ = registry.create_group_chat("churn", &user);
                        }
                        let _ = registry.leave_group_chat("churn", &user);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every user left after their last join, so the room must be gone.
        assert!(!registry.exists("churn"));
    }
}
