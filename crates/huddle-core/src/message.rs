//! Message types for Huddle.
//!
//! A [`Message`] is what a sender submits; a [`Delivery`] is what lands on a
//! recipient's queue.

use crate::chatroom::{RoomName, UserId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A unique message identifier.
pub type MessageId = u64;

/// Atomic counter for ensuring unique IDs even within the same nanosecond.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique message ID.
#[must_use]
pub fn generate_message_id() -> MessageId {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    timestamp.wrapping_add(counter)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The kind of conversation a room or message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// One-to-one conversation between two users.
    Direct,
    /// Named room with any number of subscribers.
    Group,
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatKind::Direct => write!(f, "direct"),
            ChatKind::Group => write!(f, "group"),
        }
    }
}

/// Where a message is headed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A single connected user.
    User(UserId),
    /// Every subscriber of a room.
    Room(RoomName),
}

impl Destination {
    /// Build a destination from a name and the kind it was tagged with.
    #[must_use]
    pub fn new(kind: ChatKind, name: impl Into<String>) -> Self {
        match kind {
            ChatKind::Direct => Destination::User(name.into()),
            ChatKind::Group => Destination::Room(name.into()),
        }
    }

    /// The kind implied by this destination.
    #[must_use]
    pub fn kind(&self) -> ChatKind {
        match self {
            Destination::User(_) => ChatKind::Direct,
            Destination::Room(_) => ChatKind::Group,
        }
    }

    /// The user or room name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Destination::User(name) | Destination::Room(name) => name,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::User(name) => write!(f, "@{name}"),
            Destination::Room(name) => write!(f, "#{name}"),
        }
    }
}

/// A message submitted for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Target user or room.
    pub destination: Destination,
    /// Message text.
    pub body: String,
}

impl Message {
    /// Create a new message.
    #[must_use]
    pub fn new(destination: Destination, body: impl Into<String>) -> Self {
        Self {
            destination,
            body: body.into(),
        }
    }

    /// Create a direct message to a user.
    #[must_use]
    pub fn to_user(user: impl Into<UserId>, body: impl Into<String>) -> Self {
        Self::new(Destination::User(user.into()), body)
    }

    /// Create a message for a room.
    #[must_use]
    pub fn to_room(room: impl Into<RoomName>, body: impl Into<String>) -> Self {
        Self::new(Destination::Room(room.into()), body)
    }

    /// The kind implied by the destination.
    #[must_use]
    pub fn kind(&self) -> ChatKind {
        self.destination.kind()
    }
}

/// A message stamped with its sender, ready to sit on a recipient queue.
///
/// Fan-out shares one `Arc<Delivery>` across every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Unique message identifier.
    pub id: MessageId,
    /// The sending user.
    pub from: UserId,
    /// Original destination (the recipient for direct, the room for group).
    pub destination: Destination,
    /// Message text.
    pub body: String,
    /// Milliseconds since the Unix epoch when the message was routed.
    pub timestamp: u64,
}

impl Delivery {
    /// Stamp a message with its sender.
    #[must_use]
    pub fn new(message: Message, from: impl Into<UserId>) -> Self {
        Self {
            id: generate_message_id(),
            from: from.into(),
            destination: message.destination,
            body: message.body,
            timestamp: now_millis(),
        }
    }

    /// The kind implied by the destination.
    #[must_use]
    pub fn kind(&self) -> ChatKind {
        self.destination.kind()
    }
}
