//! Domain errors returned by the registry and router.

use thiserror::Error;

/// Errors produced by chat operations.
///
/// None of these are fatal. A failed mutating call leaves the registry and
/// the connection pool exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// A room with this name already exists.
    #[error("Room already exists: {0}")]
    AlreadyExists(String),

    /// No room with this name exists.
    #[error("Room not found: {0}")]
    NotFound(String),

    /// The user is already subscribed to the room.
    #[error("User {user} is already a member of {room}")]
    AlreadyMember {
        /// Room name.
        room: String,
        /// User identifier.
        user: String,
    },

    /// The user is not subscribed to the room.
    #[error("User {user} is not a member of {room}")]
    NotMember {
        /// Room name.
        room: String,
        /// User identifier.
        user: String,
    },

    /// Neither a connected user nor a room matches the destination.
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    /// The recipient's queue stayed full for the whole enqueue window.
    #[error("Recipient queue is full: {0}")]
    Backpressure(String),
}

impl ChatError {
    /// Short stable label, used for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::AlreadyExists(_) => "already_exists",
            ChatError::NotFound(_) => "not_found",
            ChatError::AlreadyMember { .. } => "already_member",
            ChatError::NotMember { .. } => "not_member",
            ChatError::DestinationNotFound(_) => "destination_not_found",
            ChatError::Backpressure(_) => "backpressure",
        }
    }

    pub(crate) fn already_member(room: &str, user: &str) -> Self {
        ChatError::AlreadyMember {
            room: room.to_string(),
            user: user.to_string(),
        }
    }

    pub(crate) fn not_member(room: &str, user: &str) -> Self {
        ChatError::NotMember {
            room: room.to_string(),
            user: user.to_string(),
        }
    }
}
