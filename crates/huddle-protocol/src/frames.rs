//! Frame types for the Huddle protocol.
//!
//! Frames are the unit of communication between clients and the server.
//! Each frame is serialized using MessagePack, tagged by its `type` field.

use serde::{Deserialize, Serialize};

/// Frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum FrameType {
    Connect = 0x01,
    Connected = 0x02,
    CreateGroupChat = 0x03,
    JoinGroupChat = 0x04,
    LeaveGroupChat = 0x05,
    ListChannels = 0x06,
    Channels = 0x07,
    SendMessage = 0x08,
    Message = 0x09,
    Ack = 0x0A,
    Error = 0x0B,
    Ping = 0x0C,
    Pong = 0x0D,
}

impl From<FrameType> for u8 {
    fn from(ft: FrameType) -> u8 {
        ft as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            0x01 => Ok(FrameType::Connect),
            0x02 => Ok(FrameType::Connected),
            0x03 => Ok(FrameType::CreateGroupChat),
            0x04 => Ok(FrameType::JoinGroupChat),
            0x05 => Ok(FrameType::LeaveGroupChat),
            0x06 => Ok(FrameType::ListChannels),
            0x07 => Ok(FrameType::Channels),
            0x08 => Ok(FrameType::SendMessage),
            0x09 => Ok(FrameType::Message),
            0x0A => Ok(FrameType::Ack),
            0x0B => Ok(FrameType::Error),
            0x0C => Ok(FrameType::Ping),
            0x0D => Ok(FrameType::Pong),
            _ => Err("Invalid frame type"),
        }
    }
}

/// Conversation kind on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ChannelKind {
    /// One-to-one conversation; the destination is a user name.
    Direct = 0,
    /// Group room; the destination is a room name.
    Group = 1,
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for ChannelKind {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChannelKind::Direct),
            1 => Ok(ChannelKind::Group),
            _ => Err("Invalid channel kind"),
        }
    }
}

/// One row of a `Channels` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Room name.
    pub name: String,
    /// Room kind.
    pub kind: ChannelKind,
}

/// A protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Session handshake; must be the first client frame.
    Connect {
        /// Client protocol major version.
        version: u8,
        /// Resolved identity of the connecting user.
        user: String,
    },

    /// Handshake accepted.
    Connected {
        /// The user the session is bound to.
        user: String,
        /// Negotiated protocol major version.
        version: u8,
        /// Recommended heartbeat interval in milliseconds.
        heartbeat: u32,
    },

    /// Create a group room owned by the caller.
    CreateGroupChat {
        /// Request ID for acknowledgment.
        id: u64,
        /// Room name.
        channel: String,
    },

    /// Join an existing group room.
    JoinGroupChat {
        /// Request ID for acknowledgment.
        id: u64,
        /// Room name.
        channel: String,
    },

    /// Leave a group room.
    LeaveGroupChat {
        /// Request ID for acknowledgment.
        id: u64,
        /// Room name.
        channel: String,
    },

    /// Request the room listing.
    ListChannels {
        /// Request ID, echoed in the `Channels` reply.
        id: u64,
    },

    /// Room listing reply.
    Channels {
        /// ID of the `ListChannels` request.
        id: u64,
        /// Rooms at the time of the request.
        items: Vec<ChannelEntry>,
    },

    /// Send a chat message.
    SendMessage {
        /// Request ID for acknowledgment.
        id: u64,
        /// User or room name, depending on `kind`.
        to: String,
        /// Destination kind.
        kind: ChannelKind,
        /// Message text.
        body: String,
    },

    /// A chat message delivered to this session.
    Message {
        /// Server-assigned message ID.
        id: u64,
        /// Sending user.
        from: String,
        /// Recipient user or room name.
        to: String,
        /// Destination kind.
        kind: ChannelKind,
        /// Message text.
        body: String,
        /// Routing time in milliseconds since the Unix epoch.
        timestamp: u64,
    },

    /// Acknowledgment of a request.
    Ack {
        /// ID of the acknowledged request.
        id: u64,
    },

    /// Error response.
    Error {
        /// ID of the failed request (0 if not applicable).
        id: u64,
        /// Error code, see [`crate::codes`].
        code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// Keepalive ping.
    Ping {
        /// Optional timestamp.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Keepalive pong.
    Pong {
        /// Echoed timestamp from ping.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
}

impl Frame {
    /// Get the frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Connect { .. } => FrameType::Connect,
            Frame::Connected { .. } => FrameType::Connected,
            Frame::CreateGroupChat { .. } => FrameType::CreateGroupChat,
            Frame::JoinGroupChat { .. } => FrameType::JoinGroupChat,
            Frame::LeaveGroupChat { .. } => FrameType::LeaveGroupChat,
            Frame::ListChannels { .. } => FrameType::ListChannels,
            Frame::Channels { .. } => FrameType::Channels,
            Frame::SendMessage { .. } => FrameType::SendMessage,
            Frame::Message { .. } => FrameType::Message,
            Frame::Ack { .. } => FrameType::Ack,
            Frame::Error { .. } => FrameType::Error,
            Frame::Ping { .. } => FrameType::Ping,
            Frame::Pong { .. } => FrameType::Pong,
        }
    }

    /// Request ID carried by the frame, if it is a request.
    #[must_use]
    pub fn request_id(&self) -> Option<u64> {
        match self {
            Frame::CreateGroupChat { id, .. }
            | Frame::JoinGroupChat { id, .. }
            | Frame::LeaveGroupChat { id, .. }
            | Frame::ListChannels { id }
            | Frame::SendMessage { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Create a new Connect frame.
    #[must_use]
    pub fn connect(version: u8, user: impl Into<String>) -> Self {
        Frame::Connect {
            version,
            user: user.into(),
        }
    }

    /// Create a new Connected frame.
    #[must_use]
    pub fn connected(user: impl Into<String>, version: u8, heartbeat: u32) -> Self {
        Frame::Connected {
            user: user.into(),
            version,
            heartbeat,
        }
    }

    /// Create a new CreateGroupChat frame.
    #[must_use]
    pub fn create_group_chat(id: u64, channel: impl Into<String>) -> Self {
        Frame::CreateGroupChat {
            id,
            channel: channel.into(),
        }
    }

    /// Create a new JoinGroupChat frame.
    #[must_use]
    pub fn join_group_chat(id: u64, channel: impl Into<String>) -> Self {
        Frame::JoinGroupChat {
            id,
            channel: channel.into(),
        }
    }

    /// Create a new LeaveGroupChat frame.
    #[must_use]
    pub fn leave_group_chat(id: u64, channel: impl Into<String>) -> Self {
        Frame::LeaveGroupChat {
            id,
            channel: channel.into(),
        }
    }

    /// Create a new ListChannels frame.
    #[must_use]
    pub fn list_channels(id: u64) -> Self {
        Frame::ListChannels { id }
    }

    /// Create a new SendMessage frame.
    #[must_use]
    pub fn send_message(
        id: u64,
        to: impl Into<String>,
        kind: ChannelKind,
        body: impl Into<String>,
    ) -> Self {
        Frame::SendMessage {
            id,
            to: to.into(),
            kind,
            body: body.into(),
        }
    }

    /// Create a new Ack frame.
    #[must_use]
    pub fn ack(id: u64) -> Self {
        Frame::Ack { id }
    }

    /// Create a new Error frame.
    #[must_use]
    pub fn error(id: u64, code: u16, message: impl Into<String>) -> Self {
        Frame::Error {
            id,
            code,
            message: message.into(),
        }
    }

    /// Create a new Ping frame.
    #[must_use]
    pub fn ping() -> Self {
        Frame::Ping { timestamp: None }
    }

    /// Create a new Pong frame.
    #[must_use]
    pub fn pong(timestamp: Option<u64>) -> Self {
        Frame::Pong { timestamp }
    }
}
