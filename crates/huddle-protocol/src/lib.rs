//! # huddle-protocol
//!
//! Wire protocol for the Huddle chat service.
//!
//! Clients and servers exchange length-prefixed MessagePack frames over a
//! WebSocket. A session opens with `Connect` / `Connected`; after that the
//! client issues room requests and sends messages, and the server pushes
//! `Message` frames as they arrive.
//!
//! ## Frame Types
//!
//! - `Connect` / `Connected` - Session handshake carrying the user identity
//! - `CreateGroupChat` / `JoinGroupChat` / `LeaveGroupChat` - Room membership
//! - `ListChannels` / `Channels` - Room listing
//! - `SendMessage` / `Message` - Outbound and delivered chat messages
//! - `Ack` / `Error` - Request outcomes
//!
//! ## Example
//!
//! ```rust
//! use huddle_protocol::{codec, ChannelKind, Frame};
//!
//! let frame = Frame::send_message(7, "lobby", ChannelKind::Group, "Hello, world!");
//!
//! let encoded = codec::encode(&frame).unwrap();
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(frame, decoded);
//! ```

pub mod codec;
pub mod codes;
pub mod frames;
pub mod version;

pub use codec::{decode, encode, ProtocolError};
pub use frames::{ChannelEntry, ChannelKind, Frame, FrameType};
pub use version::{Version, PROTOCOL_VERSION};
