//! # huddle-core
//!
//! Room registry, connection pool, and message routing for the Huddle chat service.
//!
//! This crate provides the in-process building blocks:
//!
//! - **Chatroom** - A named room and its subscriber set
//! - **Registry** - Room lifecycle (create, join, leave, list)
//! - **ConnectionPool** - One bounded outbound queue per connected user
//! - **Router** - Delivers a message to a single user or fans it out to a room
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Session    │────▶│   Router    │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │
//!        │                   ▼
//!        │            ┌─────────────┐
//!        └────────────│    Pool     │
//!         drain queue └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use huddle_core::{Message, Router};
//!
//! # tokio_test_block_on(async {
//! let router = Router::new();
//! let mut bob = router.connect("bob");
//!
//! router.create_group_chat("lobby", "alice").unwrap();
//! router.join_group_chat("lobby", "bob").unwrap();
//!
//! let report = router
//!     .send_message(Message::to_room("lobby", "hello"), "alice")
//!     .await
//!     .unwrap();
//! assert_eq!(report.delivered, 1);
//!
//! let delivery = bob.recv().await.unwrap();
//! assert_eq!(delivery.body, "hello");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod chatroom;
pub mod error;
pub mod message;
pub mod pool;
pub mod registry;
pub mod router;

pub use chatroom::{Chatroom, RoomName, SubscriberSet, UserId};
pub use error::ChatError;
pub use message::{ChatKind, Delivery, Destination, Message};
pub use pool::{ConnectionHandle, ConnectionPool, SendResult, DEFAULT_QUEUE_CAPACITY};
pub use registry::{ChannelInfo, Registry};
pub use router::{DeliveryReport, Router, RouterConfig, RouterStats};
