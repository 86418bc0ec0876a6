//! Message router for Huddle.
//!
//! The router owns the room [`Registry`] and the [`ConnectionPool`] and is
//! the single entry point the transport layer calls into. Room sends check
//! membership and take a subscriber snapshot under the room's lock, then
//! fan out with no lock held.

use crate::chatroom::UserId;
use crate::error::ChatError;
use crate::message::{Delivery, Destination, Message};
use crate::pool::{ConnectionHandle, ConnectionPool, SendResult, DEFAULT_QUEUE_CAPACITY};
use crate::registry::{ChannelInfo, Registry};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Outbound queue capacity per connection.
    pub queue_capacity: usize,
    /// How long a send may wait on a full recipient queue. Zero never waits.
    pub enqueue_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            enqueue_timeout: Duration::from_millis(100),
        }
    }
}

/// Per-send delivery summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Queues the message was pushed onto.
    pub delivered: usize,
    /// Recipients skipped because their queue stayed full.
    pub dropped: usize,
    /// Room subscribers with no live connection.
    pub offline: usize,
}

/// The central message router.
#[derive(Debug)]
pub struct Router {
    registry: Registry,
    pool: ConnectionPool,
    config: RouterConfig,
}

impl Router {
    /// Create a new router with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create a new router with custom configuration.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        info!("Creating router with config: {:?}", config);
        Self {
            registry: Registry::new(),
            pool: ConnectionPool::with_capacity(config.queue_capacity),
            config,
        }
    }

    /// Router configuration.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The room registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The connection pool.
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Register `user` and return the queue the session must drain.
    pub fn connect(&self, user: impl Into<UserId>) -> ConnectionHandle {
        self.pool.connect(user)
    }

    /// Drop `user`'s queue. Returns `true` if the user was connected.
    pub fn disconnect(&self, user: &str) -> bool {
        self.pool.disconnect(user)
    }

    /// Create a group room owned by `creator`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::AlreadyExists`] if the name is taken.
    pub fn create_group_chat(&self, name: &str, creator: &str) -> Result<(), ChatError> {
        self.registry.create_group_chat(name, creator)
    }

    /// Subscribe `user` to a room.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] or [`ChatError::AlreadyMember`].
    pub fn join_group_chat(&self, name: &str, user: &str) -> Result<(), ChatError> {
        self.registry.join_group_chat(name, user)
    }

    /// Unsubscribe `user` from a room, deleting it once empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] or [`ChatError::NotMember`].
    pub fn leave_group_chat(&self, name: &str, user: &str) -> Result<(), ChatError> {
        self.registry.leave_group_chat(name, user)
    }

    /// Snapshot of all rooms.
    #[must_use]
    pub fn list_channels(&self) -> Vec<ChannelInfo> {
        self.registry.list_channels()
    }

    /// Route a message from `sender`.
    ///
    /// Direct messages go to the recipient's queue only. Room messages go to
    /// every subscriber except the sender; recipients whose queue stays full
    /// are skipped and counted in [`DeliveryReport::dropped`].
    ///
    /// # Errors
    ///
    /// - [`ChatError::DestinationNotFound`] if the user is not connected or
    ///   the room does not exist.
    /// - [`ChatError::NotMember`] if `sender` is not subscribed to the room.
    /// - [`ChatError::Backpressure`] if a direct recipient's queue is full.
    pub async fn send_message(
        &self,
        message: Message,
        sender: &str,
    ) -> Result<DeliveryReport, ChatError> {
        match message.destination.clone() {
            Destination::User(user) => self.send_direct(&user, message, sender).await,
            Destination::Room(room) => self.send_to_room(&room, message, sender).await,
        }
    }

    async fn send_direct(
        &self,
        user: &str,
        message: Message,
        sender: &str,
    ) -> Result<DeliveryReport, ChatError> {
        let delivery = Arc::new(Delivery::new(message, sender));

        match self
            .pool
            .send_to(user, delivery, self.config.enqueue_timeout)
            .await
        {
            SendResult::Sent => {
                trace!(from = %sender, to = %user, "Direct message queued");
                Ok(DeliveryReport {
                    delivered: 1,
                    ..DeliveryReport::default()
                })
            }
            SendResult::NotConnected | SendResult::Closed => {
                Err(ChatError::DestinationNotFound(user.to_string()))
            }
            SendResult::QueueFull => Err(ChatError::Backpressure(user.to_string())),
        }
    }

    async fn send_to_room(
        &self,
        room: &str,
        message: Message,
        sender: &str,
    ) -> Result<DeliveryReport, ChatError> {
        // The registry guard is released before any enqueue.
        let recipients = self
            .registry
            .recipients(room, sender)
            .map_err(|err| match err {
                ChatError::NotFound(name) => ChatError::DestinationNotFound(name),
                other => other,
            })?;

        let delivery = Arc::new(Delivery::new(message, sender));
        let timeout = self.config.enqueue_timeout;

        let results = join_all(
            recipients
                .iter()
                .map(|user| self.pool.send_to(user, Arc::clone(&delivery), timeout)),
        )
        .await;

        let mut report = DeliveryReport::default();
        for (user, result) in recipients.iter().zip(results) {
            match result {
                SendResult::Sent => report.delivered += 1,
                SendResult::QueueFull => {
                    warn!(room = %room, user = %user, "Dropped room message for saturated queue");
                    report.dropped += 1;
                }
                SendResult::NotConnected | SendResult::Closed => report.offline += 1,
            }
        }

        debug!(
            room = %room,
            from = %sender,
            delivered = report.delivered,
            dropped = report.dropped,
            offline = report.offline,
            "Room message fanned out"
        );
        Ok(report)
    }

    /// Get router statistics.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            room_count: self.registry.room_count(),
            connection_count: self.pool.connection_count(),
            total_subscriptions: self.registry.total_subscriptions(),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Router statistics.
#[derive(Debug, Clone)]
pub struct RouterStats {
    /// Number of live rooms.
    pub room_count: usize,
    /// Number of connected users.
    pub connection_count: usize,
    /// Total number of room subscriptions.
    pub total_subscriptions: usize,
}
