//! Connection pool for Huddle.
//!
//! Maps each connected user to the producer side of a bounded outbound
//! queue. The consumer side is handed back to the session as a
//! [`ConnectionHandle`], which releases its pool entry when dropped.

use crate::chatroom::UserId;
use crate::message::Delivery;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tracing::{debug, info, warn};

/// Default outbound queue capacity per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Outcome of pushing a delivery onto a user's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Delivery was queued.
    Sent,
    /// The user has no queue in the pool.
    NotConnected,
    /// The queue stayed full for the whole enqueue window.
    QueueFull,
    /// The consumer is gone; the stale entry was removed.
    Closed,
}

#[derive(Debug)]
struct ConnectionEntry {
    sender: mpsc::Sender<Arc<Delivery>>,
    generation: u64,
}

#[derive(Debug)]
struct PoolInner {
    connections: DashMap<UserId, ConnectionEntry>,
    next_generation: AtomicU64,
    capacity: usize,
}

/// Pool of per-user outbound queues.
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create a pool with the default queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a pool whose queues hold up to `capacity` deliveries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connections: DashMap::new(),
                next_generation: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Queue capacity given to new connections.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Register a fresh queue for `user`.
    ///
    /// A previous queue for the same user is replaced. Its producer is
    /// dropped, so the older handle drains what it already holds and then
    /// sees the end of the stream.
    pub fn connect(&self, user: impl Into<UserId>) -> ConnectionHandle {
        let user = user.into();
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let replaced = self
            .inner
            .connections
            .insert(user.clone(), ConnectionEntry { sender, generation });
        if replaced.is_some() {
            info!(user = %user, generation, "Replaced existing connection");
        } else {
            debug!(user = %user, generation, "Connected");
        }

        ConnectionHandle {
            user,
            generation,
            receiver,
            pool: self.clone(),
        }
    }

    /// Remove `user`'s queue regardless of which connection installed it.
    ///
    /// Returns `true` if the user was connected.
    pub fn disconnect(&self, user: &str) -> bool {
        let removed = self.inner.connections.remove(user).is_some();
        if removed {
            debug!(user = %user, "Disconnected");
        }
        removed
    }

    /// Remove `user`'s queue only if it still belongs to `generation`.
    fn release(&self, user: &str, generation: u64) -> bool {
        let removed = self
            .inner
            .connections
            .remove_if(user, |_, entry| entry.generation == generation)
            .is_some();
        if removed {
            debug!(user = %user, generation, "Released connection");
        }
        removed
    }

    /// Producer side of `user`'s queue, if connected.
    #[must_use]
    pub fn lookup(&self, user: &str) -> Option<mpsc::Sender<Arc<Delivery>>> {
        self.inner
            .connections
            .get(user)
            .map(|entry| entry.sender.clone())
    }

    /// Push a delivery onto `user`'s queue.
    ///
    /// Waits at most `timeout` for capacity; a zero timeout never waits.
    /// No pool lock is held while waiting.
    pub async fn send_to(&self, user: &str, delivery: Arc<Delivery>, timeout: Duration) -> SendResult {
        let Some(sender) = self.lookup(user) else {
            return SendResult::NotConnected;
        };

        let closed = if timeout.is_zero() {
            match sender.try_send(delivery) {
                Ok(()) => return SendResult::Sent,
                Err(TrySendError::Full(_)) => false,
                Err(TrySendError::Closed(_)) => true,
            }
        } else {
            match sender.send_timeout(delivery, timeout).await {
                Ok(()) => return SendResult::Sent,
                Err(SendTimeoutError::Timeout(_)) => false,
                Err(SendTimeoutError::Closed(_)) => true,
            }
        };

        if closed {
            // Only evict the entry this sender came from; a reconnect may
            // already have installed a newer queue.
            self.inner
                .connections
                .remove_if(user, |_, entry| entry.sender.same_channel(&sender));
            debug!(user = %user, "Queue closed, removed stale connection");
            SendResult::Closed
        } else {
            warn!(user = %user, "Outbound queue full");
            SendResult::QueueFull
        }
    }

    /// Check if a user is connected.
    #[must_use]
    pub fn is_connected(&self, user: &str) -> bool {
        self.inner.connections.contains_key(user)
    }

    /// Number of connected users.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of a user's outbound queue.
///
/// Exactly one handle drains a given queue. Dropping the handle removes its
/// queue from the pool, unless a newer connection for the same user has
/// already replaced it.
#[derive(Debug)]
pub struct ConnectionHandle {
    user: UserId,
    generation: u64,
    receiver: mpsc::Receiver<Arc<Delivery>>,
    pool: ConnectionPool,
}

impl ConnectionHandle {
    /// The connected user.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Wait for the next delivery.
    ///
    /// Returns `None` once the queue has been disconnected or replaced and
    /// everything already queued has been drained.
    pub async fn recv(&mut self) -> Option<Arc<Delivery>> {
        self.receiver.recv().await
    }

    /// Take the next delivery if one is ready.
    pub fn try_recv(&mut self) -> Option<Arc<Delivery>> {
        self.receiver.try_recv().ok()
    }

    #[cfg(test)]
    fn is_current(&self) -> bool {
        self.pool
            .inner
            .connections
            .get(&self.user)
            .is_some_and(|entry| entry.generation == self.generation)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.pool.release(&self.user, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn delivery(body: &str) -> Arc<Delivery> {
        Arc::new(Delivery::new(Message::to_user("bob", body), "alice"))
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let pool = ConnectionPool::new();
        let mut bob = pool.connect("bob");
        assert!(pool.is_connected("bob"));

        let result = pool.send_to("bob", delivery("hi"), Duration::ZERO).await;
        assert_eq!(result, SendResult::Sent);
        assert_eq!(bob.recv().await.unwrap().body, "hi");
    }

    #[tokio::test]
    async fn test_send_to_unknown_user() {
        let pool = ConnectionPool::new();
        let result = pool.send_to("ghost", delivery("hi"), Duration::ZERO).await;
        assert_eq!(result, SendResult::NotConnected);
    }

    #[tokio::test]
    async fn test_drop_handle_releases_entry() {
        let pool = ConnectionPool::new();
        let handle = pool.connect("bob");
        assert_eq!(pool.connection_count(), 1);

        drop(handle);
        assert!(!pool.is_connected("bob"));
    }

    #[tokio::test]
    async fn test_reconnect_replaces_and_closes_old_queue() {
        let pool = ConnectionPool::new();
        let mut first = pool.connect("bob");
        pool.send_to("bob", delivery("one"), Duration::ZERO).await;

        let mut second = pool.connect("bob");
        assert!(!first.is_current());
        assert!(second.is_current());

        // The old handle drains what it had, then ends.
        assert_eq!(first.recv().await.unwrap().body, "one");
        assert!(first.recv().await.is_none());

        // Dropping the old handle must not evict the new connection.
        drop(first);
        assert!(pool.is_connected("bob"));

        pool.send_to("bob", delivery("two"), Duration::ZERO).await;
        assert_eq!(second.recv().await.unwrap().body, "two");
    }

    #[tokio::test]
    async fn test_explicit_disconnect_ends_stream() {
        let pool = ConnectionPool::new();
        let mut bob = pool.connect("bob");

        assert!(pool.disconnect("bob"));
        assert!(!pool.disconnect("bob"));
        assert!(bob.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_reports_backpressure() {
        let pool = ConnectionPool::with_capacity(2);
        let _bob = pool.connect("bob");

        for _ in 0..2 {
            assert_eq!(
                pool.send_to("bob", delivery("x"), Duration::ZERO).await,
                SendResult::Sent
            );
        }
        assert_eq!(
            pool.send_to("bob", delivery("x"), Duration::ZERO).await,
            SendResult::QueueFull
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_waits_for_capacity() {
        let pool = ConnectionPool::with_capacity(1);
        let mut bob = pool.connect("bob");
        pool.send_to("bob", delivery("first"), Duration::ZERO).await;

        let sender_pool = pool.clone();
        let pending = tokio::spawn(async move {
            sender_pool
                .send_to("bob", delivery("second"), Duration::from_secs(5))
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bob.recv().await.unwrap().body, "first");

        assert_eq!(pending.await.unwrap(), SendResult::Sent);
        assert_eq!(bob.recv().await.unwrap().body, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_times_out() {
        let pool = ConnectionPool::with_capacity(1);
        let _bob = pool.connect("bob");
        pool.send_to("bob", delivery("first"), Duration::ZERO).await;

        let result = pool
            .send_to("bob", delivery("second"), Duration::from_millis(50))
            .await;
        assert_eq!(result, SendResult::QueueFull);
    }

    #[tokio::test]
    async fn test_fifo_per_queue() {
        let pool = ConnectionPool::new();
        let mut bob = pool.connect("bob");

        for i in 0..10 {
            pool.send_to("bob", delivery(&i.to_string()), Duration::ZERO)
                .await;
        }
        for i in 0..10 {
            assert_eq!(bob.recv().await.unwrap().body, i.to_string());
        }
    }
}
