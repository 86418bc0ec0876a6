//! Shared fixtures for the Huddle benchmarks.

use huddle_core::{ConnectionHandle, Router, RouterConfig};
use std::time::Duration;

/// A router whose sends never wait and whose queues rarely fill.
#[must_use]
pub fn bench_router() -> Router {
    Router::with_config(RouterConfig {
        queue_capacity: 4096,
        enqueue_timeout: Duration::ZERO,
    })
}

/// Create `room` owned by `owner` with `members` extra connected subscribers.
///
/// Returns the handles of the extra members, which must stay alive for
/// their queues to remain in the pool.
pub fn populate_room(
    router: &Router,
    room: &str,
    owner: &str,
    members: usize,
) -> Vec<ConnectionHandle> {
    router
        .create_group_chat(room, owner)
        .expect("room name already taken");

    (0..members)
        .map(|i| {
            let user = format!("{room}-member-{i}");
            let handle = router.connect(user.clone());
            router
                .join_group_chat(room, &user)
                .expect("fresh member cannot already be subscribed");
            handle
        })
        .collect()
}

/// Empty every queue so the next iteration starts from zero.
pub fn drain(handles: &mut [ConnectionHandle]) -> usize {
    let mut drained = 0;
    for handle in handles {
        while handle.try_recv().is_some() {
            drained += 1;
        }
    }
    drained
}

/// Single-threaded runtime for driving async sends from criterion loops.
#[must_use]
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
}
