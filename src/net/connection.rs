//! Session identity and active-session accounting.
//!
//! # Responsibilities
//! - Generate unique session IDs for log correlation
//! - Count active sessions for the shutdown drain
//! - Release the count (and the connection slot) exactly once per session

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::net::listener::ConnectionPermit;

/// Global atomic counter for session IDs.
/// Relaxed ordering is enough since only uniqueness matters.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// Shared count of live sessions.
///
/// Cloning is cheap; every clone observes the same counter.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. The returned guard decrements on drop.
    pub fn track(&self, permit: Option<ConnectionPermit>) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
            permit,
        }
    }

    /// Current number of active sessions.
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Poll until the active count reaches zero.
    pub async fn wait_for_idle(&self, poll_interval: Duration) {
        while self.active_count() > 0 {
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Held by a session task for its whole lifetime.
///
/// Dropping it, whether the task returned, failed, or was aborted,
/// decrements the active count and frees the connection slot.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicUsize>,
    id: SessionId,
    permit: Option<ConnectionPermit>,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Free the slot first: a zero count implies every slot is free.
        drop(self.permit.take());
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(session_id = %self.id, "Session released");
    }
}
