//! Shutdown coordination for the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::net::connection::ConnectionTracker;

/// Coordinator for graceful shutdown.
///
/// Holds the server's "running" flag as a watch channel so that every
/// subscriber, including ones created after the trigger, observes it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Flip the running flag. Idempotent.
    pub fn trigger(&self) {
        let changed = self.tx.send_if_modified(|stopping| !std::mem::replace(stopping, true));
        if changed {
            tracing::info!("Shutdown triggered");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of [`Shutdown`], one per long-running task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been triggered.
    ///
    /// Also resolves if every [`Shutdown`] handle has been dropped.
    /// Cancel-safe.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stopping| *stopping).await;
    }
}

/// How the session drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every session exited on its own.
    Completed,
    /// The drain deadline passed and the remaining sessions were aborted.
    ForceClosed { aborted: usize },
}

/// Wait for all sessions to finish after shutdown has been triggered.
///
/// Polls `tracker` every `poll_interval`. With a `deadline`, sessions
/// still alive once it elapses are aborted; aborting drops their guards,
/// so the active count still reaches zero before this returns.
pub async fn drain_sessions(
    tracker: &ConnectionTracker,
    sessions: &mut JoinSet<()>,
    poll_interval: Duration,
    deadline: Option<Duration>,
) -> DrainOutcome {
    let active = tracker.active_count();
    if active > 0 {
        tracing::info!(active_sessions = active, "Waiting for sessions to finish");
    }

    let idle = tracker.wait_for_idle(poll_interval);
    let outcome = match deadline {
        None => {
            idle.await;
            DrainOutcome::Completed
        }
        Some(limit) => match tokio::time::timeout(limit, idle).await {
            Ok(()) => DrainOutcome::Completed,
            Err(_) => {
                let remaining = tracker.active_count();
                tracing::warn!(
                    active_sessions = remaining,
                    deadline = ?limit,
                    "Drain deadline passed, aborting sessions"
                );
                sessions.abort_all();
                DrainOutcome::ForceClosed { aborted: remaining }
            }
        },
    };

    // Wait for finished or aborted tasks to be torn down; aborted ones
    // release their guards here.
    while sessions.join_next().await.is_some() {}

    debug_assert_eq!(tracker.active_count(), 0);
    outcome
}
