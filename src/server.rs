//! Authentication server: accept loop, session spawning, and shutdown drain.
//!
//! # Responsibilities
//! - Accept connections until shutdown is triggered
//! - Count each session before spawning it
//! - Stop accepting (close the listening socket) on shutdown
//! - Block until every session has exited

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::accounts::AccountStore;
use crate::config::ServerConfig;
use crate::lifecycle::{drain_sessions, DrainOutcome, ShutdownSignal};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::net::session::Session;

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The concurrent authentication server.
pub struct AuthServer {
    config: ServerConfig,
    store: Arc<AccountStore>,
    tracker: ConnectionTracker,
}

impl AuthServer {
    pub fn new(config: ServerConfig, store: AccountStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Handle to the active-session counter.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Serve until `shutdown` fires, then drain sessions.
    ///
    /// The listener is dropped as soon as shutdown is observed, so later
    /// connection attempts are refused while the drain runs.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<DrainOutcome, ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, "Server running, press Ctrl+C to exit");

        let mut sessions = JoinSet::new();

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => break Ok(()),

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Session task panicked");
                        }
                    }
                }

                accepted = listener.accept() => {
                    let (stream, peer_addr, permit) = match accepted {
                        Ok(conn) => conn,
                        Err(ListenerError::Accept(e)) => {
                            // Per-connection failures (e.g. the peer vanished
                            // before accept) must not stop the server.
                            tracing::warn!(error = %e, "Accept failed");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                            continue;
                        }
                        Err(e) => break Err(e),
                    };

                    let guard = self.tracker.track(Some(permit));
                    tracing::info!(
                        session_id = %guard.id(),
                        %peer_addr,
                        active_sessions = self.tracker.active_count(),
                        "Accepted connection"
                    );

                    let session = Session::new(
                        stream,
                        peer_addr,
                        Arc::clone(&self.store),
                        self.config.session.clone(),
                        shutdown.clone(),
                        guard,
                    );
                    sessions.spawn(session.serve());
                }
            }
        };

        drop(listener);
        tracing::info!("Listener closed, cleaning up");

        let outcome = drain_sessions(
            &self.tracker,
            &mut sessions,
            self.config.shutdown.poll_interval(),
            self.config.shutdown.drain_timeout(),
        )
        .await;

        tracing::info!(?outcome, "Server shutdown complete");
        result.map(|()| outcome)
    }
}
