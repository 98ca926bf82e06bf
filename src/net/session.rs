//! Per-connection request/response loop.
//!
//! # States
//! ```text
//! AwaitRequest ──data──▶ Decode ──▶ Respond ──rate limit──▶ AwaitRequest
//!      │                                 │
//!      └─ shutdown / peer close / reset ─┴─ write failure ──▶ Terminate
//! ```
//!
//! One request is in flight at a time. Errors end only this session;
//! the active-session count is released by the [`SessionGuard`] when the
//! session is dropped, whichever way it ends.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::accounts::AccountStore;
use crate::config::SessionConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{SessionGuard, SessionId};
use crate::protocol::{self, Response};

/// Transport failures. Fatal to the session, never to the server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection reset by peer")]
    PeerReset,

    #[error("partial write: sent {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                TransportError::PeerReset
            }
            _ => TransportError::Io(err),
        }
    }
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its side of the connection.
    PeerClosed,
    /// The server is shutting down.
    Shutdown,
}

enum Incoming {
    Data(usize),
    End(SessionEnd),
}

/// A single client session.
pub struct Session<S = TcpStream> {
    stream: S,
    peer_addr: SocketAddr,
    store: Arc<AccountStore>,
    config: SessionConfig,
    shutdown: ShutdownSignal,
    guard: SessionGuard,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer_addr: SocketAddr,
        store: Arc<AccountStore>,
        config: SessionConfig,
        shutdown: ShutdownSignal,
        guard: SessionGuard,
    ) -> Self {
        Self {
            stream,
            peer_addr,
            store,
            config,
            shutdown,
            guard,
        }
    }

    pub fn id(&self) -> SessionId {
        self.guard.id()
    }

    /// Run the session and log how it ended. Never fails.
    pub async fn serve(self) {
        let session_id = self.id();
        let peer_addr = self.peer_addr;

        match self.run().await {
            Ok(reason) => {
                tracing::info!(%session_id, %peer_addr, ?reason, "Session ended");
            }
            Err(e) => {
                tracing::warn!(%session_id, %peer_addr, error = %e, "Session ended with transport error");
            }
        }
    }

    /// Drive the request/response loop until the session terminates.
    ///
    /// Consumes the session; the stream is closed and the guard released
    /// on return.
    pub async fn run(mut self) -> Result<SessionEnd, TransportError> {
        let mut buf = vec![0u8; self.config.buffer_size];

        loop {
            let n = match self.await_request(&mut buf).await? {
                Incoming::Data(n) => n,
                Incoming::End(reason) => return Ok(reason),
            };

            let request = protocol::decode(&buf[..n]);
            match &request {
                Ok(req) => tracing::debug!(
                    session_id = %self.id(),
                    username = %req.username,
                    password_hash = %req.password_hash,
                    "recv"
                ),
                Err(e) => tracing::debug!(
                    session_id = %self.id(),
                    raw = ?String::from_utf8_lossy(&buf[..n]),
                    error = %e,
                    "recv malformed request"
                ),
            }

            let response = protocol::respond(&self.store, &request);
            self.send(response).await?;

            tokio::time::sleep(self.config.rate_limit()).await;
        }
    }

    async fn await_request(&mut self, buf: &mut [u8]) -> Result<Incoming, TransportError> {
        if self.shutdown.is_triggered() {
            return Ok(Incoming::End(SessionEnd::Shutdown));
        }

        tokio::select! {
            biased;

            _ = self.shutdown.recv() => Ok(Incoming::End(SessionEnd::Shutdown)),
            read = self.stream.read(buf) => match read {
                Ok(0) => Ok(Incoming::End(SessionEnd::PeerClosed)),
                Ok(n) => Ok(Incoming::Data(n)),
                Err(e) => Err(TransportError::from_io(e)),
            },
        }
    }

    async fn send(&mut self, response: Response) -> Result<(), TransportError> {
        let bytes = response.encode();
        tracing::info!(session_id = %self.id(), peer_addr = %self.peer_addr, %response, "send");

        let written = self.stream.write(bytes).await.map_err(TransportError::from_io)?;
        if written < bytes.len() {
            return Err(TransportError::PartialWrite {
                written,
                expected: bytes.len(),
            });
        }
        self.stream.flush().await.map_err(TransportError::from_io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{duplex, DuplexStream};

    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::net::connection::ConnectionTracker;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            rate_limit_ms: 1,
            buffer_size: 1024,
        }
    }

    fn session(
        stream: DuplexStream,
        tracker: &ConnectionTracker,
        shutdown: &Shutdown,
    ) -> Session<DuplexStream> {
        Session::new(
            stream,
            "127.0.0.1:40000".parse().unwrap(),
            Arc::new(AccountStore::parse("alice abc123\n")),
            fast_config(),
            shutdown.subscribe(),
            tracker.track(None),
        )
    }

    async fn exchange(client: &mut DuplexStream, request: &[u8]) -> String {
        client.write_all(request).await.unwrap();
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn answers_each_request_in_order() {
        let tracker = ConnectionTracker::new();
        let shutdown = Shutdown::new();
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(session(server, &tracker, &shutdown).run());

        assert_eq!(exchange(&mut client, b"alice\nwrong\n").await, "not authorised");
        assert_eq!(exchange(&mut client, b"alice\n").await, "bad request");
        assert_eq!(exchange(&mut client, b"alice\nabc123\n").await, "authorised");

        drop(client);
        assert_eq!(task.await.unwrap().unwrap(), SessionEnd::PeerClosed);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn invalid_utf8_keeps_connection_open() {
        let tracker = ConnectionTracker::new();
        let shutdown = Shutdown::new();
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(session(server, &tracker, &shutdown).run());

        assert_eq!(exchange(&mut client, b"\xff\n\xfe\n").await, "bad request");
        assert_eq!(exchange(&mut client, b"alice\nabc123\n").await, "authorised");

        drop(client);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn idle_session_exits_on_shutdown() {
        let tracker = ConnectionTracker::new();
        let shutdown = Shutdown::new();
        let (mut client, server) = duplex(1024);
        let task = tokio::spawn(session(server, &tracker, &shutdown).run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.active_count(), 1);

        shutdown.trigger();
        let end = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("session observes shutdown")
            .unwrap()
            .unwrap();
        assert_eq!(end, SessionEnd::Shutdown);
        assert_eq!(tracker.active_count(), 0);

        // No farewell message; the peer just sees EOF.
        let mut buf = [0u8; 16];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn already_triggered_shutdown_ends_before_reading() {
        let tracker = ConnectionTracker::new();
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let (mut client, server) = duplex(1024);
        client.write_all(b"alice\nabc123\n").await.unwrap();

        let end = session(server, &tracker, &shutdown).run().await.unwrap();
        assert_eq!(end, SessionEnd::Shutdown);
    }

    #[tokio::test]
    async fn short_write_is_fatal() {
        let tracker = ConnectionTracker::new();
        let shutdown = Shutdown::new();
        // Room for four bytes only, so "not authorised" cannot go out in one write.
        let (mut client, server) = duplex(4);
        let task = tokio::spawn(session(server, &tracker, &shutdown).run());

        client.write_all(b"a\nb\n").await.unwrap();

        let err = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::PartialWrite { written: 4, expected: 14 }
        ));
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn reset_kinds_map_to_peer_reset() {
        for kind in [ErrorKind::ConnectionReset, ErrorKind::BrokenPipe] {
            let err = TransportError::from_io(std::io::Error::from(kind));
            assert!(matches!(err, TransportError::PeerReset));
        }
        let other = TransportError::from_io(std::io::Error::from(ErrorKind::TimedOut));
        assert!(matches!(other, TransportError::Io(_)));
    }
}
