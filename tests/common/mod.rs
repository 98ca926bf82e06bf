//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use auth_server::config::ServerConfig;
use auth_server::lifecycle::DrainOutcome;
use auth_server::net::connection::ConnectionTracker;
use auth_server::net::listener::{Listener, ListenerError};
use auth_server::{AccountStore, AuthServer, Shutdown};

/// Hex-encoded SHA-1, the hash format clients send.
pub fn sha1_hex(password: &str) -> String {
    Sha1::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Write an accounts file to a unique temporary path.
pub fn write_accounts_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("accounts-{}.tsv", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Config tuned for fast tests on an ephemeral loopback port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.port = 0;
    config.shutdown.poll_interval_ms = 10;
    config.session.rate_limit_ms = 10;
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub handle: JoinHandle<Result<DrainOutcome, ListenerError>>,
}

impl TestServer {
    /// Trigger shutdown and wait for the server to finish draining.
    pub async fn stop(self) -> DrainOutcome {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not shut down")
            .unwrap()
            .unwrap()
    }
}

/// Start a server on an ephemeral port.
pub async fn start_server(store: AccountStore, config: ServerConfig) -> TestServer {
    let listener = Listener::bind(&config.listener).unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = AuthServer::new(config, store);
    let tracker = server.tracker();
    let signal = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, signal).await });

    TestServer {
        addr,
        shutdown,
        tracker,
        handle,
    }
}

/// Send one request and read one response.
pub async fn exchange(stream: &mut TcpStream, request: &str) -> String {
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("no response from server")
        .unwrap();
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

/// Poll until `tracker` reports `expected` active sessions.
pub async fn wait_for_active(tracker: &ConnectionTracker, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while tracker.active_count() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {expected} active sessions, found {}",
            tracker.active_count()
        )
    });
}
