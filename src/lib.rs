//! Concurrent TCP authentication server.
//!
//! Clients send `<username>\n<password_hash>\n` and receive `authorised`,
//! `not authorised`, or `bad request`. Each connection runs in its own
//! task; shutdown stops accepting and waits for every session to exit.

pub mod accounts;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod server;

pub use accounts::AccountStore;
pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use server::AuthServer;
