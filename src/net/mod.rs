//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (session id, active-session guard)
//!     → session.rs (request/response loop)
//!
//! Session States:
//!     AwaitRequest → Decode → Respond → (AwaitRequest | Terminate)
//! ```
//!
//! # Design Decisions
//! - Connections over the limit are closed at accept, never queued
//! - Each session is counted for graceful shutdown
//! - The count is released by a drop guard, so every exit path is covered

pub mod connection;
pub mod listener;
pub mod session;
