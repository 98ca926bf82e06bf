//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → listener stops accepting
//!             → sessions observe the flag and exit
//!             → drain_sessions waits for active count == 0
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative; sessions exit on their own
//! - The drain has an optional deadline after which stuck sessions are aborted

pub mod shutdown;
pub mod signals;

pub use shutdown::{drain_sessions, DrainOutcome, Shutdown, ShutdownSignal};
