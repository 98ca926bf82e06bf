//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! listener / sessions / shutdown
//!     → tracing events (session_id, peer_addr, response)
//!     → logging.rs subscriber (stdout)
//! ```

pub mod logging;

pub use logging::init_logging;
