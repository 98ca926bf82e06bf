//! Account store subsystem.
//!
//! # Data Flow
//! ```text
//! accounts file (one `<username> <hash>` per line)
//!     → store.rs (parse, skip malformed lines)
//!     → AccountStore (immutable)
//!     → shared via Arc to every session
//! ```

pub mod store;

pub use store::AccountStore;
