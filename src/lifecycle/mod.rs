//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → broadcast → background tasks (topology feed) exit their loops
//!
//! Signals (signals.rs):
//!     SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Selection itself has no lifecycle: it never suspends or blocks
//! - Only background tasks subscribe to shutdown

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
