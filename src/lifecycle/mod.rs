//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Load sender keys → Seed nonces → Connect store
//!         → Report stale reservations → Build dispatcher
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Graceful HTTP shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: an empty pool or an unseeded nonce is fatal
//! - Listeners start last (traffic only when ready)

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::{bootstrap, StartupError};
