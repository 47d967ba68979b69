//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher call to the chain:
//!     → timeouts.rs (every gateway call gets a deadline)
//!     → On expiry: GatewayError::Timeout, handled like any transient failure
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries happen by failing over to another sender, not by repeating a call

pub mod timeouts;

pub use timeouts::with_timeout;
