//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, store, gateway produce:
//!     → logging.rs (structured log events, request span per redemption)
//!     → metrics.rs (mint outcomes, candidate outcomes, rollback failures)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never formatted strings, for anything queryable
//! - Request ID flows through the `relay_mint` span
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
