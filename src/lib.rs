//! Voucher relayer library.
//!
//! Redeems one-time vouchers by minting on an EVM chain through a pool of
//! sender accounts, consuming each voucher at most once.

// Core subsystems
pub mod blockchain;
pub mod relay;
pub mod store;

// Surfaces
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use relay::{RelayDispatcher, RelayError, SignerPool};
