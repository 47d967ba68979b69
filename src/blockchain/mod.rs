//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private keys)
//!     → wallet.rs (key loading, signing)
//!     → transaction.rs (mint call encoding, request building)
//!     → gateway.rs (ChainGateway port)
//!     → client.rs (JSON-RPC implementation with timeouts and failover)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod gateway;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::RpcGateway;
pub use gateway::ChainGateway;
pub use transaction::{parse_destination, MintTemplate, DEFAULT_MINT_SELECTOR};
pub use types::{ChainId, GatewayError, GatewayResult, SignedTransaction};
pub use wallet::Wallet;
