//! Chain-specific types and error definitions.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash};
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Classified errors returned by a [`ChainGateway`](crate::blockchain::ChainGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The node rejected the transaction because its nonce is already used.
    #[error("Sequence too low: {0}")]
    SequenceTooLow(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0:?}")]
    Timeout(Duration),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl GatewayError {
    /// True when the cached nonce must be resynchronized from the chain.
    pub fn is_sequence_stale(&self) -> bool {
        matches!(self, GatewayError::SequenceTooLow(_))
    }
}

/// Result type for blockchain operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A signed, EIP-2718 encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Address of the signing sender.
    pub sender: Address,
    /// Nonce the transaction consumes.
    pub nonce: u64,
    /// Keccak hash of the encoded transaction.
    pub hash: TxHash,
    /// Raw bytes for `eth_sendRawTransaction`.
    pub raw: Bytes,
}
