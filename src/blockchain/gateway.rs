//! The chain port consumed by the relay dispatcher.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::blockchain::types::{GatewayResult, SignedTransaction};

/// Read queries and transaction submission against one chain.
///
/// Reads are idempotent. Submission is at-most-once from the caller's side:
/// a sender's nonce is only advanced after `submit_transaction` returns a
/// hash, so resubmitting under a stale nonce cannot double-spend a sequence.
///
/// Implementations classify node rejections into [`GatewayError`] variants;
/// callers never inspect error text.
///
/// [`GatewayError`]: crate::blockchain::GatewayError
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Native balance of `address` in wei.
    async fn get_balance(&self, address: Address) -> GatewayResult<U256>;

    /// Next nonce for `address`, counting pending transactions.
    async fn get_next_sequence(&self, address: Address) -> GatewayResult<u64>;

    /// Current gas price estimate in wei.
    async fn get_fee_estimate(&self) -> GatewayResult<u128>;

    /// Broadcast a signed transaction.
    async fn submit_transaction(&self, tx: &SignedTransaction) -> GatewayResult<TxHash>;
}
