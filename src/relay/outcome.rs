//! Per-candidate attempt outcomes.

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;

use crate::blockchain::GatewayError;

/// Proof that the chain accepted a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub tx_hash: TxHash,
    pub sender: Address,
    pub nonce: u64,
}

/// What happened when one sender was tried. Every variant except
/// `Success` sends the failover loop to the next candidate.
#[derive(Debug)]
pub enum CandidateOutcome {
    /// Balance below the reserve threshold; no transaction was built.
    SkipBalance { balance: U256 },
    /// Nonce stayed stale after the allowed resyncs.
    RetryStaleSequence,
    /// Any other failure, including timeouts.
    RetryTransient(GatewayError),
    Success(MintReceipt),
}

impl CandidateOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            CandidateOutcome::SkipBalance { .. } => "skip_balance",
            CandidateOutcome::RetryStaleSequence => "stale_sequence",
            CandidateOutcome::RetryTransient(GatewayError::Timeout(_)) => "timeout",
            CandidateOutcome::RetryTransient(_) => "transient",
            CandidateOutcome::Success(_) => "success",
        }
    }
}
