//! Terminal relay errors.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that cross the dispatcher boundary.
///
/// Per-candidate failures never appear here; they are absorbed by failover.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Voucher unknown, already used, or reserved by another request.
    #[error("Voucher is not redeemable")]
    VoucherInvalid,

    /// Every sender was tried and none submitted. The voucher was returned.
    #[error("All relayers exhausted")]
    AllRelayersExhausted,

    /// Every sender failed and the voucher could not be returned to the valid set.
    #[error("Failed to return voucher {voucher_id} after exhausting relayers: {source}")]
    RollbackFailed {
        voucher_id: String,
        #[source]
        source: StoreError,
    },

    /// The store failed before anything was reserved.
    #[error("Voucher store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid destination address: {0}")]
    InvalidDestination(String),

    /// The redemption task died before reporting an outcome. The voucher
    /// may still be in flight.
    #[error("Redemption interrupted: {0}")]
    Interrupted(String),
}

impl RelayError {
    /// Stable wire identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::VoucherInvalid => "VOUCHER_INVALID",
            RelayError::AllRelayersExhausted => "ALL_RELAYERS_EXHAUSTED",
            RelayError::RollbackFailed { .. } => "ROLLBACK_FAILED",
            RelayError::Store(_) => "STORE_UNAVAILABLE",
            RelayError::InvalidDestination(_) => "INVALID_DESTINATION",
            RelayError::Interrupted(_) => "INTERNAL_ERROR",
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(RelayError::VoucherInvalid.kind(), "VOUCHER_INVALID");
        assert_eq!(RelayError::AllRelayersExhausted.kind(), "ALL_RELAYERS_EXHAUSTED");
        let err = RelayError::RollbackFailed {
            voucher_id: "v1".into(),
            source: StoreError::Unavailable("down".into()),
        };
        assert_eq!(err.kind(), "ROLLBACK_FAILED");
        assert!(err.to_string().contains("v1"));
    }
}
