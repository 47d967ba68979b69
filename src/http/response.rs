//! Response envelopes.
//!
//! Every JSON response carries `ok`. Failures add a stable `error` kind and
//! a human-readable `message`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::relay::{MintReceipt, RelayError};
use crate::store::StoreError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub ok: bool,
    pub status: &'static str,
    pub tx_hash: String,
}

impl From<MintReceipt> for MintResponse {
    fn from(receipt: MintReceipt) -> Self {
        Self {
            ok: true,
            status: "submitted",
            tx_hash: receipt.tx_hash.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error,
            message: message.into(),
        }
    }
}

/// Status code for a terminal relay error.
pub fn status_for(error: &RelayError) -> StatusCode {
    match error {
        RelayError::VoucherInvalid => StatusCode::FORBIDDEN,
        RelayError::AllRelayersExhausted => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::RollbackFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        RelayError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::InvalidDestination(_) => StatusCode::BAD_REQUEST,
        RelayError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        (status, Json(ErrorResponse::new(self.kind(), self.to_string()))).into_response()
    }
}

impl IntoResponse for MintResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Store failure on a read-only endpoint.
pub fn store_unavailable(error: StoreError) -> Response {
    tracing::error!(error = %error, "Voucher store query failed");
    RelayError::Store(error).into_response()
}

/// Malformed request body.
pub fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("INVALID_REQUEST", message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&RelayError::VoucherInvalid), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&RelayError::AllRelayersExhausted), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_for(&RelayError::InvalidDestination("x".into())),
            StatusCode::BAD_REQUEST
        );
        let rollback = RelayError::RollbackFailed {
            voucher_id: "v1".into(),
            source: StoreError::Unavailable("down".into()),
        };
        assert_eq!(status_for(&rollback), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_mint_response_shape() {
        let response = MintResponse {
            ok: true,
            status: "submitted",
            tx_hash: "0xabc".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["txHash"], "0xabc");
        assert_eq!(json["status"], "submitted");
        assert_eq!(json["ok"], true);
    }
}
