//! Timeout enforcement.
//!
//! Wraps gateway calls so that a hung RPC turns into a classified
//! [`GatewayError::Timeout`] instead of pinning a sender's guard forever.

use std::future::Future;
use std::time::Duration;

use crate::blockchain::types::{GatewayError, GatewayResult};

/// Run a gateway call with a deadline.
pub async fn with_timeout<F, T>(limit: Duration, call: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}
