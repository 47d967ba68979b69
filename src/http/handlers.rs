//! Route handlers.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::blockchain::parse_destination;
use crate::http::auth::{caller_address, not_publisher, AddressParams};
use crate::http::request::{client_ip, MintBody};
use crate::http::response::{bad_request, store_unavailable, MintResponse};
use crate::http::server::AppState;
use crate::relay::{IdentitySnapshot, MintRequest, RelayError};
use crate::store::VoucherState;

/// Mint bodies are two short strings.
const MAX_MINT_BODY_BYTES: usize = 16 * 1024;
const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 500;

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

/// `POST /relay/mint`
pub async fn relay_mint(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(&parts.headers, peer);

    let bytes = match axum::body::to_bytes(body, MAX_MINT_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(format!("Unreadable body: {}", e)),
    };
    let body: MintBody = match serde_json::from_slice(&bytes) {
        Ok(body) => body,
        Err(e) => return bad_request(format!("Invalid mint request: {}", e)),
    };

    let Some(destination) = parse_destination(&body.dest) else {
        return RelayError::InvalidDestination(body.dest).into_response();
    };
    if body.code_hash.trim().is_empty() {
        return RelayError::VoucherInvalid.into_response();
    }

    let mut mint = MintRequest::new(destination, body.code_hash.trim());
    if let Some(ip) = ip {
        mint = mint.with_client_ip(ip);
    }

    match state.dispatcher.relay(mint).await {
        Ok(receipt) => MintResponse::from(receipt).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "codeHash")]
    pub code_hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub ok: bool,
    pub code_hash: String,
    pub state: VoucherState,
    pub redeemable: bool,
}

/// `GET /relay/verify?codeHash=...`
pub async fn verify_voucher(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match state.dispatcher.verify_voucher(&params.code_hash).await {
        Ok(voucher_state) => Json(VerifyResponse {
            ok: true,
            redeemable: voucher_state == VoucherState::Valid,
            code_hash: params.code_hash,
            state: voucher_state,
        })
        .into_response(),
        Err(e) => store_unavailable(e),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingResponse {
    pub ok: bool,
    pub code_hash: String,
    /// `None` until the voucher has been redeemed.
    pub address: Option<String>,
}

/// `GET /relay/binding?codeHash=...`
pub async fn voucher_binding(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match state.dispatcher.voucher_binding(&params.code_hash).await {
        Ok(address) => Json(BindingResponse {
            ok: true,
            code_hash: params.code_hash,
            address: address.map(|a| a.to_string()),
        })
        .into_response(),
        Err(e) => store_unavailable(e),
    }
}

#[derive(Serialize)]
pub struct AccessResponse {
    pub ok: bool,
    pub role: &'static str,
}

/// `GET /api/admin/check-access?address=...`
pub async fn check_access(
    State(state): State<AppState>,
    Query(params): Query<AddressParams>,
    headers: HeaderMap,
) -> Response {
    let Some(address) = caller_address(&params, &headers) else {
        return bad_request("A wallet address is required");
    };
    match state.dispatcher.is_publisher(&address).await {
        Ok(true) => Json(AccessResponse {
            ok: true,
            role: "publisher",
        })
        .into_response(),
        Ok(false) => not_publisher(),
        Err(e) => store_unavailable(e),
    }
}

/// `GET /api/v1/stats/sales`
pub async fn sales_stats(State(state): State<AppState>) -> Response {
    match state.dispatcher.sales_stats().await {
        Ok(series) => Json(series).into_response(),
        Err(e) => store_unavailable(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

/// `GET /api/v1/stats/recent?limit=N`
pub async fn recent_mints(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT).min(MAX_RECENT_LIMIT);
    match state.dispatcher.recent_mints(limit).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => store_unavailable(e),
    }
}

#[derive(Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub identities: Vec<IdentitySnapshot>,
}

/// `GET /relay/pool`
pub async fn pool_status(State(state): State<AppState>) -> Json<PoolStatus> {
    let pool = state.dispatcher.pool();
    Json(PoolStatus {
        size: pool.len(),
        identities: pool.snapshot(),
    })
}
