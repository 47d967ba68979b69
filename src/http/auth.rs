//! Publisher gate for the statistics routes.
//!
//! The caller names a wallet address with `?address=` or
//! `Authorization: Bearer <address>`. It must be in the store's publisher set.

use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::http::response::{store_unavailable, ErrorResponse};
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AddressParams {
    pub address: Option<String>,
}

/// Address from the query string, else from a bearer token.
pub fn caller_address(params: &AddressParams, headers: &HeaderMap) -> Option<String> {
    let from_query = params
        .address
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(address) = from_query {
        return Some(address.to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("UNAUTHORIZED", "A wallet address is required")),
    )
        .into_response()
}

pub fn not_publisher() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::new("FORBIDDEN", "Publisher role required")),
    )
        .into_response()
}

/// Middleware: pass only callers holding the publisher role.
pub async fn publisher_only(
    State(state): State<AppState>,
    Query(params): Query<AddressParams>,
    request: Request,
    next: Next,
) -> Response {
    let Some(address) = caller_address(&params, request.headers()) else {
        return unauthorized();
    };

    match state.dispatcher.is_publisher(&address).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::info!(%address, path = %request.uri().path(), "Rejected non-publisher");
            not_publisher()
        }
        Err(e) => store_unavailable(e),
    }
}
