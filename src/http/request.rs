//! Request parsing.
//!
//! # Responsibilities
//! - Resolve the client IP behind proxies
//! - Decode the mint request body

use std::net::SocketAddr;

use axum::http::HeaderMap;
use serde::Deserialize;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Body of `POST /relay/mint`.
#[derive(Debug, Clone, Deserialize)]
pub struct MintBody {
    /// Destination address, hex.
    pub dest: String,
    /// Voucher identifier.
    #[serde(rename = "codeHash")]
    pub code_hash: String,
}

/// Client IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get(X_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    peer.map(|addr| addr.ip().to_string())
}
