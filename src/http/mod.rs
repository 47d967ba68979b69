//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, CORS, timeout, tracing layers)
//!     → auth.rs (publisher gate on statistics routes)
//!     → request.rs (client IP, mint body parsing)
//!     → handlers.rs (call the dispatcher or a store query)
//!     → response.rs (JSON envelope, error kind → status code)
//! ```

pub mod auth;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
