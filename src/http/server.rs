//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, request timeout, tracing, publisher gate)
//! - Bind server to listener and shut down gracefully

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::http::{auth, handlers};
use crate::relay::RelayDispatcher;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RelayDispatcher>,
}

/// HTTP front end for the relay dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ListenerConfig, dispatcher: Arc<RelayDispatcher>) -> Self {
        let state = AppState { dispatcher };
        let router = Self::build_router(Duration::from_secs(config.request_timeout_secs), state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(request_timeout: Duration, state: AppState) -> Router {
        let publisher_routes = Router::new()
            .route("/api/v1/stats/sales", get(handlers::sales_stats))
            .route("/api/v1/stats/recent", get(handlers::recent_mints))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth::publisher_only));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/relay/mint", post(handlers::relay_mint))
            .route("/relay/verify", get(handlers::verify_voucher))
            .route("/relay/binding", get(handlers::voucher_binding))
            .route("/relay/pool", get(handlers::pool_status))
            .route("/api/admin/check-access", get(handlers::check_access))
            .merge(publisher_routes)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Router for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
