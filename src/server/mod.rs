//! HTTP surface: `/chat`, `/speech` and `/health`

pub mod handlers;
pub mod state;

use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::{ParleyError, Result};
pub use state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/speech", post(handlers::speech))
        .route("/health", get(handlers::health))
        .layer(trace_layer)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ParleyError::ServerError(e.to_string()))
}
