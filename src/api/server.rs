use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, AppState, HealthState};

/// Build the health router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `/health` on all interfaces until the task is aborted
pub async fn run_server(
    port: u16,
    health: HealthState,
    token: Option<String>,
) -> Result<(), std::io::Error> {
    let app = build_router(Arc::new(AppState { health, token }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting health server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
