use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Header carrying the shared health token
pub const TOKEN_HEADER: &str = "x-signwatch-token";

/// Most recent sample taken by any poll loop
#[derive(Debug, Clone)]
pub struct TargetStatus {
    pub target: String,
    pub alerted: bool,
    pub at: DateTime<Utc>,
}

/// Snapshot of monitor health
///
/// Loops only write, the endpoint only reads; alert decisions never consult it.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    latest: Arc<RwLock<Option<TargetStatus>>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a finished cycle
    pub fn record(&self, target: &str, alerted: bool) {
        *self.latest.write() = Some(TargetStatus {
            target: target.to_string(),
            alerted,
            at: Utc::now(),
        });
    }

    pub fn latest(&self) -> Option<TargetStatus> {
        self.latest.read().clone()
    }

    /// Healthy unless the latest sampled target is alarmed
    pub fn is_healthy(&self) -> bool {
        self.latest
            .read()
            .as_ref()
            .map(|status| !status.alerted)
            .unwrap_or(true)
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub health: HealthState,
    pub token: Option<String>,
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn health_check(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, &'static str), ApiError> {
    if let Some(token) = &state.token {
        let presented = headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(token.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }

    if state.health.is_healthy() {
        Ok((StatusCode::OK, "OK"))
    } else {
        if let Some(status) = state.health.latest() {
            tracing::debug!(monitor = %status.target, at = %status.at, "Reporting unhealthy");
        }
        Ok((StatusCode::SERVICE_UNAVAILABLE, "NOTOK"))
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
        }
    }
}
