//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use durian_fx::RateServiceStats;

use crate::{AppState, MetricsSnapshot};

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Rate cache and provider counters.
    pub rates: RateServiceStats,
    /// Request counters.
    pub metrics: MetricsSnapshot,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        rates: state.rates.stats(),
        metrics: state.metrics.snapshot(),
    })
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_reports_counters() {
        let app = test_app();
        app.get("/api/exchange-rate").await;

        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["metrics"]["rate_requests"], 1);
        assert_eq!(body["rates"]["live_fetches"], 1);
    }
}
