//! Durian Gateway
//!
//! HTTP surface for the THB/USDC exchange rate, offramp quotes, and the
//! admin offramp review workflow.

pub mod admin;
pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use durian_fx::RateService;
use durian_ledger::OfframpService;

pub use admin::{AdminAllowlist, AdminUser};
pub use config::{GatewayConfig, RateConfig};
pub use error::ApiError;
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cached exchange rate and offramp calculator.
    pub rates: Arc<RateService>,
    /// Offramp request lifecycle.
    pub offramps: Arc<OfframpService>,
    /// Admin e-mail allowlist.
    pub admins: Arc<AdminAllowlist>,
    /// Request counters.
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        rates: Arc<RateService>,
        offramps: Arc<OfframpService>,
        admins: AdminAllowlist,
    ) -> Self {
        Self {
            rates,
            offramps,
            admins: Arc::new(admins),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
