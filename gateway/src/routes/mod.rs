//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod admin_offramp;
pub mod exchange_rate;
pub mod health;
pub mod offramp;

/// Creates the router with every route.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(exchange_rate::routes())
        .merge(offramp::routes())
        .merge(admin_offramp::routes())
}
