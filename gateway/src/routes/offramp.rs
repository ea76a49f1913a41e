//! Offramp request submission by businesses.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use durian_ledger::NewOfframpRequest;

use crate::{ApiError, AppState};

/// Creates the offramp submission routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/offramp", post(create_offramp))
}

/// POST `/api/offramp` - request a USDC withdrawal to a THB bank account.
///
/// The stored `amount_thb` is the net payout quoted at submission time; the
/// admin may overwrite it when fulfilling.
async fn create_offramp(
    State(state): State<AppState>,
    payload: Result<Json<NewOfframpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let quote = state.rates.quote_offramp(request.amount_usdc).await?;
    state.metrics.quote_issued();

    let record = state
        .offramps
        .create(request, Some(quote.net_thb.value))
        .await?;
    state.metrics.offramp_created();

    info!(
        offramp_id = %record.id,
        business_id = %record.business_id,
        rate_source = %quote.rate_source,
        "Offramp request submitted"
    );

    Ok((StatusCode::CREATED, Json(json!({ "offrampRequest": record }))))
}
