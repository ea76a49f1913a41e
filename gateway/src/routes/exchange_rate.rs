//! Public exchange rate and offramp quote route.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use durian_common::{round_half_up, Timestamp};
use durian_fx::{parse_amount, OfframpQuote, RateLookup};

use crate::{ApiError, AppState};

/// Creates the exchange rate routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/exchange-rate", get(get_exchange_rate))
}

/// Query parameters for the exchange rate lookup.
#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    /// Optional USDC amount to quote an offramp for.
    pub usdc: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBody {
    /// THB per USDC, 4 places.
    #[serde(with = "rust_decimal::serde::float")]
    pub thb_per_usdc: Decimal,
    /// USD per THB, 6 places.
    #[serde(with = "rust_decimal::serde::float")]
    pub usd_per_thb: Decimal,
    pub formatted: String,
    pub source: String,
    pub cached: bool,
}

impl From<&RateLookup> for RateBody {
    fn from(lookup: &RateLookup) -> Self {
        Self {
            thb_per_usdc: round_half_up(lookup.rate.thb_per_usdc(), 4),
            usd_per_thb: round_half_up(lookup.rate.usd_per_thb(), 6),
            formatted: lookup.rate.formatted(),
            source: lookup.rate.source.label().to_string(),
            cached: lookup.cached,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfframpBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_usdc: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_thb: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub commission_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub commission_usdc: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub commission_thb: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_thb: Decimal,
}

impl From<&OfframpQuote> for OfframpBody {
    fn from(quote: &OfframpQuote) -> Self {
        Self {
            amount_usdc: quote.amount_usdc.value,
            gross_thb: quote.gross_thb.value,
            commission_percent: quote.commission_percent,
            commission_usdc: quote.commission_usdc.value,
            commission_thb: quote.commission_thb.value,
            net_thb: quote.net_thb.value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub offramp_percent: Decimal,
}

/// Response for `GET /api/exchange-rate`.
#[derive(Debug, Serialize)]
pub struct ExchangeRateResponse {
    pub rate: RateBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offramp: Option<OfframpBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionBody>,
    pub timestamp: Timestamp,
}

/// GET `/api/exchange-rate[?usdc=<amount>]` - current rate, plus an offramp
/// quote when an amount is given.
async fn get_exchange_rate(
    State(state): State<AppState>,
    Query(query): Query<ExchangeRateQuery>,
) -> Result<Json<ExchangeRateResponse>, ApiError> {
    state.metrics.rate_requested();

    // An empty `usdc=` is treated like no amount at all.
    let amount = query
        .usdc
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_amount)
        .transpose()?;

    let lookup = state.rates.get_rate().await;

    let (offramp, commission) = match amount {
        Some(amount) => {
            let quote = state.rates.calculator().calculate(amount, &lookup.rate)?;
            state.metrics.quote_issued();
            debug!(
                amount_usdc = %amount,
                net_thb = %quote.net_thb,
                "Offramp quoted"
            );
            (Some(OfframpBody::from(&quote)), None)
        }
        None => (
            None,
            Some(CommissionBody {
                offramp_percent: state.rates.commission_percent(),
            }),
        ),
    };

    Ok(Json(ExchangeRateResponse {
        rate: RateBody::from(&lookup),
        offramp,
        commission,
        timestamp: durian_common::now(),
    }))
}
