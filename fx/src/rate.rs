//! THB/USD exchange rate.

use chrono::Duration;
use durian_common::{round_half_up, Timestamp};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FxError, FxResult};

/// Where a rate value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// Fetched from a named external provider.
    Provider(String),
    /// Hardcoded approximation used when every provider failed.
    Fallback,
}

impl RateSource {
    /// Short label for logs and API responses.
    pub fn label(&self) -> &str {
        match self {
            RateSource::Provider(name) => name,
            RateSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Conversion factor between Thai Baht and USD (1 USDC is treated as 1 USD).
///
/// Both directions are held so that a rate quoted as THB per USD does not
/// lose precision by being inverted twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    usd_per_thb: Decimal,
    thb_per_usdc: Decimal,
    /// When the value was obtained.
    pub fetched_at: Timestamp,
    /// Where the value was obtained.
    pub source: RateSource,
}

impl ExchangeRate {
    /// Build from a USD-per-THB quote.
    pub fn from_usd_per_thb(
        usd_per_thb: Decimal,
        source: RateSource,
        fetched_at: Timestamp,
    ) -> FxResult<Self> {
        let usd_per_thb = ensure_positive(usd_per_thb, &source)?;
        Ok(Self {
            usd_per_thb,
            thb_per_usdc: Decimal::ONE / usd_per_thb,
            fetched_at,
            source,
        })
    }

    /// Build from a THB-per-USD(C) quote.
    pub fn from_thb_per_usdc(
        thb_per_usdc: Decimal,
        source: RateSource,
        fetched_at: Timestamp,
    ) -> FxResult<Self> {
        let thb_per_usdc = ensure_positive(thb_per_usdc, &source)?;
        Ok(Self {
            usd_per_thb: Decimal::ONE / thb_per_usdc,
            thb_per_usdc,
            fetched_at,
            source,
        })
    }

    /// Fallback rate from a value already known to be positive.
    pub(crate) fn fallback(usd_per_thb: Decimal, fetched_at: Timestamp) -> Self {
        Self {
            usd_per_thb,
            thb_per_usdc: Decimal::ONE / usd_per_thb,
            fetched_at,
            source: RateSource::Fallback,
        }
    }

    /// USD per 1 THB.
    pub fn usd_per_thb(&self) -> Decimal {
        self.usd_per_thb
    }

    /// THB per 1 USDC.
    pub fn thb_per_usdc(&self) -> Decimal {
        self.thb_per_usdc
    }

    /// Whether the rate is younger than `ttl` at `now`.
    pub fn is_fresh(&self, now: Timestamp, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }

    /// Display form, e.g. `1 USDC = ฿35.70`.
    pub fn formatted(&self) -> String {
        format!("1 USDC = ฿{:.2}", round_half_up(self.thb_per_usdc, 2))
    }
}

/// Convert a JSON float into a positive decimal rate.
pub(crate) fn decimal_from_f64(value: f64, provider: &str) -> FxResult<Decimal> {
    if !value.is_finite() {
        return Err(FxError::InvalidRate {
            provider: provider.to_string(),
            reason: format!("{value} is not finite"),
        });
    }
    Decimal::from_f64(value).ok_or_else(|| FxError::InvalidRate {
        provider: provider.to_string(),
        reason: format!("{value} is out of range"),
    })
}

fn ensure_positive(value: Decimal, source: &RateSource) -> FxResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(FxError::InvalidRate {
            provider: source.label().to_string(),
            reason: format!("{value} is not positive"),
        });
    }
    Ok(value)
}
