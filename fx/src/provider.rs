//! Rate provider traits and implementations.

use async_trait::async_trait;
use durian_common::{Clock, DurationExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};
use crate::rate::{decimal_from_f64, ExchangeRate, RateSource};

/// Trait for THB/USD rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the current rate.
    async fn fetch_rate(&self) -> FxResult<ExchangeRate>;
}

/// How a provider's `latest` payload expresses the THB/USD relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDirection {
    /// Base THB, read `rates.USD` (USD per THB).
    UsdPerThb,
    /// Base USD, read `rates.THB` (THB per USD).
    ThbPerUsd,
}

impl QuoteDirection {
    fn field(&self) -> &'static str {
        match self {
            QuoteDirection::UsdPerThb => "USD",
            QuoteDirection::ThbPerUsd => "THB",
        }
    }
}

/// `latest` payload shared by exchangerate-api.com and open.er-api.com.
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Provider backed by a public `latest rates` JSON endpoint.
pub struct HttpRateProvider {
    name: String,
    url: String,
    direction: QuoteDirection,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl HttpRateProvider {
    /// Default primary endpoint, quoted with THB as base.
    pub const EXCHANGERATE_API_URL: &'static str = "https://api.exchangerate-api.com/v4/latest/THB";
    /// Default alternate endpoint, quoted with USD as base.
    pub const OPEN_ER_API_URL: &'static str = "https://open.er-api.com/v6/latest/USD";

    /// Create a provider with a request timeout.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        direction: QuoteDirection,
        timeout: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> FxResult<Self> {
        let name = name.into();
        let client = Client::builder()
            .timeout(timeout.as_std())
            .build()
            .map_err(|e| FxError::ProviderError {
                provider: name.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name,
            url: url.into(),
            direction,
            client,
            clock,
        })
    }

    /// Primary provider: exchangerate-api.com, base THB.
    pub fn exchangerate_api(
        url: impl Into<String>,
        timeout: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> FxResult<Self> {
        Self::new("exchangerate-api", url, QuoteDirection::UsdPerThb, timeout, clock)
    }

    /// Alternate provider: open.er-api.com, base USD.
    pub fn open_er_api(
        url: impl Into<String>,
        timeout: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> FxResult<Self> {
        Self::new("open-er-api", url, QuoteDirection::ThbPerUsd, timeout, clock)
    }

    fn provider_error(&self, message: impl Into<String>) -> FxError {
        FxError::ProviderError {
            provider: self.name.clone(),
            message: message.into(),
        }
    }

    fn parse_rate(&self, body: LatestRatesResponse) -> FxResult<ExchangeRate> {
        let field = self.direction.field();
        let raw = body
            .rates
            .get(field)
            .copied()
            .ok_or_else(|| self.provider_error(format!("response has no rates.{field}")))?;

        let value = decimal_from_f64(raw, &self.name)?;
        let source = RateSource::Provider(self.name.clone());
        let now = self.clock.now();

        match self.direction {
            QuoteDirection::UsdPerThb => ExchangeRate::from_usd_per_thb(value, source, now),
            QuoteDirection::ThbPerUsd => ExchangeRate::from_thb_per_usdc(value, source, now),
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rate(&self) -> FxResult<ExchangeRate> {
        let response = self
            .client
            .get(&self.url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| self.provider_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.provider_error(format!("HTTP {}", response.status())));
        }

        let body: LatestRatesResponse = response
            .json()
            .await
            .map_err(|e| self.provider_error(e.to_string()))?;

        self.parse_rate(body)
    }
}

/// Tries providers in order and returns the first valid rate.
pub struct FallbackRateProvider {
    providers: Vec<Arc<dyn RateProvider>>,
}

impl FallbackRateProvider {
    /// Create a chain; earlier providers take priority.
    pub fn new(providers: Vec<Arc<dyn RateProvider>>) -> Self {
        Self { providers }
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl RateProvider for FallbackRateProvider {
    fn name(&self) -> &str {
        "chain"
    }

    async fn fetch_rate(&self) -> FxResult<ExchangeRate> {
        if self.providers.is_empty() {
            return Err(FxError::NoProvidersAvailable);
        }

        for provider in &self.providers {
            match provider.fetch_rate().await {
                Ok(rate) => {
                    debug!(
                        provider = provider.name(),
                        usd_per_thb = %rate.usd_per_thb(),
                        "Got rate from provider"
                    );
                    return Ok(rate);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed to return rate"
                    );
                }
            }
        }

        Err(FxError::RateNotAvailable)
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    usd_per_thb: parking_lot::Mutex<Option<rust_decimal::Decimal>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider that fails until a rate is set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usd_per_thb: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Answer subsequent fetches with this USD-per-THB value.
    pub fn set_rate(&self, usd_per_thb: rust_decimal::Decimal) {
        *self.usd_per_thb.lock() = Some(usd_per_thb);
    }

    /// Fail subsequent fetches.
    pub fn fail(&self) {
        *self.usd_per_thb.lock() = None;
    }

    /// Number of fetches attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rate(&self) -> FxResult<ExchangeRate> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let value = *self.usd_per_thb.lock();
        match value {
            Some(usd_per_thb) => ExchangeRate::from_usd_per_thb(
                usd_per_thb,
                RateSource::Provider(self.name.clone()),
                chrono::Utc::now(),
            ),
            None => Err(FxError::ProviderError {
                provider: self.name.clone(),
                message: "mock failure".to_string(),
            }),
        }
    }
}
