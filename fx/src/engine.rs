//! Rate service: cached THB/USD rate with provider fallback, plus the
//! conversions built on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use durian_common::{constants, Clock, Currency, Money, SystemClock};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, RateCache, RateCacheConfig};
use crate::error::{FxError, FxResult};
use crate::offramp::{
    convert, validate_amount, OfframpCalculator, OfframpQuote, OFFRAMP_COMMISSION_RATE,
};
use crate::provider::{FallbackRateProvider, HttpRateProvider, RateProvider};
use crate::rate::ExchangeRate;

/// Approximate USD per THB used when every provider fails (≈ ฿35.71 per USDC).
pub const FALLBACK_USD_PER_THB: Decimal = Decimal::from_parts(28, 0, 0, false, 3);

/// Configuration for the rate service.
#[derive(Debug, Clone)]
pub struct RateServiceConfig {
    /// Cache configuration.
    pub cache: RateCacheConfig,
    /// Per-request timeout for provider fetches.
    pub fetch_timeout: Duration,
    /// Primary provider endpoint (USD per THB).
    pub primary_url: String,
    /// Alternate provider endpoint (THB per USD).
    pub secondary_url: String,
    /// Rate returned when no provider answers.
    pub fallback_usd_per_thb: Decimal,
    /// Offramp commission fraction.
    pub commission_rate: Decimal,
}

impl Default for RateServiceConfig {
    fn default() -> Self {
        Self {
            cache: RateCacheConfig::default(),
            fetch_timeout: constants::rate_fetch_timeout(),
            primary_url: HttpRateProvider::EXCHANGERATE_API_URL.to_string(),
            secondary_url: HttpRateProvider::OPEN_ER_API_URL.to_string(),
            fallback_usd_per_thb: FALLBACK_USD_PER_THB,
            commission_rate: OFFRAMP_COMMISSION_RATE,
        }
    }
}

/// Result of a rate lookup.
#[derive(Debug, Clone)]
pub struct RateLookup {
    /// The rate.
    pub rate: ExchangeRate,
    /// Whether it was served from cache.
    pub cached: bool,
}

/// The rate service.
pub struct RateService {
    provider: Arc<dyn RateProvider>,
    cache: RateCache,
    calculator: OfframpCalculator,
    clock: Arc<dyn Clock>,
    fallback_usd_per_thb: Decimal,
    live_fetches: AtomicU64,
    fallbacks: AtomicU64,
}

impl RateService {
    /// Create a new rate service with the given provider and clock.
    pub fn new(
        provider: Arc<dyn RateProvider>,
        config: RateServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fallback_usd_per_thb = if config.fallback_usd_per_thb > Decimal::ZERO {
            config.fallback_usd_per_thb
        } else {
            warn!(
                configured = %config.fallback_usd_per_thb,
                "Ignoring non-positive fallback rate"
            );
            FALLBACK_USD_PER_THB
        };

        Self {
            provider,
            cache: RateCache::new(config.cache, clock.clone()),
            calculator: OfframpCalculator::new(config.commission_rate),
            clock,
            fallback_usd_per_thb,
            live_fetches: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Create a service backed by the primary and alternate HTTP providers.
    pub fn with_default_providers(config: RateServiceConfig) -> FxResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let primary = HttpRateProvider::exchangerate_api(
            config.primary_url.clone(),
            config.fetch_timeout,
            clock.clone(),
        )?;
        let secondary = HttpRateProvider::open_er_api(
            config.secondary_url.clone(),
            config.fetch_timeout,
            clock.clone(),
        )?;

        let chain = FallbackRateProvider::new(vec![
            Arc::new(primary) as Arc<dyn RateProvider>,
            Arc::new(secondary) as Arc<dyn RateProvider>,
        ]);
        info!(providers = chain.len(), "Rate provider chain configured");

        Ok(Self::new(Arc::new(chain), config, clock))
    }

    /// Get the current rate.
    ///
    /// Serves the cache while fresh, otherwise asks the provider chain. When
    /// every provider fails the fallback rate is returned and not cached, so
    /// the next call tries the network again. Never fails.
    #[instrument(skip(self))]
    pub async fn get_rate(&self) -> RateLookup {
        if let Some(rate) = self.cache.get() {
            debug!("Using cached rate");
            return RateLookup { rate, cached: true };
        }

        match self.provider.fetch_rate().await {
            Ok(rate) => {
                self.live_fetches.fetch_add(1, Ordering::Relaxed);
                info!(
                    source = %rate.source,
                    usd_per_thb = %rate.usd_per_thb(),
                    "Live rate fetched"
                );
                self.cache.insert(rate.clone());
                RateLookup { rate, cached: false }
            }
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Using fallback rate");
                RateLookup {
                    rate: self.fallback_rate(),
                    cached: false,
                }
            }
        }
    }

    /// Cached rate if fresh, otherwise the fallback. Never touches the network.
    pub fn peek_rate(&self) -> RateLookup {
        match self.cache.get() {
            Some(rate) => RateLookup { rate, cached: true },
            None => RateLookup {
                rate: self.fallback_rate(),
                cached: false,
            },
        }
    }

    /// Quote an offramp of `amount_usdc` at the current rate.
    #[instrument(skip(self), fields(amount_usdc = %amount_usdc))]
    pub async fn quote_offramp(&self, amount_usdc: Decimal) -> FxResult<OfframpQuote> {
        validate_amount(amount_usdc)?;
        let lookup = self.get_rate().await;
        self.calculator.calculate(amount_usdc, &lookup.rate)
    }

    /// Convert a THB price into USDC for payments (no commission, 6 places).
    pub async fn thb_to_usdc(&self, amount: &Money) -> FxResult<Money> {
        ensure_currency(amount, Currency::thb())?;
        let lookup = self.get_rate().await;
        Ok(convert(amount.value, lookup.rate.usd_per_thb(), Currency::usdc())?.round())
    }

    /// Convert a USDC amount into THB for display (no commission, 2 places).
    pub async fn usdc_to_thb(&self, amount: &Money) -> FxResult<Money> {
        ensure_currency(amount, Currency::usdc())?;
        let lookup = self.get_rate().await;
        Ok(convert(amount.value, lookup.rate.thb_per_usdc(), Currency::thb())?.round())
    }

    /// Calculator configured with this service's commission.
    pub fn calculator(&self) -> &OfframpCalculator {
        &self.calculator
    }

    /// Offramp commission as a percentage.
    pub fn commission_percent(&self) -> Decimal {
        self.calculator.commission_percent()
    }

    /// Get service statistics.
    pub fn stats(&self) -> RateServiceStats {
        RateServiceStats {
            cache: self.cache.stats(),
            live_fetches: self.live_fetches.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    fn fallback_rate(&self) -> ExchangeRate {
        ExchangeRate::fallback(self.fallback_usd_per_thb, self.clock.now())
    }
}

fn ensure_currency(amount: &Money, expected: Currency) -> FxResult<()> {
    if amount.currency != expected {
        return Err(FxError::CurrencyMismatch {
            expected,
            actual: amount.currency.clone(),
        });
    }
    validate_amount(amount.value)?;
    Ok(())
}

/// Service statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RateServiceStats {
    pub cache: CacheStats,
    pub live_fetches: u64,
    pub fallbacks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockRateProvider;
    use crate::rate::RateSource;
    use chrono::Utc;
    use durian_common::ManualClock;
    use rust_decimal_macros::dec;

    struct Harness {
        provider: Arc<MockRateProvider>,
        clock: Arc<ManualClock>,
        service: RateService,
    }

    fn setup() -> Harness {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_rate(dec!(0.028));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = RateService::new(provider.clone(), RateServiceConfig::default(), clock.clone());
        Harness {
            provider,
            clock,
            service,
        }
    }

    #[tokio::test]
    async fn test_get_rate() {
        let h = setup();
        let lookup = h.service.get_rate().await;

        assert!(!lookup.cached);
        assert_eq!(lookup.rate.usd_per_thb(), dec!(0.028));
        assert_eq!(lookup.rate.source, RateSource::Provider("test".into()));
    }

    #[tokio::test]
    async fn test_cache_hit_survives_network_failure() {
        let h = setup();
        let first = h.service.get_rate().await;

        h.provider.fail();
        h.clock.advance(Duration::seconds(120));
        let second = h.service.get_rate().await;

        assert!(second.cached);
        assert_eq!(first.rate.usd_per_thb(), second.rate.usd_per_thb());
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let h = setup();
        h.service.get_rate().await;

        h.provider.set_rate(dec!(0.030));
        h.clock.advance(Duration::seconds(301));
        let lookup = h.service.get_rate().await;

        assert!(!lookup.cached);
        assert_eq!(lookup.rate.usd_per_thb(), dec!(0.030));
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_is_not_cached() {
        let h = setup();
        h.provider.fail();

        let lookup = h.service.get_rate().await;
        assert_eq!(lookup.rate.source, RateSource::Fallback);
        assert_eq!(lookup.rate.usd_per_thb(), FALLBACK_USD_PER_THB);

        h.provider.set_rate(dec!(0.029));
        let lookup = h.service.get_rate().await;
        assert_eq!(lookup.rate.source, RateSource::Provider("test".into()));
        assert_eq!(h.provider.calls(), 2);

        let stats = h.service.stats();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.live_fetches, 1);
    }

    #[tokio::test]
    async fn test_peek_rate_never_fetches() {
        let h = setup();
        assert_eq!(h.service.peek_rate().rate.source, RateSource::Fallback);
        assert_eq!(h.provider.calls(), 0);

        h.service.get_rate().await;
        let peeked = h.service.peek_rate();
        assert!(peeked.cached);
        assert_eq!(peeked.rate.usd_per_thb(), dec!(0.028));
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_quote_offramp_validates_before_fetching() {
        let h = setup();

        assert!(matches!(
            h.service.quote_offramp(Decimal::ZERO).await,
            Err(FxError::InvalidAmount(_))
        ));
        assert!(matches!(
            h.service.quote_offramp(dec!(-1)).await,
            Err(FxError::InvalidAmount(_))
        ));
        assert_eq!(h.provider.calls(), 0);

        let quote = h.service.quote_offramp(dec!(100)).await.unwrap();
        assert_eq!(quote.net_thb.value, dec!(3553.57));
    }

    #[tokio::test]
    async fn test_payment_conversions() {
        let h = setup();

        let usdc = h.service.thb_to_usdc(&Money::thb(dec!(150))).await.unwrap();
        assert_eq!(usdc, Money::usdc(dec!(4.2)));

        let thb = h.service.usdc_to_thb(&Money::usdc(dec!(10))).await.unwrap();
        assert_eq!(thb.value, dec!(357.14));

        assert!(matches!(
            h.service.thb_to_usdc(&Money::usdc(dec!(1))).await,
            Err(FxError::CurrencyMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected_before_fetching() {
        let h = setup();
        let huge = Decimal::MAX;

        assert!(matches!(
            h.service.quote_offramp(huge).await,
            Err(FxError::InvalidAmount(_))
        ));
        assert!(matches!(
            h.service.usdc_to_thb(&Money::usdc(huge)).await,
            Err(FxError::InvalidAmount(_))
        ));
        assert!(matches!(
            h.service.thb_to_usdc(&Money::thb(huge)).await,
            Err(FxError::InvalidAmount(_))
        ));
        assert_eq!(h.provider.calls(), 0);
    }
}
