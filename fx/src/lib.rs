//! Durian FX Engine
//!
//! THB/USDC exchange rate service and offramp calculator.
//!
//! # Features
//!
//! - Primary and alternate public rate endpoints tried in order
//! - Single-entry rate cache with a 5-minute TTL and an injected clock
//! - Constant fallback rate when every provider fails (never cached)
//! - Offramp quotes: gross THB, 0.5% commission, net THB
//!
//! # Example
//!
//! ```rust,ignore
//! use durian_fx::{RateService, RateServiceConfig};
//!
//! let service = RateService::with_default_providers(RateServiceConfig::default())?;
//!
//! let lookup = service.get_rate().await;
//! println!("{}", lookup.rate.formatted());
//!
//! let quote = service.quote_offramp(dec!(100)).await?;
//! assert_eq!(quote.net_thb.value, quote.gross_thb.value - quote.commission_thb.value);
//! ```

pub mod rate;
pub mod provider;
pub mod cache;
pub mod offramp;
pub mod engine;
pub mod error;

pub use rate::{ExchangeRate, RateSource};
pub use provider::{FallbackRateProvider, HttpRateProvider, RateProvider};
pub use cache::{CacheStats, RateCache, RateCacheConfig};
pub use offramp::{
    parse_amount, validate_amount, OfframpCalculator, OfframpQuote, OFFRAMP_COMMISSION_RATE,
};
pub use engine::{RateLookup, RateService, RateServiceConfig, RateServiceStats, FALLBACK_USD_PER_THB};
pub use error::{FxError, FxResult};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
