//! Gateway configuration.

use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;

use durian_common::constants;
use durian_fx::{
    HttpRateProvider, RateCacheConfig, RateServiceConfig, FALLBACK_USD_PER_THB,
    OFFRAMP_COMMISSION_RATE,
};

/// Exchange rate configuration.
#[derive(Debug, Clone)]
pub struct RateConfig {
    /// How long a fetched rate is served from cache.
    pub cache_ttl: Duration,
    /// Timeout for a single provider request.
    pub fetch_timeout: Duration,
    /// Primary provider URL (THB base).
    pub primary_url: String,
    /// Alternate provider URL (USD base).
    pub secondary_url: String,
    /// USD per THB used when every provider fails.
    pub fallback_usd_per_thb: Decimal,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            cache_ttl: constants::rate_cache_ttl(),
            fetch_timeout: constants::rate_fetch_timeout(),
            primary_url: HttpRateProvider::EXCHANGERATE_API_URL.to_string(),
            secondary_url: HttpRateProvider::OPEN_ER_API_URL.to_string(),
            fallback_usd_per_thb: FALLBACK_USD_PER_THB,
        }
    }
}

impl RateConfig {
    /// Build the rate service configuration.
    pub fn service_config(&self) -> RateServiceConfig {
        RateServiceConfig {
            cache: RateCacheConfig {
                ttl: self.cache_ttl,
            },
            fetch_timeout: self.fetch_timeout,
            primary_url: self.primary_url.clone(),
            secondary_url: self.secondary_url.clone(),
            fallback_usd_per_thb: self.fallback_usd_per_thb,
            commission_rate: OFFRAMP_COMMISSION_RATE,
        }
    }
}

/// Main gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Database URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Maximum database connections.
    pub database_max_connections: u32,
    /// Exchange rate configuration.
    pub rate: RateConfig,
    /// E-mail addresses allowed to use the admin routes.
    pub admin_emails: Vec<String>,
    /// Log level.
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            database_url: None,
            database_max_connections: 10,
            rate: RateConfig::default(),
            admin_emails: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unparsable values keep the
    /// default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("GATEWAY_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = parse(&lookup, "GATEWAY_LISTEN_PORT") {
            config.listen_port = port;
        }

        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            config.database_url = Some(url);
        }

        if let Some(max) = parse(&lookup, "DATABASE_MAX_CONNECTIONS") {
            config.database_max_connections = max;
        }

        if let Some(ttl) = parse(&lookup, "RATE_CACHE_TTL_SECS").and_then(Duration::try_seconds) {
            config.rate.cache_ttl = ttl;
        }

        if let Some(timeout) =
            parse(&lookup, "RATE_FETCH_TIMEOUT_MS").and_then(Duration::try_milliseconds)
        {
            config.rate.fetch_timeout = timeout;
        }

        if let Some(url) = lookup("RATE_PRIMARY_URL") {
            config.rate.primary_url = url;
        }

        if let Some(url) = lookup("RATE_SECONDARY_URL") {
            config.rate.secondary_url = url;
        }

        if let Some(rate) = parse(&lookup, "RATE_FALLBACK_USD_PER_THB") {
            config.rate.fallback_usd_per_thb = rate;
        }

        if let Some(emails) = lookup("ADMIN_EMAILS") {
            config.admin_emails = emails
                .split(',')
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect();
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.database_max_connections == 0 {
            return Err("Database max connections cannot be 0".to_string());
        }

        if self.rate.cache_ttl <= Duration::zero() {
            return Err("Rate cache TTL must be positive".to_string());
        }

        if self.rate.fetch_timeout <= Duration::zero() {
            return Err("Rate fetch timeout must be positive".to_string());
        }

        for url in [&self.rate.primary_url, &self.rate.secondary_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Rate provider URL must be http(s): {url}"));
            }
        }

        if self.rate.fallback_usd_per_thb <= Decimal::ZERO {
            return Err("Fallback rate must be positive".to_string());
        }

        if let Some(email) = self.admin_emails.iter().find(|email| !email.contains('@')) {
            return Err(format!("Invalid admin e-mail: {email}"));
        }

        Ok(())
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}
