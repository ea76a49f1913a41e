//! Monetary types for the Durian settlement service.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Rounding policy for every user-facing amount: round half up (away from zero).
pub const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Largest amount accepted in either currency (one trillion). Every figure
/// derived from it at a realistic rate fits the `NUMERIC(20, 6)` columns.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// A monetary amount with currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount value (high precision decimal).
    pub value: Decimal,
    /// Currency or token code.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money instance.
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Create a THB amount.
    pub fn thb(value: Decimal) -> Self {
        Self::new(value, Currency::thb())
    }

    /// Create a USDC amount.
    pub fn usdc(value: Decimal) -> Self {
        Self::new(value, Currency::usdc())
    }

    /// Check if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Multiply by `factor`, or `None` if the product overflows.
    pub fn checked_mul(&self, factor: Decimal) -> Option<Self> {
        self.value
            .checked_mul(factor)
            .map(|value| Self::new(value, self.currency.clone()))
    }

    /// Check that the amount has no more fractional digits than the
    /// currency carries.
    pub fn fits_decimal_places(&self) -> bool {
        self.value.normalize().scale() <= self.currency.decimal_places()
    }

    /// Round to the currency's standard decimal places, half up.
    pub fn round(&self) -> Self {
        Self {
            value: round_half_up(self.value, self.currency.decimal_places()),
            currency: self.currency.clone(),
        }
    }
}

/// Round `value` to `places` decimal places using [`ROUNDING`].
pub fn round_half_up(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, ROUNDING)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

impl Sub for Money {
    type Output = Result<Money, CurrencyMismatchError>;

    fn sub(self, other: Money) -> Self::Output {
        if self.currency != other.currency {
            return Err(CurrencyMismatchError {
                expected: self.currency,
                actual: other.currency,
            });
        }
        Ok(Money {
            value: self.value - other.value,
            currency: self.currency,
        })
    }
}

/// Error when attempting operations on different currencies.
#[derive(Debug, Clone)]
pub struct CurrencyMismatchError {
    pub expected: Currency,
    pub actual: Currency,
}

impl fmt::Display for CurrencyMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Currency mismatch: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for CurrencyMismatchError {}

/// Currency or token code (ISO 4217 for fiat).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Standard decimal places used when presenting amounts.
    pub fn decimal_places(&self) -> u32 {
        match self.0.as_str() {
            "USDC" | "USDT" => 6,
            "JPY" | "KRW" | "VND" => 0,
            _ => 2,
        }
    }

    pub fn thb() -> Self {
        Self::new("THB")
    }

    pub fn usdc() -> Self {
        Self::new("USDC")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
