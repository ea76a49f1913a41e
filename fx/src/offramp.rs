//! Offramp amount calculation: USDC withdrawal into a THB payout net of
//! platform commission.

use durian_common::{Currency, Money, Timestamp, MAX_AMOUNT};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::error::{FxError, FxResult};
use crate::rate::{ExchangeRate, RateSource};

/// Platform commission on offramps: 0.5%.
pub const OFFRAMP_COMMISSION_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Parse a user-supplied USDC amount and validate it.
pub fn parse_amount(raw: &str) -> FxResult<Decimal> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| FxError::InvalidAmount(format!("{raw:?} is not a number")))?;
    validate_amount(value)
}

/// Accept amounts in `(0, MAX_AMOUNT]` with at most six fractional digits.
pub fn validate_amount(amount: Decimal) -> FxResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(FxError::InvalidAmount(format!("{amount} must be greater than zero")));
    }
    if amount > MAX_AMOUNT {
        return Err(FxError::InvalidAmount(format!(
            "{amount} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    if !Money::usdc(amount).fits_decimal_places() {
        return Err(FxError::InvalidAmount(format!(
            "{amount} has more than {} decimal places",
            Currency::usdc().decimal_places()
        )));
    }
    Ok(amount)
}

/// `amount * factor` in `currency`, failing instead of overflowing.
pub(crate) fn convert(amount: Decimal, factor: Decimal, currency: Currency) -> FxResult<Money> {
    Money::new(amount, currency)
        .checked_mul(factor)
        .ok_or_else(|| FxError::InvalidAmount(format!("{amount} is too large to convert")))
}

/// Breakdown of a USDC → THB offramp.
///
/// Intermediate products are kept at full precision; only the stored amounts
/// are rounded (THB to 2 places, USDC to 6, half up).
#[derive(Debug, Clone, Serialize)]
pub struct OfframpQuote {
    pub amount_usdc: Money,
    pub thb_per_usdc: Decimal,
    pub gross_thb: Money,
    pub commission_usdc: Money,
    pub commission_thb: Money,
    pub net_thb: Money,
    /// Commission as a percentage, e.g. `0.5`.
    pub commission_percent: Decimal,
    pub rate_source: RateSource,
    pub quoted_at: Timestamp,
}

/// Computes offramp quotes for a fixed commission rate.
#[derive(Debug, Clone, Copy)]
pub struct OfframpCalculator {
    commission_rate: Decimal,
}

impl OfframpCalculator {
    /// Create a calculator with a commission fraction (`0.005` = 0.5%).
    pub fn new(commission_rate: Decimal) -> Self {
        Self { commission_rate }
    }

    /// Commission as a percentage.
    pub fn commission_percent(&self) -> Decimal {
        (self.commission_rate * Decimal::ONE_HUNDRED).normalize()
    }

    /// Quote an offramp of `amount_usdc` at `rate`.
    pub fn calculate(&self, amount_usdc: Decimal, rate: &ExchangeRate) -> FxResult<OfframpQuote> {
        let amount_usdc = validate_amount(amount_usdc)?;
        let thb_per_usdc = rate.thb_per_usdc();

        let amount = Money::usdc(amount_usdc);
        let gross_thb = convert(amount_usdc, thb_per_usdc, Currency::thb())?;
        let commission_usdc = convert(amount_usdc, self.commission_rate, Currency::usdc())?;
        let commission_thb = convert(commission_usdc.value, thb_per_usdc, Currency::thb())?;
        let net_thb = (gross_thb.clone() - commission_thb.clone()).map_err(|e| {
            FxError::CurrencyMismatch {
                expected: e.expected,
                actual: e.actual,
            }
        })?;

        Ok(OfframpQuote {
            amount_usdc: amount,
            thb_per_usdc,
            gross_thb: gross_thb.round(),
            commission_usdc: commission_usdc.round(),
            commission_thb: commission_thb.round(),
            net_thb: net_thb.round(),
            commission_percent: self.commission_percent(),
            rate_source: rate.source.clone(),
            quoted_at: rate.fetched_at,
        })
    }
}

impl Default for OfframpCalculator {
    fn default() -> Self {
        Self::new(OFFRAMP_COMMISSION_RATE)
    }
}
