//! Conversions between host decimal amounts and the gateway's smallest
//! currency unit. Most currencies use a multiplier of 100; zero-decimal
//! currencies use 1 and three-decimal currencies use 1000.

use crate::error::{ProviderError, ProviderResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "OMR", "TND"];

pub fn currency_multiplier(currency: &str) -> i64 {
    let currency = currency.to_uppercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        1
    } else if THREE_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        1000
    } else {
        100
    }
}

/// Converts a host decimal amount into the gateway's smallest currency unit.
/// Three-decimal currencies are rounded up to the nearest ten minor units,
/// a constraint the gateway imposes on those currencies.
pub fn to_smallest_unit(amount: Decimal, currency: &str) -> ProviderResult<i64> {
    let multiplier = currency_multiplier(currency);
    let scaled = amount * Decimal::from(multiplier);
    let mut minor = scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            ProviderError::invalid_field(format!("amount {amount} is not representable"), "amount")
        })?;
    if multiplier == 1000 {
        // Signed `div_ceil` is unstable; this is the equivalent for a
        // positive divisor.
        let (q, r) = (minor / 10, minor % 10);
        minor = (if r > 0 { q + 1 } else { q }) * 10;
    }
    Ok(minor)
}

/// Converts a minor-unit gateway amount back into host currency units.
pub fn from_smallest_unit(amount: i64, currency: &str) -> Decimal {
    Decimal::from(amount) / Decimal::from(currency_multiplier(currency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn two_decimal_currency_scales_by_hundred() {
        assert_eq!(to_smallest_unit(dec!(295.50), "INR").unwrap(), 29550);
        assert_eq!(to_smallest_unit(dec!(500), "inr").unwrap(), 50000);
        assert_eq!(from_smallest_unit(50000, "INR"), dec!(500));
    }

    #[test]
    fn zero_decimal_currency_is_passed_through() {
        assert_eq!(to_smallest_unit(dec!(500), "JPY").unwrap(), 500);
        assert_eq!(from_smallest_unit(500, "JPY"), dec!(500));
    }

    #[test]
    fn three_decimal_currency_rounds_up_to_nearest_ten() {
        assert_eq!(to_smallest_unit(dec!(1.234), "KWD").unwrap(), 1240);
        assert_eq!(to_smallest_unit(dec!(1.230), "KWD").unwrap(), 1230);
        assert_eq!(from_smallest_unit(1230, "KWD"), dec!(1.23));
    }

    #[test]
    fn fractional_minor_units_round_half_up() {
        assert_eq!(to_smallest_unit(dec!(10.005), "USD").unwrap(), 1001);
        assert_eq!(to_smallest_unit(dec!(10.004), "USD").unwrap(), 1000);
    }
}
