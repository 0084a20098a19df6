//! Fixed-point valuation and price formatting

use crate::core::error::ValuationError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for prices and position values.
pub const CURRENCY_SCALE: u32 = 2;

/// Rounds half-up (away from zero at the midpoint), the way currency is displayed.
/// The result always carries exactly two fractional digits, so `30.5` becomes `30.50`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub close_price: Decimal,
    pub current_value: Decimal,
}

/// Rounds the raw price and values the position from the rounded price.
///
/// `shares_owned` is not validated here. Fails only when the position value does
/// not fit in a `Decimal`.
pub fn compute_valuation(
    raw_price: Decimal,
    shares_owned: i64,
) -> Result<Valuation, ValuationError> {
    let close_price = round_currency(raw_price);
    let current_value = close_price
        .checked_mul(Decimal::from(shares_owned))
        .map(round_currency)
        .ok_or(ValuationError::Overflow {
            close_price,
            shares_owned,
        })?;
    Ok(Valuation {
        close_price,
        current_value,
    })
}

/// Formats a price as `#,##0.00`, rounding half-up.
pub fn format_price(price: Decimal) -> String {
    let rounded = round_currency(price);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}
