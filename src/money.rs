// src/money.rs

use rust_decimal::{Decimal, RoundingStrategy};

/// Money is stored and reported with exactly two fractional digits.
pub const DECIMAL_PLACES: u32 = 2;

/// Half-up rounding, away from zero, to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// qty x unit price, rounded to cents.
pub fn line_subtotal(qty: i64, unit_price: Decimal) -> Decimal {
    round_money(Decimal::from(qty) * unit_price)
}
