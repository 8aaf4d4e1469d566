//! Fixed-point helpers for prices, quantities and the idiot index.
//!
//! Money and quantities are stored as integer hundredths and handled as
//! `rust_decimal::Decimal` everywhere else, so aggregation never goes through
//! floating point. Rounding only happens when values are presented.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fractional digits carried by stored prices and quantities.
pub const STORED_SCALE: u32 = 2;

/// Fractional digits shown for the idiot index.
pub const INDEX_SCALE: u32 = 4;

/// Converts a decimal with at most two fractional digits into integer hundredths.
///
/// Trailing zeros are ignored, so `5.000` is accepted as `500`.
pub fn to_minor_units(value: Decimal, field: &'static str) -> Result<i64> {
    let normalized = value.normalize();
    if normalized.scale() > STORED_SCALE {
        return Err(Error::invalid(
            field,
            format!("{value} has more than {STORED_SCALE} fractional digits"),
        ));
    }

    let mut scaled = normalized;
    scaled.rescale(STORED_SCALE);
    i64::try_from(scaled.mantissa())
        .map_err(|_| Error::invalid(field, format!("{value} is out of range")))
}

/// Converts integer hundredths back into a two-digit decimal.
#[must_use]
pub fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, STORED_SCALE)
}

/// Validates a retail price (non-negative, two digits) and returns it in cents.
pub fn price_to_cents(price: Decimal) -> Result<i64> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(Error::invalid("retail_price", "cannot be negative"));
    }
    to_minor_units(price, "retail_price")
}

/// Validates a component quantity (strictly positive, two digits) and returns hundredths.
pub fn quantity_to_hundredths(quantity: Decimal) -> Result<i64> {
    if quantity <= Decimal::ZERO {
        return Err(Error::invalid("quantity", "must be greater than zero"));
    }
    to_minor_units(quantity, "quantity")
}

/// Rounds a money value for presentation, always showing two fractional digits.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(STORED_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(STORED_SCALE);
    rounded
}

/// Rounds an idiot index for presentation, dropping trailing zeros.
#[must_use]
pub fn round_index(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(INDEX_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// `retail / materials`, undefined when materials cost is zero.
#[must_use]
pub fn idiot_index(retail_price: Decimal, materials_cost: Decimal) -> Option<Decimal> {
    if materials_cost.is_zero() {
        return None;
    }
    retail_price.checked_div(materials_cost)
}

/// Coarse classification of an idiot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBand {
    /// Below 2x
    Low,
    /// From 2x up to (excluding) 5x
    Medium,
    /// 5x and above
    High,
}

impl IndexBand {
    /// Picks the band for a defined index.
    #[must_use]
    pub fn classify(index: Decimal) -> Self {
        if index >= Decimal::from(5) {
            Self::High
        } else if index >= Decimal::from(2) {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
