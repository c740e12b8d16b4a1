//! Core pricing calculation functions.
//!
//! Pure functions for quote math - no database access. Every stored money or
//! area figure passes through `round_money` exactly once, on the final value.
//! Products are checked, and a figure too large for its column is reported as
//! a validation error on the figure it would have produced.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::{AppError, Result};
use crate::pricing::models::PricingMode;

/// Decimal places for money and area figures.
pub const MONEY_PLACES: u32 = 2;

/// Largest storable area, `NUMERIC(12, 2)`: 9,999,999,999.99
pub const MAX_AREA: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest storable amount, `NUMERIC(14, 2)`: 999,999,999,999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Uncovered share assumed when a stored value is missing.
pub const DEFAULT_UNCOVERED_PERCENT: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Round to specified decimal places, half away from zero.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use arqui_quotes::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(3));
/// assert_eq!(round_money(dec!(1.005), 2), dec!(1.01));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Read-time fallback for a stored uncovered percentage.
///
/// Caller-supplied values are validated instead of clamped; this only keeps a
/// malformed or missing stored value from producing a negative covered area.
pub fn clamp_uncovered_percent(percent: Option<Decimal>) -> Decimal {
    match percent {
        Some(p) => p.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
        None => DEFAULT_UNCOVERED_PERCENT,
    }
}

/// Resolve the covered area of a project.
///
/// An explicit covered area wins for the mutation that supplies it. Otherwise
/// it is `total_area * (1 - uncovered_percent / 100)`.
pub fn resolve_covered_area(
    total_area: Decimal,
    uncovered_percent: Decimal,
    explicit_covered: Option<Decimal>,
) -> Decimal {
    if let Some(covered) = explicit_covered {
        return round_money(covered, MONEY_PLACES);
    }

    let percent = clamp_uncovered_percent(Some(uncovered_percent));
    let covered_share = Decimal::ONE - percent / Decimal::ONE_HUNDRED;
    round_money(total_area * covered_share, MONEY_PLACES)
}

/// Round a checked result and hold it to `max`.
fn bounded(field: &str, value: Option<Decimal>, max: Decimal) -> Result<Decimal> {
    value
        .map(|v| round_money(v, MONEY_PLACES))
        .filter(|v| *v <= max)
        .ok_or_else(|| AppError::validation(field, format!("must not exceed {}", max)))
}

/// Base cost: covered area x floors x rate per unit area.
pub fn compute_base_cost(
    covered_area: Decimal,
    floor_count: i32,
    rate_per_area: Decimal,
) -> Result<Decimal> {
    let cost = covered_area
        .checked_mul(Decimal::from(floor_count))
        .and_then(|v| v.checked_mul(rate_per_area));
    bounded("baseCost", cost, MAX_AMOUNT)
}

/// Compute one line item total.
///
/// Quantities below one are treated as one for the arithmetic. Intermediate
/// terms are not rounded.
pub fn compute_line_total(
    mode: PricingMode,
    unit_price: Decimal,
    quantity: i32,
    total_area: Decimal,
    base_cost: Decimal,
) -> Result<Decimal> {
    let quantity = Decimal::from(quantity.max(1));

    let total = match mode {
        PricingMode::Flat => unit_price.checked_mul(quantity),
        PricingMode::PerArea => unit_price
            .checked_mul(total_area)
            .and_then(|v| v.checked_mul(quantity)),
        PricingMode::Percentage => base_cost
            .checked_mul(unit_price / Decimal::ONE_HUNDRED)
            .and_then(|v| v.checked_mul(quantity)),
    };

    bounded("lineTotal", total, MAX_AMOUNT)
}

/// Derived cost figures of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteTotals {
    pub extras_cost: Decimal,
    pub total_cost: Decimal,
}

/// Aggregate line totals into extras and total cost.
pub fn calculate_totals<I>(base_cost: Decimal, line_totals: I) -> Result<QuoteTotals>
where
    I: IntoIterator<Item = Decimal>,
{
    let extras = line_totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, total| acc.checked_add(total));
    let extras_cost = bounded("extrasCost", extras, MAX_AMOUNT)?;

    Ok(QuoteTotals {
        extras_cost,
        total_cost: bounded("totalCost", base_cost.checked_add(extras_cost), MAX_AMOUNT)?,
    })
}
