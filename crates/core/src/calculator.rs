//! Line totals and request budgets.
//!
//! Every function here is pure. Callers recompute after each row mutation so
//! the read-only budget always reflects the current rows.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::item_group::LineItem;

const TOTAL_SCALE: u32 = 2;

/// `frequency × quantity × unit_cost`, rounded to cents.
///
/// A missing or zero frequency/quantity counts as 1 so a half-filled row does
/// not collapse to zero; a missing unit cost counts as 0.
pub fn compute_total(
    frequency: Option<Decimal>,
    quantity: Option<Decimal>,
    unit_cost: Option<Decimal>,
) -> Decimal {
    let frequency = or_one(frequency);
    let quantity = or_one(quantity);
    let unit_cost = unit_cost.unwrap_or(Decimal::ZERO);

    round_total(frequency * quantity * unit_cost)
}

/// `days_number × rate` with no substitution for missing values.
pub fn compute_travel_total(days_number: Option<Decimal>, rate: Option<Decimal>) -> Decimal {
    round_total(days_number.unwrap_or(Decimal::ZERO) * rate.unwrap_or(Decimal::ZERO))
}

pub fn aggregate<'a, G, I>(rows: I) -> Decimal
where
    G: LineItem + 'a,
    I: IntoIterator<Item = &'a G>,
{
    rows.into_iter().map(LineItem::total).sum()
}

fn or_one(value: Option<Decimal>) -> Decimal {
    match value {
        Some(value) if !value.is_zero() => value,
        _ => Decimal::ONE,
    }
}

fn round_total(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(TOTAL_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
