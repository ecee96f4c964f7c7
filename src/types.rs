//! Shared semantic types for monetary amounts, rates, and date arithmetic

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary amount in euros, cent precision at the edges.
///
/// Intermediate computations keep full decimal precision; values are rounded
/// half-to-even at the last step per heir (Art. 1965 A-style banker's
/// rounding is what the tax administration applies to fractional cents).
pub type Money = Decimal;

/// A fraction in [0, 1] (shares, bracket rates, usufruct rates).
pub type Rate = Decimal;

/// Round to cent precision, half-to-even.
pub fn round_cents(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Age in completed years at a reference date.
///
/// The reference date is always the date of death: every age-dependent rule
/// (usufruct scale, 15-year recall window) is assessed at that date so a
/// simulation replays identically years later.
pub fn age_at(birth_date: NaiveDate, reference: NaiveDate) -> i32 {
    let mut age = reference.year() - birth_date.year();
    if (reference.month(), reference.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}
