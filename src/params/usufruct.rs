//! Fiscal valuation of dismembered ownership (Art. 669 CGI)
//!
//! The scale owns both its data and its lookup: callers ask for a split of
//! a full-ownership value into usufruct and bare-ownership slices, either
//! by the usufructuary's age (viager) or by a fixed duration (temporaire).

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{age_at, Money, Rate};

/// Valuation of one dismemberment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsufructSplit {
    pub usufruct_value: Money,
    pub bare_ownership_value: Money,
    pub usufruct_rate: Rate,
}

/// Age-stepped usufruct scale plus the temporary-usufruct rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsufructScale {
    /// (exclusive upper age bound, usufruct rate), ascending
    steps: Vec<(u32, Rate)>,

    /// Rate per started period for a temporary usufruct (Art. 669 II)
    temporary_rate_per_period: Rate,

    /// Period length in years for the temporary rule
    temporary_period_years: u32,
}

impl UsufructScale {
    /// Art. 669 scale, unchanged since 2004
    pub fn france_2024() -> Self {
        Self {
            steps: vec![
                (21, dec!(0.90)),
                (31, dec!(0.80)),
                (41, dec!(0.70)),
                (51, dec!(0.60)),
                (61, dec!(0.50)),
                (71, dec!(0.40)),
                (81, dec!(0.30)),
                (91, dec!(0.20)),
            ],
            temporary_rate_per_period: dec!(0.23),
            temporary_period_years: 10,
        }
    }

    /// Build from an explicit step table (CSV loading)
    pub fn from_steps(steps: Vec<(u32, Rate)>) -> Self {
        Self {
            steps,
            temporary_rate_per_period: dec!(0.23),
            temporary_period_years: 10,
        }
    }

    /// Usufruct rate for a life usufruct, by age at the date of death
    pub fn viager_rate(&self, age: i32) -> Rate {
        for &(max_age, rate) in &self.steps {
            if age < max_age as i32 {
                return rate;
            }
        }
        // 91 and beyond
        dec!(0.10)
    }

    /// Usufruct rate for a fixed-term usufruct: 23% per started 10-year
    /// period, never above full ownership
    pub fn temporary_rate(&self, duration_years: u32) -> Rate {
        let periods = duration_years.div_ceil(self.temporary_period_years);
        (self.temporary_rate_per_period * Money::from(periods)).min(Money::ONE)
    }

    /// Split a full-ownership value by the usufructuary's age
    pub fn split_viager(
        &self,
        total_value: Money,
        usufructuary_birth_date: NaiveDate,
        death_date: NaiveDate,
    ) -> UsufructSplit {
        let age = age_at(usufructuary_birth_date, death_date);
        self.split_at_rate(total_value, self.viager_rate(age))
    }

    /// Split a full-ownership value for a fixed-term usufruct
    pub fn split_temporary(&self, total_value: Money, duration_years: u32) -> UsufructSplit {
        self.split_at_rate(total_value, self.temporary_rate(duration_years))
    }

    fn split_at_rate(&self, total_value: Money, rate: Rate) -> UsufructSplit {
        let usufruct_value = total_value * rate;
        UsufructSplit {
            usufruct_value,
            bare_ownership_value: total_value - usufruct_value,
            usufruct_rate: rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_viager_rate_steps() {
        let scale = UsufructScale::france_2024();
        assert_eq!(scale.viager_rate(20), dec!(0.90));
        assert_eq!(scale.viager_rate(21), dec!(0.80));
        assert_eq!(scale.viager_rate(45), dec!(0.60));
        assert_eq!(scale.viager_rate(70), dec!(0.40));
        assert_eq!(scale.viager_rate(71), dec!(0.30));
        assert_eq!(scale.viager_rate(90), dec!(0.20));
        assert_eq!(scale.viager_rate(91), dec!(0.10));
        assert_eq!(scale.viager_rate(105), dec!(0.10));
    }

    #[test]
    fn test_split_viager_age_72() {
        let scale = UsufructScale::france_2024();
        let split = scale.split_viager(dec!(300000), d(1952, 1, 10), d(2024, 6, 1));

        assert_eq!(split.usufruct_rate, dec!(0.30));
        assert_eq!(split.usufruct_value, dec!(90000.00));
        assert_eq!(split.bare_ownership_value, dec!(210000.00));
    }

    #[test]
    fn test_temporary_rate_periods() {
        let scale = UsufructScale::france_2024();
        assert_eq!(scale.temporary_rate(5), dec!(0.23));
        assert_eq!(scale.temporary_rate(10), dec!(0.23));
        assert_eq!(scale.temporary_rate(11), dec!(0.46));
        assert_eq!(scale.temporary_rate(25), dec!(0.69));
        // Capped at full ownership
        assert_eq!(scale.temporary_rate(50), dec!(1));
    }
}
