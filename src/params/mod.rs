//! Legal parameter table: allowances, tax scales, usufruct scale, and
//! life-insurance limits
//!
//! Everything age- or bracket-dependent in the engine reads from this table,
//! which is always passed in explicitly. A simulation run against the 2024
//! table stays reproducible after the 2025 table ships.

mod allowances;
mod brackets;
mod usufruct;
pub mod loader;

pub use allowances::AllowanceTable;
pub use brackets::{BracketApplication, TaxBracket, TaxGroup, TaxScale};
pub use usufruct::{UsufructScale, UsufructSplit};

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{Money, Rate};

/// Life-insurance taxation limits (Art. 990 I / 757 B CGI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeInsuranceLimits {
    /// Per-beneficiary allowance on premiums paid before 70
    pub allowance_before_70: Money,

    /// Global allowance on premiums paid after 70, shared by all
    /// beneficiaries
    pub allowance_after_70: Money,

    /// Art. 990 I rate below the pivot
    pub rate_low: Rate,

    /// Art. 990 I rate above the pivot
    pub rate_high: Rate,

    /// Taxable amount where the 990 I rate switches
    pub rate_pivot: Money,

    /// Vie-Génération rebate applied to the capital before allowances
    /// (Art. 990 I bis)
    pub vie_generation_rebate: Rate,
}

impl LifeInsuranceLimits {
    pub fn france_2024() -> Self {
        Self {
            allowance_before_70: dec!(152500),
            allowance_after_70: dec!(30500),
            rate_low: dec!(0.20),
            rate_high: dec!(0.3125),
            rate_pivot: dec!(700000),
            vie_generation_rebate: dec!(0.20),
        }
    }
}

/// Deduction caps and partial-exemption rates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionRules {
    /// Funeral expenses deductible without proof (Art. 775 CGI)
    pub funeral_cap: Money,

    /// Pacte Dutreil exemption rate (Art. 787 B CGI)
    pub dutreil_rate: Rate,

    /// Rural lease: threshold between the two exemption bands (Art. 793)
    pub rural_threshold: Money,
    pub rural_rate_low: Rate,
    pub rural_rate_high: Rate,

    /// Forestry group exemption rate (Art. 793)
    pub forestry_rate: Rate,

    /// Main residence relief when the spouse stays in it (Art. 764 bis)
    pub main_residence_rebate: Rate,
}

impl DeductionRules {
    pub fn france_2024() -> Self {
        Self {
            funeral_cap: dec!(1500),
            dutreil_rate: dec!(0.75),
            rural_threshold: dec!(300000),
            rural_rate_low: dec!(0.75),
            rural_rate_high: dec!(0.50),
            forestry_rate: dec!(0.75),
            main_residence_rebate: dec!(0.20),
        }
    }

    /// Exempt amount of a partially exempt asset value (Art. 787 B / 793).
    ///
    /// Returns zero when the claim's conditions are not met (missing
    /// Dutreil commitments, rural lease under 18 years). The caller passes
    /// the value excluding any CCA: the shareholder account never benefits
    /// from the Dutreil relief.
    pub fn professional_exempt_amount(
        &self,
        value: Money,
        exemption: &crate::input::ProfessionalExemption,
    ) -> Money {
        use crate::input::ExemptionType;
        match exemption.exemption_type {
            ExemptionType::Dutreil => {
                if exemption.dutreil_is_collective && exemption.dutreil_is_individual {
                    value * self.dutreil_rate
                } else {
                    Money::ZERO
                }
            }
            ExemptionType::RuralLease => {
                if exemption.lease_duration_years.unwrap_or(0) >= 18 {
                    if value <= self.rural_threshold {
                        value * self.rural_rate_low
                    } else {
                        self.rural_threshold * self.rural_rate_low
                            + (value - self.rural_threshold) * self.rural_rate_high
                    }
                } else {
                    Money::ZERO
                }
            }
            ExemptionType::Forestry => value * self.forestry_rate,
        }
    }

    /// Exempt fraction (0-1) of an asset value, for the Art. 769 debt
    /// pro-rata
    pub fn professional_exempt_fraction(
        &self,
        value: Money,
        exemption: &crate::input::ProfessionalExemption,
    ) -> Rate {
        if value <= Money::ZERO {
            return Money::ZERO;
        }
        self.professional_exempt_amount(value, exemption) / value
    }
}

/// Complete statute-book snapshot the engine computes against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalParameters {
    pub allowances: AllowanceTable,
    pub scale: TaxScale,
    pub usufruct: UsufructScale,
    pub life_insurance: LifeInsuranceLimits,
    pub deductions: DeductionRules,
}

impl LegalParameters {
    /// Built-in Loi de Finances 2024 table
    pub fn france_2024() -> Self {
        Self {
            allowances: AllowanceTable::france_2024(),
            scale: TaxScale::france_2024(),
            usufruct: UsufructScale::france_2024(),
            life_insurance: LifeInsuranceLimits::france_2024(),
            deductions: DeductionRules::france_2024(),
        }
    }

    /// Load the table from CSV files in a directory
    pub fn from_csv_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        loader::LoadedParameters::load_from(path).map(Into::into)
    }
}
