//! Output structures returned by one simulation

use serde::{Deserialize, Serialize};

use crate::input::{AssetOrigin, MatrimonialRegime, OwnershipMode, SpouseChoice};
use crate::params::BracketApplication;
use crate::trace::{Alert, CalculationStep, Explanation};
use crate::types::{Money, Rate};

/// Headline figures of the succession
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMetrics {
    /// Net succession mass after liquidation, civil report, and debts
    pub total_estate_value: Money,
    pub legal_reserve_value: Money,
    pub disposable_quota_value: Money,

    /// Inheritance tax plus Art. 990 I life-insurance levy
    pub total_tax_amount: Money,

    pub explanation_keys: Vec<Explanation>,
}

/// An asset (or asset slice) received by an heir outside the general
/// percentage split: bequests and right-of-return transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedAsset {
    pub asset_id: String,
    pub share_percentage: Rate,
    pub value: Money,
    pub note: String,
}

/// Full detail of one heir's tax computation, for the trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxComputation {
    pub gross_amount: Money,
    pub allowance_label: String,
    pub allowance_amount: Money,
    pub net_taxable: Money,
    pub brackets_applied: Vec<BracketApplication>,
    pub total_tax: Money,
}

/// Per-heir result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeirBreakdown {
    pub id: String,
    pub name: String,

    /// Percentage of the net mass (0-100) actually allocated
    pub legal_share_percent: Rate,

    /// Civil entitlement out of the mass (imputed gifts included: the heir
    /// already holds that part)
    pub gross_share_value: Money,

    /// Base the tax scale was applied to, after imputation, partial
    /// exemptions, and the Art. 757 B add-back
    pub taxable_base: Money,

    pub abatement_used: Money,
    pub tax_amount: Money,

    /// What the heir pockets at the death: gross minus imputed gifts minus
    /// tax, floored at zero
    pub net_share_value: Money,

    pub received_assets: Vec<ReceivedAsset>,
    pub tax_calculation_details: Option<TaxComputation>,
    pub explanation_keys: Vec<Explanation>,
}

/// Matrimonial liquidation summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationDetails {
    pub regime: MatrimonialRegime,
    pub community_assets_total: Money,
    pub spouse_community_share: Money,
    pub deceased_community_share: Money,
    pub personal_assets_deceased: Money,
    pub rewards_to_deceased: Money,
    pub rewards_to_spouse: Money,
    pub has_full_attribution: bool,
    pub has_preciput: bool,
    pub preciput_value: Money,
    pub unequal_share_spouse_percentage: Option<Rate>,

    /// Per-asset attribution lines, human-readable
    pub details: Vec<String>,
}

/// Surviving-spouse specifics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpouseDetails {
    pub has_usufruct: bool,
    pub usufruct_value: Option<Money>,
    pub usufruct_rate: Option<Rate>,
    pub bare_ownership_value: Option<Money>,
    pub choice_made: Option<SpouseChoice>,
}

/// Per-asset note rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBreakdown {
    pub asset_id: String,
    pub asset_value: Money,
    pub ownership_mode: OwnershipMode,
    pub asset_origin: AssetOrigin,
    pub notes: Vec<String>,
}

/// Family shape summary derived from the heirs list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyContext {
    pub has_spouse: bool,
    pub spouse_age: Option<i32>,
    pub num_children: usize,
    pub has_stepchildren: bool,
    pub num_representing_descendants: usize,
}

/// Complete result of one simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessionOutput {
    pub global_metrics: GlobalMetrics,
    pub heirs_breakdown: Vec<HeirBreakdown>,
    pub family_context: FamilyContext,
    pub spouse_details: Option<SpouseDetails>,
    pub liquidation_details: LiquidationDetails,
    pub assets_breakdown: Vec<AssetBreakdown>,
    pub calculation_steps: Vec<CalculationStep>,
    pub warnings: Vec<Alert>,
}

impl SuccessionOutput {
    /// Breakdown row for an heir id
    pub fn heir(&self, id: &str) -> Option<&HeirBreakdown> {
        self.heirs_breakdown.iter().find(|h| h.id == id)
    }
}
