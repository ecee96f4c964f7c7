//! Stage 2: reconstitution of the succession mass (Art. 843+ CC)
//!
//! mass = deceased net assets + reportable donations - deductible debts,
//! then the legal right of return (Art. 738-2 CC) carves out assets given
//! by still-living parents when the deceased left no descendants.

use chrono::NaiveDate;
use log::debug;
use rust_decimal_macros::dec;

use super::liquidation::LiquidationOutcome;
use crate::input::{AssetOrigin, DebtType, Relationship, SimulationInput};
use crate::params::LegalParameters;
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::Money;

/// One donation re-entering the civil mass
#[derive(Debug, Clone)]
pub(crate) struct ReportedDonation {
    pub donation_id: String,
    pub beneficiary_id: String,
    pub value: Money,
    pub date: NaiveDate,
    pub declared: bool,
}

/// Result of the reconstitution stage
#[derive(Debug, Clone)]
pub(crate) struct EstateMass {
    /// Devolution base, right-of-return already carved out
    pub net_succession_mass: Money,

    pub reportable_donations: Vec<ReportedDonation>,
    pub reportable_total: Money,
    pub deductible_debts_total: Money,

    /// (parent heir id, returned value), in input asset order
    pub right_of_return: Vec<(String, Money)>,
    pub right_of_return_total: Money,
}

pub(crate) fn reconstitute(
    input: &SimulationInput,
    liquidation: &LiquidationOutcome,
    params: &LegalParameters,
    tracer: &mut Tracer,
) -> EstateMass {
    let mut reportable_donations = Vec::new();
    let mut reportable_total = Money::ZERO;

    for donation in &input.donations {
        if !donation.is_reportable() {
            continue;
        }
        let value = donation.reportable_value();
        reportable_total += value;
        reportable_donations.push(ReportedDonation {
            donation_id: donation.id.clone(),
            beneficiary_id: donation.beneficiary_id.clone(),
            value,
            date: donation.donation_date,
            declared: donation.is_declared_to_tax,
        });
        tracer.explain(
            Explanation::new(ExplanationKey::MassReportableDonation843)
                .with("donation", &donation.id)
                .with("value", value),
        );
    }

    let deductible_debts_total = deduct_debts(input, params, tracer);

    let mut mass = liquidation.deceased_net_assets + reportable_total - deductible_debts_total;
    if mass < Money::ZERO {
        tracer.data_warning(
            format!("Debts exceed the estate: the net mass is floored at zero (shortfall {})", -mass),
            Explanation::new(ExplanationKey::MassDebtDeducted).with("shortfall", -mass),
        );
        mass = Money::ZERO;
    }

    let (right_of_return, right_of_return_total) = right_of_return(input, mass, tracer);
    mass -= right_of_return_total;

    debug!(
        "estate: mass {} (donations {}, debts {}, right of return {})",
        mass, reportable_total, deductible_debts_total, right_of_return_total
    );
    tracer.record_step(
        2,
        "Reconstitution de la masse successorale",
        "Civil report of prior donations and deduction of the estate's debts",
        format!(
            "net assets {} + donations {} - debts {} - right of return {} = mass {}",
            liquidation.deceased_net_assets,
            reportable_total,
            deductible_debts_total,
            right_of_return_total,
            mass
        ),
    );

    EstateMass {
        net_succession_mass: mass,
        reportable_donations,
        reportable_total,
        deductible_debts_total,
        right_of_return,
        right_of_return_total,
    }
}

fn deduct_debts(input: &SimulationInput, params: &LegalParameters, tracer: &mut Tracer) -> Money {
    let mut total = Money::ZERO;

    for debt in &input.debts {
        if !debt.is_deductible {
            if debt.proof_provided {
                tracer.data_warning(
                    format!("Debt {} has proof but is marked non-deductible", debt.id),
                    Explanation::new(ExplanationKey::MassDebtDeducted).with("debt", &debt.id),
                );
            }
            continue;
        }

        let mut amount = debt.amount;

        // Funeral expenses cap without proof (Art. 775 CGI)
        if debt.debt_type == DebtType::Funeral && amount > params.deductions.funeral_cap {
            if debt.proof_provided {
                tracer.fiscal_note(
                    format!(
                        "Funeral expenses above the {} cap accepted on proof ({})",
                        params.deductions.funeral_cap, amount
                    ),
                    Explanation::new(ExplanationKey::MassFuneralCap775).with("debt", &debt.id),
                );
            } else {
                tracer.data_warning(
                    format!(
                        "Funeral expenses capped at {} without proof (declared {})",
                        params.deductions.funeral_cap, amount
                    ),
                    Explanation::new(ExplanationKey::MassFuneralCap775)
                        .with("debt", &debt.id)
                        .with("declared", amount),
                );
                amount = params.deductions.funeral_cap;
            }
        }

        // Community debts weigh on the succession for half only
        if debt.asset_origin == AssetOrigin::Community {
            amount /= dec!(2);
        }

        // Debt secured by a partially exempt asset deducts pro-rata of the
        // taxed fraction (Art. 769 CGI)
        if let Some(asset) = debt
            .linked_asset_id
            .as_deref()
            .and_then(|id| input.asset(id))
        {
            if let Some(exemption) = &asset.professional_exemption {
                let exempt_fraction = params
                    .deductions
                    .professional_exempt_fraction(asset.estimated_value, exemption);
                if exempt_fraction > Money::ZERO {
                    let deductible = amount * (Money::ONE - exempt_fraction);
                    tracer.fiscal_note(
                        format!(
                            "Debt {} linked to partially exempt asset {}: {} deductible out of {} (Art. 769 CGI)",
                            debt.id, asset.id, deductible, amount
                        ),
                        Explanation::new(ExplanationKey::MassDebtProRata769)
                            .with("debt", &debt.id)
                            .with("exempt_fraction", exempt_fraction),
                    );
                    amount = deductible;
                }
            }
        }

        total += amount;
        tracer.explain(
            Explanation::new(ExplanationKey::MassDebtDeducted)
                .with("debt", &debt.id)
                .with("deducted", amount),
        );
    }

    total
}

/// Legal right of return (Art. 738-2 CC): without descendants, an asset
/// received by gift from a living parent heir goes back to that parent,
/// within a quarter of the mass per parent.
fn right_of_return(
    input: &SimulationInput,
    mass: Money,
    tracer: &mut Tracer,
) -> (Vec<(String, Money)>, Money) {
    let has_descendants = input
        .heirs
        .iter()
        .any(|h| h.is_descendant() && !h.is_renouncing());
    if has_descendants {
        return (Vec::new(), Money::ZERO);
    }

    let parent_ids: Vec<&str> = input
        .heirs
        .iter()
        .filter(|h| h.relationship == Relationship::Parent && !h.is_renouncing())
        .map(|h| h.id.as_str())
        .collect();
    if parent_ids.is_empty() {
        return (Vec::new(), Money::ZERO);
    }

    let cap_per_parent = mass * dec!(0.25);
    let mut amounts: Vec<(String, Money)> = Vec::new();
    let mut total = Money::ZERO;

    for asset in &input.assets {
        let Some(parent_id) = asset.received_from_parent_id.as_deref() else {
            continue;
        };
        if !parent_ids.contains(&parent_id) {
            continue;
        }
        let already = amounts
            .iter()
            .filter(|(id, _)| id == parent_id)
            .map(|(_, v)| *v)
            .sum::<Money>();
        let allowed = (cap_per_parent - already).min(asset.estimated_value).max(Money::ZERO);
        if allowed <= Money::ZERO {
            continue;
        }
        amounts.push((parent_id.to_string(), allowed));
        total += allowed;
        tracer.fiscal_note(
            format!(
                "Right of return (Art. 738-2 CC): {} goes back to the donor parent {} for {}",
                asset.id, parent_id, allowed
            ),
            Explanation::new(ExplanationKey::RightOfReturn7382)
                .with("asset", &asset.id)
                .with("parent", parent_id)
                .with("value", allowed),
        );
    }

    (amounts, total)
}
