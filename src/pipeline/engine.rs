//! Pipeline orchestrator
//!
//! Runs liquidation, reconstitution, devolution, allocation, then the two
//! tax stages (life insurance first: the Art. 757 B add-back feeds the
//! inheritance-tax base), validating the pipeline invariants at each
//! stage exit and aggregating everything into the output.

use log::info;
use rust_decimal_macros::dec;

use super::allocation::{self, Allocation};
use super::devolution::{self, Devolution};
use super::estate::{self, EstateMass};
use super::liquidation::{self, LiquidationOutcome};
use crate::error::EngineError;
use crate::input::{Relationship, SimulationInput};
use crate::output::{
    AssetBreakdown, FamilyContext, GlobalMetrics, HeirBreakdown, LiquidationDetails,
    ReceivedAsset, SpouseDetails, SuccessionOutput,
};
use crate::params::LegalParameters;
use crate::tax::{inheritance, life_insurance};
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::{round_cents, Money};

/// Engine bound to one legal parameter table
pub struct SuccessionEngine {
    params: LegalParameters,
}

impl SuccessionEngine {
    pub fn new(params: LegalParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LegalParameters {
        &self.params
    }

    /// Run one complete simulation.
    ///
    /// Domain findings come back as alerts on the output; `Err` is
    /// reserved for structurally invalid input and internal invariant
    /// violations.
    pub fn simulate(&self, input: &SimulationInput) -> Result<SuccessionOutput, EngineError> {
        input.validate()?;
        let mut tracer = Tracer::new();

        context_flags(input, &mut tracer);

        let liquidation = liquidation::liquidate(input, &self.params, &mut tracer);
        check_attribution_conservation(&liquidation)?;
        check_life_insurance_exclusion(input, &liquidation)?;

        let estate = estate::reconstitute(input, &liquidation, &self.params, &mut tracer);

        let devolution = devolution::solve(input, &estate, &mut tracer);
        check_reserve_bounds(&estate, &devolution)?;

        let allocation =
            allocation::allocate(input, &self.params, &estate, &devolution, &mut tracer);
        check_share_sum(input, &allocation)?;
        check_renouncer_shares(input, &allocation)?;

        let life_insurance = life_insurance::assess(input, &self.params, &mut tracer);
        let taxes = inheritance::assess(
            input,
            &self.params,
            &liquidation,
            &allocation,
            &life_insurance,
            &mut tracer,
        );
        check_tax_bounds(&taxes)?;

        let output = build_output(
            input,
            liquidation,
            estate,
            devolution,
            allocation,
            life_insurance,
            taxes,
            tracer,
        );
        info!(
            "simulation complete: mass {}, total tax {}",
            output.global_metrics.total_estate_value, output.global_metrics.total_tax_amount
        );
        Ok(output)
    }
}

/// One-shot entry point over an explicit parameter table
pub fn simulate(
    input: &SimulationInput,
    params: &LegalParameters,
) -> Result<SuccessionOutput, EngineError> {
    SuccessionEngine::new(params.clone()).simulate(input)
}

/// International and cross-cutting context flags, before any computation
fn context_flags(input: &SimulationInput, tracer: &mut Tracer) {
    if input.residence_country != "FR" {
        tracer.legal_warning(
            format!(
                "The deceased resided abroad ({}): French succession law may not apply (EU Reg. 650/2012)",
                input.residence_country
            ),
            Explanation::new(ExplanationKey::AlertInternational)
                .with("residence_country", &input.residence_country),
        );
    }
    for asset in &input.assets {
        if asset.location_country != "FR" {
            tracer.legal_warning(
                format!(
                    "Asset {} is located abroad ({}): double-taxation treaties must be checked",
                    asset.id, asset.location_country
                ),
                Explanation::new(ExplanationKey::AlertInternational)
                    .with("asset", &asset.id)
                    .with("location_country", &asset.location_country),
            );
        }
    }
}

// ---- invariant gates -------------------------------------------------------

const CENT: Money = dec!(0.01);
const SHARE_TOLERANCE: Money = dec!(0.000001);

/// I2: every attributed asset conserves its retained value
fn check_attribution_conservation(liquidation: &LiquidationOutcome) -> Result<(), EngineError> {
    for attribution in &liquidation.attributions {
        let total =
            attribution.deceased_share + attribution.spouse_share + attribution.preciput_share;
        if (total - attribution.retained_value).abs() > CENT {
            return Err(EngineError::InvariantViolation {
                stage: "liquidation",
                invariant: "I2",
                details: format!(
                    "asset {} splits into {} against a retained value of {}",
                    attribution.asset_id, total, attribution.retained_value
                ),
            });
        }
    }
    Ok(())
}

/// I6: life-insurance contracts never enter the mass
fn check_life_insurance_exclusion(
    input: &SimulationInput,
    liquidation: &LiquidationOutcome,
) -> Result<(), EngineError> {
    for asset in input.assets.iter().filter(|a| a.is_life_insurance()) {
        if liquidation.attributions.iter().any(|a| a.asset_id == asset.id) {
            return Err(EngineError::InvariantViolation {
                stage: "liquidation",
                invariant: "I6",
                details: format!("life-insurance contract {} entered the mass", asset.id),
            });
        }
    }
    Ok(())
}

/// I3: the reserve fits in the mass and the quota is non-negative
fn check_reserve_bounds(estate: &EstateMass, devolution: &Devolution) -> Result<(), EngineError> {
    if devolution.legal_reserve > estate.net_succession_mass + CENT
        || devolution.disposable_quota < -CENT
    {
        return Err(EngineError::InvariantViolation {
            stage: "devolution",
            invariant: "I3",
            details: format!(
                "reserve {} against a mass of {}",
                devolution.legal_reserve, estate.net_succession_mass
            ),
        });
    }
    Ok(())
}

/// I1: allocated fractions cover the whole mass. An all-zero allocation is
/// legitimate when nobody could be placed (general renunciation, or a
/// cleft succession whose data errors are already flagged); what this gate
/// catches is a partial sum.
fn check_share_sum(_input: &SimulationInput, allocation: &Allocation) -> Result<(), EngineError> {
    let sum: Money = allocation.shares.values().copied().sum();
    if sum == Money::ZERO {
        return Ok(());
    }
    if (sum - Money::ONE).abs() > SHARE_TOLERANCE {
        return Err(EngineError::InvariantViolation {
            stage: "allocation",
            invariant: "I1",
            details: format!("shares sum to {sum}"),
        });
    }
    Ok(())
}

/// I5: a renouncer keeps nothing for themselves
fn check_renouncer_shares(
    input: &SimulationInput,
    allocation: &Allocation,
) -> Result<(), EngineError> {
    for heir in input.heirs.iter().filter(|h| h.is_renouncing()) {
        let share = allocation
            .shares
            .get(&heir.id)
            .copied()
            .unwrap_or(Money::ZERO);
        if share > SHARE_TOLERANCE {
            return Err(EngineError::InvariantViolation {
                stage: "allocation",
                invariant: "I5",
                details: format!("renouncing heir {} holds a share of {share}", heir.id),
            });
        }
    }
    Ok(())
}

/// I4 / P7: taxes are non-negative and bounded by the base
fn check_tax_bounds(taxes: &inheritance::TaxAssessment) -> Result<(), EngineError> {
    for heir in &taxes.heirs {
        if heir.tax < Money::ZERO || heir.tax > heir.taxable_base + CENT {
            return Err(EngineError::InvariantViolation {
                stage: "taxation",
                invariant: "I4",
                details: format!(
                    "heir {} taxed {} on a base of {}",
                    heir.heir_id, heir.tax, heir.taxable_base
                ),
            });
        }
    }
    Ok(())
}

// ---- output assembly -------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn build_output(
    input: &SimulationInput,
    liquidation: LiquidationOutcome,
    estate: EstateMass,
    devolution: Devolution,
    allocation: Allocation,
    life_insurance: life_insurance::LifeInsuranceAssessment,
    taxes: inheritance::TaxAssessment,
    tracer: Tracer,
) -> SuccessionOutput {
    let mut heirs_breakdown = Vec::new();
    for heir in &input.heirs {
        let gross = allocation
            .gross_values
            .get(&heir.id)
            .copied()
            .unwrap_or(Money::ZERO);
        let share = allocation
            .shares
            .get(&heir.id)
            .copied()
            .unwrap_or(Money::ZERO);
        let imputed = allocation
            .imputations
            .get(&heir.id)
            .copied()
            .unwrap_or(Money::ZERO);
        let heir_tax = taxes.heirs.iter().find(|t| t.heir_id == heir.id);
        let tax = heir_tax.map(|t| t.tax).unwrap_or(Money::ZERO);
        let taxable_base = heir_tax.map(|t| t.taxable_base).unwrap_or(Money::ZERO);
        let allowance_used = heir_tax.map(|t| t.allowance_used).unwrap_or(Money::ZERO);

        let mut received_assets: Vec<ReceivedAsset> = allocation
            .bequests
            .iter()
            .filter(|b| b.beneficiary_id == heir.id)
            .map(|b| ReceivedAsset {
                asset_id: b.asset_id.clone(),
                share_percentage: b.share_percentage,
                value: round_cents(b.value),
                note: "legs particulier".into(),
            })
            .collect();
        for (parent_id, value) in &estate.right_of_return {
            if parent_id == &heir.id {
                received_assets.push(ReceivedAsset {
                    asset_id: "droit-de-retour".into(),
                    share_percentage: dec!(100),
                    value: round_cents(*value),
                    note: "retour légal (Art. 738-2 CC)".into(),
                });
            }
        }

        let transmitted = (gross - imputed).max(Money::ZERO);
        heirs_breakdown.push(HeirBreakdown {
            id: heir.id.clone(),
            name: heir.id.clone(),
            legal_share_percent: share * dec!(100),
            gross_share_value: round_cents(gross),
            taxable_base,
            abatement_used: allowance_used,
            tax_amount: tax,
            net_share_value: round_cents((transmitted - tax).max(Money::ZERO)),
            received_assets,
            tax_calculation_details: heir_tax.map(|t| t.computation.clone()),
            explanation_keys: heir_tax.map(|t| t.explanations.clone()).unwrap_or_default(),
        });
    }

    let spouse_heir = input.spouse();
    let spouse_details = spouse_heir.map(|_| SpouseDetails {
        has_usufruct: allocation.spouse.has_usufruct,
        usufruct_value: allocation.spouse.usufruct_value.map(round_cents),
        usufruct_rate: allocation.spouse.usufruct_rate,
        bare_ownership_value: allocation.spouse.bare_ownership_value.map(round_cents),
        choice_made: allocation.spouse.choice_made,
    });

    let children: Vec<_> = input
        .heirs
        .iter()
        .filter(|h| h.relationship == Relationship::Child)
        .collect();
    let family_context = FamilyContext {
        has_spouse: spouse_heir.is_some(),
        spouse_age: spouse_heir.map(|s| s.age_at(input.death_date)),
        num_children: children.len(),
        has_stepchildren: children.iter().any(|c| !c.is_from_current_union),
        num_representing_descendants: input
            .heirs
            .iter()
            .filter(|h| h.represented_heir_id.is_some())
            .count(),
    };

    let mut assets_breakdown = Vec::new();
    for asset in &input.assets {
        let mut notes = Vec::new();
        if asset.is_life_insurance() {
            notes.push("assurance-vie, hors succession".to_string());
        }
        if asset.asset_origin == crate::input::AssetOrigin::Community {
            notes.push("bien commun au couple".to_string());
        }
        if asset.ownership_mode == crate::input::OwnershipMode::Bare {
            notes.push("nue-propriété, usufruit détenu par un tiers".to_string());
        }
        for bequest in allocation.bequests.iter().filter(|b| b.asset_id == asset.id) {
            notes.push(format!(
                "légué à {} ({}%)",
                bequest.beneficiary_id, bequest.share_percentage
            ));
        }
        if asset.received_from_parent_id.is_some() {
            notes.push("reçu d'un parent (droit de retour possible)".to_string());
        }
        assets_breakdown.push(AssetBreakdown {
            asset_id: asset.id.clone(),
            asset_value: asset.estimated_value,
            ownership_mode: asset.ownership_mode,
            asset_origin: asset.asset_origin,
            notes,
        });
    }

    let liquidation_details = LiquidationDetails {
        regime: input.matrimonial_regime,
        community_assets_total: round_cents(liquidation.community_total),
        spouse_community_share: round_cents(liquidation.spouse_community_share),
        deceased_community_share: round_cents(liquidation.deceased_community_share),
        personal_assets_deceased: round_cents(liquidation.personal_assets),
        rewards_to_deceased: round_cents(liquidation.rewards_to_deceased),
        rewards_to_spouse: round_cents(liquidation.rewards_to_spouse),
        has_full_attribution: liquidation.has_full_attribution,
        has_preciput: liquidation.preciput_value > Money::ZERO,
        preciput_value: round_cents(liquidation.preciput_value),
        unequal_share_spouse_percentage: liquidation.unequal_share_spouse_percentage,
        details: liquidation.details,
    };

    let total_tax = taxes.total_tax + life_insurance.total_tax_990i;
    let (calculation_steps, warnings, explanations) = tracer.into_parts();

    SuccessionOutput {
        global_metrics: GlobalMetrics {
            total_estate_value: round_cents(estate.net_succession_mass),
            legal_reserve_value: round_cents(devolution.legal_reserve),
            disposable_quota_value: round_cents(devolution.disposable_quota),
            total_tax_amount: round_cents(total_tax),
            explanation_keys: explanations,
        },
        heirs_breakdown,
        family_context,
        spouse_details,
        liquidation_details,
        assets_breakdown,
        calculation_steps,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        AcceptanceOption, Asset, AssetOrigin, Heir, MatrimonialRegime, OwnershipMode, SpouseChoice,
        Wishes,
    };
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn run(input: &SimulationInput) -> SuccessionOutput {
        simulate(input, &LegalParameters::france_2024()).unwrap()
    }

    fn standard_family() -> SimulationInput {
        let mut home =
            Asset::new("home", dec!(600000), OwnershipMode::Full, AssetOrigin::Community);
        home.acquisition_date = Some(d(1995, 5, 10));
        SimulationInput {
            matrimonial_regime: MatrimonialRegime::CommunityLegal,
            marriage_date: Some(d(1990, 6, 1)),
            death_date: d(2024, 3, 1),
            assets: vec![home],
            heirs: vec![
                Heir::new("spouse", d(1958, 2, 1), Relationship::Spouse),
                Heir::new("c1", d(1991, 4, 1), Relationship::Child),
                Heir::new("c2", d(1994, 9, 1), Relationship::Child),
            ],
            wishes: Wishes {
                spouse_choice: Some(SpouseChoice::QuarterOwnership),
                ..Default::default()
            },
            donations: vec![],
            debts: vec![],
            matrimonial_advantages: None,
            residence_country: "FR".into(),
        }
    }

    #[test]
    fn test_standard_family_scenario() {
        let output = run(&standard_family());

        // Liquidation leaves half of the community to the succession
        assert_eq!(output.global_metrics.total_estate_value, dec!(300000.00));

        let spouse = output.heir("spouse").unwrap();
        assert_eq!(spouse.gross_share_value, dec!(75000.00));
        assert_eq!(spouse.tax_amount, Money::ZERO);

        // 112 500 - 100 000 of allowance: 8 072 at 5% then 4 428 at 10%
        for child in ["c1", "c2"] {
            let row = output.heir(child).unwrap();
            assert_eq!(row.gross_share_value, dec!(112500.00));
            assert_eq!(row.tax_amount, dec!(846.40));
        }
    }

    #[test]
    fn test_gross_shares_cover_the_mass() {
        let output = run(&standard_family());
        let total: Money = output
            .heirs_breakdown
            .iter()
            .map(|h| h.gross_share_value)
            .sum();
        assert!((total - output.global_metrics.total_estate_value).abs() <= dec!(0.01));
    }

    #[test]
    fn test_representation_scenario() {
        let mut g1 = Heir::new("g1", d(2010, 1, 1), Relationship::Grandchild);
        g1.represented_heir_id = Some("B".into());
        let mut g2 = Heir::new("g2", d(2012, 1, 1), Relationship::Grandchild);
        g2.represented_heir_id = Some("B".into());
        let input = SimulationInput {
            matrimonial_regime: MatrimonialRegime::Separation,
            marriage_date: None,
            death_date: d(2024, 3, 1),
            assets: vec![Asset::new("a", dec!(900000), OwnershipMode::Full, AssetOrigin::Personal)],
            heirs: vec![Heir::new("A", d(1980, 1, 1), Relationship::Child), g1, g2],
            wishes: Wishes::default(),
            donations: vec![],
            debts: vec![],
            matrimonial_advantages: None,
            residence_country: "FR".into(),
        };
        let output = run(&input);

        assert_eq!(output.heir("A").unwrap().gross_share_value, dec!(450000.00));
        assert_eq!(output.heir("g1").unwrap().gross_share_value, dec!(225000.00));
        assert_eq!(output.heir("g2").unwrap().gross_share_value, dec!(225000.00));
    }

    #[test]
    fn test_disposable_quota_scenario() {
        let mut input = standard_family();
        input.heirs.remove(2);
        input.wishes = Wishes {
            has_spouse_donation: true,
            spouse_choice: Some(SpouseChoice::DisposableQuota),
            ..Default::default()
        };
        input.assets[0].estimated_value = dec!(1200000);
        let output = run(&input);

        // Mass 600 000: spouse takes half in full ownership, exempt; the
        // child is taxed on a 200 000 base
        let spouse = output.heir("spouse").unwrap();
        assert_eq!(spouse.gross_share_value, dec!(300000.00));
        assert_eq!(spouse.tax_amount, Money::ZERO);

        let child = output.heir("c1").unwrap();
        assert_eq!(child.gross_share_value, dec!(300000.00));
        assert_eq!(child.tax_calculation_details.as_ref().unwrap().net_taxable, dec!(200000.00));
        assert_eq!(child.tax_amount, dec!(38194.35));
    }

    #[test]
    fn test_usufruct_option_fills_spouse_details() {
        let mut input = standard_family();
        input.wishes.spouse_choice = Some(SpouseChoice::Usufruct);
        let output = run(&input);

        let details = output.spouse_details.unwrap();
        assert!(details.has_usufruct);
        // Spouse is 66 at death: usufruct rate 40%
        assert_eq!(details.usufruct_rate, Some(dec!(0.40)));
        assert_eq!(details.usufruct_value, Some(dec!(120000.00)));
        assert_eq!(details.bare_ownership_value, Some(dec!(180000.00)));
    }

    #[test]
    fn test_renouncer_gets_nothing_without_representation() {
        let mut input = standard_family();
        input.heirs[2].acceptance_option = AcceptanceOption::Renunciation;
        let output = run(&input);

        assert_eq!(output.heir("c2").unwrap().gross_share_value, Money::ZERO);
        // The accepting child takes the full three quarters
        assert_eq!(output.heir("c1").unwrap().gross_share_value, dec!(225000.00));
    }

    #[test]
    fn test_identical_inputs_give_identical_outputs() {
        let input = standard_family();
        let first = run(&input);
        let second = run(&input);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }

    #[test]
    fn test_tax_monotone_in_asset_value() {
        let mut input = standard_family();
        let low = run(&input).global_metrics.total_tax_amount;
        input.assets[0].estimated_value = dec!(800000);
        let high = run(&input).global_metrics.total_tax_amount;
        assert!(high >= low);
    }

    #[test]
    fn test_tax_never_exceeds_taxable_base() {
        let mut input = standard_family();
        input.assets[0].estimated_value = dec!(5000000);
        let output = run(&input);
        for heir in &output.heirs_breakdown {
            assert!(heir.tax_amount <= heir.taxable_base);
            assert!(heir.tax_amount >= Money::ZERO);
            assert!(heir.net_share_value >= Money::ZERO);
        }
    }

    #[test]
    fn test_international_context_flagged() {
        let mut input = standard_family();
        input.residence_country = "BE".into();
        input.assets[0].location_country = "ES".into();
        let output = run(&input);

        let international = output
            .warnings
            .iter()
            .filter(|w| {
                w.explanations
                    .iter()
                    .any(|e| e.key == ExplanationKey::AlertInternational)
            })
            .count();
        assert_eq!(international, 2);
    }

    #[test]
    fn test_every_metric_has_explanations() {
        let output = run(&standard_family());
        assert!(!output.global_metrics.explanation_keys.is_empty());
        for heir in &output.heirs_breakdown {
            if heir.tax_amount > Money::ZERO {
                assert!(!heir.explanation_keys.is_empty(), "heir {}", heir.id);
            }
        }
    }

    #[test]
    fn test_validation_error_is_fatal() {
        let mut input = standard_family();
        input.assets[0].estimated_value = dec!(-1);
        let result = simulate(&input, &LegalParameters::france_2024());
        assert!(matches!(result, Err(EngineError::InputValidation(_))));
    }

    #[test]
    fn test_all_renouncing_heirs_yield_empty_allocation() {
        let mut input = standard_family();
        for heir in &mut input.heirs {
            heir.acceptance_option = AcceptanceOption::Renunciation;
        }
        let output = run(&input);
        for heir in &output.heirs_breakdown {
            assert_eq!(heir.gross_share_value, Money::ZERO);
        }
    }
}
