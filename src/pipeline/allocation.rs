//! Stage 4: allocation of the mass per the testament and the spouse option
//! (Art. 757, 843, 920+ CC)
//!
//! Overlays the testamentary wishes on the legal devolution: specific
//! bequests, custom shares, the surviving spouse's option, gift
//! imputation, and the detection of excessive liberalities with their
//! reduction plan. Reductions are reported, never silently applied.

use std::collections::BTreeMap;

use log::debug;
use rust_decimal_macros::dec;

use super::devolution::Devolution;
use super::estate::EstateMass;
use crate::input::{Relationship, SimulationInput, SpouseChoice, TestamentDistribution};
use crate::params::LegalParameters;
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::{Money, Rate};

/// What the surviving spouse ends up with
#[derive(Debug, Clone, Default)]
pub(crate) struct SpouseAllocation {
    pub has_usufruct: bool,
    pub usufruct_value: Option<Money>,
    pub usufruct_rate: Option<Rate>,
    pub bare_ownership_value: Option<Money>,
    pub choice_made: Option<SpouseChoice>,
}

/// One specific bequest resolved to a value
#[derive(Debug, Clone)]
pub(crate) struct BequestAward {
    pub asset_id: String,
    pub beneficiary_id: String,
    pub share_percentage: Rate,
    pub value: Money,
}

/// One liberality trimmed by the reduction plan (Art. 920+)
#[derive(Debug, Clone)]
pub(crate) struct LiberalityReduction {
    pub liberality_id: String,
    pub kind: &'static str,
    pub beneficiary_id: String,
    pub original_value: Money,
    pub reduction: Money,
    pub reduced_value: Money,
}

/// Result of the allocation stage
#[derive(Debug, Clone)]
pub(crate) struct Allocation {
    /// Final fraction of the mass per heir (0-1)
    pub shares: BTreeMap<String, Rate>,

    /// Civil entitlement per heir, bequests included
    pub gross_values: BTreeMap<String, Money>,

    /// Reportable donations already in each heir's hands (Art. 843)
    pub imputations: BTreeMap<String, Money>,

    pub bequests: Vec<BequestAward>,
    pub spouse: SpouseAllocation,
    pub reductions: Vec<LiberalityReduction>,
}

pub(crate) fn allocate(
    input: &SimulationInput,
    params: &LegalParameters,
    estate: &EstateMass,
    devolution: &Devolution,
    tracer: &mut Tracer,
) -> Allocation {
    let mass = estate.net_succession_mass;

    let (mut bequests, mut bequests_total) = resolve_bequests(input, tracer);
    if bequests_total > mass {
        tracer.legal_warning(
            format!("Bequests ({bequests_total}) exceed the net mass ({mass}); scaled down pro-rata"),
            Explanation::new(ExplanationKey::AlertOverAllocation).with("excess", bequests_total - mass),
        );
        // Keep the mass conserved: the testament cannot give away more
        // than there is
        if bequests_total > Money::ZERO {
            for bequest in &mut bequests {
                bequest.value = bequest.value * mass / bequests_total;
            }
        }
        bequests_total = bequests.iter().map(|b| b.value).sum();
    }
    let remaining = (mass - bequests_total).max(Money::ZERO);

    let mut spouse = SpouseAllocation::default();
    let base_shares = match input.wishes.testament_distribution {
        TestamentDistribution::Legal | TestamentDistribution::SpecificBequests => {
            with_spouse_option(input, params, devolution, remaining, &mut spouse, tracer)
        }
        TestamentDistribution::Custom => custom_shares(input, devolution, tracer),
        TestamentDistribution::SpouseAll => spouse_all(devolution, tracer),
        TestamentDistribution::ChildrenAll => children_all(input, params, devolution, remaining, &mut spouse, tracer),
    };

    // Civil entitlement: fraction of the un-bequeathed mass plus bequests
    let mut gross_values: BTreeMap<String, Money> = BTreeMap::new();
    for heir in &input.heirs {
        let base = base_shares.get(&heir.id).copied().unwrap_or(Money::ZERO);
        let from_bequests: Money = bequests
            .iter()
            .filter(|b| b.beneficiary_id == heir.id)
            .map(|b| b.value)
            .sum();
        let gross = base * remaining + from_bequests;
        if gross > Money::ZERO || base_shares.contains_key(&heir.id) {
            gross_values.insert(heir.id.clone(), gross);
        }
    }

    let shares: BTreeMap<String, Rate> = if mass > Money::ZERO {
        gross_values
            .iter()
            .map(|(id, value)| (id.clone(), *value / mass))
            .collect()
    } else {
        base_shares.clone()
    };

    let imputations = impute_gifts(input, estate, &gross_values, tracer);

    validate_reserves(devolution, &shares, tracer);

    let reductions = excessive_liberalities(
        estate,
        devolution,
        &bequests,
        bequests_total,
        tracer,
    );

    debug!(
        "allocation: {} heirs allocated over mass {}",
        gross_values.len(),
        mass
    );
    tracer.record_step(
        4,
        "Répartition des parts",
        "Testamentary wishes, spouse option, gift imputation, and liberality checks",
        format!(
            "{} heir(s), bequests {}, spouse option {:?}",
            gross_values.len(),
            bequests_total,
            spouse.choice_made
        ),
    );

    Allocation {
        shares,
        gross_values,
        imputations,
        bequests,
        spouse,
        reductions,
    }
}

/// Resolve specific bequests to values, flagging per-asset over-allocation
fn resolve_bequests(input: &SimulationInput, tracer: &mut Tracer) -> (Vec<BequestAward>, Money) {
    let mut awards = Vec::new();
    let mut total = Money::ZERO;

    let mut allocated_by_asset: BTreeMap<String, Rate> = BTreeMap::new();
    for bequest in &input.wishes.specific_bequests {
        let Some(asset) = input.asset(&bequest.asset_id) else {
            tracer.data_warning(
                format!("Bequest names unknown asset {}", bequest.asset_id),
                Explanation::new(ExplanationKey::AlertOverAllocation).with("asset", &bequest.asset_id),
            );
            continue;
        };
        match input.heir(&bequest.beneficiary_id) {
            None => {
                tracer.data_warning(
                    format!("Bequest of {} names unknown beneficiary {}", bequest.asset_id, bequest.beneficiary_id),
                    Explanation::new(ExplanationKey::AlertOverAllocation).with("beneficiary", &bequest.beneficiary_id),
                );
                continue;
            }
            Some(heir) if heir.is_renouncing() => {
                tracer.legal_warning(
                    format!(
                        "Bequest of {} names {} who renounced the succession; skipped",
                        bequest.asset_id, bequest.beneficiary_id
                    ),
                    Explanation::new(ExplanationKey::ShareRenunciation)
                        .with("heir", &bequest.beneficiary_id),
                );
                continue;
            }
            Some(_) => {}
        }

        let value = asset.estimated_value * bequest.share_percentage / dec!(100);
        total += value;
        *allocated_by_asset.entry(asset.id.clone()).or_insert(Money::ZERO) +=
            bequest.share_percentage;
        awards.push(BequestAward {
            asset_id: bequest.asset_id.clone(),
            beneficiary_id: bequest.beneficiary_id.clone(),
            share_percentage: bequest.share_percentage,
            value,
        });
        tracer.explain(
            Explanation::new(ExplanationKey::ShareBequest)
                .with("asset", &bequest.asset_id)
                .with("beneficiary", &bequest.beneficiary_id)
                .with("value", value),
        );
    }

    for (asset_id, allocated) in &allocated_by_asset {
        if *allocated > dec!(100) {
            tracer.legal_warning(
                format!("Asset {asset_id} is bequeathed at {allocated}% in total"),
                Explanation::new(ExplanationKey::AlertOverAllocation)
                    .with("asset", asset_id)
                    .with("allocated_percentage", allocated),
            );
        }
    }

    (awards, total)
}

/// Legal distribution with the spouse option applied (Art. 757 CC)
fn with_spouse_option(
    input: &SimulationInput,
    params: &LegalParameters,
    devolution: &Devolution,
    available: Money,
    spouse_allocation: &mut SpouseAllocation,
    tracer: &mut Tracer,
) -> BTreeMap<String, Rate> {
    let mut shares = devolution.legal_shares.clone();

    let (Some(spouse_id), true) = (devolution.spouse_id.as_deref(), devolution.has_descendants)
    else {
        return shares;
    };
    let Some(choice) = input.wishes.spouse_choice else {
        return shares;
    };
    let Some(spouse) = input.heir(spouse_id) else {
        return shares;
    };

    let children: Vec<_> = input
        .heirs
        .iter()
        .filter(|h| h.relationship == Relationship::Child)
        .collect();

    let mut effective = choice;
    if choice == SpouseChoice::Usufruct {
        let all_common = children.iter().all(|c| c.is_from_current_union);
        if !all_common && !input.wishes.has_spouse_donation {
            tracer.legal_warning(
                "Full usufruct requires all children from the current union or a donation entre époux; quarter ownership applied instead (Art. 757 CC)",
                Explanation::new(ExplanationKey::ShareSpouseUsufruct757).with("fallback", "QUARTER_OWNERSHIP"),
            );
            effective = SpouseChoice::QuarterOwnership;
        }
    }
    if choice == SpouseChoice::DisposableQuota && !input.wishes.has_spouse_donation {
        tracer.error_alert(
            "The disposable-quota option requires a donation au dernier vivant; quarter ownership applied instead (Art. 1094-1 CC)",
            Explanation::new(ExplanationKey::ShareSpouseQuota10941).with("fallback", "QUARTER_OWNERSHIP"),
        );
        effective = SpouseChoice::QuarterOwnership;
    }

    spouse_allocation.choice_made = Some(effective);

    // Fraction left to the descendants, distributed by souche
    let children_fraction = match effective {
        SpouseChoice::Usufruct => {
            let split =
                params
                    .usufruct
                    .split_viager(available, spouse.birth_date, input.death_date);
            spouse_allocation.has_usufruct = true;
            spouse_allocation.usufruct_value = Some(split.usufruct_value);
            spouse_allocation.usufruct_rate = Some(split.usufruct_rate);
            spouse_allocation.bare_ownership_value = Some(split.bare_ownership_value);
            shares.insert(spouse_id.to_string(), split.usufruct_rate);
            tracer.explain(
                Explanation::new(ExplanationKey::ShareSpouseUsufruct757)
                    .with("usufruct_rate", split.usufruct_rate),
            );
            tracer.explain(
                Explanation::new(ExplanationKey::UsufructValuation669)
                    .with("age", spouse.age_at(input.death_date))
                    .with("usufruct_value", split.usufruct_value),
            );
            Money::ONE - split.usufruct_rate
        }
        SpouseChoice::QuarterOwnership => {
            shares.insert(spouse_id.to_string(), dec!(0.25));
            tracer.explain(Explanation::new(ExplanationKey::ShareSpouseQuarter757));
            dec!(0.75)
        }
        SpouseChoice::DisposableQuota => {
            let spouse_fraction = match devolution.child_souches.len() {
                1 => dec!(0.5),
                2 => Money::from(1u32) / Money::from(3u32),
                _ => dec!(0.25),
            };
            shares.insert(spouse_id.to_string(), spouse_fraction);
            tracer.explain(
                Explanation::new(ExplanationKey::ShareSpouseQuota10941)
                    .with("spouse_fraction", spouse_fraction),
            );
            Money::ONE - spouse_fraction
        }
    };

    let souche_count = devolution.child_souches.len();
    if souche_count > 0 {
        let per_souche = children_fraction / Money::from(souche_count as u32);
        for souche in &devolution.child_souches {
            let per_member = per_souche / Money::from(souche.members.len() as u32);
            for member in &souche.members {
                shares.insert(member.clone(), per_member);
            }
        }
    }

    shares
}

/// Custom testament shares, completed or normalized so the whole mass is
/// allocated
fn custom_shares(
    input: &SimulationInput,
    devolution: &Devolution,
    tracer: &mut Tracer,
) -> BTreeMap<String, Rate> {
    let mut shares: BTreeMap<String, Rate> = BTreeMap::new();
    for custom in &input.wishes.custom_shares {
        match input.heir(&custom.beneficiary_id) {
            None => {
                tracer.data_warning(
                    format!("Custom share names unknown beneficiary {}", custom.beneficiary_id),
                    Explanation::new(ExplanationKey::ShareCustom)
                        .with("beneficiary", &custom.beneficiary_id),
                );
                continue;
            }
            Some(heir) if heir.is_renouncing() => {
                tracer.legal_warning(
                    format!(
                        "Custom share names {} who renounced the succession; skipped",
                        custom.beneficiary_id
                    ),
                    Explanation::new(ExplanationKey::ShareRenunciation)
                        .with("heir", &custom.beneficiary_id),
                );
                continue;
            }
            Some(_) => {}
        }
        *shares
            .entry(custom.beneficiary_id.clone())
            .or_insert(Money::ZERO) += custom.percentage / dec!(100);
    }
    tracer.explain(Explanation::new(ExplanationKey::ShareCustom).with("heirs", shares.len()));

    let allocated: Rate = shares.values().copied().sum();
    let tolerance = dec!(0.000001);
    if (allocated - Money::ONE).abs() <= tolerance {
        return shares;
    }

    if allocated < Money::ONE {
        // Give the remainder to the legal heirs the testament did not name
        let unnamed: Vec<(&String, &Rate)> = devolution
            .legal_shares
            .iter()
            .filter(|(id, fraction)| !shares.contains_key(*id) && **fraction > Money::ZERO)
            .collect();
        let unnamed_total: Rate = unnamed.iter().map(|(_, f)| **f).sum();
        if unnamed_total > Money::ZERO {
            tracer.data_warning(
                format!("Custom shares only allocate {allocated}; the remainder follows the legal devolution"),
                Explanation::new(ExplanationKey::ShareCustom).with("allocated", allocated),
            );
            let remainder = Money::ONE - allocated;
            for (id, fraction) in unnamed {
                shares.insert(id.clone(), remainder * *fraction / unnamed_total);
            }
            return shares;
        }
    }

    // Nothing to complete with: scale to a full allocation
    if allocated > Money::ZERO {
        tracer.data_warning(
            format!("Custom shares sum to {allocated}; normalized to the full mass"),
            Explanation::new(ExplanationKey::ShareCustom).with("allocated", allocated),
        );
        for value in shares.values_mut() {
            *value /= allocated;
        }
    }
    shares
}

/// Everything to the spouse, capped by the descendants' reserve
fn spouse_all(devolution: &Devolution, tracer: &mut Tracer) -> BTreeMap<String, Rate> {
    let Some(spouse_id) = devolution.spouse_id.as_deref() else {
        tracer.data_warning(
            "Testament leaves everything to the spouse but no surviving spouse is present; legal devolution applied",
            Explanation::new(ExplanationKey::ShareCustom).with("mode", "SPOUSE_ALL"),
        );
        return devolution.legal_shares.clone();
    };

    let mut shares = BTreeMap::new();
    if devolution.reserve_fraction > Money::ZERO && devolution.has_descendants {
        tracer.legal_warning(
            format!(
                "Everything-to-the-spouse is capped by the descendants' reserve ({})",
                devolution.reserve_fraction
            ),
            Explanation::new(ExplanationKey::AlertReserveExceeded)
                .with("reserve_fraction", devolution.reserve_fraction),
        );
        shares.insert(
            spouse_id.to_string(),
            Money::ONE - devolution.reserve_fraction,
        );
        let per_souche =
            devolution.reserve_fraction / Money::from(devolution.child_souches.len() as u32);
        for souche in &devolution.child_souches {
            let per_member = per_souche / Money::from(souche.members.len() as u32);
            for member in &souche.members {
                shares.insert(member.clone(), per_member);
            }
        }
    } else {
        shares.insert(spouse_id.to_string(), Money::ONE);
    }
    shares
}

/// Everything to the children, the spouse stands aside
fn children_all(
    input: &SimulationInput,
    params: &LegalParameters,
    devolution: &Devolution,
    available: Money,
    spouse_allocation: &mut SpouseAllocation,
    tracer: &mut Tracer,
) -> BTreeMap<String, Rate> {
    if !devolution.has_descendants {
        tracer.data_warning(
            "Testament leaves everything to the children but none inherit; legal devolution applied",
            Explanation::new(ExplanationKey::ShareCustom).with("mode", "CHILDREN_ALL"),
        );
        return with_spouse_option(input, params, devolution, available, spouse_allocation, tracer);
    }
    let mut shares = BTreeMap::new();
    let per_souche = Money::ONE / Money::from(devolution.child_souches.len() as u32);
    for souche in &devolution.child_souches {
        let per_member = per_souche / Money::from(souche.members.len() as u32);
        for member in &souche.members {
            shares.insert(member.clone(), per_member);
        }
    }
    if let Some(spouse_id) = devolution.spouse_id.as_deref() {
        shares.insert(spouse_id.to_string(), Money::ZERO);
    }
    shares
}

/// Record the reportable gifts already in each heir's hands (Art. 843)
fn impute_gifts(
    input: &SimulationInput,
    estate: &EstateMass,
    gross_values: &BTreeMap<String, Money>,
    tracer: &mut Tracer,
) -> BTreeMap<String, Money> {
    let mut imputations = BTreeMap::new();
    for heir in &input.heirs {
        let imputed: Money = estate
            .reportable_donations
            .iter()
            .filter(|d| d.beneficiary_id == heir.id)
            .map(|d| d.value)
            .sum();
        if imputed <= Money::ZERO {
            continue;
        }
        imputations.insert(heir.id.clone(), imputed);
        let gross = gross_values.get(&heir.id).copied().unwrap_or(Money::ZERO);
        let mut explanation = Explanation::new(ExplanationKey::GiftImputation843)
            .with("heir", &heir.id)
            .with("imputed", imputed);
        if imputed > gross {
            explanation = explanation.with("excess_over_share", imputed - gross);
        }
        tracer.explain(explanation);
    }
    imputations
}

/// Warn when the allocation leaves a reserved heir under their individual
/// reserve; the engine reports, the notary rebalances
fn validate_reserves(
    devolution: &Devolution,
    shares: &BTreeMap<String, Rate>,
    tracer: &mut Tracer,
) {
    let tolerance = dec!(0.000001);
    for (heir_id, reserve) in &devolution.individual_reserves {
        let allocated = shares.get(heir_id).copied().unwrap_or(Money::ZERO);
        if allocated + tolerance < *reserve {
            tracer.legal_warning(
                format!(
                    "Heir {heir_id} receives {allocated} of the mass, under their reserve of {reserve}"
                ),
                Explanation::new(ExplanationKey::AlertReserveExceeded)
                    .with("heir", heir_id)
                    .with("allocated", allocated)
                    .with("reserve", reserve),
            );
        }
    }
}

/// Detect excessive liberalities (Art. 920) and compute the reduction
/// order: bequests first, then donations from the most recent back
/// (Art. 923)
fn excessive_liberalities(
    estate: &EstateMass,
    devolution: &Devolution,
    bequests: &[BequestAward],
    bequests_total: Money,
    tracer: &mut Tracer,
) -> Vec<LiberalityReduction> {
    if devolution.reserve_fraction <= Money::ZERO {
        return Vec::new();
    }
    let total_liberalities = estate.reportable_total + bequests_total;
    if total_liberalities <= devolution.disposable_quota {
        return Vec::new();
    }

    let excess = total_liberalities - devolution.disposable_quota;
    let mut remaining = excess;
    let mut reductions = Vec::new();

    // Bequests all date from the death: reduced together, in testament
    // order
    for bequest in bequests {
        if remaining <= Money::ZERO {
            break;
        }
        let cut = bequest.value.min(remaining);
        remaining -= cut;
        reductions.push(LiberalityReduction {
            liberality_id: format!("{}:{}", bequest.asset_id, bequest.beneficiary_id),
            kind: "bequest",
            beneficiary_id: bequest.beneficiary_id.clone(),
            original_value: bequest.value,
            reduction: cut,
            reduced_value: bequest.value - cut,
        });
    }

    // Donations from the most recent to the oldest
    let mut donations: Vec<_> = estate.reportable_donations.iter().collect();
    donations.sort_by(|a, b| b.date.cmp(&a.date));
    for donation in donations {
        if remaining <= Money::ZERO {
            break;
        }
        let cut = donation.value.min(remaining);
        remaining -= cut;
        reductions.push(LiberalityReduction {
            liberality_id: donation.donation_id.clone(),
            kind: "donation",
            beneficiary_id: donation.beneficiary_id.clone(),
            original_value: donation.value,
            reduction: cut,
            reduced_value: donation.value - cut,
        });
    }

    let mut alert_explanations = vec![Explanation::new(ExplanationKey::AlertReserveExceeded)
        .with("excess", excess)
        .with("disposable_quota", devolution.disposable_quota)];
    for reduction in &reductions {
        alert_explanations.push(
            Explanation::new(ExplanationKey::Reduction920)
                .with("liberality", &reduction.liberality_id)
                .with("reduction", reduction.reduction),
        );
    }
    tracer.alert(crate::trace::Alert {
        severity: crate::trace::Severity::Warning,
        audience: crate::trace::Audience::User,
        category: crate::trace::Category::Legal,
        message: format!(
            "Liberalities ({total_liberalities}) exceed the disposable quota ({}); {excess} is reducible by the reserved heirs",
            devolution.disposable_quota
        ),
        details: Some("The reduction applies to bequests first, then to donations from the most recent to the oldest (Art. 923 CC)".into()),
        explanations: alert_explanations,
    });

    reductions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        Asset, AssetOrigin, CustomShare, Donation, DonationType, Heir, MatrimonialRegime,
        OwnershipMode, SpecificBequest, Wishes,
    };
    use crate::pipeline::{devolution::solve, estate::reconstitute, liquidation::liquidate};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn family_input(wishes: Wishes) -> SimulationInput {
        SimulationInput {
            matrimonial_regime: MatrimonialRegime::Separation,
            marriage_date: Some(d(1990, 1, 1)),
            death_date: d(2024, 3, 1),
            assets: vec![Asset::new("a", dec!(600000), OwnershipMode::Full, AssetOrigin::Personal)],
            heirs: vec![
                Heir::new("spouse", d(1952, 2, 1), Relationship::Spouse),
                Heir::new("c1", d(1991, 1, 1), Relationship::Child),
                Heir::new("c2", d(1993, 1, 1), Relationship::Child),
            ],
            wishes,
            donations: vec![],
            debts: vec![],
            matrimonial_advantages: None,
            residence_country: "FR".into(),
        }
    }

    fn run(input: &SimulationInput) -> (Allocation, Tracer) {
        let params = LegalParameters::france_2024();
        let mut tracer = Tracer::new();
        let liq = liquidate(input, &params, &mut tracer);
        let estate = reconstitute(input, &liq, &params, &mut tracer);
        let devolution = solve(input, &estate, &mut tracer);
        let allocation = allocate(input, &params, &estate, &devolution, &mut tracer);
        (allocation, tracer)
    }

    fn gross(allocation: &Allocation, id: &str) -> Money {
        allocation.gross_values.get(id).copied().unwrap_or(Money::ZERO)
    }

    #[test]
    fn test_quarter_ownership_option() {
        let input = family_input(Wishes {
            spouse_choice: Some(SpouseChoice::QuarterOwnership),
            ..Default::default()
        });
        let (allocation, _) = run(&input);

        assert_eq!(gross(&allocation, "spouse"), dec!(150000));
        assert_eq!(gross(&allocation, "c1"), dec!(225000));
        assert_eq!(gross(&allocation, "c2"), dec!(225000));
        assert_eq!(allocation.spouse.choice_made, Some(SpouseChoice::QuarterOwnership));
    }

    #[test]
    fn test_usufruct_option_splits_fiscally() {
        let input = family_input(Wishes {
            spouse_choice: Some(SpouseChoice::Usufruct),
            ..Default::default()
        });
        let (allocation, _) = run(&input);

        // Spouse is 72 at death: usufruct rate 30%
        assert!(allocation.spouse.has_usufruct);
        assert_eq!(allocation.spouse.usufruct_rate, Some(dec!(0.30)));
        assert_eq!(allocation.spouse.usufruct_value, Some(dec!(180000.00)));
        assert_eq!(gross(&allocation, "spouse"), dec!(180000.00));
        // Children share the bare ownership equally
        assert_eq!(gross(&allocation, "c1"), dec!(210000.00));
        assert_eq!(gross(&allocation, "c2"), dec!(210000.00));
    }

    #[test]
    fn test_usufruct_fallback_with_stepchild_and_no_donation() {
        let mut input = family_input(Wishes {
            spouse_choice: Some(SpouseChoice::Usufruct),
            ..Default::default()
        });
        input.heirs[2].is_from_current_union = false;
        let (allocation, tracer) = run(&input);

        assert_eq!(allocation.spouse.choice_made, Some(SpouseChoice::QuarterOwnership));
        assert!(tracer.alerts().iter().any(|a| a.message.contains("usufruct")
            || a.message.contains("Usufruct")
            || a.message.contains("quarter ownership")));
    }

    #[test]
    fn test_disposable_quota_with_one_child() {
        let mut input = family_input(Wishes {
            has_spouse_donation: true,
            spouse_choice: Some(SpouseChoice::DisposableQuota),
            ..Default::default()
        });
        input.heirs.remove(2);
        let (allocation, _) = run(&input);

        assert_eq!(gross(&allocation, "spouse"), dec!(300000.0));
        assert_eq!(gross(&allocation, "c1"), dec!(300000.0));
    }

    #[test]
    fn test_disposable_quota_without_donation_falls_back() {
        let input = family_input(Wishes {
            has_spouse_donation: false,
            spouse_choice: Some(SpouseChoice::DisposableQuota),
            ..Default::default()
        });
        let (allocation, tracer) = run(&input);

        assert_eq!(allocation.spouse.choice_made, Some(SpouseChoice::QuarterOwnership));
        assert!(tracer
            .alerts()
            .iter()
            .any(|a| a.severity == crate::trace::Severity::Error));
    }

    #[test]
    fn test_specific_bequest_carves_out_asset_share() {
        let mut input = family_input(Wishes {
            testament_distribution: TestamentDistribution::SpecificBequests,
            specific_bequests: vec![SpecificBequest {
                asset_id: "a".into(),
                beneficiary_id: "c1".into(),
                share_percentage: dec!(20),
            }],
            spouse_choice: Some(SpouseChoice::QuarterOwnership),
            ..Default::default()
        });
        input.heirs[0].birth_date = d(1952, 2, 1);
        let (allocation, _) = run(&input);

        // 120 000 bequeathed, 480 000 split per the legal rules
        assert_eq!(gross(&allocation, "c1"), dec!(120000) + dec!(180000.0));
        assert_eq!(gross(&allocation, "c2"), dec!(180000.0));
        assert_eq!(gross(&allocation, "spouse"), dec!(120000.0));
    }

    #[test]
    fn test_over_allocated_asset_flagged() {
        let input = family_input(Wishes {
            testament_distribution: TestamentDistribution::SpecificBequests,
            specific_bequests: vec![
                SpecificBequest {
                    asset_id: "a".into(),
                    beneficiary_id: "c1".into(),
                    share_percentage: dec!(70),
                },
                SpecificBequest {
                    asset_id: "a".into(),
                    beneficiary_id: "c2".into(),
                    share_percentage: dec!(60),
                },
            ],
            ..Default::default()
        });
        let (_, tracer) = run(&input);
        assert!(tracer.alerts().iter().any(|a| a.message.contains("130")));
    }

    #[test]
    fn test_custom_shares_under_reserve_warn_but_stand() {
        let input = family_input(Wishes {
            testament_distribution: TestamentDistribution::Custom,
            custom_shares: vec![
                CustomShare { beneficiary_id: "spouse".into(), percentage: dec!(80) },
                CustomShare { beneficiary_id: "c1".into(), percentage: dec!(10) },
                CustomShare { beneficiary_id: "c2".into(), percentage: dec!(10) },
            ],
            ..Default::default()
        });
        let (allocation, tracer) = run(&input);

        // Shares stand as written
        assert_eq!(gross(&allocation, "spouse"), dec!(480000.0));
        // Each child's reserve is 1/3: violation flagged, not rebalanced
        assert!(tracer
            .alerts()
            .iter()
            .any(|a| a.message.contains("reserve") || a.message.contains("Reserve")));
    }

    #[test]
    fn test_imputation_recorded_per_heir() {
        let mut input = family_input(Wishes {
            spouse_choice: Some(SpouseChoice::QuarterOwnership),
            ..Default::default()
        });
        input.donations = vec![Donation {
            id: "d1".into(),
            donation_type: DonationType::DonManuel,
            beneficiary_id: "c1".into(),
            donation_date: d(2020, 1, 1),
            original_value: dec!(50000),
            current_estimated_value: None,
            is_declared_to_tax: true,
        }];
        let (allocation, _) = run(&input);

        assert_eq!(allocation.imputations.get("c1"), Some(&dec!(50000)));
        assert_eq!(allocation.imputations.get("c2"), None);
    }

    #[test]
    fn test_excessive_liberalities_reduction_order() {
        let mut input = family_input(Wishes {
            testament_distribution: TestamentDistribution::SpecificBequests,
            specific_bequests: vec![SpecificBequest {
                asset_id: "a".into(),
                beneficiary_id: "spouse".into(),
                share_percentage: dec!(40),
            }],
            ..Default::default()
        });
        input.donations = vec![
            Donation {
                id: "old".into(),
                donation_type: DonationType::DonManuel,
                beneficiary_id: "c1".into(),
                donation_date: d(2010, 1, 1),
                original_value: dec!(100000),
                current_estimated_value: None,
                is_declared_to_tax: true,
            },
            Donation {
                id: "recent".into(),
                donation_type: DonationType::DonManuel,
                beneficiary_id: "c2".into(),
                donation_date: d(2020, 1, 1),
                original_value: dec!(100000),
                current_estimated_value: None,
                is_declared_to_tax: true,
            },
        ];
        let (allocation, _) = run(&input);

        // Mass 800 000, two children: quota 1/3 (266 666.67);
        // liberalities 440 000: excess is absorbed by the bequest first,
        // then the most recent donation
        assert!(!allocation.reductions.is_empty());
        assert_eq!(allocation.reductions[0].kind, "bequest");
        if allocation.reductions.len() > 1 {
            assert_eq!(allocation.reductions[1].liberality_id, "recent");
        }
    }
}
