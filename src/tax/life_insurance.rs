//! Life-insurance taxation, outside the succession (Art. 990 I / 757 B CGI)
//!
//! Contracts never enter the civil mass. Premiums paid before the
//! subscriber turned 70 bear the Art. 990 I levy per beneficiary;
//! premiums paid after 70 share the global Art. 757 B allowance, and the
//! remainder re-enters each beneficiary's inheritance-tax base, which is
//! why this stage runs before the inheritance-tax stage.

use std::collections::BTreeMap;

use log::debug;
use rust_decimal_macros::dec;

use crate::input::{
    Asset, BeneficiaryOwnership, LifeInsuranceContractType, SimulationInput, SubscriberType,
};
use crate::params::LegalParameters;
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::{round_cents, Money, Rate};

/// Per-beneficiary life-insurance assessment, aggregated over contracts
#[derive(Debug, Clone)]
pub(crate) struct BeneficiaryAssessment {
    pub beneficiary_id: String,

    /// Art. 990 I base: before-70 capital share, Vie-Génération rebate
    /// applied
    pub base_990i: Money,
    pub allowance_990i: Money,
    pub taxable_990i: Money,
    pub tax_990i: Money,

    /// After-70 premium share (Art. 757 B)
    pub after70_premiums: Money,
    pub allowance_757b: Money,

    /// Amount re-entering the beneficiary's inheritance-tax base
    pub addback_757b: Money,

    /// Spouse or partner: exempt on both sides
    pub exempt: bool,

    pub contracts: Vec<String>,
}

/// Result of the life-insurance stage
#[derive(Debug, Clone, Default)]
pub(crate) struct LifeInsuranceAssessment {
    /// Ordered by first appearance over contracts and beneficiary lists
    pub beneficiaries: Vec<BeneficiaryAssessment>,
    pub total_tax_990i: Money,

    /// Total contract value kept outside the mass, for reporting
    pub total_capital_excluded: Money,
}

impl LifeInsuranceAssessment {
    /// Art. 757 B add-back for an heir, zero when none
    pub fn addback_for(&self, heir_id: &str) -> Money {
        self.beneficiaries
            .iter()
            .find(|b| b.beneficiary_id == heir_id)
            .map(|b| b.addback_757b)
            .unwrap_or(Money::ZERO)
    }
}

/// A beneficiary's resolved fraction of one contract
struct ContractSlice {
    beneficiary_id: String,
    fraction: Rate,
    dismembered: bool,
}

pub(crate) fn assess(
    input: &SimulationInput,
    params: &LegalParameters,
    tracer: &mut Tracer,
) -> LifeInsuranceAssessment {
    let contracts: Vec<&Asset> = input
        .assets
        .iter()
        .filter(|a| a.is_life_insurance())
        .collect();
    if contracts.is_empty() {
        return LifeInsuranceAssessment::default();
    }

    let mut assessment = LifeInsuranceAssessment::default();
    let mut order: Vec<String> = Vec::new();
    let mut base_990i: BTreeMap<String, Money> = BTreeMap::new();
    let mut cap_990i: BTreeMap<String, Money> = BTreeMap::new();
    let mut after70: BTreeMap<String, Money> = BTreeMap::new();
    let mut contract_refs: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for contract in &contracts {
        assessment.total_capital_excluded += contract.estimated_value;

        if contract.subscriber_type == Some(SubscriberType::Spouse) {
            tracer.fiscal_note(
                format!(
                    "Contract {} was subscribed by the surviving spouse; its unwinding at the first death is a vigilance point",
                    contract.id
                ),
                Explanation::new(ExplanationKey::LifeInsurance990i).with("contract", &contract.id),
            );
        }

        if contract.life_insurance_contract_type == LifeInsuranceContractType::AncienContrat {
            tracer.explain(
                Explanation::new(ExplanationKey::LifeInsuranceAncienContrat)
                    .with("contract", &contract.id),
            );
            continue;
        }

        let slices = resolve_slices(input, contract, params, tracer);

        let mut before = contract.premiums_before_70.unwrap_or(Money::ZERO);
        if contract.life_insurance_contract_type == LifeInsuranceContractType::VieGeneration {
            before *= Money::ONE - params.life_insurance.vie_generation_rebate;
            tracer.explain(
                Explanation::new(ExplanationKey::LifeInsuranceVieGeneration)
                    .with("contract", &contract.id)
                    .with("rebated_base", before),
            );
        }
        let after = contract.premiums_after_70.unwrap_or(Money::ZERO);

        for slice in &slices {
            if !order.contains(&slice.beneficiary_id) {
                order.push(slice.beneficiary_id.clone());
            }
            *base_990i.entry(slice.beneficiary_id.clone()).or_insert(Money::ZERO) +=
                before * slice.fraction;
            // A dismembered clause shares the 152 500 allowance pro-rata
            // between usufructuary and bare owners; plain beneficiaries
            // each carry a full one
            let cap = if slice.dismembered {
                params.life_insurance.allowance_before_70 * slice.fraction
            } else {
                params.life_insurance.allowance_before_70
            };
            let entry = cap_990i.entry(slice.beneficiary_id.clone()).or_insert(Money::ZERO);
            *entry = (*entry + cap).min(params.life_insurance.allowance_before_70);
            *after70.entry(slice.beneficiary_id.clone()).or_insert(Money::ZERO) +=
                after * slice.fraction;
            contract_refs
                .entry(slice.beneficiary_id.clone())
                .or_default()
                .push(contract.id.clone());
        }
    }

    // Art. 757 B: one 30 500 allowance over all contracts, pro-rated on
    // the after-70 premiums of the non-exempt beneficiaries
    let after70_taxable_total: Money = order
        .iter()
        .filter(|id| !is_exempt_beneficiary(input, id))
        .map(|id| after70.get(id).copied().unwrap_or(Money::ZERO))
        .sum();

    for beneficiary_id in &order {
        let exempt = is_exempt_beneficiary(input, beneficiary_id);
        let base = base_990i.get(beneficiary_id).copied().unwrap_or(Money::ZERO);
        let after = after70.get(beneficiary_id).copied().unwrap_or(Money::ZERO);

        let (allowance_990i, taxable_990i, tax_990i) = if exempt {
            tracer.explain(
                Explanation::new(ExplanationKey::LifeInsuranceSpouseExempt)
                    .with("beneficiary", beneficiary_id),
            );
            (Money::ZERO, Money::ZERO, Money::ZERO)
        } else {
            let allowance = cap_990i
                .get(beneficiary_id)
                .copied()
                .unwrap_or(Money::ZERO)
                .min(base);
            let taxable = (base - allowance).max(Money::ZERO);
            let tax = round_cents(
                taxable.min(params.life_insurance.rate_pivot) * params.life_insurance.rate_low
                    + (taxable - params.life_insurance.rate_pivot).max(Money::ZERO)
                        * params.life_insurance.rate_high,
            );
            if base > Money::ZERO {
                tracer.explain(
                    Explanation::new(ExplanationKey::LifeInsurance990i)
                        .with("beneficiary", beneficiary_id)
                        .with("taxable", taxable)
                        .with("tax", tax),
                );
            }
            (allowance, taxable, tax)
        };

        let (allowance_757b, addback_757b) = if exempt || after <= Money::ZERO {
            (Money::ZERO, Money::ZERO)
        } else {
            let allowance = if after70_taxable_total <= params.life_insurance.allowance_after_70 {
                after
            } else {
                params.life_insurance.allowance_after_70 * after / after70_taxable_total
            };
            let addback = after - allowance;
            if addback > Money::ZERO {
                tracer.explain(
                    Explanation::new(ExplanationKey::LifeInsurance757b)
                        .with("beneficiary", beneficiary_id)
                        .with("addback", addback),
                );
            }
            (allowance, addback)
        };

        assessment.total_tax_990i += tax_990i;
        assessment.beneficiaries.push(BeneficiaryAssessment {
            beneficiary_id: beneficiary_id.clone(),
            base_990i: base,
            allowance_990i,
            taxable_990i,
            tax_990i,
            after70_premiums: after,
            allowance_757b,
            addback_757b,
            exempt,
            contracts: contract_refs.remove(beneficiary_id).unwrap_or_default(),
        });
    }

    debug!(
        "life insurance: {} contract(s), 990 I tax {}",
        contracts.len(),
        assessment.total_tax_990i
    );
    tracer.record_step(
        5,
        "Fiscalité des assurances-vie",
        "Art. 990 I levy and Art. 757 B add-back, outside the succession",
        format!(
            "{} contract(s) excluded from the mass, 990 I tax {}",
            contracts.len(),
            assessment.total_tax_990i
        ),
    );

    assessment
}

fn is_exempt_beneficiary(input: &SimulationInput, heir_id: &str) -> bool {
    input
        .heir(heir_id)
        .map(|h| h.is_spouse_or_partner())
        .unwrap_or(false)
}

/// Resolve the beneficiary clause of one contract into fractions of its
/// premiums, valuing a dismembered clause through the Art. 669 scale
fn resolve_slices(
    input: &SimulationInput,
    contract: &Asset,
    params: &LegalParameters,
    tracer: &mut Tracer,
) -> Vec<ContractSlice> {
    if contract.life_insurance_beneficiaries.is_empty() {
        // No clause on record: deterministic equal split among the
        // accepting heirs, flagged for the user to fix
        let accepting: Vec<&str> = input
            .heirs
            .iter()
            .filter(|h| !h.is_renouncing())
            .map(|h| h.id.as_str())
            .collect();
        tracer.data_warning(
            format!(
                "Contract {} has no beneficiary clause on record; premiums split equally among the {} accepting heirs",
                contract.id,
                accepting.len()
            ),
            Explanation::new(ExplanationKey::LifeInsurance990i).with("contract", &contract.id),
        );
        let count = accepting.len().max(1);
        return accepting
            .iter()
            .map(|id| ContractSlice {
                beneficiary_id: id.to_string(),
                fraction: Money::ONE / Money::from(count as u32),
                dismembered: false,
            })
            .collect();
    }

    let dismembered = contract
        .life_insurance_beneficiaries
        .iter()
        .any(|b| b.ownership != BeneficiaryOwnership::Full);

    if !dismembered {
        let total: Rate = contract
            .life_insurance_beneficiaries
            .iter()
            .map(|b| b.share_percentage)
            .sum();
        if (total - dec!(100)).abs() > dec!(0.01) {
            tracer.data_warning(
                format!(
                    "Beneficiary shares of contract {} sum to {total}%; normalized",
                    contract.id
                ),
                Explanation::new(ExplanationKey::LifeInsurance990i).with("contract", &contract.id),
            );
        }
        let denominator = if total > Money::ZERO { total } else { dec!(100) };
        return contract
            .life_insurance_beneficiaries
            .iter()
            .map(|b| ContractSlice {
                beneficiary_id: b.beneficiary_id.clone(),
                fraction: b.share_percentage / denominator,
                dismembered: false,
            })
            .collect();
    }

    // Dismembered clause: the usufruct slice is valued by the (first)
    // usufructuary's age, the bare owners share the rest
    let usufructuaries: Vec<_> = contract
        .life_insurance_beneficiaries
        .iter()
        .filter(|b| b.ownership == BeneficiaryOwnership::Usufruct)
        .collect();
    let bare_owners: Vec<_> = contract
        .life_insurance_beneficiaries
        .iter()
        .filter(|b| b.ownership != BeneficiaryOwnership::Usufruct)
        .collect();

    let usufruct_rate = usufructuaries
        .first()
        .and_then(|b| input.heir(&b.beneficiary_id))
        .map(|h| params.usufruct.viager_rate(h.age_at(input.death_date)))
        .unwrap_or(Money::ZERO);

    tracer.explain(
        Explanation::new(ExplanationKey::LifeInsuranceDismembered)
            .with("contract", &contract.id)
            .with("usufruct_rate", usufruct_rate),
    );

    let mut slices = Vec::new();
    let usufruct_total: Rate = usufructuaries.iter().map(|b| b.share_percentage).sum();
    for beneficiary in &usufructuaries {
        let within = if usufruct_total > Money::ZERO {
            beneficiary.share_percentage / usufruct_total
        } else {
            Money::ZERO
        };
        slices.push(ContractSlice {
            beneficiary_id: beneficiary.beneficiary_id.clone(),
            fraction: usufruct_rate * within,
            dismembered: true,
        });
    }
    let bare_total: Rate = bare_owners.iter().map(|b| b.share_percentage).sum();
    for beneficiary in &bare_owners {
        let within = if bare_total > Money::ZERO {
            beneficiary.share_percentage / bare_total
        } else {
            Money::ZERO
        };
        slices.push(ContractSlice {
            beneficiary_id: beneficiary.beneficiary_id.clone(),
            fraction: (Money::ONE - usufruct_rate) * within,
            dismembered: true,
        });
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        AssetOrigin, Heir, LifeInsuranceBeneficiary, MatrimonialRegime, OwnershipMode,
        Relationship, Wishes,
    };
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn beneficiary(id: &str, pct: Money, ownership: BeneficiaryOwnership) -> LifeInsuranceBeneficiary {
        LifeInsuranceBeneficiary {
            beneficiary_id: id.into(),
            share_percentage: pct,
            ownership,
        }
    }

    fn input_with(assets: Vec<Asset>, heirs: Vec<Heir>) -> SimulationInput {
        SimulationInput {
            matrimonial_regime: MatrimonialRegime::Separation,
            marriage_date: None,
            death_date: d(2024, 3, 1),
            assets,
            heirs,
            wishes: Wishes::default(),
            donations: vec![],
            debts: vec![],
            matrimonial_advantages: None,
            residence_country: "FR".into(),
        }
    }

    fn run(input: &SimulationInput) -> LifeInsuranceAssessment {
        let params = LegalParameters::france_2024();
        let mut tracer = Tracer::new();
        assess(input, &params, &mut tracer)
    }

    fn contract(id: &str, before: Option<Money>, after: Option<Money>) -> Asset {
        let mut asset = Asset::new(id, before.unwrap_or(Money::ZERO) + after.unwrap_or(Money::ZERO), OwnershipMode::Full, AssetOrigin::Personal);
        asset.premiums_before_70 = before;
        asset.premiums_after_70 = after;
        asset
    }

    #[test]
    fn test_990i_single_child_beneficiary() {
        let mut av = contract("av", Some(dec!(300000)), None);
        av.life_insurance_beneficiaries =
            vec![beneficiary("c1", dec!(100), BeneficiaryOwnership::Full)];
        let assessment = run(&input_with(
            vec![av],
            vec![Heir::new("c1", d(1990, 1, 1), Relationship::Child)],
        ));

        let row = &assessment.beneficiaries[0];
        assert_eq!(row.taxable_990i, dec!(147500));
        assert_eq!(row.tax_990i, dec!(29500.00));
        assert_eq!(assessment.total_tax_990i, dec!(29500.00));
    }

    #[test]
    fn test_990i_above_pivot_uses_high_rate() {
        let mut av = contract("av", Some(dec!(1000000)), None);
        av.life_insurance_beneficiaries =
            vec![beneficiary("c1", dec!(100), BeneficiaryOwnership::Full)];
        let assessment = run(&input_with(
            vec![av],
            vec![Heir::new("c1", d(1990, 1, 1), Relationship::Child)],
        ));

        // Taxable 847 500: 700 000 at 20% + 147 500 at 31.25%
        let row = &assessment.beneficiaries[0];
        assert_eq!(row.taxable_990i, dec!(847500));
        assert_eq!(row.tax_990i, dec!(186093.75));
    }

    #[test]
    fn test_spouse_beneficiary_exempt() {
        let mut av = contract("av", Some(dec!(500000)), Some(dec!(60000)));
        av.life_insurance_beneficiaries =
            vec![beneficiary("spouse", dec!(100), BeneficiaryOwnership::Full)];
        let assessment = run(&input_with(
            vec![av],
            vec![Heir::new("spouse", d(1955, 1, 1), Relationship::Spouse)],
        ));

        let row = &assessment.beneficiaries[0];
        assert!(row.exempt);
        assert_eq!(row.tax_990i, Money::ZERO);
        assert_eq!(row.addback_757b, Money::ZERO);
    }

    #[test]
    fn test_757b_allowance_shared_proportionally() {
        let mut av = contract("av", None, Some(dec!(91500)));
        av.life_insurance_beneficiaries = vec![
            beneficiary("c1", dec!(66.666666666666666667), BeneficiaryOwnership::Full),
            beneficiary("c2", dec!(33.333333333333333333), BeneficiaryOwnership::Full),
        ];
        let assessment = run(&input_with(
            vec![av],
            vec![
                Heir::new("c1", d(1990, 1, 1), Relationship::Child),
                Heir::new("c2", d(1992, 1, 1), Relationship::Child),
            ],
        ));

        // 91 500 after-70 premiums against the 30 500 global allowance:
        // two thirds of the allowance to c1, one third to c2
        let c1 = &assessment.beneficiaries[0];
        let c2 = &assessment.beneficiaries[1];
        assert!((c1.addback_757b - dec!(40666.67)).abs() < dec!(0.1));
        assert!((c2.addback_757b - dec!(20333.33)).abs() < dec!(0.1));
        assert_eq!(assessment.total_tax_990i, Money::ZERO);
    }

    #[test]
    fn test_757b_fully_covered_by_allowance() {
        let mut av = contract("av", None, Some(dec!(20000)));
        av.life_insurance_beneficiaries =
            vec![beneficiary("c1", dec!(100), BeneficiaryOwnership::Full)];
        let assessment = run(&input_with(
            vec![av],
            vec![Heir::new("c1", d(1990, 1, 1), Relationship::Child)],
        ));
        assert_eq!(assessment.beneficiaries[0].addback_757b, Money::ZERO);
    }

    #[test]
    fn test_ancien_contrat_exempt() {
        let mut av = contract("av", Some(dec!(400000)), None);
        av.life_insurance_contract_type = LifeInsuranceContractType::AncienContrat;
        av.life_insurance_beneficiaries =
            vec![beneficiary("c1", dec!(100), BeneficiaryOwnership::Full)];
        let assessment = run(&input_with(
            vec![av],
            vec![Heir::new("c1", d(1990, 1, 1), Relationship::Child)],
        ));

        assert!(assessment.beneficiaries.is_empty());
        assert_eq!(assessment.total_tax_990i, Money::ZERO);
    }

    #[test]
    fn test_vie_generation_rebate() {
        let mut av = contract("av", Some(dec!(300000)), None);
        av.life_insurance_contract_type = LifeInsuranceContractType::VieGeneration;
        av.life_insurance_beneficiaries =
            vec![beneficiary("c1", dec!(100), BeneficiaryOwnership::Full)];
        let assessment = run(&input_with(
            vec![av],
            vec![Heir::new("c1", d(1990, 1, 1), Relationship::Child)],
        ));

        // Base 240 000 after the 20% rebate, taxable 87 500
        let row = &assessment.beneficiaries[0];
        assert_eq!(row.base_990i, dec!(240000.0));
        assert_eq!(row.taxable_990i, dec!(87500.0));
        assert_eq!(row.tax_990i, dec!(17500.00));
    }

    #[test]
    fn test_dismembered_clause_spouse_usufruct_child_bare() {
        let mut av = contract("av", Some(dec!(400000)), None);
        av.life_insurance_beneficiaries = vec![
            beneficiary("spouse", dec!(100), BeneficiaryOwnership::Usufruct),
            beneficiary("c1", dec!(100), BeneficiaryOwnership::Bare),
        ];
        let assessment = run(&input_with(
            vec![av],
            vec![
                // Spouse is 72 at death: usufruct rate 30%
                Heir::new("spouse", d(1952, 1, 1), Relationship::Spouse),
                Heir::new("c1", d(1990, 1, 1), Relationship::Child),
            ],
        ));

        let spouse = assessment
            .beneficiaries
            .iter()
            .find(|b| b.beneficiary_id == "spouse")
            .unwrap();
        assert!(spouse.exempt);

        let child = assessment
            .beneficiaries
            .iter()
            .find(|b| b.beneficiary_id == "c1")
            .unwrap();
        // Bare owner takes 70% of the premiums with 70% of the allowance
        assert_eq!(child.base_990i, dec!(280000.0));
        assert_eq!(child.allowance_990i, dec!(106750.00));
        assert_eq!(child.taxable_990i, dec!(173250.00));
        assert_eq!(child.tax_990i, dec!(34650.00));
    }

    #[test]
    fn test_missing_clause_splits_among_accepting_heirs() {
        let av = contract("av", Some(dec!(305000)), None);
        let assessment = run(&input_with(
            vec![av],
            vec![
                Heir::new("c1", d(1990, 1, 1), Relationship::Child),
                Heir::new("c2", d(1992, 1, 1), Relationship::Child),
            ],
        ));

        assert_eq!(assessment.beneficiaries.len(), 2);
        // Each gets 152 500: exactly the allowance, nothing taxable
        assert_eq!(assessment.beneficiaries[0].taxable_990i, Money::ZERO);
        assert_eq!(assessment.total_tax_990i, Money::ZERO);
    }
}
