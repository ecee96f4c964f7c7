//! Inheritance tax per heir (Art. 777, 779, 784, 786 CGI)
//!
//! Taxable base = civil share net of imputed gifts, plus the Art. 757 B
//! add-back, minus the pro-rata partial exemptions (Dutreil, rural,
//! forestry, occupied main residence). The allowance is reduced by the
//! declared donations of the last fifteen years, then the group's bracket
//! scale applies. Rounding happens once per heir, on the final figures.

use log::debug;

use super::life_insurance::LifeInsuranceAssessment;
use crate::input::{Heir, SimulationInput};
use crate::output::TaxComputation;
use crate::params::{LegalParameters, TaxGroup};
use crate::pipeline::{Allocation, LiquidationOutcome};
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::{round_cents, Money};

/// One heir's assessed tax
#[derive(Debug, Clone)]
pub(crate) struct HeirTax {
    pub heir_id: String,
    pub taxable_base: Money,
    pub allowance_used: Money,
    pub tax: Money,
    pub computation: TaxComputation,
    pub explanations: Vec<Explanation>,
}

/// Result of the inheritance-tax stage
#[derive(Debug, Clone)]
pub(crate) struct TaxAssessment {
    pub heirs: Vec<HeirTax>,
    pub total_tax: Money,
}

pub(crate) fn assess(
    input: &SimulationInput,
    params: &LegalParameters,
    liquidation: &LiquidationOutcome,
    allocation: &Allocation,
    life_insurance: &LifeInsuranceAssessment,
    tracer: &mut Tracer,
) -> TaxAssessment {
    // Partial exemptions attach to the estate and spread over the heirs
    // pro-rata of their shares (the simplified devolution does not assign
    // specific assets to specific heirs)
    let estate_reliefs = estate_reliefs(input, params, liquidation, tracer);

    let mut assessment = TaxAssessment {
        heirs: Vec::new(),
        total_tax: Money::ZERO,
    };

    for heir in &input.heirs {
        let gross = allocation
            .gross_values
            .get(&heir.id)
            .copied()
            .unwrap_or(Money::ZERO);
        let addback = life_insurance.addback_for(&heir.id);
        if gross <= Money::ZERO && addback <= Money::ZERO {
            continue;
        }

        let heir_tax = assess_heir(
            input, params, allocation, heir, gross, addback, estate_reliefs, tracer,
        );
        assessment.total_tax += heir_tax.tax;
        assessment.heirs.push(heir_tax);
    }

    debug!("inheritance tax: total {}", assessment.total_tax);
    tracer.record_step(
        6,
        "Calcul des droits de succession",
        "Allowances, fifteen-year recall, and bracket scales per heir",
        format!("total inheritance tax {}", assessment.total_tax),
    );

    assessment
}

/// Total exempt value carried by the estate: professional exemptions plus
/// the occupied-main-residence relief
fn estate_reliefs(
    input: &SimulationInput,
    params: &LegalParameters,
    liquidation: &LiquidationOutcome,
    tracer: &mut Tracer,
) -> Money {
    let mut total = Money::ZERO;

    for attribution in &liquidation.attributions {
        let Some(asset) = input.asset(&attribution.asset_id) else {
            continue;
        };

        if let Some(exemption) = &asset.professional_exemption {
            // The exemption covers the fraction of the asset that entered
            // the mass, and never the CCA (Art. 787 B)
            let basis_total = asset.estimated_value + asset.cca_value;
            let in_mass_fraction = if basis_total > Money::ZERO {
                attribution.deceased_share / basis_total
            } else {
                Money::ZERO
            };
            let exempt =
                params.deductions.professional_exempt_amount(asset.estimated_value, exemption)
                    * in_mass_fraction;
            if exempt > Money::ZERO {
                total += exempt;
                let key = match exemption.exemption_type {
                    crate::input::ExemptionType::Dutreil => ExplanationKey::ExemptionDutreil787b,
                    crate::input::ExemptionType::RuralLease => ExplanationKey::ExemptionRural793,
                    crate::input::ExemptionType::Forestry => ExplanationKey::ExemptionForestry793,
                };
                tracer.explain(
                    Explanation::new(key)
                        .with("asset", &asset.id)
                        .with("exempt_value", exempt),
                );
            }
        }

        if attribution.occupied_main_residence_value > Money::ZERO {
            let relief = attribution.occupied_main_residence_value
                * params.deductions.main_residence_rebate;
            total += relief;
            tracer.explain(
                Explanation::new(ExplanationKey::ExemptionMainResidence764bis)
                    .with("asset", &attribution.asset_id)
                    .with("relief", relief),
            );
        }
    }

    total
}

#[allow(clippy::too_many_arguments)]
fn assess_heir(
    input: &SimulationInput,
    params: &LegalParameters,
    allocation: &Allocation,
    heir: &Heir,
    gross: Money,
    addback: Money,
    estate_reliefs: Money,
    tracer: &mut Tracer,
) -> HeirTax {
    let mut explanations = Vec::new();

    // Imputation: the gifts already received are not transmitted again
    let imputed = allocation
        .imputations
        .get(&heir.id)
        .copied()
        .unwrap_or(Money::ZERO);
    let transmitted = (gross - imputed).max(Money::ZERO);
    if imputed > Money::ZERO {
        explanations.push(
            Explanation::new(ExplanationKey::GiftImputation843)
                .with("imputed", imputed)
                .with("transmitted", transmitted),
        );
    }

    let share_fraction = allocation
        .shares
        .get(&heir.id)
        .copied()
        .unwrap_or(Money::ZERO);
    let relief_share = estate_reliefs * share_fraction;

    let taxable_base = (transmitted + addback - relief_share).max(Money::ZERO);
    if addback > Money::ZERO {
        explanations.push(
            Explanation::new(ExplanationKey::LifeInsurance757b).with("addback", addback),
        );
    }

    let group = TaxGroup::classify(
        heir.relationship,
        heir.adoption_type,
        heir.has_received_continuous_care,
    );

    // Spouse and PACS partner: total exemption, no scale
    let Some(base_allowance) = params.allowances.for_group(group) else {
        explanations.push(Explanation::new(ExplanationKey::TaxSpouseExempt));
        let computation = TaxComputation {
            gross_amount: round_cents(taxable_base),
            allowance_label: "Exonération conjoint/partenaire (loi TEPA)".into(),
            allowance_amount: round_cents(taxable_base),
            net_taxable: Money::ZERO,
            brackets_applied: Vec::new(),
            total_tax: Money::ZERO,
        };
        return HeirTax {
            heir_id: heir.id.clone(),
            taxable_base: round_cents(taxable_base),
            allowance_used: round_cents(taxable_base),
            tax: Money::ZERO,
            computation,
            explanations,
        };
    };

    if group == TaxGroup::Stranger && heir.adoption_type == crate::input::AdoptionType::Simple {
        explanations.push(Explanation::new(ExplanationKey::TaxAdoptionSimple786));
        tracer.fiscal_note(
            format!(
                "Simple adoptee {} without continuous care is taxed as a stranger (Art. 786 CGI)",
                heir.id
            ),
            Explanation::new(ExplanationKey::TaxAdoptionSimple786).with("heir", &heir.id),
        );
    }

    // Fifteen-year recall: declared donations consume the allowance first
    let recall: Money = input
        .donations
        .iter()
        .filter(|d| d.beneficiary_id == heir.id && d.within_fiscal_recall(input.death_date))
        .map(|d| d.current_estimated_value.unwrap_or(d.original_value))
        .sum();
    let consumed = recall.min(base_allowance);
    let mut allowance = base_allowance - consumed;
    let mut allowance_label = allowance_label_for(group).to_string();
    if consumed > Money::ZERO {
        allowance_label.push_str(" - rappel fiscal 15 ans");
        explanations.push(
            Explanation::new(ExplanationKey::AbatementConsumed15y)
                .with("consumed", consumed)
                .with("remaining", allowance),
        );
    }
    if heir.is_disabled {
        allowance += params.allowances.disability_bonus;
        allowance_label.push_str(" + handicap (Art. 779 II)");
        explanations.push(
            Explanation::new(ExplanationKey::AbatementDisability779)
                .with("bonus", params.allowances.disability_bonus),
        );
    }
    explanations.push(allowance_explanation(group, allowance));

    let allowance_used = allowance.min(taxable_base);
    let net_taxable = (taxable_base - allowance).max(Money::ZERO);
    let (tax, brackets_applied) = params.scale.tax_on(group, net_taxable);
    let tax = round_cents(tax);
    if net_taxable > Money::ZERO {
        explanations.push(
            Explanation::new(ExplanationKey::TaxBrackets777)
                .with("net_taxable", net_taxable)
                .with("tax", tax),
        );
    }

    let computation = TaxComputation {
        gross_amount: round_cents(taxable_base),
        allowance_label,
        allowance_amount: round_cents(allowance_used),
        net_taxable: round_cents(net_taxable),
        brackets_applied,
        total_tax: tax,
    };

    HeirTax {
        heir_id: heir.id.clone(),
        taxable_base: round_cents(taxable_base),
        allowance_used: round_cents(allowance_used),
        tax,
        computation,
        explanations,
    }
}

fn allowance_label_for(group: TaxGroup) -> &'static str {
    match group {
        TaxGroup::DirectLine => "Abattement ligne directe (Art. 779 CGI)",
        TaxGroup::Sibling => "Abattement frère/soeur (Art. 779 CGI)",
        TaxGroup::NephewNiece => "Abattement neveu/nièce (Art. 779 CGI)",
        TaxGroup::Stranger => "Abattement autre (Art. 779 CGI)",
        TaxGroup::Exempt => "Exonération conjoint/partenaire (loi TEPA)",
    }
}

fn allowance_explanation(group: TaxGroup, allowance: Money) -> Explanation {
    let key = match group {
        TaxGroup::DirectLine => ExplanationKey::AbatementChild100k,
        TaxGroup::Sibling => ExplanationKey::AbatementSibling,
        TaxGroup::NephewNiece => ExplanationKey::AbatementNephew,
        TaxGroup::Stranger | TaxGroup::Exempt => ExplanationKey::AbatementOther,
    };
    Explanation::new(key).with("allowance", allowance)
}
