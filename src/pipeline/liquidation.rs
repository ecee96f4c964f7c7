//! Stage 1: liquidation of the matrimonial regime (Art. 1400+ CC)
//!
//! Splits every asset between the deceased's estate and the surviving
//! spouse. Life-insurance contracts are diverted to the dedicated tax
//! stage and never enter the succession mass. Value is conserved per
//! asset: deceased share + spouse share + preciput share always equals
//! the retained value.

use log::debug;
use rust_decimal_macros::dec;

use crate::input::{
    AssetOwner, MatrimonialAdvantages, MatrimonialRegime, OwnershipMode, Relationship,
    SimulationInput, UsufructType,
};
use crate::params::LegalParameters;
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::{Money, Rate};

/// How one asset was split at liquidation
#[derive(Debug, Clone)]
pub(crate) struct AssetAttribution {
    pub asset_id: String,

    /// Deceased-side basis: estimated value plus CCA, reduced by the
    /// indivision fraction
    pub retained_value: Money,

    pub deceased_share: Money,
    pub spouse_share: Money,
    pub preciput_share: Money,
    pub is_community: bool,

    /// Deceased share of a main residence the spouse keeps occupying,
    /// basis for the Art. 764 bis relief at taxation
    pub occupied_main_residence_value: Money,
}

/// Result of the liquidation stage
#[derive(Debug, Clone)]
pub(crate) struct LiquidationOutcome {
    pub deceased_net_assets: Money,
    pub community_total: Money,
    pub deceased_community_share: Money,
    pub spouse_community_share: Money,
    pub personal_assets: Money,
    pub rewards_to_deceased: Money,
    pub rewards_to_spouse: Money,
    pub preciput_value: Money,
    pub has_full_attribution: bool,
    pub unequal_share_spouse_percentage: Option<Rate>,
    pub attributions: Vec<AssetAttribution>,

    /// Ids of life-insurance contracts, excluded from the mass
    pub life_insurance_ids: Vec<String>,

    pub details: Vec<String>,
}

/// Run the liquidation over every asset, in input order.
pub(crate) fn liquidate(
    input: &SimulationInput,
    params: &LegalParameters,
    tracer: &mut Tracer,
) -> LiquidationOutcome {
    let advantages = input
        .matrimonial_advantages
        .clone()
        .unwrap_or_default();
    let regime = input.matrimonial_regime;

    let mut outcome = LiquidationOutcome {
        deceased_net_assets: Money::ZERO,
        community_total: Money::ZERO,
        deceased_community_share: Money::ZERO,
        spouse_community_share: Money::ZERO,
        personal_assets: Money::ZERO,
        rewards_to_deceased: Money::ZERO,
        rewards_to_spouse: Money::ZERO,
        preciput_value: Money::ZERO,
        has_full_attribution: advantages.has_full_attribution,
        unequal_share_spouse_percentage: if advantages.has_unequal_share {
            advantages.spouse_share_percentage
        } else {
            None
        },
        attributions: Vec::new(),
        life_insurance_ids: Vec::new(),
        details: Vec::new(),
    };

    if regime == MatrimonialRegime::ParticipationAcquests {
        tracer.fiscal_note(
            "Participation aux acquêts: liquidated as a separation; the participation claim itself is not computed",
            Explanation::new(ExplanationKey::AlertRegimeMismatch).with("regime", "PARTICIPATION_ACQUESTS"),
        );
    }

    // Community fraction going to the deceased once a community asset is
    // divided (full attribution overrides to zero, pro-rata of the
    // retranchement re-added below)
    let deceased_community_fraction = if advantages.has_full_attribution {
        Money::ZERO
    } else if advantages.has_unequal_share {
        let spouse_pct = advantages.spouse_share_percentage.unwrap_or(dec!(50));
        (dec!(100) - spouse_pct) / dec!(100)
    } else {
        dec!(0.5)
    };

    for asset in &input.assets {
        if asset.is_life_insurance() {
            outcome.life_insurance_ids.push(asset.id.clone());
            outcome.details.push(format!(
                "{}: life-insurance contract, outside the succession",
                asset.id
            ));
            continue;
        }

        let fraction = asset.deceased_fraction();
        let mut retained = (asset.estimated_value + asset.cca_value) * fraction;
        if asset.ownership_mode == OwnershipMode::Indivision {
            tracer.explain(
                Explanation::new(ExplanationKey::LiquidationIndivision)
                    .with("asset", &asset.id)
                    .with("deceased_fraction", fraction),
            );
        }
        retained = dismembered_value(asset, retained, input, params, tracer);

        // Community asset declared under a separation-style regime: data
        // inconsistency, kept in the deceased's estate
        if asset.asset_origin == crate::input::AssetOrigin::Community && !regime.has_community() {
            tracer.data_warning(
                format!(
                    "Asset {} is declared community property under a separation regime; treated as the deceased's",
                    asset.id
                ),
                Explanation::new(ExplanationKey::AlertRegimeMismatch).with("asset", &asset.id),
            );
        }
        check_acquisition_date(input, asset, tracer);

        let mut attribution = AssetAttribution {
            asset_id: asset.id.clone(),
            retained_value: retained,
            deceased_share: Money::ZERO,
            spouse_share: Money::ZERO,
            preciput_share: Money::ZERO,
            is_community: false,
            occupied_main_residence_value: Money::ZERO,
        };

        match asset.owner_under(regime, input.marriage_date) {
            AssetOwner::Deceased => {
                attribution.deceased_share = retained;
                outcome.personal_assets += retained;
                outcome.details.push(format!(
                    "{}: bien propre of the deceased ({retained})",
                    asset.id
                ));
                tracer.explain(
                    Explanation::new(ExplanationKey::LiquidationPropre)
                        .with("asset", &asset.id)
                        .with("value", retained),
                );
            }
            AssetOwner::Community => {
                attribution.is_community = true;
                outcome.community_total += retained;

                if advantages.has_preciput && advantages.preciput_asset_ids.contains(&asset.id) {
                    // Taken off-top by the spouse before any division
                    attribution.preciput_share = retained;
                    outcome.preciput_value += retained;
                    outcome.details.push(format!(
                        "{}: preciput, taken off-top by the spouse ({retained})",
                        asset.id
                    ));
                    tracer.explain(
                        Explanation::new(ExplanationKey::LiquidationPreciput)
                            .with("asset", &asset.id)
                            .with("value", retained),
                    );
                } else {
                    // Reward (Art. 1468) when personal money funded part of
                    // a community asset. The paying estate is unknown, so
                    // the claim splits 50/50 and the division nets out.
                    let funding = asset.community_funding_percentage;
                    let reward = if funding > Money::ZERO && funding < dec!(100) {
                        retained * (dec!(100) - funding) / dec!(100)
                    } else {
                        Money::ZERO
                    };
                    if reward > Money::ZERO {
                        let half = reward / dec!(2);
                        outcome.rewards_to_deceased += half;
                        outcome.rewards_to_spouse += half;
                        tracer.alert(crate::trace::Alert {
                            severity: crate::trace::Severity::Warning,
                            audience: crate::trace::Audience::Notary,
                            category: crate::trace::Category::Legal,
                            message: format!(
                                "Reward on {}: the funding estate is not identified, claim split 50/50 (heuristic)",
                                asset.id
                            ),
                            details: None,
                            explanations: vec![Explanation::new(ExplanationKey::LiquidationReward1468)
                                .with("asset", &asset.id)
                                .with("reward", reward)],
                        });
                    }

                    let divisible = retained - reward;
                    let reward_half = reward / dec!(2);
                    attribution.deceased_share =
                        divisible * deceased_community_fraction + reward_half;
                    attribution.spouse_share =
                        divisible * (Money::ONE - deceased_community_fraction) + reward_half;

                    outcome.details.push(format!(
                        "{}: community asset, deceased share {}",
                        asset.id, attribution.deceased_share
                    ));
                    tracer.explain(
                        Explanation::new(ExplanationKey::LiquidationCommunity50)
                            .with("asset", &asset.id)
                            .with("deceased_share", attribution.deceased_share),
                    );
                }
            }
        }

        if asset.is_main_residence && asset.spouse_occupies_property {
            // The CCA never concerns a dwelling; the deceased share is the
            // relief basis as-is
            attribution.occupied_main_residence_value = attribution.deceased_share;
        }

        outcome.attributions.push(attribution);
    }

    apply_full_attribution(input, &advantages, &mut outcome, tracer);

    if advantages.has_unequal_share {
        outcome.details.push(format!(
            "unequal sharing clause: spouse {}% of the community",
            advantages.spouse_share_percentage.unwrap_or(dec!(50))
        ));
        tracer.explain(
            Explanation::new(ExplanationKey::LiquidationUnequalShare)
                .with("spouse_percentage", advantages.spouse_share_percentage.unwrap_or(dec!(50))),
        );
    }

    outcome.deceased_community_share = outcome
        .attributions
        .iter()
        .filter(|a| a.is_community)
        .map(|a| a.deceased_share)
        .sum();
    outcome.spouse_community_share = outcome
        .attributions
        .iter()
        .filter(|a| a.is_community)
        .map(|a| a.spouse_share)
        .sum();
    outcome.deceased_net_assets = outcome.personal_assets + outcome.deceased_community_share;

    debug!(
        "liquidation: deceased net {} (community {}, preciput {})",
        outcome.deceased_net_assets, outcome.community_total, outcome.preciput_value
    );
    tracer.record_step(
        1,
        "Liquidation du régime matrimonial",
        "Split of the assets between the deceased's estate and the surviving spouse",
        format!(
            "deceased net assets {}, community {}, spouse community share {}",
            outcome.deceased_net_assets, outcome.community_total, outcome.spouse_community_share
        ),
    );

    outcome
}

/// Full-attribution clause (Art. 1524), capped by the retranchement action
/// when stepchildren exist (Art. 1527): the advantage beyond the special
/// disposable quota re-enters the deceased's estate.
fn apply_full_attribution(
    input: &SimulationInput,
    advantages: &MatrimonialAdvantages,
    outcome: &mut LiquidationOutcome,
    tracer: &mut Tracer,
) {
    if !advantages.has_full_attribution {
        return;
    }

    tracer.explain(Explanation::new(ExplanationKey::LiquidationFullAttribution));
    outcome
        .details
        .push("full-attribution clause: the community goes to the spouse".to_string());

    let children: Vec<_> = input
        .heirs
        .iter()
        .filter(|h| h.relationship == Relationship::Child)
        .collect();
    let has_stepchildren = children.iter().any(|c| !c.is_from_current_union);
    if !has_stepchildren {
        return;
    }

    // Special disposable quota against the deceased's standard estate
    // (propres + half of the divisible community)
    let divisible_total: Money = outcome
        .attributions
        .iter()
        .filter(|a| a.is_community && a.preciput_share == Money::ZERO)
        .map(|a| a.retained_value)
        .sum();
    if divisible_total <= Money::ZERO {
        return;
    }

    let advantage_value = divisible_total / dec!(2);
    let reserve_rate = match children.len() {
        1 => dec!(0.5),
        2 => Money::from(2u32) / Money::from(3u32),
        _ => dec!(0.75),
    };
    let quota_rate = Money::ONE - reserve_rate;
    let theoretical_mass = outcome.personal_assets + advantage_value;
    let available_quota = theoretical_mass * quota_rate;
    let excess = (advantage_value - available_quota).max(Money::ZERO);
    if excess <= Money::ZERO {
        return;
    }

    tracer.legal_warning(
        format!(
            "R-1527 action en retranchement: stepchildren cap the matrimonial advantage; {excess} re-enters the succession"
        ),
        Explanation::new(ExplanationKey::LiquidationRetranchement1527)
            .with("excess", excess)
            .with("available_quota", available_quota),
    );
    tracer.explain(
        Explanation::new(ExplanationKey::AlertStepchildren)
            .with("stepchildren", children.iter().filter(|c| !c.is_from_current_union).count()),
    );
    outcome
        .details
        .push(format!("retranchement (Art. 1527): {excess} back into the succession"));

    // Re-seat the excess on the community assets pro-rata, keeping each
    // attribution conserved
    for attribution in outcome
        .attributions
        .iter_mut()
        .filter(|a| a.is_community && a.preciput_share == Money::ZERO)
    {
        let delta = excess * attribution.retained_value / divisible_total;
        attribution.deceased_share += delta;
        attribution.spouse_share -= delta;
    }
}

/// Transmissible value of a dismembered asset (Art. 669 CGI).
///
/// Bare ownership transmits the bare fraction only; a life usufruct held
/// by the deceased extinguishes at death (Art. 617 CC) and transmits
/// nothing, while a fixed-term usufruct transmits its remaining fiscal
/// value.
fn dismembered_value(
    asset: &crate::input::Asset,
    retained: Money,
    input: &SimulationInput,
    params: &LegalParameters,
    tracer: &mut Tracer,
) -> Money {
    match asset.ownership_mode {
        OwnershipMode::Bare => {
            let rate = match (asset.usufruct_type, asset.usufructuary_birth_date) {
                (UsufructType::Viager, Some(birth_date)) => {
                    params
                        .usufruct
                        .split_viager(retained, birth_date, input.death_date)
                        .usufruct_rate
                }
                (UsufructType::Temporaire, _) => match asset.usufruct_duration_years {
                    Some(years) => params.usufruct.temporary_rate(years),
                    None => {
                        tracer.data_warning(
                            format!(
                                "Asset {} holds a temporary usufruct without a duration; kept at full value",
                                asset.id
                            ),
                            Explanation::new(ExplanationKey::UsufructValuation669)
                                .with("asset", &asset.id),
                        );
                        return retained;
                    }
                },
                (UsufructType::Viager, None) => return retained,
            };
            let bare = retained * (Money::ONE - rate);
            tracer.explain(
                Explanation::new(ExplanationKey::UsufructValuation669)
                    .with("asset", &asset.id)
                    .with("usufruct_rate", rate)
                    .with("bare_value", bare),
            );
            bare
        }
        OwnershipMode::Usufruct => match asset.usufruct_type {
            UsufructType::Viager => {
                tracer.fiscal_note(
                    format!(
                        "Life usufruct {} extinguishes at the death of the usufructuary; nothing transmits (Art. 617 CC)",
                        asset.id
                    ),
                    Explanation::new(ExplanationKey::UsufructValuation669)
                        .with("asset", &asset.id)
                        .with("transmitted", Money::ZERO),
                );
                Money::ZERO
            }
            UsufructType::Temporaire => {
                let rate = asset
                    .usufruct_duration_years
                    .map(|years| params.usufruct.temporary_rate(years))
                    .unwrap_or(Money::ZERO);
                let value = retained * rate;
                tracer.explain(
                    Explanation::new(ExplanationKey::UsufructValuation669)
                        .with("asset", &asset.id)
                        .with("usufruct_rate", rate)
                        .with("transmitted", value),
                );
                value
            }
        },
        _ => retained,
    }
}

/// Acquisition-date consistency against the marriage date
fn check_acquisition_date(
    input: &SimulationInput,
    asset: &crate::input::Asset,
    tracer: &mut Tracer,
) {
    let (Some(marriage), Some(acquired)) = (input.marriage_date, asset.acquisition_date) else {
        return;
    };
    if !input.matrimonial_regime.has_community() {
        return;
    }
    use crate::input::AssetOrigin;
    if asset.asset_origin == AssetOrigin::Community && acquired < marriage {
        tracer.data_warning(
            format!(
                "Asset {} declared community but acquired before the marriage (possible apport clause)",
                asset.id
            ),
            Explanation::new(ExplanationKey::AlertDateInconsistent).with("asset", &asset.id),
        );
    } else if asset.asset_origin == AssetOrigin::Personal && acquired >= marriage {
        tracer.data_warning(
            format!(
                "Asset {} declared personal but acquired during the marriage (check remploi clause)",
                asset.id
            ),
            Explanation::new(ExplanationKey::AlertDateInconsistent).with("asset", &asset.id),
        );
    }
}
