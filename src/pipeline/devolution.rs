//! Stage 3: devolution order, reserve, and default legal shares
//! (Art. 734, 751+, 913, 914-1, 746 CC)
//!
//! Produces the legal distribution before testamentary wishes: heir order,
//! souche structure for representation, reserve fraction and disposable
//! quota. The allocation stage overlays the spouse option and the
//! testament on top of this.

use std::collections::BTreeMap;

use log::debug;
use rust_decimal_macros::dec;

use super::estate::EstateMass;
use crate::input::{Relationship, SimulationInput};
use crate::trace::{Explanation, ExplanationKey, Tracer};
use crate::types::{Money, Rate};

/// A line of descent from one original heir, populated with its living
/// accepting members
#[derive(Debug, Clone)]
pub(crate) struct Souche {
    pub root_id: String,
    pub members: Vec<String>,

    /// True when the root is predeceased or renouncing and the members
    /// inherit by representation
    pub is_representation: bool,
}

/// Result of the devolution stage
#[derive(Debug, Clone)]
pub(crate) struct Devolution {
    /// Default legal distribution (fractions of the mass). The spouse is
    /// at zero when children exist: the option is applied at allocation.
    pub legal_shares: BTreeMap<String, Rate>,

    pub child_souches: Vec<Souche>,
    pub reserve_fraction: Rate,
    pub legal_reserve: Money,
    pub disposable_quota: Money,

    /// Individual reserve fraction of each reserved heir
    pub individual_reserves: BTreeMap<String, Rate>,

    pub spouse_id: Option<String>,
    pub has_descendants: bool,
}

pub(crate) fn solve(
    input: &SimulationInput,
    estate: &EstateMass,
    tracer: &mut Tracer,
) -> Devolution {
    let spouse_id = input.spouse().map(|s| s.id.clone());

    for heir in input.heirs.iter().filter(|h| h.is_renouncing()) {
        tracer.explain(
            Explanation::new(ExplanationKey::ShareRenunciation).with("heir", &heir.id),
        );
    }

    let child_souches = build_child_souches(input);
    let has_descendants = !child_souches.is_empty();

    let (reserve_fraction, individual_reserves) =
        reserve(input, &child_souches, has_descendants, tracer);
    let legal_reserve = estate.net_succession_mass * reserve_fraction;
    let disposable_quota = estate.net_succession_mass - legal_reserve;
    tracer.explain(
        Explanation::new(ExplanationKey::DisposableQuota)
            .with("reserve", legal_reserve)
            .with("quota", disposable_quota),
    );

    let legal_shares = legal_distribution(input, &child_souches, spouse_id.as_deref(), tracer);

    debug!(
        "devolution: {} souches, reserve {}, quota {}",
        child_souches.len(),
        legal_reserve,
        disposable_quota
    );
    tracer.record_step(
        3,
        "Détermination de la dévolution",
        "Heir order, representation, and reserve computation",
        format!(
            "{} heir(s) allocated, reserve {} ({}), disposable quota {}",
            legal_shares.len(),
            legal_reserve,
            reserve_fraction,
            disposable_quota
        ),
    );

    Devolution {
        legal_shares,
        child_souches,
        reserve_fraction,
        legal_reserve,
        disposable_quota,
        individual_reserves,
        spouse_id,
        has_descendants,
    }
}

/// Root of a representation chain: follow represented ids through listed
/// intermediate representatives (a great-grandchild points at a grandchild
/// who points at the original child)
fn resolve_root(input: &SimulationInput, id: &str) -> String {
    match input.heir(id) {
        Some(heir) => match &heir.represented_heir_id {
            Some(upper) => resolve_root(input, upper),
            None => id.to_string(),
        },
        None => id.to_string(),
    }
}

/// Group descendants into souches: one per accepting child, one per
/// represented (predeceased or renouncing) child with at least one
/// accepting representative. Souches without any accepting member are
/// pruned, which also prunes renouncers whose descendants all renounce.
fn build_child_souches(input: &SimulationInput) -> Vec<Souche> {
    let mut souches: Vec<Souche> = Vec::new();

    let mut push_member = |root_id: String, member: Option<String>, representation: bool| {
        if let Some(existing) = souches.iter_mut().find(|s| s.root_id == root_id) {
            if let Some(member) = member {
                existing.members.push(member);
            }
            existing.is_representation |= representation;
        } else {
            souches.push(Souche {
                root_id,
                members: member.into_iter().collect(),
                is_representation: representation,
            });
        }
    };

    for heir in &input.heirs {
        match heir.relationship {
            Relationship::Child if !heir.is_renouncing() => {
                push_member(heir.id.clone(), Some(heir.id.clone()), false);
            }
            Relationship::Grandchild | Relationship::GreatGrandchild => {
                let Some(represented) = &heir.represented_heir_id else {
                    continue;
                };
                if heir.is_renouncing() {
                    continue;
                }
                let root = resolve_root(input, represented);
                // Representation of a sibling (nephew line) is handled in
                // the collateral order, not here
                if matches!(
                    input.heir(&root).map(|h| h.relationship),
                    Some(Relationship::Sibling)
                ) {
                    continue;
                }
                push_member(root, Some(heir.id.clone()), true);
            }
            _ => {}
        }
    }

    souches.retain(|s| !s.members.is_empty());
    souches
}

/// Reserve fraction and each reserved heir's individual fraction
/// (Art. 913 by souche, Art. 914-1 for parents)
fn reserve(
    input: &SimulationInput,
    child_souches: &[Souche],
    has_descendants: bool,
    tracer: &mut Tracer,
) -> (Rate, BTreeMap<String, Rate>) {
    let mut individual = BTreeMap::new();

    if has_descendants {
        let n = child_souches.len();
        let fraction = match n {
            1 => dec!(0.5),
            2 => Money::from(2u32) / Money::from(3u32),
            _ => dec!(0.75),
        };
        let per_souche = fraction / Money::from(n as u32);
        for souche in child_souches {
            let per_member = per_souche / Money::from(souche.members.len() as u32);
            for member in &souche.members {
                individual.insert(member.clone(), per_member);
            }
        }
        tracer.explain(
            Explanation::new(ExplanationKey::ReserveChildren913)
                .with("souches", n)
                .with("fraction", fraction),
        );
        return (fraction, individual);
    }

    let parents: Vec<_> = input
        .heirs
        .iter()
        .filter(|h| h.relationship == Relationship::Parent && !h.is_renouncing())
        .collect();
    match parents.len() {
        0 => (Money::ZERO, individual),
        1 => {
            individual.insert(parents[0].id.clone(), dec!(0.25));
            tracer.explain(
                Explanation::new(ExplanationKey::ReserveParents9141).with("parents", 1),
            );
            (dec!(0.25), individual)
        }
        _ => {
            for parent in parents.iter().take(2) {
                individual.insert(parent.id.clone(), dec!(0.25));
            }
            tracer.explain(
                Explanation::new(ExplanationKey::ReserveParents9141).with("parents", 2),
            );
            (dec!(0.5), individual)
        }
    }
}

/// Default legal distribution over the orders of Art. 734 CC
fn legal_distribution(
    input: &SimulationInput,
    child_souches: &[Souche],
    spouse_id: Option<&str>,
    tracer: &mut Tracer,
) -> BTreeMap<String, Rate> {
    let mut shares = BTreeMap::new();

    // Order 1: descendants
    if !child_souches.is_empty() {
        distribute_souches(child_souches, Money::ONE, &mut shares, tracer);
        if let Some(spouse) = spouse_id {
            shares.insert(spouse.to_string(), Money::ZERO);
            if input.wishes.spouse_choice.is_none() {
                tracer.alert(crate::trace::Alert {
                    severity: crate::trace::Severity::Info,
                    audience: crate::trace::Audience::User,
                    category: crate::trace::Category::Legal,
                    message: "A surviving spouse with descendants must opt (Art. 757 CC); no option given, spouse share left at zero".into(),
                    details: None,
                    explanations: vec![Explanation::new(ExplanationKey::AlertSpouseMustChoose)],
                });
            }
        }
        return shares;
    }

    let parents: Vec<_> = input
        .heirs
        .iter()
        .filter(|h| h.relationship == Relationship::Parent && !h.is_renouncing())
        .collect();

    // Order 2: spouse, alone or with the parents
    if let Some(spouse) = spouse_id {
        match parents.len() {
            0 => {
                shares.insert(spouse.to_string(), Money::ONE);
                tracer.explain(Explanation::new(ExplanationKey::ShareSpouseAlone7572));
                let siblings_present = input
                    .heirs
                    .iter()
                    .any(|h| h.relationship == Relationship::Sibling && !h.is_renouncing());
                if siblings_present {
                    tracer.legal_warning(
                        "Siblings are excluded by the surviving spouse (Art. 757-2 CC)",
                        Explanation::new(ExplanationKey::ShareSpouseAlone7572),
                    );
                }
            }
            1 => {
                shares.insert(spouse.to_string(), dec!(0.75));
                shares.insert(parents[0].id.clone(), dec!(0.25));
                tracer.explain(
                    Explanation::new(ExplanationKey::ShareSpouseParents7571).with("parents", 1),
                );
            }
            n => {
                shares.insert(spouse.to_string(), dec!(0.5));
                let per_parent = dec!(0.5) / Money::from(n as u32);
                for parent in &parents {
                    shares.insert(parent.id.clone(), per_parent);
                }
                tracer.explain(
                    Explanation::new(ExplanationKey::ShareSpouseParents7571).with("parents", n),
                );
            }
        }
        return shares;
    }

    // Order 3: parents and siblings (Art. 738), then siblings alone
    let sibling_souches = build_sibling_souches(input);
    if !parents.is_empty() || !sibling_souches.is_empty() {
        let mut sibling_total = Money::ONE;
        if !sibling_souches.is_empty() && !parents.is_empty() {
            let parent_count = parents.len().min(2);
            for parent in parents.iter().take(2) {
                shares.insert(parent.id.clone(), dec!(0.25));
            }
            sibling_total = Money::ONE - dec!(0.25) * Money::from(parent_count as u32);
            tracer.explain(
                Explanation::new(ExplanationKey::ShareParentsSiblings738)
                    .with("parents", parent_count)
                    .with("sibling_souches", sibling_souches.len()),
            );
        } else if sibling_souches.is_empty() {
            let per_parent = Money::ONE / Money::from(parents.len() as u32);
            for parent in &parents {
                shares.insert(parent.id.clone(), per_parent);
            }
            tracer.explain(
                Explanation::new(ExplanationKey::ShareParentsSiblings738)
                    .with("parents", parents.len())
                    .with("sibling_souches", 0),
            );
            return shares;
        }
        distribute_souches(&sibling_souches, sibling_total, &mut shares, tracer);
        return shares;
    }

    // Orders 4-5: collaterals, split between the two lines (fente)
    fente(input, &mut shares, tracer);
    shares
}

/// Equal split by souche, members of one souche sharing its fraction
fn distribute_souches(
    souches: &[Souche],
    total: Rate,
    shares: &mut BTreeMap<String, Rate>,
    tracer: &mut Tracer,
) {
    if souches.is_empty() {
        return;
    }
    let per_souche = total / Money::from(souches.len() as u32);
    for souche in souches {
        let per_member = per_souche / Money::from(souche.members.len() as u32);
        for member in &souche.members {
            shares.insert(member.clone(), per_member);
        }
        if souche.is_representation {
            tracer.explain(
                Explanation::new(ExplanationKey::ShareRepresentation)
                    .with("souche", &souche.root_id)
                    .with("members", souche.members.len()),
            );
        }
    }
    tracer.explain(
        Explanation::new(ExplanationKey::ShareChildrenEqual).with("souches", souches.len()),
    );
}

/// Sibling souches with nephews and nieces representing their parent
fn build_sibling_souches(input: &SimulationInput) -> Vec<Souche> {
    let mut souches: Vec<Souche> = Vec::new();
    for heir in &input.heirs {
        match heir.relationship {
            Relationship::Sibling if !heir.is_renouncing() => {
                souches.push(Souche {
                    root_id: heir.id.clone(),
                    members: vec![heir.id.clone()],
                    is_representation: false,
                });
            }
            Relationship::NephewNiece if !heir.is_renouncing() => {
                let Some(represented) = &heir.represented_heir_id else {
                    continue;
                };
                let root = resolve_root(input, represented);
                if let Some(existing) = souches.iter_mut().find(|s| s.root_id == root) {
                    existing.members.push(heir.id.clone());
                    existing.is_representation = true;
                } else {
                    souches.push(Souche {
                        root_id: root,
                        members: vec![heir.id.clone()],
                        is_representation: true,
                    });
                }
            }
            _ => {}
        }
    }
    souches.retain(|s| !s.members.is_empty());
    souches
}

/// Kinship degree inside a line, for the closest-degree rule (Art. 744)
fn collateral_degree(relationship: Relationship) -> u32 {
    match relationship {
        Relationship::NephewNiece => 3,
        _ => 5,
    }
}

/// Cleft succession (Art. 746 CC): the estate splits half and half between
/// the paternal and the maternal line; inside each line the closest degree
/// inherits. A candidate without the line flag cannot be placed: the
/// engine flags the data error instead of guessing a side.
fn fente(input: &SimulationInput, shares: &mut BTreeMap<String, Rate>, tracer: &mut Tracer) {
    let mut paternal: Vec<&crate::input::Heir> = Vec::new();
    let mut maternal: Vec<&crate::input::Heir> = Vec::new();

    for heir in &input.heirs {
        if heir.is_renouncing() || heir.is_spouse_or_partner() || heir.is_descendant() {
            continue;
        }
        if !matches!(
            heir.relationship,
            Relationship::Other | Relationship::NephewNiece
        ) {
            continue;
        }
        match heir.paternal_line {
            Some(true) => paternal.push(heir),
            Some(false) => maternal.push(heir),
            None => {
                tracer.error_alert(
                    format!(
                        "Cleft succession reached but heir {} has no paternal/maternal line flag; excluded from the split",
                        heir.id
                    ),
                    Explanation::new(ExplanationKey::AlertFenteMissingLine).with("heir", &heir.id),
                );
            }
        }
    }

    let closest = |line: &[&crate::input::Heir]| -> Vec<String> {
        let Some(min_degree) = line.iter().map(|h| collateral_degree(h.relationship)).min() else {
            return Vec::new();
        };
        line.iter()
            .filter(|h| collateral_degree(h.relationship) == min_degree)
            .map(|h| h.id.clone())
            .collect()
    };

    let best_paternal = closest(&paternal);
    let best_maternal = closest(&maternal);

    let mut assign = |ids: &[String], total: Rate| {
        if ids.is_empty() {
            return;
        }
        let per_heir = total / Money::from(ids.len() as u32);
        for id in ids {
            shares.insert(id.clone(), per_heir);
        }
    };

    match (best_paternal.is_empty(), best_maternal.is_empty()) {
        (false, false) => {
            assign(&best_paternal, dec!(0.5));
            assign(&best_maternal, dec!(0.5));
            tracer.explain(
                Explanation::new(ExplanationKey::ShareFente746)
                    .with("paternal", best_paternal.len())
                    .with("maternal", best_maternal.len()),
            );
        }
        (false, true) => {
            assign(&best_paternal, Money::ONE);
            tracer.explain(
                Explanation::new(ExplanationKey::ShareFente746).with("maternal", 0),
            );
        }
        (true, false) => {
            assign(&best_maternal, Money::ONE);
            tracer.explain(
                Explanation::new(ExplanationKey::ShareFente746).with("paternal", 0),
            );
        }
        (true, true) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        AcceptanceOption, Asset, AssetOrigin, Heir, MatrimonialRegime, OwnershipMode, Wishes,
    };
    use crate::params::LegalParameters;
    use crate::pipeline::{estate::reconstitute, liquidation::liquidate};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn input_with(heirs: Vec<Heir>, mass: Money) -> SimulationInput {
        SimulationInput {
            matrimonial_regime: MatrimonialRegime::Separation,
            marriage_date: None,
            death_date: d(2024, 3, 1),
            assets: vec![Asset::new("a", mass, OwnershipMode::Full, AssetOrigin::Personal)],
            heirs,
            wishes: Wishes::default(),
            donations: vec![],
            debts: vec![],
            matrimonial_advantages: None,
            residence_country: "FR".into(),
        }
    }

    fn run(input: &SimulationInput) -> Devolution {
        let params = LegalParameters::france_2024();
        let mut tracer = Tracer::new();
        let liq = liquidate(input, &params, &mut tracer);
        let estate = reconstitute(input, &liq, &params, &mut tracer);
        solve(input, &estate, &mut tracer)
    }

    fn share(devolution: &Devolution, id: &str) -> Rate {
        devolution.legal_shares.get(id).copied().unwrap_or(Money::ZERO)
    }

    #[test]
    fn test_reserve_fractions_by_child_count() {
        for (children, expected) in [
            (1, dec!(0.5)),
            (2, Money::from(2u32) / Money::from(3u32)),
            (3, dec!(0.75)),
            (4, dec!(0.75)),
        ] {
            let heirs: Vec<Heir> = (0..children)
                .map(|i| Heir::new(format!("c{i}"), d(1990, 1, 1), Relationship::Child))
                .collect();
            let devolution = run(&input_with(heirs, dec!(100000)));
            assert_eq!(devolution.reserve_fraction, expected, "{children} children");
        }
    }

    #[test]
    fn test_parents_reserve_without_descendants() {
        let devolution = run(&input_with(
            vec![
                Heir::new("p1", d(1950, 1, 1), Relationship::Parent),
                Heir::new("p2", d(1952, 1, 1), Relationship::Parent),
            ],
            dec!(100000),
        ));
        assert_eq!(devolution.reserve_fraction, dec!(0.5));
        assert_eq!(share(&devolution, "p1"), dec!(0.5));
        assert_eq!(share(&devolution, "p2"), dec!(0.5));
    }

    #[test]
    fn test_representation_splits_souche() {
        // A alive; B predeceased, represented by two grandchildren
        let mut g1 = Heir::new("g1", d(2010, 1, 1), Relationship::Grandchild);
        g1.represented_heir_id = Some("B".into());
        let mut g2 = Heir::new("g2", d(2012, 1, 1), Relationship::Grandchild);
        g2.represented_heir_id = Some("B".into());
        let devolution = run(&input_with(
            vec![Heir::new("A", d(1980, 1, 1), Relationship::Child), g1, g2],
            dec!(900000),
        ));

        assert_eq!(devolution.child_souches.len(), 2);
        assert_eq!(share(&devolution, "A"), dec!(0.5));
        assert_eq!(share(&devolution, "g1"), dec!(0.25));
        assert_eq!(share(&devolution, "g2"), dec!(0.25));
        // Two souches: reserve is the two-children fraction
        assert_eq!(devolution.reserve_fraction, Money::from(2u32) / Money::from(3u32));
    }

    #[test]
    fn test_renouncing_child_without_representation_is_pruned() {
        let mut renouncer = Heir::new("B", d(1982, 1, 1), Relationship::Child);
        renouncer.acceptance_option = AcceptanceOption::Renunciation;
        let devolution = run(&input_with(
            vec![Heir::new("A", d(1980, 1, 1), Relationship::Child), renouncer],
            dec!(100000),
        ));

        assert_eq!(devolution.child_souches.len(), 1);
        assert_eq!(share(&devolution, "A"), Money::ONE);
        assert_eq!(share(&devolution, "B"), Money::ZERO);
        assert_eq!(devolution.reserve_fraction, dec!(0.5));
    }

    #[test]
    fn test_renouncing_child_with_representation_keeps_souche() {
        let mut renouncer = Heir::new("B", d(1982, 1, 1), Relationship::Child);
        renouncer.acceptance_option = AcceptanceOption::Renunciation;
        let mut g1 = Heir::new("g1", d(2010, 1, 1), Relationship::Grandchild);
        g1.represented_heir_id = Some("B".into());
        let devolution = run(&input_with(
            vec![Heir::new("A", d(1980, 1, 1), Relationship::Child), renouncer, g1],
            dec!(100000),
        ));

        assert_eq!(devolution.child_souches.len(), 2);
        assert_eq!(share(&devolution, "A"), dec!(0.5));
        assert_eq!(share(&devolution, "g1"), dec!(0.5));
        assert_eq!(share(&devolution, "B"), Money::ZERO);
    }

    #[test]
    fn test_multi_level_representation_resolves_to_root_souche() {
        // B predeceased; B's child g1 also predeceased; great-grandchildren
        // gg1 and gg2 stand in g1's place inside B's souche
        let mut g1 = Heir::new("g1", d(2000, 1, 1), Relationship::Grandchild);
        g1.represented_heir_id = Some("B".into());
        g1.acceptance_option = AcceptanceOption::Renunciation;
        let mut gg1 = Heir::new("gg1", d(2018, 1, 1), Relationship::GreatGrandchild);
        gg1.represented_heir_id = Some("g1".into());
        let mut gg2 = Heir::new("gg2", d(2020, 1, 1), Relationship::GreatGrandchild);
        gg2.represented_heir_id = Some("g1".into());

        let devolution = run(&input_with(
            vec![Heir::new("A", d(1980, 1, 1), Relationship::Child), g1, gg1, gg2],
            dec!(400000),
        ));

        assert_eq!(devolution.child_souches.len(), 2);
        assert_eq!(share(&devolution, "A"), dec!(0.5));
        assert_eq!(share(&devolution, "gg1"), dec!(0.25));
        assert_eq!(share(&devolution, "gg2"), dec!(0.25));
    }

    #[test]
    fn test_spouse_alone_takes_everything() {
        let devolution = run(&input_with(
            vec![
                Heir::new("spouse", d(1960, 1, 1), Relationship::Spouse),
                Heir::new("sib", d(1958, 1, 1), Relationship::Sibling),
            ],
            dec!(100000),
        ));
        assert_eq!(share(&devolution, "spouse"), Money::ONE);
        assert_eq!(share(&devolution, "sib"), Money::ZERO);
    }

    #[test]
    fn test_spouse_with_parents() {
        let devolution = run(&input_with(
            vec![
                Heir::new("spouse", d(1960, 1, 1), Relationship::Spouse),
                Heir::new("p1", d(1940, 1, 1), Relationship::Parent),
                Heir::new("p2", d(1938, 1, 1), Relationship::Parent),
            ],
            dec!(100000),
        ));
        assert_eq!(share(&devolution, "spouse"), dec!(0.5));
        assert_eq!(share(&devolution, "p1"), dec!(0.25));
        assert_eq!(share(&devolution, "p2"), dec!(0.25));
    }

    #[test]
    fn test_parents_and_siblings_art_738() {
        let devolution = run(&input_with(
            vec![
                Heir::new("p1", d(1940, 1, 1), Relationship::Parent),
                Heir::new("s1", d(1965, 1, 1), Relationship::Sibling),
                Heir::new("s2", d(1967, 1, 1), Relationship::Sibling),
            ],
            dec!(100000),
        ));
        assert_eq!(share(&devolution, "p1"), dec!(0.25));
        assert_eq!(share(&devolution, "s1"), dec!(0.375));
        assert_eq!(share(&devolution, "s2"), dec!(0.375));
    }

    #[test]
    fn test_nephew_represents_sibling() {
        let mut nephew = Heir::new("n1", d(1990, 1, 1), Relationship::NephewNiece);
        nephew.represented_heir_id = Some("s-dead".into());
        let devolution = run(&input_with(
            vec![Heir::new("s1", d(1965, 1, 1), Relationship::Sibling), nephew],
            dec!(100000),
        ));
        assert_eq!(share(&devolution, "s1"), dec!(0.5));
        assert_eq!(share(&devolution, "n1"), dec!(0.5));
    }

    #[test]
    fn test_fente_splits_lines_and_flags_missing_side() {
        let mut uncle = Heir::new("u1", d(1950, 1, 1), Relationship::Other);
        uncle.paternal_line = Some(true);
        let mut cousin = Heir::new("k1", d(1970, 1, 1), Relationship::Other);
        cousin.paternal_line = Some(false);
        let unflagged = Heir::new("x1", d(1960, 1, 1), Relationship::Other);

        let input = input_with(vec![uncle, cousin, unflagged], dec!(100000));
        let mut tracer = Tracer::new();
        let params = LegalParameters::france_2024();
        let liq = liquidate(&input, &params, &mut tracer);
        let estate = reconstitute(&input, &liq, &params, &mut tracer);
        let devolution = solve(&input, &estate, &mut tracer);

        assert_eq!(share(&devolution, "u1"), dec!(0.5));
        assert_eq!(share(&devolution, "k1"), dec!(0.5));
        assert_eq!(share(&devolution, "x1"), Money::ZERO);
        assert!(tracer
            .alerts()
            .iter()
            .any(|a| a.severity == crate::trace::Severity::Error));
    }

    #[test]
    fn test_fente_single_line_takes_all() {
        let mut uncle = Heir::new("u1", d(1950, 1, 1), Relationship::Other);
        uncle.paternal_line = Some(true);
        let mut aunt = Heir::new("u2", d(1952, 1, 1), Relationship::Other);
        aunt.paternal_line = Some(true);
        let devolution = run(&input_with(vec![uncle, aunt], dec!(100000)));
        assert_eq!(share(&devolution, "u1"), dec!(0.5));
        assert_eq!(share(&devolution, "u2"), dec!(0.5));
    }
}
