//! Progressive tax scales by fiscal group (Art. 777 CGI)
//!
//! The scale separates:
//! - the fiscal grouping of family relationships (who is taxed like whom)
//! - the bracket tables themselves (Loi de Finances values)
//!
//! so either can be swapped independently when a new statute book arrives.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::input::{AdoptionType, Relationship};
use crate::types::{Money, Rate};

/// Fiscal group an heir is taxed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxGroup {
    /// Children, parents, grandchildren and great-grandchildren in
    /// representation, full adoptees: the Art. 777 progressive scale
    DirectLine,
    /// Siblings: 35% then 45%
    Sibling,
    /// Nephews and nieces: flat 55%
    NephewNiece,
    /// Beyond the 4th degree and strangers: flat 60%
    Stranger,
    /// Spouse and PACS partner: fully exempt (loi TEPA 2007)
    Exempt,
}

impl TaxGroup {
    /// Classify an heir fiscally.
    ///
    /// A simple adoptee is taxed as a stranger unless they received five
    /// years of continuous care during minority (Art. 786 CGI).
    pub fn classify(
        relationship: Relationship,
        adoption_type: AdoptionType,
        has_received_continuous_care: bool,
    ) -> TaxGroup {
        match relationship {
            Relationship::Spouse | Relationship::Partner => TaxGroup::Exempt,
            Relationship::Child
            | Relationship::Grandchild
            | Relationship::GreatGrandchild
            | Relationship::Parent => {
                if adoption_type == AdoptionType::Simple && !has_received_continuous_care {
                    TaxGroup::Stranger
                } else {
                    TaxGroup::DirectLine
                }
            }
            Relationship::Sibling => TaxGroup::Sibling,
            Relationship::NephewNiece => TaxGroup::NephewNiece,
            Relationship::Other => TaxGroup::Stranger,
        }
    }
}

/// One bracket of a progressive scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Lower bound, exclusive of the previous bracket
    pub lower: Money,

    /// Upper bound; None for the open top bracket
    pub upper: Option<Money>,

    pub rate: Rate,
}

/// One bracket's contribution to an heir's tax, kept for the output trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketApplication {
    pub lower: Money,
    pub upper: Option<Money>,
    pub rate: Rate,
    pub taxable_in_bracket: Money,
    pub tax_for_bracket: Money,
}

/// Bracket tables for every fiscal group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxScale {
    pub direct_line: Vec<TaxBracket>,
    pub sibling: Vec<TaxBracket>,
    pub nephew_niece: Vec<TaxBracket>,
    pub stranger: Vec<TaxBracket>,
}

impl TaxScale {
    /// Loi de Finances 2024 values
    pub fn france_2024() -> Self {
        let bracket = |lower: Money, upper: Option<Money>, rate: Rate| TaxBracket {
            lower,
            upper,
            rate,
        };
        Self {
            // Art. 777 CGI, ligne directe
            direct_line: vec![
                bracket(dec!(0), Some(dec!(8072)), dec!(0.05)),
                bracket(dec!(8072), Some(dec!(12109)), dec!(0.10)),
                bracket(dec!(12109), Some(dec!(15932)), dec!(0.15)),
                bracket(dec!(15932), Some(dec!(552324)), dec!(0.20)),
                bracket(dec!(552324), Some(dec!(902838)), dec!(0.30)),
                bracket(dec!(902838), Some(dec!(1805677)), dec!(0.40)),
                bracket(dec!(1805677), None, dec!(0.45)),
            ],
            sibling: vec![
                bracket(dec!(0), Some(dec!(24430)), dec!(0.35)),
                bracket(dec!(24430), None, dec!(0.45)),
            ],
            nephew_niece: vec![bracket(dec!(0), None, dec!(0.55))],
            stranger: vec![bracket(dec!(0), None, dec!(0.60))],
        }
    }

    /// Brackets for a group; an exempt group has none
    pub fn brackets_for(&self, group: TaxGroup) -> &[TaxBracket] {
        match group {
            TaxGroup::DirectLine => &self.direct_line,
            TaxGroup::Sibling => &self.sibling,
            TaxGroup::NephewNiece => &self.nephew_niece,
            TaxGroup::Stranger => &self.stranger,
            TaxGroup::Exempt => &[],
        }
    }

    /// Walk the scale piecewise over a net taxable amount.
    ///
    /// Returns the accumulated tax and the per-bracket rows for the trace.
    pub fn tax_on(&self, group: TaxGroup, net_taxable: Money) -> (Money, Vec<BracketApplication>) {
        let mut tax = Money::ZERO;
        let mut rows = Vec::new();

        for bracket in self.brackets_for(group) {
            if net_taxable <= bracket.lower {
                break;
            }
            let upper_bound = match bracket.upper {
                Some(upper) => net_taxable.min(upper),
                None => net_taxable,
            };
            let taxable_in_bracket = (upper_bound - bracket.lower).max(Money::ZERO);
            if taxable_in_bracket <= Money::ZERO {
                continue;
            }
            let tax_for_bracket = taxable_in_bracket * bracket.rate;
            tax += tax_for_bracket;
            rows.push(BracketApplication {
                lower: bracket.lower,
                upper: bracket.upper,
                rate: bracket.rate,
                taxable_in_bracket,
                tax_for_bracket,
            });
        }

        (tax, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_line_400k() {
        let scale = TaxScale::france_2024();
        let (tax, rows) = scale.tax_on(TaxGroup::DirectLine, dec!(400000));

        // 403.60 + 403.70 + 573.45 + 76 813.60
        assert_eq!(tax, dec!(78194.35));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].tax_for_bracket, dec!(403.60));
        assert_eq!(rows[1].tax_for_bracket, dec!(403.70));
        assert_eq!(rows[2].tax_for_bracket, dec!(573.45));
        assert_eq!(rows[3].tax_for_bracket, dec!(76813.60));
    }

    #[test]
    fn test_direct_line_small_amount_crosses_two_brackets() {
        let scale = TaxScale::france_2024();
        let (tax, rows) = scale.tax_on(TaxGroup::DirectLine, dec!(12500));

        // 8 072 at 5% + 4 428 at 10%
        assert_eq!(tax, dec!(846.40));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_sibling_scale() {
        let scale = TaxScale::france_2024();
        let (tax, _) = scale.tax_on(TaxGroup::Sibling, dec!(84068));

        // 24 430 at 35% + 59 638 at 45%
        assert_eq!(tax, dec!(35387.60));
    }

    #[test]
    fn test_flat_groups() {
        let scale = TaxScale::france_2024();
        let (nephew, _) = scale.tax_on(TaxGroup::NephewNiece, dec!(10000));
        assert_eq!(nephew, dec!(5500.00));

        let (stranger, _) = scale.tax_on(TaxGroup::Stranger, dec!(10000));
        assert_eq!(stranger, dec!(6000.00));
    }

    #[test]
    fn test_exempt_group_has_no_brackets() {
        let scale = TaxScale::france_2024();
        let (tax, rows) = scale.tax_on(TaxGroup::Exempt, dec!(1000000));
        assert_eq!(tax, Money::ZERO);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_classify_adoption() {
        assert_eq!(
            TaxGroup::classify(Relationship::Child, AdoptionType::Simple, false),
            TaxGroup::Stranger
        );
        assert_eq!(
            TaxGroup::classify(Relationship::Child, AdoptionType::Simple, true),
            TaxGroup::DirectLine
        );
        assert_eq!(
            TaxGroup::classify(Relationship::Child, AdoptionType::Full, false),
            TaxGroup::DirectLine
        );
        assert_eq!(
            TaxGroup::classify(Relationship::Partner, AdoptionType::None, false),
            TaxGroup::Exempt
        );
    }
}
