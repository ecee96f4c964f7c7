//! Personal allowances by fiscal group (Art. 779 CGI)

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::brackets::TaxGroup;
use crate::types::Money;

/// Allowance amounts deducted from the taxable base before the scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceTable {
    /// Children, parents, representation in direct line
    pub direct_line: Money,

    pub sibling: Money,
    pub nephew_niece: Money,

    /// Beyond the 4th degree and strangers
    pub stranger: Money,

    /// Extra allowance for a disabled heir, cumulative with the personal
    /// one (Art. 779 II CGI)
    pub disability_bonus: Money,
}

impl AllowanceTable {
    /// Loi de Finances 2024 values
    pub fn france_2024() -> Self {
        Self {
            direct_line: dec!(100000),
            sibling: dec!(15932),
            nephew_niece: dec!(7967),
            stranger: dec!(1594),
            disability_bonus: dec!(159325),
        }
    }

    /// Base allowance for a group; None means the group is fully exempt
    /// and the scale is never reached
    pub fn for_group(&self, group: TaxGroup) -> Option<Money> {
        match group {
            TaxGroup::DirectLine => Some(self.direct_line),
            TaxGroup::Sibling => Some(self.sibling),
            TaxGroup::NephewNiece => Some(self.nephew_niece),
            TaxGroup::Stranger => Some(self.stranger),
            TaxGroup::Exempt => None,
        }
    }
}
