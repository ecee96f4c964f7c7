//! Entities describing the deceased's patrimony, family, and wishes
//!
//! Everything here is an immutable input to the pipeline. Behavior methods
//! are limited to classification helpers (who owns an asset under a given
//! regime, whether a donation re-enters the civil mass); all computation
//! lives in the pipeline stages.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{age_at, Money, Rate};

/// Matrimonial regime of the deceased's marriage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrimonialRegime {
    /// Communauté réduite aux acquêts (legal default since 1966)
    CommunityLegal,
    /// Séparation de biens
    Separation,
    /// Participation aux acquêts: liquidated like a separation here, the
    /// participation claim itself is not computed
    ParticipationAcquests,
    /// Communauté universelle
    CommunityUniversal,
}

impl MatrimonialRegime {
    /// Whether the regime admits a community pool at all
    pub fn has_community(&self) -> bool {
        matches!(
            self,
            MatrimonialRegime::CommunityLegal | MatrimonialRegime::CommunityUniversal
        )
    }
}

/// Declared origin of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetOrigin {
    /// Bien propre of the deceased
    Personal,
    /// Bien commun of the couple
    Community,
    /// Received by inheritance or gift (propre by nature, Art. 1405 CC)
    Inheritance,
}

/// How the deceased held the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipMode {
    Full,
    Usufruct,
    Bare,
    Indivision,
}

/// Kind of usufruct for dismembered assets (Art. 669 CGI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsufructType {
    /// Life usufruct, valued by the usufructuary's age (Art. 669 I)
    Viager,
    /// Fixed-term usufruct, 23% per started decade (Art. 669 II)
    Temporaire,
}

/// Fiscal flavor of a life-insurance contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeInsuranceContractType {
    Standard,
    /// Vie-Génération: 20% rebate on the capital before allowances
    /// (Art. 990 I bis CGI)
    VieGeneration,
    /// Subscribed before 20/11/1991 with premiums before 13/10/1998: exempt
    AncienContrat,
}

/// Who subscribed the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriberType {
    Deceased,
    Spouse,
}

/// Ownership slice assigned to a life-insurance beneficiary when the
/// beneficiary clause is dismembered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeneficiaryOwnership {
    Full,
    Usufruct,
    Bare,
}

/// A named beneficiary of a life-insurance contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeInsuranceBeneficiary {
    /// Heir id of the beneficiary
    pub beneficiary_id: String,

    /// Percentage of the contract assigned to this beneficiary (0-100),
    /// relative to the other beneficiaries holding the same ownership slice
    pub share_percentage: Rate,

    /// Ownership slice for dismembered clauses
    #[serde(default = "BeneficiaryOwnership::full")]
    pub ownership: BeneficiaryOwnership,
}

impl BeneficiaryOwnership {
    fn full() -> Self {
        BeneficiaryOwnership::Full
    }
}

/// Co-ownership detail for an asset held in indivision
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndivisionDetails {
    /// Percentage (0-100) held by the surviving spouse
    #[serde(default)]
    pub spouse_share_percentage: Option<Rate>,

    /// Percentage (0-100) held by third parties
    #[serde(default)]
    pub others_share_percentage: Option<Rate>,
}

impl IndivisionDetails {
    /// Fraction (0-1) of the asset belonging to the deceased
    pub fn deceased_fraction(&self) -> Rate {
        let others = self.spouse_share_percentage.unwrap_or(Money::ZERO)
            + self.others_share_percentage.unwrap_or(Money::ZERO);
        ((dec!(100) - others) / dec!(100)).max(Money::ZERO)
    }
}

/// Type of partial professional exemption attached to an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExemptionType {
    /// Pacte Dutreil, 75% on the share value excluding the CCA (Art. 787 B)
    Dutreil,
    /// Long-term rural lease, 75% up to a threshold then 50% (Art. 793)
    RuralLease,
    /// Forestry group, 75% (Art. 793)
    Forestry,
}

/// Professional exemption claim on an asset (Art. 787 B / 793 CGI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalExemption {
    pub exemption_type: ExemptionType,

    /// Dutreil: collective commitment (2 years minimum) signed
    #[serde(default)]
    pub dutreil_is_collective: bool,

    /// Dutreil: individual commitment (4 years minimum) signed
    #[serde(default)]
    pub dutreil_is_individual: bool,

    /// Rural lease: must be 18 years or more to qualify
    #[serde(default)]
    pub lease_duration_years: Option<u32>,
}

/// Result of classifying an asset under a matrimonial regime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOwner {
    /// Fully in the deceased's estate
    Deceased,
    /// In the community pool, divided at liquidation
    Community,
}

/// One asset of the patrimony snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,

    /// Full-ownership market value at the date of death
    pub estimated_value: Money,

    pub ownership_mode: OwnershipMode,
    pub asset_origin: AssetOrigin,

    /// Acquisition date, used against the marriage date to tell propres
    /// from acquêts under the legal community
    #[serde(default)]
    pub acquisition_date: Option<NaiveDate>,

    /// Birth date of the usufructuary when the asset is dismembered
    #[serde(default)]
    pub usufructuary_birth_date: Option<NaiveDate>,

    #[serde(default = "UsufructType::viager")]
    pub usufruct_type: UsufructType,

    #[serde(default)]
    pub usufruct_duration_years: Option<u32>,

    /// Share (0-100) of a community asset that was funded by community
    /// money; below 100 triggers a reward (Art. 1468 CC)
    #[serde(default = "Asset::full_funding")]
    pub community_funding_percentage: Rate,

    #[serde(default)]
    pub indivision_details: Option<IndivisionDetails>,

    /// Main residence, candidate for the 20% relief (Art. 764 bis CGI)
    #[serde(default)]
    pub is_main_residence: bool,

    /// Relief condition: the surviving spouse keeps living in it
    #[serde(default)]
    pub spouse_occupies_property: bool,

    // A set premium field makes the asset a life-insurance contract,
    // excluded from the succession mass and taxed separately.
    #[serde(default)]
    pub premiums_before_70: Option<Money>,
    #[serde(default)]
    pub premiums_after_70: Option<Money>,

    #[serde(default = "LifeInsuranceContractType::standard")]
    pub life_insurance_contract_type: LifeInsuranceContractType,

    #[serde(default)]
    pub life_insurance_beneficiaries: Vec<LifeInsuranceBeneficiary>,

    #[serde(default)]
    pub subscriber_type: Option<SubscriberType>,

    /// Compte courant d'associé attached to company shares. Part of the
    /// estate but excluded from the Dutreil base.
    #[serde(default)]
    pub cca_value: Money,

    #[serde(default)]
    pub professional_exemption: Option<ProfessionalExemption>,

    /// Donor parent id when the asset was received from a parent by gift
    /// (legal right of return, Art. 738-2 CC)
    #[serde(default)]
    pub received_from_parent_id: Option<String>,

    /// ISO country code of the asset's location
    #[serde(default = "Asset::france")]
    pub location_country: String,
}

impl UsufructType {
    fn viager() -> Self {
        UsufructType::Viager
    }
}

impl LifeInsuranceContractType {
    fn standard() -> Self {
        LifeInsuranceContractType::Standard
    }
}

impl Asset {
    fn full_funding() -> Rate {
        dec!(100)
    }

    fn france() -> String {
        "FR".to_string()
    }

    /// Create an asset with the common defaults; tests and callers override
    /// individual fields with struct-update syntax.
    pub fn new(
        id: impl Into<String>,
        estimated_value: Money,
        ownership_mode: OwnershipMode,
        asset_origin: AssetOrigin,
    ) -> Self {
        Self {
            id: id.into(),
            estimated_value,
            ownership_mode,
            asset_origin,
            acquisition_date: None,
            usufructuary_birth_date: None,
            usufruct_type: UsufructType::Viager,
            usufruct_duration_years: None,
            community_funding_percentage: dec!(100),
            indivision_details: None,
            is_main_residence: false,
            spouse_occupies_property: false,
            premiums_before_70: None,
            premiums_after_70: None,
            life_insurance_contract_type: LifeInsuranceContractType::Standard,
            life_insurance_beneficiaries: Vec::new(),
            subscriber_type: None,
            cca_value: Money::ZERO,
            professional_exemption: None,
            received_from_parent_id: None,
            location_country: "FR".to_string(),
        }
    }

    /// An asset is a life-insurance contract iff any premium field is set
    pub fn is_life_insurance(&self) -> bool {
        self.premiums_before_70.is_some() || self.premiums_after_70.is_some()
    }

    /// Classify ownership under the regime. Community origin under a
    /// separation-style regime is treated as the deceased's; the liquidator
    /// raises the data warning before calling this.
    pub fn owner_under(
        &self,
        regime: MatrimonialRegime,
        marriage_date: Option<NaiveDate>,
    ) -> AssetOwner {
        match self.asset_origin {
            AssetOrigin::Personal | AssetOrigin::Inheritance => AssetOwner::Deceased,
            AssetOrigin::Community => match regime {
                MatrimonialRegime::Separation | MatrimonialRegime::ParticipationAcquests => {
                    AssetOwner::Deceased
                }
                MatrimonialRegime::CommunityUniversal => AssetOwner::Community,
                MatrimonialRegime::CommunityLegal => {
                    // Acquired before the marriage = propre; undated assets
                    // are assumed acquired during the marriage.
                    match (marriage_date, self.acquisition_date) {
                        (Some(married), Some(acquired)) if acquired < married => {
                            AssetOwner::Deceased
                        }
                        _ => AssetOwner::Community,
                    }
                }
            },
        }
    }

    /// Fraction (0-1) of the asset belonging to the deceased, accounting
    /// for indivision
    pub fn deceased_fraction(&self) -> Rate {
        match (&self.ownership_mode, &self.indivision_details) {
            (OwnershipMode::Indivision, Some(details)) => details.deceased_fraction(),
            _ => Money::ONE,
        }
    }
}

/// Family relationship of an heir to the deceased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Child,
    Spouse,
    /// PACS partner: same fiscal exemption as the spouse, no legal
    /// devolution rights
    Partner,
    Parent,
    Sibling,
    Grandchild,
    GreatGrandchild,
    NephewNiece,
    Other,
}

/// Adoption status (Art. 786 CGI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdoptionType {
    None,
    /// Adoption plénière: identical to a biological child
    Full,
    /// Adoption simple: taxed at 60% unless continuous care was given
    Simple,
}

/// Succession option exercised by the heir (Art. 768 CC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceOption {
    PureSimple,
    BenefitInventory,
    Renunciation,
}

/// One member of the family able to inherit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heir {
    pub id: String,
    pub birth_date: NaiveDate,
    pub relationship: Relationship,

    /// False for a child of another union (famille recomposée)
    #[serde(default = "Heir::current_union")]
    pub is_from_current_union: bool,

    /// Id of the predeceased or renouncing heir this member represents
    /// (Art. 751+ CC)
    #[serde(default)]
    pub represented_heir_id: Option<String>,

    /// Extra 159 325 euro allowance (Art. 779 II CGI)
    #[serde(default)]
    pub is_disabled: bool,

    #[serde(default = "AdoptionType::none")]
    pub adoption_type: AdoptionType,

    /// For simple adoption: 5 years of continuous care during minority
    /// restores direct-line treatment (Art. 786 CGI)
    #[serde(default)]
    pub has_received_continuous_care: bool,

    #[serde(default = "AcceptanceOption::pure_simple")]
    pub acceptance_option: AcceptanceOption,

    #[serde(default)]
    pub has_renounced: bool,

    /// Paternal (true) or maternal (false) line, for the cleft succession
    /// (Art. 746 CC)
    #[serde(default)]
    pub paternal_line: Option<bool>,
}

impl AdoptionType {
    fn none() -> Self {
        AdoptionType::None
    }
}

impl AcceptanceOption {
    fn pure_simple() -> Self {
        AcceptanceOption::PureSimple
    }
}

impl Heir {
    fn current_union() -> bool {
        true
    }

    /// Create an heir with the common defaults
    pub fn new(id: impl Into<String>, birth_date: NaiveDate, relationship: Relationship) -> Self {
        Self {
            id: id.into(),
            birth_date,
            relationship,
            is_from_current_union: true,
            represented_heir_id: None,
            is_disabled: false,
            adoption_type: AdoptionType::None,
            has_received_continuous_care: false,
            acceptance_option: AcceptanceOption::PureSimple,
            has_renounced: false,
            paternal_line: None,
        }
    }

    pub fn is_renouncing(&self) -> bool {
        self.has_renounced || self.acceptance_option == AcceptanceOption::Renunciation
    }

    pub fn is_spouse_or_partner(&self) -> bool {
        matches!(self.relationship, Relationship::Spouse | Relationship::Partner)
    }

    pub fn is_descendant(&self) -> bool {
        matches!(
            self.relationship,
            Relationship::Child | Relationship::Grandchild | Relationship::GreatGrandchild
        )
    }

    pub fn age_at(&self, date: NaiveDate) -> i32 {
        age_at(self.birth_date, date)
    }
}

/// Kind of a prior donation, driving its civil reportability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationType {
    /// Reported at the value revalued at death (Art. 860 CC)
    DonManuel,
    /// Values frozen at donation day, no civil report
    DonationPartage,
    /// Customary present, never reported
    PresentUsage,
}

/// A donation made by the deceased before death
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub donation_type: DonationType,

    /// Heir id of the donee
    pub beneficiary_id: String,

    pub donation_date: NaiveDate,
    pub original_value: Money,

    /// Revaluation at the date of death, when known
    #[serde(default)]
    pub current_estimated_value: Option<Money>,

    /// Declared to the tax administration: only declared donations consume
    /// the allowance through the 15-year recall (Art. 784 CGI)
    #[serde(default)]
    pub is_declared_to_tax: bool,
}

impl Donation {
    /// Value re-entering the civil mass (rapport civil, Art. 843 CC)
    pub fn reportable_value(&self) -> Money {
        match self.donation_type {
            DonationType::DonManuel => self.current_estimated_value.unwrap_or(self.original_value),
            DonationType::DonationPartage | DonationType::PresentUsage => Money::ZERO,
        }
    }

    pub fn is_reportable(&self) -> bool {
        self.donation_type == DonationType::DonManuel
    }

    /// Whether this donation consumes allowance at the given death date
    /// (declared, and within the 15-year window)
    pub fn within_fiscal_recall(&self, death_date: NaiveDate) -> bool {
        if !self.is_declared_to_tax {
            return false;
        }
        let years = age_at(self.donation_date, death_date);
        (0..15).contains(&years)
    }
}

/// Kind of estate liability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtType {
    MortgageLoan,
    ConsumerLoan,
    Taxes,
    /// Capped at 1 500 euros without proof (Art. 775 CGI)
    Funeral,
    Other,
}

/// A debt of the estate (passif successoral)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: String,

    /// Outstanding amount, positive
    pub amount: Money,

    pub debt_type: DebtType,

    #[serde(default = "Debt::deductible")]
    pub is_deductible: bool,

    /// Asset securing the debt; a partially exempt asset triggers the
    /// Art. 769 CGI pro-rata
    #[serde(default)]
    pub linked_asset_id: Option<String>,

    /// Personal debts deduct in full; community debts only for half
    pub asset_origin: AssetOrigin,

    #[serde(default)]
    pub proof_provided: bool,
}

impl Debt {
    fn deductible() -> bool {
        true
    }
}

/// Testamentary distribution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestamentDistribution {
    Legal,
    SpecificBequests,
    Custom,
    SpouseAll,
    ChildrenAll,
}

/// Option of the surviving spouse in presence of descendants (Art. 757 CC,
/// extended by a donation entre époux, Art. 1094-1 CC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpouseChoice {
    Usufruct,
    QuarterOwnership,
    DisposableQuota,
}

/// A legacy of a specific asset (legs particulier)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificBequest {
    pub asset_id: String,
    pub beneficiary_id: String,

    /// Percentage (0-100) of the asset's value bequeathed
    #[serde(default = "SpecificBequest::whole")]
    pub share_percentage: Rate,
}

impl SpecificBequest {
    fn whole() -> Rate {
        dec!(100)
    }
}

/// A testament clause assigning a custom percentage of the estate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomShare {
    pub beneficiary_id: String,

    /// Percentage (0-100) of the net mass
    pub percentage: Rate,
}

/// Testamentary wishes of the deceased
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishes {
    /// Donation au dernier vivant, widening the spouse's options
    #[serde(default)]
    pub has_spouse_donation: bool,

    #[serde(default = "Wishes::legal")]
    pub testament_distribution: TestamentDistribution,

    #[serde(default)]
    pub specific_bequests: Vec<SpecificBequest>,

    #[serde(default)]
    pub custom_shares: Vec<CustomShare>,

    #[serde(default)]
    pub spouse_choice: Option<SpouseChoice>,
}

impl Wishes {
    fn legal() -> TestamentDistribution {
        TestamentDistribution::Legal
    }
}

impl Default for Wishes {
    fn default() -> Self {
        Self {
            has_spouse_donation: false,
            testament_distribution: TestamentDistribution::Legal,
            specific_bequests: Vec::new(),
            custom_shares: Vec::new(),
            spouse_choice: None,
        }
    }
}

/// Marriage-contract clauses altering the community split at death
/// (avantages matrimoniaux, Art. 1515/1524/1527 CC)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrimonialAdvantages {
    /// Clause d'attribution intégrale: the whole community goes to the
    /// surviving spouse (Art. 1524 CC)
    #[serde(default)]
    pub has_full_attribution: bool,

    /// Clause de préciput: listed assets are taken off-top before division
    /// (Art. 1515 CC)
    #[serde(default)]
    pub has_preciput: bool,

    #[serde(default)]
    pub preciput_asset_ids: Vec<String>,

    /// Clause de partage inégal
    #[serde(default)]
    pub has_unequal_share: bool,

    /// Spouse's community percentage under the unequal clause (51-99)
    #[serde(default)]
    pub spouse_share_percentage: Option<Rate>,
}

/// Complete, pre-validated input of one simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub matrimonial_regime: MatrimonialRegime,

    #[serde(default)]
    pub marriage_date: Option<NaiveDate>,

    /// Date of death: every age, revaluation, and recall window is
    /// assessed at this date so replays are reproducible
    pub death_date: NaiveDate,

    pub assets: Vec<Asset>,
    pub heirs: Vec<Heir>,

    #[serde(default)]
    pub wishes: Wishes,

    #[serde(default)]
    pub donations: Vec<Donation>,

    #[serde(default)]
    pub debts: Vec<Debt>,

    #[serde(default)]
    pub matrimonial_advantages: Option<MatrimonialAdvantages>,

    /// ISO country code of the deceased's residence
    #[serde(default = "Asset::france")]
    pub residence_country: String,
}

impl SimulationInput {
    /// Structural validation; failures abort the simulation before the
    /// pipeline starts. Domain inconsistencies are not checked here: the
    /// stages surface those as alerts.
    pub fn validate(&self) -> Result<(), EngineError> {
        for asset in &self.assets {
            if asset.estimated_value < Money::ZERO {
                return Err(EngineError::InputValidation(format!(
                    "asset {} has a negative value",
                    asset.id
                )));
            }
            if asset.cca_value < Money::ZERO {
                return Err(EngineError::InputValidation(format!(
                    "asset {} has a negative CCA value",
                    asset.id
                )));
            }
            if !(Money::ZERO..=dec!(100)).contains(&asset.community_funding_percentage) {
                return Err(EngineError::InputValidation(format!(
                    "asset {} community funding percentage out of 0-100",
                    asset.id
                )));
            }
            if asset.ownership_mode == OwnershipMode::Bare
                && asset.usufructuary_birth_date.is_none()
                && asset.usufruct_type == UsufructType::Viager
            {
                return Err(EngineError::InputValidation(format!(
                    "asset {} is bare ownership without a usufructuary birth date",
                    asset.id
                )));
            }
        }
        for donation in &self.donations {
            if donation.original_value < Money::ZERO
                || donation.current_estimated_value.unwrap_or(Money::ZERO) < Money::ZERO
            {
                return Err(EngineError::InputValidation(format!(
                    "donation {} has a negative value",
                    donation.id
                )));
            }
        }
        for debt in &self.debts {
            if debt.amount < Money::ZERO {
                return Err(EngineError::InputValidation(format!(
                    "debt {} has a negative amount",
                    debt.id
                )));
            }
        }
        for share in &self.wishes.custom_shares {
            if !(Money::ZERO..=dec!(100)).contains(&share.percentage) {
                return Err(EngineError::InputValidation(format!(
                    "custom share for {} out of 0-100",
                    share.beneficiary_id
                )));
            }
        }
        for bequest in &self.wishes.specific_bequests {
            if !(Money::ZERO..=dec!(100)).contains(&bequest.share_percentage) {
                return Err(EngineError::InputValidation(format!(
                    "bequest of {} to {} has a share percentage out of 0-100",
                    bequest.asset_id, bequest.beneficiary_id
                )));
            }
        }
        if let Some(advantages) = &self.matrimonial_advantages {
            if advantages.has_unequal_share {
                match advantages.spouse_share_percentage {
                    Some(pct) if (dec!(51)..=dec!(99)).contains(&pct) => {}
                    _ => {
                        return Err(EngineError::InputValidation(
                            "unequal share clause requires a spouse percentage in 51-99".into(),
                        ))
                    }
                }
            }
            if advantages.has_preciput && advantages.preciput_asset_ids.is_empty() {
                return Err(EngineError::InputValidation(
                    "preciput clause set without any asset id".into(),
                ));
            }
        }
        Ok(())
    }

    /// Surviving spouse or partner, ignoring a renouncing one
    pub fn spouse(&self) -> Option<&Heir> {
        self.heirs
            .iter()
            .find(|h| h.is_spouse_or_partner() && !h.is_renouncing())
    }

    pub fn heir(&self, id: &str) -> Option<&Heir> {
        self.heirs.iter().find(|h| h.id == id)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}
