//! Calculation trace: steps, structured alerts, explanation keys
//!
//! The tracer is an append-only log owned by the pipeline for the duration
//! of one simulation and handed back inside the output. Entries keep their
//! emission order, and context maps are BTreeMaps, so two runs over the
//! same input produce byte-identical traces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable identifier of one legal rule application; the consumer maps
/// these to localized text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplanationKey {
    // Liquidation
    LiquidationSeparation,
    LiquidationCommunity50,
    LiquidationPropre,
    LiquidationReward1468,
    LiquidationPreciput,
    LiquidationFullAttribution,
    LiquidationUnequalShare,
    LiquidationRetranchement1527,
    LiquidationIndivision,
    // Estate reconstitution
    MassReportableDonation843,
    MassDebtDeducted,
    MassFuneralCap775,
    MassDebtProRata769,
    RightOfReturn7382,
    // Devolution
    ReserveChildren913,
    ReserveParents9141,
    DisposableQuota,
    ShareChildrenEqual,
    ShareRepresentation,
    ShareRenunciation,
    ShareSpouseAlone7572,
    ShareSpouseParents7571,
    ShareParentsSiblings738,
    ShareFente746,
    // Allocation
    ShareSpouseUsufruct757,
    ShareSpouseQuarter757,
    ShareSpouseQuota10941,
    ShareCustom,
    ShareBequest,
    GiftImputation843,
    AlertReserveExceeded,
    AlertOverAllocation,
    Reduction920,
    // Usufruct valuation
    UsufructValuation669,
    // Inheritance tax
    AbatementChild100k,
    AbatementSibling,
    AbatementNephew,
    AbatementOther,
    AbatementDisability779,
    AbatementConsumed15y,
    TaxSpouseExempt,
    TaxBrackets777,
    TaxAdoptionSimple786,
    ExemptionDutreil787b,
    ExemptionRural793,
    ExemptionForestry793,
    ExemptionMainResidence764bis,
    // Life insurance
    LifeInsurance990i,
    LifeInsurance757b,
    LifeInsuranceAncienContrat,
    LifeInsuranceVieGeneration,
    LifeInsuranceDismembered,
    LifeInsuranceSpouseExempt,
    // Cross-cutting flags
    AlertInternational,
    AlertRegimeMismatch,
    AlertDateInconsistent,
    AlertFenteMissingLine,
    AlertStepchildren,
    AlertSpouseMustChoose,
}

impl ExplanationKey {
    /// Stable wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationKey::LiquidationSeparation => "LIQUIDATION_SEPARATION",
            ExplanationKey::LiquidationCommunity50 => "LIQUIDATION_COMMUNITY_50",
            ExplanationKey::LiquidationPropre => "LIQUIDATION_PROPRE",
            ExplanationKey::LiquidationReward1468 => "LIQUIDATION_REWARD_1468",
            ExplanationKey::LiquidationPreciput => "LIQUIDATION_PRECIPUT",
            ExplanationKey::LiquidationFullAttribution => "LIQUIDATION_FULL_ATTRIBUTION",
            ExplanationKey::LiquidationUnequalShare => "LIQUIDATION_UNEQUAL_SHARE",
            ExplanationKey::LiquidationRetranchement1527 => "LIQUIDATION_RETRANCHEMENT_1527",
            ExplanationKey::LiquidationIndivision => "LIQUIDATION_INDIVISION",
            ExplanationKey::MassReportableDonation843 => "MASS_REPORTABLE_DONATION_843",
            ExplanationKey::MassDebtDeducted => "MASS_DEBT_DEDUCTED",
            ExplanationKey::MassFuneralCap775 => "MASS_FUNERAL_CAP_775",
            ExplanationKey::MassDebtProRata769 => "MASS_DEBT_PRORATA_769",
            ExplanationKey::RightOfReturn7382 => "RIGHT_OF_RETURN_738_2",
            ExplanationKey::ReserveChildren913 => "RESERVE_CHILDREN_913",
            ExplanationKey::ReserveParents9141 => "RESERVE_PARENTS_914_1",
            ExplanationKey::DisposableQuota => "DISPOSABLE_QUOTA",
            ExplanationKey::ShareChildrenEqual => "SHARE_CHILDREN_EQUAL",
            ExplanationKey::ShareRepresentation => "SHARE_REPRESENTATION",
            ExplanationKey::ShareRenunciation => "SHARE_RENUNCIATION",
            ExplanationKey::ShareSpouseAlone7572 => "SHARE_SPOUSE_ALONE_757_2",
            ExplanationKey::ShareSpouseParents7571 => "SHARE_SPOUSE_PARENTS_757_1",
            ExplanationKey::ShareParentsSiblings738 => "SHARE_PARENTS_SIBLINGS_738",
            ExplanationKey::ShareFente746 => "SHARE_FENTE_746",
            ExplanationKey::ShareSpouseUsufruct757 => "SHARE_SPOUSE_USUFRUCT_757",
            ExplanationKey::ShareSpouseQuarter757 => "SHARE_SPOUSE_QUARTER_757",
            ExplanationKey::ShareSpouseQuota10941 => "SHARE_SPOUSE_QUOTA_1094_1",
            ExplanationKey::ShareCustom => "SHARE_CUSTOM",
            ExplanationKey::ShareBequest => "SHARE_BEQUEST",
            ExplanationKey::GiftImputation843 => "GIFT_IMPUTATION_843",
            ExplanationKey::AlertReserveExceeded => "ALERT_RESERVE_EXCEEDED",
            ExplanationKey::AlertOverAllocation => "ALERT_OVER_ALLOCATION",
            ExplanationKey::Reduction920 => "REDUCTION_920",
            ExplanationKey::UsufructValuation669 => "USUFRUCT_VALUATION_669",
            ExplanationKey::AbatementChild100k => "ABATEMENT_CHILD_100K",
            ExplanationKey::AbatementSibling => "ABATEMENT_SIBLING",
            ExplanationKey::AbatementNephew => "ABATEMENT_NEPHEW",
            ExplanationKey::AbatementOther => "ABATEMENT_OTHER",
            ExplanationKey::AbatementDisability779 => "ABATEMENT_DISABILITY_779",
            ExplanationKey::AbatementConsumed15y => "ABATEMENT_CONSUMED_15Y",
            ExplanationKey::TaxSpouseExempt => "TAX_SPOUSE_EXEMPT",
            ExplanationKey::TaxBrackets777 => "TAX_BRACKETS_777",
            ExplanationKey::TaxAdoptionSimple786 => "TAX_ADOPTION_SIMPLE_786",
            ExplanationKey::ExemptionDutreil787b => "EXEMPTION_DUTREIL_787B",
            ExplanationKey::ExemptionRural793 => "EXEMPTION_RURAL_793",
            ExplanationKey::ExemptionForestry793 => "EXEMPTION_FORESTRY_793",
            ExplanationKey::ExemptionMainResidence764bis => "EXEMPTION_MAIN_RESIDENCE_764BIS",
            ExplanationKey::LifeInsurance990i => "LIFE_INSURANCE_990I",
            ExplanationKey::LifeInsurance757b => "LIFE_INSURANCE_757B",
            ExplanationKey::LifeInsuranceAncienContrat => "LIFE_INSURANCE_ANCIEN_CONTRAT",
            ExplanationKey::LifeInsuranceVieGeneration => "LIFE_INSURANCE_VIE_GENERATION",
            ExplanationKey::LifeInsuranceDismembered => "LIFE_INSURANCE_DISMEMBERED",
            ExplanationKey::LifeInsuranceSpouseExempt => "LIFE_INSURANCE_SPOUSE_EXEMPT",
            ExplanationKey::AlertInternational => "ALERT_INTERNATIONAL",
            ExplanationKey::AlertRegimeMismatch => "ALERT_REGIME_MISMATCH",
            ExplanationKey::AlertDateInconsistent => "ALERT_DATE_INCONSISTENT",
            ExplanationKey::AlertFenteMissingLine => "ALERT_FENTE_MISSING_LINE",
            ExplanationKey::AlertStepchildren => "ALERT_STEPCHILDREN",
            ExplanationKey::AlertSpouseMustChoose => "ALERT_SPOUSE_MUST_CHOOSE",
        }
    }
}

/// An explanation key with the values the rule was applied to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub key: ExplanationKey,
    pub context: BTreeMap<String, String>,
}

impl Explanation {
    pub fn new(key: ExplanationKey) -> Self {
        Self {
            key,
            context: BTreeMap::new(),
        }
    }

    /// Attach a context value
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.context.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Plain language, action-oriented
    User,
    /// Precise legal vocabulary, vigilance points
    Notary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Legal,
    Fiscal,
    Data,
    Optimization,
}

/// A structured finding surfaced on the output, never thrown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub audience: Audience,
    pub category: Category,
    pub message: String,
    pub details: Option<String>,
    pub explanations: Vec<Explanation>,
}

/// One pipeline step recorded for the output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationStep {
    pub step_number: u32,
    pub step_name: String,
    pub description: String,
    pub result_summary: String,
}

/// Append-only log threaded through the pipeline stages
#[derive(Debug, Default)]
pub struct Tracer {
    steps: Vec<CalculationStep>,
    alerts: Vec<Alert>,
    explanations: Vec<Explanation>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed pipeline step
    pub fn record_step(
        &mut self,
        step_number: u32,
        step_name: &str,
        description: &str,
        result_summary: String,
    ) {
        self.steps.push(CalculationStep {
            step_number,
            step_name: step_name.to_string(),
            description: description.to_string(),
            result_summary,
        });
    }

    /// Record a global explanation key
    pub fn explain(&mut self, explanation: Explanation) {
        self.explanations.push(explanation);
    }

    pub fn alert(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    /// Data-quality warning aimed at the user
    pub fn data_warning(&mut self, message: impl Into<String>, explanation: Explanation) {
        self.alerts.push(Alert {
            severity: Severity::Warning,
            audience: Audience::User,
            category: Category::Data,
            message: message.into(),
            details: None,
            explanations: vec![explanation],
        });
    }

    /// Devolution-rule warning aimed at the user
    pub fn legal_warning(&mut self, message: impl Into<String>, explanation: Explanation) {
        self.alerts.push(Alert {
            severity: Severity::Warning,
            audience: Audience::User,
            category: Category::Legal,
            message: message.into(),
            details: None,
            explanations: vec![explanation],
        });
    }

    /// Fiscal vigilance note for the notary
    pub fn fiscal_note(&mut self, message: impl Into<String>, explanation: Explanation) {
        self.alerts.push(Alert {
            severity: Severity::Info,
            audience: Audience::Notary,
            category: Category::Fiscal,
            message: message.into(),
            details: None,
            explanations: vec![explanation],
        });
    }

    /// Non-fatal error finding (the computation proceeds on a fallback)
    pub fn error_alert(&mut self, message: impl Into<String>, explanation: Explanation) {
        self.alerts.push(Alert {
            severity: Severity::Error,
            audience: Audience::User,
            category: Category::Legal,
            message: message.into(),
            details: None,
            explanations: vec![explanation],
        });
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn explanations(&self) -> &[Explanation] {
        &self.explanations
    }

    /// Hand the accumulated log over to the output
    pub fn into_parts(self) -> (Vec<CalculationStep>, Vec<Alert>, Vec<Explanation>) {
        (self.steps, self.alerts, self.explanations)
    }
}
