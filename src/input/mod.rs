//! Input data model: the snapshot of the succession to simulate

mod data;

pub use data::{
    AcceptanceOption, AdoptionType, Asset, AssetOrigin, AssetOwner, BeneficiaryOwnership,
    CustomShare, Debt, DebtType, Donation, DonationType, ExemptionType, Heir, IndivisionDetails,
    LifeInsuranceBeneficiary, LifeInsuranceContractType, MatrimonialAdvantages, MatrimonialRegime,
    OwnershipMode, ProfessionalExemption, Relationship, SimulationInput, SpecificBequest,
    SpouseChoice, SubscriberType, TestamentDistribution, UsufructType, Wishes,
};
