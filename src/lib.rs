//! Succession Engine - Deterministic calculator for French successions
//!
//! This library provides:
//! - Matrimonial regime liquidation (community, separation, clauses)
//! - Estate reconstitution with civil report and deductible debts
//! - Devolution with representation, renunciation, and cleft succession
//! - Share allocation under testamentary wishes and the spouse option
//! - Inheritance tax and the separate life-insurance taxation
//!
//! One simulation is a pure function of a [`SimulationInput`] and a
//! [`LegalParameters`] table; every figure in the output is paired with
//! explanation keys citing the legal articles applied.

pub mod error;
pub mod input;
pub mod output;
pub mod params;
mod pipeline;
pub mod scenario;
mod tax;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use error::EngineError;
pub use input::SimulationInput;
pub use output::SuccessionOutput;
pub use params::LegalParameters;
pub use pipeline::{simulate, SuccessionEngine};
pub use scenario::SimulationRunner;
pub use types::{Money, Rate};
