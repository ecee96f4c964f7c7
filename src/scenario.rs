//! Batch runner for independent simulations
//!
//! Loads the legal parameter table once, then runs many simulations
//! against it. Each simulation is pure and owns its state, so batches
//! parallelize trivially.

use rayon::prelude::*;

use crate::error::EngineError;
use crate::input::SimulationInput;
use crate::output::SuccessionOutput;
use crate::params::LegalParameters;
use crate::pipeline::SuccessionEngine;

/// Pre-loaded runner for repeated simulations
///
/// # Example
/// ```ignore
/// let runner = SimulationRunner::new(LegalParameters::france_2024());
/// let output = runner.run(&input)?;
/// ```
pub struct SimulationRunner {
    engine: SuccessionEngine,
}

impl SimulationRunner {
    /// Create a runner over an explicit parameter table
    pub fn new(params: LegalParameters) -> Self {
        Self {
            engine: SuccessionEngine::new(params),
        }
    }

    /// Create a runner by loading the table from CSV files
    pub fn from_csv_path(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(LegalParameters::from_csv_path(path)?))
    }

    /// Run a single simulation
    pub fn run(&self, input: &SimulationInput) -> Result<SuccessionOutput, EngineError> {
        self.engine.simulate(input)
    }

    /// Run a batch of independent simulations in parallel; results come
    /// back in input order
    pub fn run_batch(
        &self,
        inputs: &[SimulationInput],
    ) -> Vec<Result<SuccessionOutput, EngineError>> {
        inputs.par_iter().map(|input| self.engine.simulate(input)).collect()
    }

    pub fn params(&self) -> &LegalParameters {
        self.engine.params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{
        Asset, AssetOrigin, Heir, MatrimonialRegime, OwnershipMode, Relationship, Wishes,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_input(value: crate::types::Money) -> SimulationInput {
        SimulationInput {
            matrimonial_regime: MatrimonialRegime::Separation,
            marriage_date: None,
            death_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            assets: vec![Asset::new("a", value, OwnershipMode::Full, AssetOrigin::Personal)],
            heirs: vec![Heir::new(
                "c1",
                NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                Relationship::Child,
            )],
            wishes: Wishes::default(),
            donations: vec![],
            debts: vec![],
            matrimonial_advantages: None,
            residence_country: "FR".into(),
        }
    }

    #[test]
    fn test_batch_results_keep_input_order() {
        let runner = SimulationRunner::new(LegalParameters::france_2024());
        let inputs: Vec<SimulationInput> = [dec!(100000), dec!(200000), dec!(300000)]
            .iter()
            .map(|v| sample_input(*v))
            .collect();

        let results = runner.run_batch(&inputs);
        assert_eq!(results.len(), 3);
        for (input, result) in inputs.iter().zip(&results) {
            let output = result.as_ref().unwrap();
            assert_eq!(
                output.global_metrics.total_estate_value,
                input.assets[0].estimated_value
            );
        }
    }
}
