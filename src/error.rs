//! Engine error taxonomy
//!
//! Domain findings (over-allocation, reserve violations, inconsistent dates)
//! never surface as errors: they accumulate as structured alerts on the
//! output. Only structurally invalid inputs, or an internal invariant
//! failing at a stage exit, abort the simulation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The input cannot be computed on at all (missing or negative values,
    /// malformed percentages). Detected before the pipeline starts.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// A pipeline invariant failed at a stage exit. This is a bug in the
    /// engine or a corrupted parameter table, never a user problem.
    #[error("invariant {invariant} violated at stage {stage}: {details}")]
    InvariantViolation {
        stage: &'static str,
        invariant: &'static str,
        details: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_stage_and_invariant() {
        let err = EngineError::InvariantViolation {
            stage: "devolution",
            invariant: "I1",
            details: "shares sum to 0.97".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("I1"));
        assert!(msg.contains("devolution"));
    }
}
