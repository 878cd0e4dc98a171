//! Inference configuration.

use std::time::Duration;

use crate::engine::errors::InferError;

/// Default threshold above which a clause weight is treated as hard.
pub const DEFAULT_HARD_WEIGHT: f64 = 1e7;

/// Tuning knobs for the whole pipeline. Field defaults follow the reference
/// parameterization; `validate` is called once at driver start and the engine
/// assumes a validated config from then on.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InferConfig {
    /// Clauses with `|weight| >= hard_weight` must be satisfied.
    pub hard_weight: f64,
    /// Per-try WalkSAT flip budget; `0` means `100 × num_atoms`.
    pub max_flips: usize,
    /// WalkSAT restart count; `0` means `3`.
    pub max_tries: usize,
    /// Number of MC-SAT samples to draw.
    pub mcsat_samples: usize,
    /// Probability of a random (non-greedy) WalkSAT step.
    pub walksat_random_step_prob: f64,
    /// Probability of a simulated-annealing step inside SampleSAT.
    pub samplesat_sa_prob: f64,
    /// Inverse temperature of the SampleSAT annealing steps.
    pub samplesat_sa_coef: f64,
    /// Priors at or above this activate a soft-evidence atom up front.
    pub soft_evidence_threshold: f64,
    /// Interleave unit propagation with hard-clause grounding.
    pub iterative_unit_propagation: bool,
    /// Run full unit propagation on the MRF after grounding.
    pub unit_propagation: bool,
    /// Ask the unit solver for backbones instead of propagated units.
    pub use_backbones: bool,
    /// Bypass the activation closure and activate every unknown atom.
    pub mark_all_atoms_active: bool,
    /// When false, emit per-key existence clauses alongside the mutex
    /// clauses of a functional dependency.
    pub key_constraint_allows_null_label: bool,
    /// Fatal ceiling on the number of active ground clauses.
    pub max_ground_clauses: usize,
    /// Cooperative deadline for the whole run; `None` disables it.
    pub timeout: Option<Duration>,
    /// Seed for all random streams; split deterministically per phase.
    pub seed: u64,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            hard_weight: DEFAULT_HARD_WEIGHT,
            max_flips: 0,
            max_tries: 0,
            mcsat_samples: 100,
            walksat_random_step_prob: 0.5,
            samplesat_sa_prob: 0.5,
            samplesat_sa_coef: 10.0,
            soft_evidence_threshold: 0.0,
            iterative_unit_propagation: true,
            unit_propagation: true,
            use_backbones: false,
            mark_all_atoms_active: false,
            key_constraint_allows_null_label: true,
            max_ground_clauses: 50_000_000,
            timeout: None,
            seed: 0,
        }
    }
}

impl InferConfig {
    pub fn validate(&self) -> Result<(), InferError> {
        if self.mcsat_samples == 0 {
            return Err(InferError::InvalidConfig(
                "mcsat_samples must be positive for marginal inference".into(),
            ));
        }
        if !(self.hard_weight.is_finite() && self.hard_weight > 0.0) {
            return Err(InferError::InvalidConfig(
                "hard_weight must be positive and finite".into(),
            ));
        }
        for (name, p) in [
            ("walksat_random_step_prob", self.walksat_random_step_prob),
            ("samplesat_sa_prob", self.samplesat_sa_prob),
            ("soft_evidence_threshold", self.soft_evidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(InferError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {p}"
                )));
            }
        }
        if self.samplesat_sa_coef < 0.0 || !self.samplesat_sa_coef.is_finite() {
            return Err(InferError::InvalidConfig(
                "samplesat_sa_coef must be non-negative and finite".into(),
            ));
        }
        if self.max_ground_clauses == 0 {
            return Err(InferError::InvalidConfig(
                "max_ground_clauses must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        InferConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_samples_rejected() {
        let cfg = InferConfig {
            mcsat_samples: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let cfg = InferConfig {
            walksat_random_step_prob: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
