//! Pipeline orchestration: grounding, unit propagation, MC-SAT, output.

use rustc_hash::FxHashMap;

use crate::config::InferConfig;
use crate::deadline::Deadline;
use crate::engine::clause::AtomId;
use crate::engine::errors::InferError;
use crate::engine::grounder::Grounder;
use crate::engine::sampler::{self, phases, SamplerParams};
use crate::engine::solver::UnitSolver;
use crate::engine::store::GroundStore;
use crate::engine::unit_prop::unit_propagate;
use crate::metrics::Metrics;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// All requested samples were drawn.
    Completed,
    /// The deadline expired; marginals cover the samples drawn so far.
    Timeout,
}

/// Per-atom marginals plus the run summary.
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// `(atom print form, estimated probability)`, ascending by atom id.
    pub marginals: Vec<(String, f64)>,
    pub termination: Termination,
    /// Average assignment cost over the drawn samples.
    pub average_cost: f64,
    pub metrics: Metrics,
}

/// Runs the inference pipeline: grounding closure with iterative unit
/// propagation, optional post-grounding simplification, MC-SAT, and marginal
/// emission. Phases run strictly in sequence; the MRF is owned by exactly
/// one phase at a time.
pub struct InferenceDriver<S: GroundStore, U: UnitSolver> {
    store: S,
    solver: U,
    config: InferConfig,
    metrics: Metrics,
}

impl<S: GroundStore, U: UnitSolver> InferenceDriver<S, U> {
    /// Validates the configuration up front; an invalid one refuses to run.
    pub fn new(store: S, solver: U, config: InferConfig) -> Result<Self, InferError> {
        config.validate()?;
        Ok(Self {
            store,
            solver,
            config,
            metrics: Metrics::default(),
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs marginal inference end to end.
    pub fn run(&mut self) -> Result<InferenceResult, InferError> {
        let deadline = Deadline::new(self.config.timeout);

        let outcome = {
            let mut grounder = Grounder::new(
                &mut self.store,
                &self.solver,
                &self.config,
                &mut self.metrics,
                &deadline,
            );
            grounder.construct_mrf()?
        };
        self.metrics.grounding_ms = deadline.elapsed().as_millis() as u64;
        let mut mrf = outcome.mrf;

        if outcome.timed_out {
            // Partial result: no samples, evidence-derived values only.
            let marginals = self.collect_marginals(&mrf, &FxHashMap::default(), 0);
            return Ok(InferenceResult {
                marginals,
                termination: Termination::Timeout,
                average_cost: 0.0,
                metrics: self.metrics.clone(),
            });
        }

        let mut pinned: FxHashMap<AtomId, bool> = FxHashMap::default();
        if self.config.unit_propagation {
            let up_start = deadline.elapsed();
            let up = unit_propagate(mrf, &deadline)?;
            mrf = up.mrf;
            pinned = up.pinned;
            self.metrics.unit_prop_ms = (deadline.elapsed() - up_start).as_millis() as u64;
            #[cfg(feature = "tracing")]
            tracing::info!(
                atoms = mrf.num_atoms(),
                clauses = mrf.num_clauses(),
                "MRF size after unit propagation"
            );
        }

        self.metrics.ground_atoms = mrf.num_atoms();
        self.metrics.ground_clauses = mrf.num_clauses();
        self.metrics.hard_units = mrf.count_hard_units();

        let params = SamplerParams {
            max_flips: if self.config.max_flips == 0 {
                100 * mrf.num_atoms().max(1)
            } else {
                self.config.max_flips
            },
            max_tries: if self.config.max_tries == 0 {
                3
            } else {
                self.config.max_tries
            },
            random_step_prob: self.config.walksat_random_step_prob,
            sa_prob: self.config.samplesat_sa_prob,
            sa_coef: self.config.samplesat_sa_coef,
        };

        let mut init_rng = sampler::rng_stream(self.config.seed, phases::INIT);
        mrf.randomize(&mut init_rng);
        mrf.recount();

        let mcsat_start = deadline.elapsed();
        let mut retention_rng = sampler::rng_stream(self.config.seed, phases::RETENTION);
        let mut samplesat_rng = sampler::rng_stream(self.config.seed, phases::SAMPLESAT);
        let outcome = sampler::mc_sat(
            &mut mrf,
            self.config.mcsat_samples,
            &params,
            &mut retention_rng,
            &mut samplesat_rng,
            &deadline,
            &mut self.metrics,
        )?;
        self.metrics.mcsat_ms = (deadline.elapsed() - mcsat_start).as_millis() as u64;

        let marginals = self.collect_marginals(&mrf, &pinned, outcome.samples);
        let average_cost = if outcome.samples > 0 {
            outcome.sum_cost / outcome.samples as f64
        } else {
            0.0
        };
        Ok(InferenceResult {
            marginals,
            termination: if outcome.timed_out {
                Termination::Timeout
            } else {
                Termination::Completed
            },
            average_cost,
            metrics: self.metrics.clone(),
        })
    }

    /// Assembles `(print form, probability)` pairs for the reportable atoms:
    /// active atoms of the query predicates, or every active atom when no
    /// query predicate is declared. Pinned and fixed atoms report their
    /// forced truth; sampled atoms report `n_true / N`.
    fn collect_marginals(
        &self,
        mrf: &crate::engine::mrf::Mrf,
        pinned: &FxHashMap<AtomId, bool>,
        samples: usize,
    ) -> Vec<(String, f64)> {
        let report_all = self.store.program().query_preds.is_empty();
        let mut out = Vec::new();
        for id in self.store.all_active_atoms() {
            if !report_all && !self.store.program().is_query(self.store.atom_pred(id)) {
                continue;
            }
            let p = if let Some(&truth) = pinned.get(&id) {
                truth as u8 as f64
            } else if let Some(atom) = mrf.atom(id) {
                if atom.fixed || samples == 0 {
                    atom.truth as u8 as f64
                } else {
                    atom.n_true as f64 / samples as f64
                }
            } else {
                // Active but absent from the final MRF and not pinned: the
                // closed-world default.
                0.0
            };
            out.push((self.store.print_form(id), p));
        }
        out
    }
}
