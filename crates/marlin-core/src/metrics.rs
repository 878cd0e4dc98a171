//! Run statistics.
//!
//! An explicit sink threaded through the pipeline instead of ambient globals;
//! every phase records into the same instance and the driver returns a copy
//! with the final result.

/// Counters and timings accumulated over one inference run.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    /// Active ground atoms after grounding.
    pub ground_atoms: usize,
    /// Ground clauses after consolidation.
    pub ground_clauses: usize,
    /// Hard unit clauses present in the MRF handed to the sampler.
    pub hard_units: usize,
    /// Unit literals discovered by iterative unit propagation.
    pub units_during_iup: usize,
    /// Time spent inside the unit solver, in milliseconds.
    pub unit_solver_ms: u64,
    /// Time spent in post-grounding unit propagation, in milliseconds.
    pub unit_prop_ms: u64,
    /// Total grounding time, in milliseconds.
    pub grounding_ms: u64,
    /// Total MC-SAT time, in milliseconds.
    pub mcsat_ms: u64,
    /// MC-SAT steps where SampleSAT failed to satisfy the hard subset.
    pub sample_sat_fails: usize,
    /// Samples completed when the deadline expired (0 if no timeout).
    pub samples_at_timeout: usize,
    /// Ground clauses produced when the deadline or ceiling was hit.
    pub clauses_at_timeout: usize,
}
