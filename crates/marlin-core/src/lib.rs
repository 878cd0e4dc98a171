//! # Marlin Core
//!
//! Inference engine for Marlin Markov logic networks: grounding closure with
//! iterative unit propagation, a compact in-memory MRF, post-grounding
//! simplification, and MC-SAT marginal estimation.

pub mod config;
pub mod deadline;
pub mod engine;
pub mod metrics;

// Re-export commonly used types
pub use config::InferConfig;
pub use deadline::Deadline;
pub use engine::clause::{AtomId, GroundClause, Lit};
pub use engine::driver::{InferenceDriver, InferenceResult, Termination};
pub use engine::errors::InferError;
pub use engine::mrf::Mrf;
pub use engine::solver::{builtin_solver, BackboneSolver, CommandSolver, PropagationSolver};
pub use engine::store::{GroundStore, MemGroundStore};
pub use metrics::Metrics;
