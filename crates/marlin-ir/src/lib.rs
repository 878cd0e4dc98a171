//! # Marlin IR
//!
//! Typed model intermediate representation for Marlin Markov logic networks:
//! domains of interned constants, predicates with evidence semantics, weighted
//! clause templates, and the evidence database. The IR is decoupled from any
//! surface syntax; programs are assembled through [`MlnProgram`] directly.

pub mod evidence;
pub mod predicate;
pub mod program;
pub mod symbols;
pub mod template;

// Re-export commonly used types
pub use evidence::{Club, EvidenceDb, EvidenceTuple};
pub use predicate::{Domain, Predicate};
pub use program::{MlnProgram, ModelError};
pub use symbols::{Args, Constant, DomainId, PredId, SymbolTable, VarId};
pub use template::{ClauseTemplate, TemplateLiteral, Term};
