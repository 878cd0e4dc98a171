//! Domains and predicate declarations.

use crate::symbols::{Constant, DomainId, PredId};

/// A finite constant domain (type) that predicate arguments range over.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    /// Members in declaration order. Grounding enumerates this order, so it
    /// determines which groundings are produced first.
    pub constants: Vec<Constant>,
}

impl Domain {
    pub fn size(&self) -> usize {
        self.constants.len()
    }
}

/// A named typed relation with fixed arity and evidence semantics.
///
/// The flags control how the grounder interprets missing tuples:
/// - `closed_world`: tuples absent from the evidence set are implicitly false;
/// - `completely_specified`: both positive and negative evidence is listed
///   explicitly, so the closed-world assumption does not apply;
/// - `immutable`: evidence only, never queried or flipped by the samplers.
///
/// `key_attrs` / `dependent_attrs` declare a functional dependency: two ground
/// atoms agreeing on every key attribute but disagreeing on a dependent
/// attribute are mutually exclusive, enforced by hard clauses emitted after
/// the grounding closure.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Predicate {
    pub id: PredId,
    pub name: String,
    pub arg_domains: Vec<DomainId>,
    pub closed_world: bool,
    pub immutable: bool,
    pub completely_specified: bool,
    pub key_attrs: Vec<usize>,
    pub dependent_attrs: Vec<usize>,
}

impl Predicate {
    pub fn arity(&self) -> usize {
        self.arg_domains.len()
    }

    pub fn has_dependent_attrs(&self) -> bool {
        !self.dependent_attrs.is_empty()
    }
}

/// Renders a ground atom as `Pred(c1, c2, ...)`.
pub fn print_form(pred: &Predicate, args: &[Constant], symbols: &crate::SymbolTable) -> String {
    let rendered: Vec<&str> = args.iter().map(|&c| symbols.name(c)).collect();
    format!("{}({})", pred.name, rendered.join(", "))
}
