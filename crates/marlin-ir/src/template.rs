//! Weighted first-order clause templates.

use smallvec::SmallVec;

use crate::symbols::{Constant, PredId, VarId};

/// A term position in a template literal: either a universally (or
/// existentially) quantified variable or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Term {
    Var(VarId),
    Const(Constant),
}

/// A literal of a clause template: a predicate applied to terms, with a sense
/// (`true` = positive occurrence, `false` = negated).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateLiteral {
    pub pred: PredId,
    pub sense: bool,
    pub terms: SmallVec<[Term; 4]>,
}

impl TemplateLiteral {
    pub fn new(pred: PredId, sense: bool, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            pred,
            sense,
            terms: terms.into_iter().collect(),
        }
    }
}

/// A weighted disjunction of template literals.
///
/// The sign of the weight determines the clause sign: a positive clause costs
/// `|weight|` when unsatisfied, a negative clause costs `|weight|` when
/// satisfied. Variables listed in `exist_vars` are existentially quantified;
/// all other variables are universal.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClauseTemplate {
    pub id: u32,
    pub literals: Vec<TemplateLiteral>,
    pub weight: f64,
    pub exist_vars: Vec<VarId>,
}

impl ClauseTemplate {
    pub fn new(id: u32, literals: Vec<TemplateLiteral>, weight: f64) -> Self {
        Self {
            id,
            literals,
            weight,
            exist_vars: Vec::new(),
        }
    }

    /// The sign of the clause. Positive clauses are violated by falsifying
    /// every literal, negative clauses by satisfying one.
    pub fn is_positive(&self) -> bool {
        self.weight > 0.0
    }

    pub fn is_hard(&self, hard_weight: f64) -> bool {
        self.weight.abs() >= hard_weight
    }

    /// A template with no variables at all; its single grounding is itself.
    pub fn is_ground(&self) -> bool {
        self.literals
            .iter()
            .all(|l| l.terms.iter().all(|t| matches!(t, Term::Const(_))))
    }

    pub fn has_existentials(&self) -> bool {
        !self.exist_vars.is_empty()
    }

    /// Distinct variables in first-occurrence order. Grounding binds them in
    /// this order, which keeps enumeration deterministic.
    pub fn vars(&self) -> Vec<VarId> {
        let mut seen = Vec::new();
        for lit in &self.literals {
            for term in &lit.terms {
                if let Term::Var(v) = term {
                    if !seen.contains(v) {
                        seen.push(*v);
                    }
                }
            }
        }
        seen
    }

    /// Universally quantified variables, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<VarId> {
        self.vars()
            .into_iter()
            .filter(|v| !self.exist_vars.contains(v))
            .collect()
    }

    /// Predicates mentioned by this template, with duplicates removed.
    pub fn predicates(&self) -> Vec<PredId> {
        let mut seen = Vec::new();
        for lit in &self.literals {
            if !seen.contains(&lit.pred) {
                seen.push(lit.pred);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(pred: u32, sense: bool, vars: &[u32]) -> TemplateLiteral {
        TemplateLiteral::new(
            PredId(pred),
            sense,
            vars.iter().map(|&v| Term::Var(VarId(v))),
        )
    }

    #[test]
    fn vars_in_first_occurrence_order() {
        let t = ClauseTemplate::new(0, vec![lit(0, false, &[1, 0]), lit(1, true, &[0, 2])], 1.5);
        assert_eq!(t.vars(), vec![VarId(1), VarId(0), VarId(2)]);
        assert!(t.is_positive());
        assert!(!t.is_hard(2.0));
        assert!(t.is_hard(1.5));
    }

    #[test]
    fn free_vars_exclude_existentials() {
        let mut t = ClauseTemplate::new(0, vec![lit(0, true, &[0, 1])], 1.0);
        t.exist_vars = vec![VarId(1)];
        assert_eq!(t.free_vars(), vec![VarId(0)]);
        assert!(t.has_existentials());
    }
}
