//! The program container: domains, predicates, templates, evidence, queries.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::evidence::EvidenceDb;
use crate::predicate::{Domain, Predicate};
use crate::symbols::{Args, Constant, DomainId, PredId, SymbolTable};
use crate::template::{ClauseTemplate, Term, TemplateLiteral};

/// Errors raised by program assembly and validation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("arity mismatch for predicate '{pred}': expected {expected}, got {got}")]
    ArityMismatch {
        pred: String,
        expected: usize,
        got: usize,
    },
    #[error("unknown domain reference {0:?}")]
    UnknownDomain(DomainId),
    #[error("unknown predicate reference {0:?}")]
    UnknownPredicate(PredId),
    #[error("predicate '{pred}': key/dependent attribute index {index} out of range")]
    BadAttrIndex { pred: String, index: usize },
    #[error("template {0} has a non-finite or zero weight")]
    BadWeight(u32),
    #[error("template {template}: variable used with inconsistent domains")]
    InconsistentVarDomain { template: u32 },
    #[error("template {0} has no literals")]
    EmptyTemplate(u32),
}

/// A complete Markov logic network: the weighted theory plus the evidence it
/// is grounded against.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MlnProgram {
    pub symbols: SymbolTable,
    pub domains: Vec<Domain>,
    pub predicates: Vec<Predicate>,
    pub templates: Vec<ClauseTemplate>,
    pub evidence: EvidenceDb,
    pub query_preds: FxHashSet<PredId>,
}

impl MlnProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a domain with the given member constant names.
    pub fn add_domain(&mut self, name: &str, members: &[&str]) -> DomainId {
        let constants: Vec<Constant> = members.iter().map(|m| self.symbols.intern(m)).collect();
        let id = DomainId(self.domains.len() as u32);
        self.domains.push(Domain {
            id,
            name: name.to_string(),
            constants,
        });
        id
    }

    /// Declares a predicate over the given argument domains.
    pub fn add_predicate(&mut self, name: &str, arg_domains: &[DomainId]) -> PredId {
        let id = PredId(self.predicates.len() as u32);
        self.predicates.push(Predicate {
            id,
            name: name.to_string(),
            arg_domains: arg_domains.to_vec(),
            closed_world: true,
            immutable: false,
            completely_specified: false,
            key_attrs: Vec::new(),
            dependent_attrs: Vec::new(),
        });
        id
    }

    /// Adds a weighted clause template and returns its id.
    pub fn add_template(&mut self, literals: Vec<TemplateLiteral>, weight: f64) -> u32 {
        let id = self.templates.len() as u32;
        self.templates.push(ClauseTemplate::new(id, literals, weight));
        id
    }

    /// Marks a predicate as a query predicate (marginals will be reported
    /// for its ground atoms). Query predicates are open-world.
    pub fn mark_query(&mut self, pred: PredId) {
        self.query_preds.insert(pred);
        if let Some(p) = self.predicates.get_mut(pred.0 as usize) {
            p.closed_world = false;
        }
    }

    pub fn predicate(&self, id: PredId) -> &Predicate {
        &self.predicates[id.0 as usize]
    }

    pub fn predicate_mut(&mut self, id: PredId) -> &mut Predicate {
        &mut self.predicates[id.0 as usize]
    }

    pub fn domain(&self, id: DomainId) -> &Domain {
        &self.domains[id.0 as usize]
    }

    pub fn is_query(&self, pred: PredId) -> bool {
        self.query_preds.contains(&pred)
    }

    /// Interns an argument tuple by constant name.
    pub fn args(&mut self, names: &[&str]) -> Args {
        names.iter().map(|n| self.symbols.intern(n)).collect()
    }

    /// The domain each template variable ranges over, derived from the first
    /// literal position that mentions it.
    pub fn var_domains(
        &self,
        template: &ClauseTemplate,
    ) -> Result<Vec<(crate::VarId, DomainId)>, ModelError> {
        let mut out: Vec<(crate::VarId, DomainId)> = Vec::new();
        for lit in &template.literals {
            let pred = self
                .predicates
                .get(lit.pred.0 as usize)
                .ok_or(ModelError::UnknownPredicate(lit.pred))?;
            for (pos, term) in lit.terms.iter().enumerate() {
                if let Term::Var(v) = term {
                    let dom = pred.arg_domains[pos];
                    match out.iter().find(|(ov, _)| ov == v) {
                        None => out.push((*v, dom)),
                        Some((_, od)) if *od == dom => {}
                        Some(_) => {
                            return Err(ModelError::InconsistentVarDomain {
                                template: template.id,
                            })
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Checks referential integrity of the whole program.
    pub fn validate(&self) -> Result<(), ModelError> {
        for pred in &self.predicates {
            for &d in &pred.arg_domains {
                if d.0 as usize >= self.domains.len() {
                    return Err(ModelError::UnknownDomain(d));
                }
            }
            for &i in pred.key_attrs.iter().chain(&pred.dependent_attrs) {
                if i >= pred.arity() {
                    return Err(ModelError::BadAttrIndex {
                        pred: pred.name.clone(),
                        index: i,
                    });
                }
            }
        }
        for template in &self.templates {
            if template.literals.is_empty() {
                return Err(ModelError::EmptyTemplate(template.id));
            }
            if !template.weight.is_finite() || template.weight == 0.0 {
                return Err(ModelError::BadWeight(template.id));
            }
            for lit in &template.literals {
                let pred = self
                    .predicates
                    .get(lit.pred.0 as usize)
                    .ok_or(ModelError::UnknownPredicate(lit.pred))?;
                if lit.terms.len() != pred.arity() {
                    return Err(ModelError::ArityMismatch {
                        pred: pred.name.clone(),
                        expected: pred.arity(),
                        got: lit.terms.len(),
                    });
                }
            }
            self.var_domains(template)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::VarId;

    #[test]
    fn smoke_program_validates() {
        let mut p = MlnProgram::new();
        let people = p.add_domain("person", &["anna", "bob"]);
        let smokes = p.add_predicate("Smokes", &[people]);
        let cancer = p.add_predicate("Cancer", &[people]);
        p.mark_query(cancer);
        p.add_template(
            vec![
                TemplateLiteral::new(smokes, false, [Term::Var(VarId(0))]),
                TemplateLiteral::new(cancer, true, [Term::Var(VarId(0))]),
            ],
            1.5,
        );
        let anna = p.args(&["anna"]);
        p.evidence.observe(smokes, anna, true);
        p.validate().unwrap();
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let mut p = MlnProgram::new();
        let people = p.add_domain("person", &["anna"]);
        let knows = p.add_predicate("Knows", &[people, people]);
        p.add_template(
            vec![TemplateLiteral::new(knows, true, [Term::Var(VarId(0))])],
            1.0,
        );
        assert!(matches!(
            p.validate(),
            Err(ModelError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn zero_weight_is_rejected() {
        let mut p = MlnProgram::new();
        let d = p.add_domain("d", &["a"]);
        let q = p.add_predicate("Q", &[d]);
        p.add_template(
            vec![TemplateLiteral::new(q, true, [Term::Var(VarId(0))])],
            0.0,
        );
        assert!(matches!(p.validate(), Err(ModelError::BadWeight(_))));
    }

    #[test]
    fn inconsistent_var_domain_is_rejected() {
        let mut p = MlnProgram::new();
        let d1 = p.add_domain("d1", &["a"]);
        let d2 = p.add_domain("d2", &["x"]);
        let q = p.add_predicate("Q", &[d1]);
        let r = p.add_predicate("R", &[d2]);
        p.add_template(
            vec![
                TemplateLiteral::new(q, true, [Term::Var(VarId(0))]),
                TemplateLiteral::new(r, true, [Term::Var(VarId(0))]),
            ],
            1.0,
        );
        assert!(matches!(
            p.validate(),
            Err(ModelError::InconsistentVarDomain { .. })
        ));
    }
}
