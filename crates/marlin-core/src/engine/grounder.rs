//! Grounding: from the weighted theory and evidence to a compact MRF.
//!
//! The grounder computes the closure of *active* atoms (atoms whose
//! assignment can change the total cost), grounds every clause template into
//! could-be-violated ground clauses, interleaves unit propagation with
//! hard-clause grounding, and consolidates the result. It never enumerates
//! the full Herbrand base: inactive atoms stay at their closed-world default
//! and drop out of clause arrays.

use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};

use marlin_ir::PredId;

use crate::config::InferConfig;
use crate::deadline::Deadline;
use crate::engine::clause::{AtomId, GroundClause, Lit, LitVec};
use crate::engine::errors::InferError;
use crate::engine::mrf::{GroundAtom, Mrf};
use crate::engine::solver::{SolverError, UnitSolver};
use crate::engine::store::GroundStore;
use crate::metrics::Metrics;

/// The grounding result: the MRF plus whether the deadline interrupted the
/// phase (partial tallies are still meaningful).
pub struct GroundingOutcome {
    pub mrf: Mrf,
    pub timed_out: bool,
}

/// Drives the grounding closure against a [`GroundStore`] and a
/// [`UnitSolver`].
pub struct Grounder<'a, S: GroundStore, U: UnitSolver> {
    store: &'a mut S,
    solver: &'a U,
    config: &'a InferConfig,
    metrics: &'a mut Metrics,
    deadline: &'a Deadline,
}

impl<'a, S: GroundStore, U: UnitSolver> Grounder<'a, S, U> {
    pub fn new(
        store: &'a mut S,
        solver: &'a U,
        config: &'a InferConfig,
        metrics: &'a mut Metrics,
        deadline: &'a Deadline,
    ) -> Self {
        Self {
            store,
            solver,
            config,
            metrics,
            deadline,
        }
    }

    /// Runs the whole grounding pipeline and builds the MRF.
    pub fn construct_mrf(&mut self) -> Result<GroundingOutcome, InferError> {
        let soft = self
            .store
            .soft_evidence_atoms(self.config.soft_evidence_threshold);
        self.store.activate(&soft);

        if self.config.mark_all_atoms_active {
            let all = self.store.all_unknown_atoms()?;
            self.store.activate(&all);
        } else {
            self.compute_active_atoms()?;
        }

        let (mut buffer, timed_out) = self.ground_active_clauses()?;
        if !timed_out {
            self.add_soft_evidence_clauses(&mut buffer);
            self.add_key_constraint_clauses(&mut buffer);
        }

        let clauses = consolidate(buffer);
        if clauses.len() > self.config.max_ground_clauses {
            self.metrics.clauses_at_timeout = clauses.len();
            return Err(InferError::GroundingOversize {
                clauses: clauses.len(),
                ceiling: self.config.max_ground_clauses,
            });
        }
        if timed_out {
            self.metrics.clauses_at_timeout = clauses.len();
        }

        let atoms: Vec<GroundAtom> = self
            .store
            .all_active_atoms()
            .into_iter()
            .map(|id| self.ground_atom(id))
            .collect();
        let mrf = Mrf::new(atoms, clauses, self.config.hard_weight)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            atoms = mrf.num_atoms(),
            clauses = mrf.num_clauses(),
            "grounding complete"
        );
        Ok(GroundingOutcome { mrf, timed_out })
    }

    fn ground_atom(&self, id: AtomId) -> GroundAtom {
        let truth = self.store.known_truth(id);
        GroundAtom {
            id,
            truth: truth.unwrap_or(false),
            club: self.store.club(id),
            prior: self.store.prior(id),
            fixed: truth.is_some(),
            active: true,
            n_true: 0,
        }
    }

    /// Fixed-point closure of active atoms. Each round grounds only the
    /// templates that mention a predicate whose active set grew in the
    /// previous round.
    fn compute_active_atoms(&mut self) -> Result<(), InferError> {
        let num_templates = self.store.program().templates.len();
        let mut changed: FxHashSet<PredId> = self
            .store
            .program()
            .predicates
            .iter()
            .map(|p| p.id)
            .collect();

        while !changed.is_empty() {
            let mut changed_now: FxHashSet<PredId> = FxHashSet::default();
            for tidx in 0..num_templates {
                let (positive, worth, fresh) = {
                    let program = self.store.program();
                    let template = &program.templates[tidx];
                    let worth = template.literals.iter().any(|l| {
                        l.sense == template.is_positive()
                            && !program.predicate(l.pred).immutable
                    });
                    let fresh = template.literals.iter().any(|l| changed.contains(&l.pred));
                    (template.is_positive(), worth, fresh)
                };
                if !worth || !fresh {
                    continue;
                }
                let acts = self.store.ground_activation(tidx, positive)?;
                for id in self.store.activate(&acts) {
                    changed_now.insert(self.store.atom_pred(id));
                }
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(grown = changed_now.len(), "activation round");
            changed = changed_now;
            if self.deadline.expired() {
                break;
            }
        }
        Ok(())
    }

    /// Grounds every template into the clause buffer: hard ground clauses
    /// first, then hard templates, then soft, with unit propagation
    /// interleaved between hard templates and one buffer simplification
    /// before the soft expansion begins.
    fn ground_active_clauses(&mut self) -> Result<(Vec<GroundClause>, bool), InferError> {
        let hw = self.config.hard_weight;
        let order = {
            let program = self.store.program();
            let mut order: Vec<usize> = (0..program.templates.len()).collect();
            let rank = |tidx: &usize| {
                let t = &program.templates[*tidx];
                if t.is_hard(hw) {
                    if t.is_ground() {
                        0u8
                    } else {
                        1
                    }
                } else {
                    2
                }
            };
            order.sort_by_key(rank);
            order
        };

        let mut buffer: Vec<GroundClause> = Vec::new();
        let mut hard_units: FxHashSet<Lit> = FxHashSet::default();
        let mut first_soft = true;
        let mut timed_out = false;

        for tidx in order {
            let is_hard = self.store.program().templates[tidx].is_hard(hw);

            if !is_hard && first_soft {
                first_soft = false;
                if self.config.iterative_unit_propagation && !hard_units.is_empty() {
                    buffer = simplify_with_units(buffer, &hard_units, hw)?;
                    self.metrics.units_during_iup = hard_units.len();
                    #[cfg(feature = "tracing")]
                    tracing::info!(units = hard_units.len(), "hard units found during grounding");
                }
            }

            for g in self.store.ground_clauses(tidx)? {
                if let Some(clause) = GroundClause::build(g.lits, g.weight) {
                    buffer.push(clause);
                }
            }
            if buffer.len() > self.config.max_ground_clauses {
                self.metrics.clauses_at_timeout = buffer.len();
                return Err(InferError::GroundingOversize {
                    clauses: buffer.len(),
                    ceiling: self.config.max_ground_clauses,
                });
            }

            if self.config.iterative_unit_propagation && is_hard {
                let t0 = Instant::now();
                match self.solver.units(&buffer, hw) {
                    Ok(units) => {
                        for lit in units {
                            if hard_units.insert(lit) {
                                self.store.set_truth(lit.atom(), lit.is_positive());
                            }
                        }
                    }
                    Err(SolverError::Unsat) => {
                        return Err(InferError::Unsat {
                            clause: "hard clause set ground so far".into(),
                        });
                    }
                    Err(SolverError::Failed(_msg)) => {
                        // Pruning loss only; grounding stays correct.
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %_msg, "unit solver failed, skipping step");
                    }
                }
                self.metrics.unit_solver_ms += t0.elapsed().as_millis() as u64;
            }

            if self.deadline.expired() {
                timed_out = true;
                break;
            }
        }
        self.metrics.units_during_iup = self.metrics.units_during_iup.max(hard_units.len());

        // Write derived truths of hard unit clauses back to the store, so
        // the final atom states reflect them even when propagation was off.
        let forced: Vec<Lit> = buffer
            .iter()
            .filter(|c| c.is_unit() && c.is_hard(hw))
            .map(|c| {
                let l = c.lits[0];
                if c.weight > 0.0 {
                    l
                } else {
                    l.negated()
                }
            })
            .collect();
        for lit in forced {
            self.store.set_truth(lit.atom(), lit.is_positive());
        }

        Ok((buffer, timed_out))
    }

    /// Unit clauses for soft evidence: `{atom}` with weight `ln(p/(1-p))`,
    /// clamped to the hard weight at the extremes.
    fn add_soft_evidence_clauses(&mut self, buffer: &mut Vec<GroundClause>) {
        let hw = self.config.hard_weight;
        for id in self.store.all_active_atoms() {
            let Some(p) = self.store.prior(id) else {
                continue;
            };
            let weight = if p >= 1.0 {
                hw
            } else if p <= 0.0 {
                -hw
            } else {
                (p / (1.0 - p)).ln()
            };
            let mut lits = LitVec::new();
            lits.push(Lit::new(id, true));
            buffer.push(GroundClause { lits, weight });
        }
    }

    /// Hard clauses enforcing declared functional dependencies: for every
    /// pair of active tuples agreeing on the key attributes but differing on
    /// a dependent attribute, `{-a, -b}`. When null labels are disallowed,
    /// one existence clause per key group is added as well.
    fn add_key_constraint_clauses(&mut self, buffer: &mut Vec<GroundClause>) {
        let hw = self.config.hard_weight;
        let preds: Vec<PredId> = self
            .store
            .program()
            .predicates
            .iter()
            .filter(|p| p.has_dependent_attrs())
            .map(|p| p.id)
            .collect();

        for pred in preds {
            let (keys, deps) = {
                let p = self.store.program().predicate(pred);
                (p.key_attrs.clone(), p.dependent_attrs.clone())
            };
            let tuples = self.store.active_tuples(pred);

            for (i, (a, args_a)) in tuples.iter().enumerate() {
                for (b, args_b) in tuples.iter().skip(i + 1) {
                    let same_key = keys.iter().all(|&k| args_a[k] == args_b[k]);
                    let differs = deps.iter().any(|&d| args_a[d] != args_b[d]);
                    if same_key && differs {
                        if let Some(clause) = GroundClause::build(
                            [Lit::new(*a, false), Lit::new(*b, false)],
                            hw,
                        ) {
                            buffer.push(clause);
                        }
                    }
                }
            }

            if !self.config.key_constraint_allows_null_label {
                let mut groups: FxHashMap<Vec<marlin_ir::Constant>, LitVec> = FxHashMap::default();
                for (a, args_a) in &tuples {
                    let key: Vec<marlin_ir::Constant> = keys.iter().map(|&k| args_a[k]).collect();
                    groups.entry(key).or_default().push(Lit::new(*a, true));
                }
                let mut keyed: Vec<_> = groups.into_iter().collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                for (_, lits) in keyed {
                    if let Some(clause) = GroundClause::build(lits, hw) {
                        buffer.push(clause);
                    }
                }
            }
        }
    }
}

/// Simplifies the clause buffer against a set of fixed unit literals: drops
/// clauses the units decide and shortens the rest.
pub fn simplify_with_units(
    buffer: Vec<GroundClause>,
    units: &FxHashSet<Lit>,
    hard_weight: f64,
) -> Result<Vec<GroundClause>, InferError> {
    let mut out = Vec::with_capacity(buffer.len());
    for clause in buffer {
        let satisfied = clause.lits.iter().any(|l| units.contains(l));
        let hard = clause.is_hard(hard_weight);
        if satisfied {
            if clause.weight < 0.0 && hard {
                // A keep-unsatisfied constraint decided the wrong way.
                return Err(InferError::Unsat {
                    clause: clause.render(),
                });
            }
            continue;
        }
        let lits: LitVec = clause
            .lits
            .iter()
            .copied()
            .filter(|l| !units.contains(&l.negated()))
            .collect();
        if lits.is_empty() {
            if clause.weight >= 0.0 && hard {
                return Err(InferError::Unsat {
                    clause: clause.render(),
                });
            }
            // A permanently decided soft clause is a constant cost offset.
            continue;
        }
        out.push(GroundClause {
            lits,
            weight: clause.weight,
        });
    }
    Ok(out)
}

/// Consolidation: group by exact literal multiset, sum weights, rewrite
/// negative-weight units to the canonical positive form, and drop groups
/// whose weight cancelled to zero. Idempotent.
pub fn consolidate(buffer: Vec<GroundClause>) -> Vec<GroundClause> {
    let mut pending = buffer;
    loop {
        let mut groups: FxHashMap<LitVec, f64> = FxHashMap::default();
        for clause in pending {
            *groups.entry(clause.lits).or_insert(0.0) += clause.weight;
        }

        let mut out = Vec::with_capacity(groups.len());
        let mut rewrote = false;
        for (lits, weight) in groups {
            if weight == 0.0 {
                continue;
            }
            if lits.len() == 1 && weight < 0.0 {
                let mut flipped = LitVec::new();
                flipped.push(lits[0].negated());
                out.push(GroundClause {
                    lits: flipped,
                    weight: -weight,
                });
                rewrote = true;
            } else {
                out.push(GroundClause { lits, weight });
            }
        }
        if !rewrote {
            out.sort_by(|a, b| {
                a.lits
                    .cmp(&b.lits)
                    .then(a.weight.partial_cmp(&b.weight).unwrap_or(std::cmp::Ordering::Equal))
            });
            return out;
        }
        pending = out;
    }
}
