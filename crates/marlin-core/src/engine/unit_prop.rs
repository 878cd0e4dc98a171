//! Post-grounding unit propagation on the MRF.
//!
//! Eliminates hard unit clauses and forced atoms to a fixed point: pinned
//! atoms leave the MRF (their values are recorded for the final output),
//! satisfied clauses are dropped, and falsified literals are removed from the
//! clauses that survive. Applying the pass twice yields the same MRF as
//! applying it once.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::deadline::Deadline;
use crate::engine::clause::{AtomId, GroundClause, Lit, LitVec};
use crate::engine::errors::InferError;
use crate::engine::mrf::{GroundAtom, Mrf};

/// The simplification result.
pub struct UnitPropOutcome {
    /// The surviving MRF: only un-pinned atoms and undecided clauses.
    pub mrf: Mrf,
    /// Atoms eliminated by propagation, with their forced values.
    pub pinned: FxHashMap<AtomId, bool>,
    /// Constant cost contributed by soft clauses the propagation decided.
    pub dropped_cost: f64,
}

/// The literal a hard unit clause forces: the clause's literal itself for a
/// positive weight, its negation for a keep-unsatisfied clause.
fn forced_lit(clause: &GroundClause) -> Lit {
    let l = clause.lits[0];
    if clause.weight >= 0.0 {
        l
    } else {
        l.negated()
    }
}

/// Runs unit propagation to a fixed point. Fails with
/// [`InferError::Unsat`] on a hard contradiction.
pub fn unit_propagate(mrf: Mrf, deadline: &Deadline) -> Result<UnitPropOutcome, InferError> {
    let hard_weight = mrf.hard_weight();
    let mut clauses: Vec<Option<GroundClause>> = mrf.clauses().iter().cloned().map(Some).collect();
    let mut dropped_cost = 0.0;

    // Local incidence; the MRF's own index is not reusable once clauses
    // start shrinking.
    let mut incidence: FxHashMap<AtomId, Vec<usize>> = FxHashMap::default();
    for (idx, slot) in clauses.iter().enumerate() {
        if let Some(clause) = slot {
            for lit in &clause.lits {
                incidence.entry(lit.atom()).or_default().push(idx);
            }
        }
    }

    let mut queue: VecDeque<Lit> = VecDeque::new();

    // Seed: already-fixed atoms, hard unit clauses, and hard keep-unsatisfied
    // clauses (every literal of the latter is forced false).
    for atom in mrf.atoms() {
        if atom.fixed {
            queue.push_back(Lit::new(atom.id, atom.truth));
        }
    }
    for slot in clauses.iter_mut() {
        let Some(clause) = slot else { continue };
        if !clause.is_hard(hard_weight) {
            continue;
        }
        if clause.weight < 0.0 {
            for &lit in &clause.lits {
                queue.push_back(lit.negated());
            }
            *slot = None;
        } else if clause.is_unit() {
            queue.push_back(forced_lit(clause));
            *slot = None;
        }
    }

    let mut pinned: FxHashMap<AtomId, bool> = FxHashMap::default();

    // On deadline expiry the queued literals are still drained (every pinned
    // atom must have its incidence cleaned up), but no new units are
    // discovered.
    let mut stop_discovery = false;

    while let Some(lit) = queue.pop_front() {
        if !stop_discovery && deadline.expired() {
            stop_discovery = true;
        }
        let atom = lit.atom();
        let value = lit.is_positive();
        if let Some(&existing) = pinned.get(&atom) {
            if existing != value {
                return Err(InferError::Unsat {
                    clause: format!("[{} | unit]", lit.0),
                });
            }
            continue;
        }
        pinned.insert(atom, value);

        let Some(touched) = incidence.get(&atom) else {
            continue;
        };
        for &idx in touched {
            let Some(clause) = &mut clauses[idx] else {
                continue;
            };
            let hard = clause.is_hard(hard_weight);
            if clause.contains(lit) {
                // Clause satisfied by the pinned literal.
                if clause.weight < 0.0 {
                    if hard {
                        return Err(InferError::Unsat {
                            clause: clause.render(),
                        });
                    }
                    dropped_cost += -clause.weight;
                }
                clauses[idx] = None;
                continue;
            }
            // The clause contains the negation: shorten it.
            let shortened: LitVec = clause
                .lits
                .iter()
                .copied()
                .filter(|l| l.atom() != atom)
                .collect();
            if shortened.is_empty() {
                if clause.weight >= 0.0 {
                    if hard {
                        return Err(InferError::Unsat {
                            clause: clause.render(),
                        });
                    }
                    dropped_cost += clause.weight;
                }
                clauses[idx] = None;
                continue;
            }
            clause.lits = shortened;
            if clause.is_unit() && hard && !stop_discovery {
                queue.push_back(forced_lit(clause));
                clauses[idx] = None;
            }
        }
    }

    let survivors: Vec<GroundClause> = clauses.into_iter().flatten().collect();
    let atoms: Vec<GroundAtom> = mrf
        .atoms()
        .filter(|a| !pinned.contains_key(&a.id))
        .cloned()
        .collect();
    let mrf = Mrf::new(atoms, survivors, hard_weight)?;
    Ok(UnitPropOutcome {
        mrf,
        pinned,
        dropped_cost,
    })
}
