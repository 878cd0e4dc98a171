//! The in-memory Markov random field.
//!
//! A [`Mrf`] owns its ground atoms and weighted ground clauses exclusively.
//! The atom-to-clause incidence is packed as offset ranges into one flat
//! array, built once after construction, so a flip touches a contiguous run
//! of entries. Sampler scratch state lives here as well: per-clause
//! satisfied-literal counters, the set of currently cost-bearing clauses,
//! and the running cost with its best/worst bounds.

use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHashMap;

use marlin_ir::Club;

use crate::engine::clause::{AtomId, GroundClause, Lit};
use crate::engine::errors::InferError;

/// A ground atom with its current assignment and sampling scratch.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroundAtom {
    pub id: AtomId,
    /// Current truth value under the sampler's assignment.
    pub truth: bool,
    pub club: Club,
    /// Soft-evidence prior probability, if any.
    pub prior: Option<f64>,
    /// Fixed atoms (input evidence or truth derived during grounding) are
    /// never flipped.
    pub fixed: bool,
    /// Membership in the grounding closure.
    pub active: bool,
    /// Number of samples in which this atom was true.
    pub n_true: u64,
}

impl GroundAtom {
    pub fn unknown(id: AtomId) -> Self {
        Self {
            id,
            truth: false,
            club: Club::Unknown,
            prior: None,
            fixed: false,
            active: true,
            n_true: 0,
        }
    }
}

/// Atom-to-clause incidence packed as offset ranges into a flat entry array.
/// Each entry carries the clause index and the exact literal of the atom in
/// that clause, so a flip never searches the clause's literal array.
#[derive(Debug, Clone, Default)]
struct Incidence {
    ranges: FxHashMap<AtomId, (u32, u32)>,
    entries: Vec<(u32, Lit)>,
}

impl Incidence {
    fn build(clauses: &[GroundClause]) -> Self {
        let mut per_atom: FxHashMap<AtomId, Vec<(u32, Lit)>> = FxHashMap::default();
        for (idx, clause) in clauses.iter().enumerate() {
            for &lit in &clause.lits {
                per_atom.entry(lit.atom()).or_default().push((idx as u32, lit));
            }
        }

        // Flatten in sorted atom order for determinism.
        let mut atom_ids: Vec<AtomId> = per_atom.keys().copied().collect();
        atom_ids.sort_unstable();

        let mut entries = Vec::new();
        let mut ranges = FxHashMap::default();
        for atom in atom_ids {
            let list = &per_atom[&atom];
            let start = entries.len() as u32;
            entries.extend_from_slice(list);
            ranges.insert(atom, (start, entries.len() as u32));
        }
        Self { ranges, entries }
    }

    fn of(&self, atom: AtomId) -> &[(u32, Lit)] {
        match self.ranges.get(&atom) {
            Some(&(start, end)) => &self.entries[start as usize..end as usize],
            None => &[],
        }
    }
}

/// Set of clause indices currently in violation (bearing cost), with O(1)
/// insert, remove, and uniform pick.
#[derive(Debug, Clone, Default)]
struct ViolatedSet {
    stack: Vec<u32>,
    pos: Vec<u32>,
}

const NOT_PRESENT: u32 = u32::MAX;

impl ViolatedSet {
    fn reset(&mut self, num_clauses: usize) {
        self.stack.clear();
        self.pos.clear();
        self.pos.resize(num_clauses, NOT_PRESENT);
    }

    fn insert(&mut self, clause: u32) {
        if self.pos[clause as usize] == NOT_PRESENT {
            self.pos[clause as usize] = self.stack.len() as u32;
            self.stack.push(clause);
        }
    }

    fn remove(&mut self, clause: u32) {
        let at = self.pos[clause as usize];
        if at == NOT_PRESENT {
            return;
        }
        let last = self.stack.len() as u32 - 1;
        self.stack.swap_remove(at as usize);
        if at != last {
            let moved = self.stack[at as usize];
            self.pos[moved as usize] = at;
        }
        self.pos[clause as usize] = NOT_PRESENT;
    }

    fn len(&self) -> usize {
        self.stack.len()
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn pick(&self, rng: &mut StdRng) -> Option<u32> {
        if self.stack.is_empty() {
            None
        } else {
            Some(self.stack[rng.gen_range(0..self.stack.len())])
        }
    }
}

/// The Markov random field: atoms, clauses, incidence, and assignment state.
#[derive(Debug, Clone)]
pub struct Mrf {
    atoms: FxHashMap<AtomId, GroundAtom>,
    /// Atom ids in ascending order; the deterministic iteration order.
    atom_order: Vec<AtomId>,
    clauses: Vec<GroundClause>,
    incidence: Incidence,
    n_sat: Vec<u32>,
    violated: ViolatedSet,
    cost: f64,
    /// Lowest cost seen over the lifetime of this MRF.
    pub low_cost: f64,
    /// Highest cost seen over the lifetime of this MRF.
    pub high_cost: f64,
    hard_weight: f64,
}

impl Mrf {
    /// Builds an MRF and its incidence. Fails if a clause references an atom
    /// that was not supplied.
    pub fn new(
        atoms: Vec<GroundAtom>,
        clauses: Vec<GroundClause>,
        hard_weight: f64,
    ) -> Result<Self, InferError> {
        let mut map = FxHashMap::default();
        let mut atom_order = Vec::with_capacity(atoms.len());
        for atom in atoms {
            atom_order.push(atom.id);
            map.insert(atom.id, atom);
        }
        atom_order.sort_unstable();

        for clause in &clauses {
            for lit in &clause.lits {
                if !map.contains_key(&lit.atom()) {
                    return Err(InferError::Internal(format!(
                        "clause {} references unknown atom {}",
                        clause.render(),
                        lit.atom().0
                    )));
                }
            }
        }

        let incidence = Incidence::build(&clauses);
        let mut mrf = Self {
            atoms: map,
            atom_order,
            clauses,
            incidence,
            n_sat: Vec::new(),
            violated: ViolatedSet::default(),
            cost: 0.0,
            low_cost: f64::INFINITY,
            high_cost: f64::NEG_INFINITY,
            hard_weight,
        };
        mrf.recount();
        Ok(mrf)
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn hard_weight(&self) -> f64 {
        self.hard_weight
    }

    pub fn clauses(&self) -> &[GroundClause] {
        &self.clauses
    }

    pub fn atom(&self, id: AtomId) -> Option<&GroundAtom> {
        self.atoms.get(&id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut GroundAtom> {
        self.atoms.get_mut(&id)
    }

    /// Atoms in ascending id order.
    pub fn atoms(&self) -> impl Iterator<Item = &GroundAtom> + '_ {
        self.atom_order.iter().map(move |id| &self.atoms[id])
    }

    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_order
    }

    /// Clause indices incident to an atom, each paired with the atom's
    /// literal in that clause.
    pub fn incidence_of(&self, atom: AtomId) -> &[(u32, Lit)] {
        self.incidence.of(atom)
    }

    /// Non-fixed atoms, in ascending id order.
    pub fn flippable_atoms(&self) -> Vec<AtomId> {
        self.atom_order
            .iter()
            .copied()
            .filter(|id| !self.atoms[id].fixed)
            .collect()
    }

    /// Count of hard unit clauses, as reported in the run summary.
    pub fn count_hard_units(&self) -> usize {
        self.clauses
            .iter()
            .filter(|c| c.is_unit() && c.is_hard(self.hard_weight))
            .count()
    }

    // ------------------------------------------------------------------
    // Assignment state
    // ------------------------------------------------------------------

    /// Sets an atom's truth without updating counters; callers must
    /// `recount` before relying on costs again.
    pub fn set_truth_raw(&mut self, atom: AtomId, truth: bool) {
        if let Some(a) = self.atoms.get_mut(&atom) {
            a.truth = truth;
        }
    }

    /// Draws a fresh random assignment for every non-fixed atom. Does not
    /// recount.
    pub fn randomize(&mut self, rng: &mut StdRng) {
        for id in &self.atom_order {
            let atom = self.atoms.get_mut(id).expect("atom_order is in sync");
            if !atom.fixed {
                atom.truth = rng.gen_bool(0.5);
            }
        }
    }

    /// Snapshot of the current assignment, in ascending atom order.
    pub fn assignment(&self) -> Vec<(AtomId, bool)> {
        self.atom_order
            .iter()
            .map(|id| (*id, self.atoms[id].truth))
            .collect()
    }

    /// Restores a previously captured assignment and recounts.
    pub fn apply_assignment(&mut self, assignment: &[(AtomId, bool)]) {
        for &(id, truth) in assignment {
            self.set_truth_raw(id, truth);
        }
        self.recount();
    }

    /// Copies the assignment of `other` (same atom ids) and recounts.
    pub fn copy_assignment_from(&mut self, other: &Mrf) {
        for id in other.atom_order.iter() {
            let truth = other.atoms[id].truth;
            self.set_truth_raw(*id, truth);
        }
        self.recount();
    }

    /// Recomputes per-clause satisfied counts, the violated set, and the
    /// running cost from the current assignment.
    pub fn recount(&mut self) {
        self.n_sat.clear();
        self.n_sat.reserve(self.clauses.len());
        self.violated.reset(self.clauses.len());
        let mut cost = 0.0;
        for (idx, clause) in self.clauses.iter().enumerate() {
            let n = clause.count_satisfied(|a| self.atoms[&a].truth);
            self.n_sat.push(n);
            let c = clause.cost_at(n);
            if c > 0.0 {
                self.violated.insert(idx as u32);
            }
            cost += c;
        }
        self.cost = cost;
        self.note_cost();
    }

    fn note_cost(&mut self) {
        if self.cost < self.low_cost {
            self.low_cost = self.cost;
        }
        if self.cost > self.high_cost {
            self.high_cost = self.cost;
        }
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Recomputes the total cost from scratch without touching state; used
    /// to check the incremental bookkeeping.
    pub fn cost_recomputed(&self) -> f64 {
        self.clauses
            .iter()
            .map(|c| c.cost_at(c.count_satisfied(|a| self.atoms[&a].truth)))
            .sum()
    }

    pub fn has_violations(&self) -> bool {
        !self.violated.is_empty()
    }

    pub fn violated_count(&self) -> usize {
        self.violated.len()
    }

    /// Picks a cost-bearing clause uniformly at random.
    pub fn pick_violated(&self, rng: &mut StdRng) -> Option<u32> {
        self.violated.pick(rng)
    }

    pub fn n_sat(&self, clause: u32) -> u32 {
        self.n_sat[clause as usize]
    }

    // ------------------------------------------------------------------
    // Flips
    // ------------------------------------------------------------------

    /// Cost change from flipping `atom`, in O(incidence).
    pub fn delta_cost(&self, atom: AtomId) -> f64 {
        let Some(a) = self.atoms.get(&atom) else {
            return 0.0;
        };
        let new_truth = !a.truth;
        let mut delta = 0.0;
        for &(cidx, lit) in self.incidence.of(atom) {
            let clause = &self.clauses[cidx as usize];
            let was = self.n_sat[cidx as usize];
            let now = if lit.holds(new_truth) { was + 1 } else { was - 1 };
            delta += clause.cost_at(now) - clause.cost_at(was);
        }
        delta
    }

    /// Flips `atom`, updating satisfied counts, the violated set, and the
    /// running cost incrementally.
    pub fn flip(&mut self, atom: AtomId) {
        let new_truth = {
            let Some(a) = self.atoms.get_mut(&atom) else {
                return;
            };
            a.truth = !a.truth;
            a.truth
        };
        let (start, end) = match self.incidence.ranges.get(&atom) {
            Some(&r) => r,
            None => return,
        };
        for i in start..end {
            let (cidx, lit) = self.incidence.entries[i as usize];
            let was = self.n_sat[cidx as usize];
            let now = if lit.holds(new_truth) { was + 1 } else { was - 1 };
            self.n_sat[cidx as usize] = now;
            let clause = &self.clauses[cidx as usize];
            let cost_was = clause.cost_at(was);
            let cost_now = clause.cost_at(now);
            if cost_was <= 0.0 && cost_now > 0.0 {
                self.violated.insert(cidx);
            } else if cost_was > 0.0 && cost_now <= 0.0 {
                self.violated.remove(cidx);
            }
            self.cost += cost_now - cost_was;
        }
        self.note_cost();
    }

    // ------------------------------------------------------------------
    // MC-SAT support
    // ------------------------------------------------------------------

    /// Builds the SampleSAT sub-problem over the selected clauses: same atoms
    /// and current assignment, each selected clause promoted to a hard
    /// constraint of its own sign.
    pub fn sub_mrf(&self, selected: &[u32]) -> Result<Mrf, InferError> {
        let atoms: Vec<GroundAtom> = self.atoms().cloned().collect();
        let clauses: Vec<GroundClause> = selected
            .iter()
            .map(|&idx| {
                let c = &self.clauses[idx as usize];
                GroundClause {
                    lits: c.lits.clone(),
                    weight: if c.weight >= 0.0 {
                        self.hard_weight
                    } else {
                        -self.hard_weight
                    },
                }
            })
            .collect();
        Mrf::new(atoms, clauses, self.hard_weight)
    }

    /// Adds the current truth of every non-fixed atom to its sample tally.
    pub fn tally_sample(&mut self) {
        for id in &self.atom_order {
            let atom = self.atoms.get_mut(id).expect("atom_order is in sync");
            if !atom.fixed && atom.truth {
                atom.n_true += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn mrf_of(clauses: Vec<GroundClause>, num_atoms: i32) -> Mrf {
        let atoms = (1..=num_atoms)
            .map(|i| GroundAtom::unknown(AtomId(i)))
            .collect();
        Mrf::new(atoms, clauses, 1e7).unwrap()
    }

    #[test]
    fn incidence_is_inverse_of_lits() {
        let mrf = mrf_of(
            vec![
                GroundClause::build([Lit(1), Lit(-2)], 1.0).unwrap(),
                GroundClause::build([Lit(2), Lit(3)], 2.0).unwrap(),
            ],
            3,
        );
        for (idx, clause) in mrf.clauses().iter().enumerate() {
            for &lit in &clause.lits {
                assert!(mrf
                    .incidence_of(lit.atom())
                    .iter()
                    .any(|&(c, l)| c == idx as u32 && l == lit));
            }
        }
        for &id in mrf.atom_ids() {
            for &(cidx, lit) in mrf.incidence_of(id) {
                assert_eq!(lit.atom(), id);
                assert!(mrf.clauses()[cidx as usize].contains(lit));
            }
        }
    }

    #[test]
    fn unknown_atom_in_clause_is_rejected() {
        let atoms = vec![GroundAtom::unknown(AtomId(1))];
        let clauses = vec![GroundClause::build([Lit(1), Lit(2)], 1.0).unwrap()];
        assert!(Mrf::new(atoms, clauses, 1e7).is_err());
    }

    #[test]
    fn incremental_cost_matches_recount() {
        let mut mrf = mrf_of(
            vec![
                GroundClause::build([Lit(1), Lit(2)], 1.5).unwrap(),
                GroundClause::build([Lit(-1), Lit(-2)], 2.5).unwrap(),
                GroundClause::build([Lit(1), Lit(-3)], -0.5).unwrap(),
            ],
            3,
        );
        let mut rng = StdRng::seed_from_u64(7);
        mrf.randomize(&mut rng);
        mrf.recount();
        for &atom in &[AtomId(1), AtomId(2), AtomId(3), AtomId(2), AtomId(1)] {
            let predicted = mrf.cost() + mrf.delta_cost(atom);
            mrf.flip(atom);
            assert!((mrf.cost() - predicted).abs() < 1e-9);
            assert!((mrf.cost() - mrf.cost_recomputed()).abs() < 1e-9);
        }
    }

    #[test]
    fn flip_round_trip_restores_cost() {
        let mut mrf = mrf_of(
            vec![
                GroundClause::build([Lit(1), Lit(2)], 1.0).unwrap(),
                GroundClause::build([Lit(-2), Lit(3)], -2.0).unwrap(),
            ],
            3,
        );
        mrf.recount();
        let before_cost = mrf.cost();
        let before = mrf.assignment();
        mrf.flip(AtomId(2));
        mrf.flip(AtomId(2));
        assert_eq!(mrf.assignment(), before);
        assert!((mrf.cost() - before_cost).abs() < 1e-12);
    }

    #[test]
    fn fixed_atoms_are_not_randomized() {
        let mut atoms: Vec<GroundAtom> = (1..=2).map(|i| GroundAtom::unknown(AtomId(i))).collect();
        atoms[0].fixed = true;
        atoms[0].truth = true;
        let mut mrf = Mrf::new(atoms, vec![], 1e7).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..16 {
            mrf.randomize(&mut rng);
            assert!(mrf.atom(AtomId(1)).unwrap().truth);
        }
        assert_eq!(mrf.flippable_atoms(), vec![AtomId(2)]);
    }

    #[test]
    fn violated_set_tracks_cost_bearing_clauses() {
        let mut mrf = mrf_of(vec![GroundClause::build([Lit(1)], 2.0).unwrap()], 1);
        // atom 1 initialized false: positive unit clause violated
        mrf.recount();
        assert_eq!(mrf.violated_count(), 1);
        mrf.flip(AtomId(1));
        assert_eq!(mrf.violated_count(), 0);
        assert_eq!(mrf.cost(), 0.0);
        assert_eq!(mrf.low_cost, 0.0);
        assert_eq!(mrf.high_cost, 2.0);
    }
}
