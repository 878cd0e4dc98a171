//! Law-style properties of the engine components.

use proptest::prelude::*;

use marlin_core::engine::grounder::consolidate;
use marlin_core::engine::mrf::GroundAtom;
use marlin_core::engine::unit_prop::unit_propagate;
use marlin_core::{AtomId, Deadline, GroundClause, Lit, Mrf};

const HARD: f64 = 1e7;
const NUM_ATOMS: i32 = 6;

fn arb_lit() -> impl Strategy<Value = Lit> {
    (1..=NUM_ATOMS, any::<bool>()).prop_map(|(a, pos)| Lit(if pos { a } else { -a }))
}

fn arb_weight() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => -4.0..4.0f64,
        1 => Just(HARD),
        1 => Just(-HARD),
    ]
    .prop_filter("zero weights are invalid", |w| *w != 0.0)
}

fn arb_clause() -> impl Strategy<Value = Option<GroundClause>> {
    (proptest::collection::vec(arb_lit(), 1..4), arb_weight())
        .prop_map(|(lits, weight)| GroundClause::build(lits, weight))
}

fn arb_clauses() -> impl Strategy<Value = Vec<GroundClause>> {
    proptest::collection::vec(arb_clause(), 0..12)
        .prop_map(|cs| cs.into_iter().flatten().collect())
}

fn mrf_of(clauses: Vec<GroundClause>) -> Mrf {
    let atoms = (1..=NUM_ATOMS)
        .map(|i| GroundAtom::unknown(AtomId(i)))
        .collect();
    Mrf::new(atoms, clauses, HARD).unwrap()
}

proptest! {
    /// Applying the unit propagator twice yields the same MRF as once.
    #[test]
    fn unit_propagation_is_idempotent(clauses in arb_clauses()) {
        let deadline = Deadline::unlimited();
        let Ok(once) = unit_propagate(mrf_of(clauses), &deadline) else {
            // A hard contradiction is a legal outcome; idempotence only
            // applies to successful runs.
            return Ok(());
        };
        let again = unit_propagate(once.mrf.clone(), &deadline).unwrap();
        prop_assert!(again.pinned.is_empty());
        prop_assert_eq!(once.mrf.clauses(), again.mrf.clauses());
        prop_assert_eq!(once.mrf.atom_ids(), again.mrf.atom_ids());
    }

    /// Consolidation is idempotent.
    #[test]
    fn consolidation_is_idempotent(clauses in arb_clauses()) {
        let once = consolidate(clauses);
        let twice = consolidate(once.clone());
        prop_assert_eq!(once, twice);
    }

    /// After consolidation every clause is canonical: sorted unique literals,
    /// no tautologies, no negative-weight units, no zero weights.
    #[test]
    fn consolidation_canonicalizes(clauses in arb_clauses()) {
        for clause in consolidate(clauses) {
            prop_assert!(!clause.lits.is_empty());
            prop_assert!(clause.weight != 0.0);
            for pair in clause.lits.windows(2) {
                prop_assert!(pair[0].atom() < pair[1].atom());
            }
            if clause.lits.len() == 1 {
                prop_assert!(clause.weight > 0.0);
            }
        }
    }

    /// Flipping an atom twice restores the assignment and the cost exactly.
    #[test]
    fn flip_round_trip(clauses in arb_clauses(), atom in 1..=NUM_ATOMS) {
        let mut mrf = mrf_of(clauses);
        mrf.recount();
        let cost = mrf.cost();
        let assignment = mrf.assignment();
        mrf.flip(AtomId(atom));
        mrf.flip(AtomId(atom));
        prop_assert_eq!(mrf.assignment(), assignment);
        prop_assert!((mrf.cost() - cost).abs() < 1e-9);
    }

    /// The incrementally maintained cost equals the from-scratch recount
    /// after any flip sequence.
    #[test]
    fn incremental_cost_is_exact(
        clauses in arb_clauses(),
        flips in proptest::collection::vec(1..=NUM_ATOMS, 0..24),
    ) {
        let mut mrf = mrf_of(clauses);
        mrf.recount();
        for atom in flips {
            let predicted = mrf.cost() + mrf.delta_cost(AtomId(atom));
            mrf.flip(AtomId(atom));
            prop_assert!((mrf.cost() - predicted).abs() < 1e-6);
            prop_assert!((mrf.cost() - mrf.cost_recomputed()).abs() < 1e-6);
        }
    }

    /// After unit propagation no hard unit clause survives and no surviving
    /// clause references a pinned atom.
    #[test]
    fn unit_propagation_postconditions(clauses in arb_clauses()) {
        let deadline = Deadline::unlimited();
        let Ok(out) = unit_propagate(mrf_of(clauses), &deadline) else {
            return Ok(());
        };
        for clause in out.mrf.clauses() {
            prop_assert!(!(clause.is_unit() && clause.is_hard(HARD)));
            for lit in &clause.lits {
                prop_assert!(!out.pinned.contains_key(&lit.atom()));
            }
        }
    }
}
