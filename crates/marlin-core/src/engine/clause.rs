//! Ground literals and weighted ground clauses.

use smallvec::SmallVec;

/// A unique identifier for a ground atom. Ids are 1-based and positive; the
/// value 0 is reserved so a literal can carry polarity in its sign.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtomId(pub i32);

/// A signed ground literal: a non-zero `i32` whose magnitude is the atom id
/// and whose sign is the polarity.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lit(pub i32);

/// Sentinel magnitude used while aggregating existentially quantified
/// groundings: a literal already satisfied by evidence is recorded as
/// `±SAT_SENTINEL` and any grounding containing it is discarded.
pub const SAT_SENTINEL: i32 = 999_999_999;

impl Lit {
    pub fn new(atom: AtomId, positive: bool) -> Self {
        Lit(if positive { atom.0 } else { -atom.0 })
    }

    pub fn atom(self) -> AtomId {
        AtomId(self.0.abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn negated(self) -> Lit {
        Lit(-self.0)
    }

    /// Whether the literal holds under the given truth value of its atom.
    pub fn holds(self, truth: bool) -> bool {
        self.is_positive() == truth
    }
}

/// The literal array of a clause. Most ground clauses are short.
pub type LitVec = SmallVec<[Lit; 4]>;

/// A weighted ground clause.
///
/// Invariants (enforced by [`GroundClause::build`]):
/// - `lits` is non-empty, strictly sorted by `|lit|`, and duplicate-free;
/// - no `x` and `-x` co-occur (tautologies are dropped at construction);
/// - a unit clause `{-x}` with positive weight is the canonical form of
///   `{x}` with negative weight (the rewrite happens in consolidation).
///
/// A clause with `weight > 0` costs `|weight|` while unsatisfied; a clause
/// with `weight < 0` costs `|weight|` while satisfied.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroundClause {
    pub lits: LitVec,
    pub weight: f64,
}

impl GroundClause {
    /// Normalizes a literal multiset into a clause: sorts by magnitude and
    /// removes duplicates. Returns `None` for an empty multiset or a
    /// tautology (`x` and `-x` both present).
    pub fn build(lits: impl IntoIterator<Item = Lit>, weight: f64) -> Option<Self> {
        let mut lits: LitVec = lits.into_iter().collect();
        lits.sort_unstable_by_key(|l| (l.0.abs(), l.0));
        lits.dedup();
        if lits.is_empty() {
            return None;
        }
        for pair in lits.windows(2) {
            if pair[0].atom() == pair[1].atom() {
                return None;
            }
        }
        Some(Self { lits, weight })
    }

    pub fn is_unit(&self) -> bool {
        self.lits.len() == 1
    }

    pub fn is_hard(&self, hard_weight: f64) -> bool {
        self.weight.abs() >= hard_weight
    }

    /// The literal of `atom` in this clause, if any.
    pub fn lit_for(&self, atom: AtomId) -> Option<Lit> {
        self.lits
            .binary_search_by_key(&atom.0, |l| l.0.abs())
            .ok()
            .map(|i| self.lits[i])
    }

    pub fn contains(&self, lit: Lit) -> bool {
        self.lit_for(lit.atom()) == Some(lit)
    }

    /// Number of literals satisfied under the given assignment.
    pub fn count_satisfied(&self, truth: impl Fn(AtomId) -> bool) -> u32 {
        self.lits
            .iter()
            .filter(|l| l.holds(truth(l.atom())))
            .count() as u32
    }

    /// Cost contribution of this clause given its satisfied-literal count.
    pub fn cost_at(&self, n_sat: u32) -> f64 {
        if self.weight >= 0.0 {
            if n_sat == 0 {
                self.weight
            } else {
                0.0
            }
        } else if n_sat > 0 {
            -self.weight
        } else {
            0.0
        }
    }

    /// Human-readable form for diagnostics, e.g. `[1, -4 | w=2.5]`.
    pub fn render(&self) -> String {
        let lits: Vec<String> = self.lits.iter().map(|l| l.0.to_string()).collect();
        format!("[{} | w={}]", lits.join(", "), self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_sorts_and_dedups() {
        let c = GroundClause::build([Lit(3), Lit(-1), Lit(3)], 1.0).unwrap();
        assert_eq!(c.lits.as_slice(), &[Lit(-1), Lit(3)]);
        assert!(c.contains(Lit(-1)));
        assert!(!c.contains(Lit(1)));
        assert_eq!(c.lit_for(AtomId(3)), Some(Lit(3)));
    }

    #[test]
    fn tautology_is_dropped() {
        assert!(GroundClause::build([Lit(2), Lit(-2)], 1.0).is_none());
        assert!(GroundClause::build([], 1.0).is_none());
    }

    #[test]
    fn cost_convention() {
        let pos = GroundClause::build([Lit(1)], 2.0).unwrap();
        assert_eq!(pos.cost_at(0), 2.0);
        assert_eq!(pos.cost_at(1), 0.0);
        let neg = GroundClause::build([Lit(1), Lit(2)], -3.0).unwrap();
        assert_eq!(neg.cost_at(0), 0.0);
        assert_eq!(neg.cost_at(1), 3.0);
        assert_eq!(neg.cost_at(2), 3.0);
    }

    #[test]
    fn count_satisfied_matches_assignment() {
        let c = GroundClause::build([Lit(1), Lit(-2)], 1.0).unwrap();
        assert_eq!(c.count_satisfied(|a| a == AtomId(1)), 2);
        assert_eq!(c.count_satisfied(|a| a == AtomId(2)), 0);
    }
}
