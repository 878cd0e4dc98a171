//! The evidence database: ground tuples with fixed truth, soft priors, and
//! query membership.

use rustc_hash::FxHashMap;

use crate::symbols::{Args, PredId};

/// The role of a ground tuple in the input.
///
/// The numeric order matters: values below `Evidence` have unknown truth and
/// may be flipped by the samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Club {
    /// Not evidence and not queried; unknown truth.
    Unknown = 0,
    /// A query tuple; unknown truth, marginal to be inferred.
    Query = 1,
    /// Fixed evidence.
    Evidence = 2,
    /// A query tuple with known training truth.
    QueryEvidence = 3,
}

impl Club {
    /// Whether the tuple's truth is fixed by the input.
    pub fn is_fixed(self) -> bool {
        matches!(self, Club::Evidence | Club::QueryEvidence)
    }
}

/// A single evidence observation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvidenceTuple {
    pub args: Args,
    /// Fixed truth value; `None` for soft evidence and bare query tuples.
    pub truth: Option<bool>,
    /// Soft-evidence prior probability, `None` if none.
    pub prior: Option<f64>,
    pub club: Club,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct PredEvidence {
    /// Tuples in observation order; iteration over this vector is the
    /// deterministic order of the store.
    tuples: Vec<EvidenceTuple>,
    index: FxHashMap<Args, usize>,
}

/// Per-predicate store of observed tuples.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvidenceDb {
    by_pred: FxHashMap<PredId, PredEvidence>,
}

impl EvidenceDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hard evidence observation. A repeated observation of the
    /// same tuple overwrites the previous one.
    pub fn observe(&mut self, pred: PredId, args: Args, truth: bool) {
        self.insert(
            pred,
            EvidenceTuple {
                args,
                truth: Some(truth),
                prior: None,
                club: Club::Evidence,
            },
        );
    }

    /// Records a soft evidence observation with prior probability `p`.
    pub fn observe_soft(&mut self, pred: PredId, args: Args, prior: f64) {
        self.insert(
            pred,
            EvidenceTuple {
                args,
                truth: None,
                prior: Some(prior),
                club: Club::Unknown,
            },
        );
    }

    /// Records a query tuple with known training truth.
    pub fn observe_query_evidence(&mut self, pred: PredId, args: Args, truth: bool) {
        self.insert(
            pred,
            EvidenceTuple {
                args,
                truth: Some(truth),
                prior: None,
                club: Club::QueryEvidence,
            },
        );
    }

    fn insert(&mut self, pred: PredId, tuple: EvidenceTuple) {
        let slot = self.by_pred.entry(pred).or_default();
        if let Some(&i) = slot.index.get(&tuple.args) {
            slot.tuples[i] = tuple;
        } else {
            slot.index.insert(tuple.args.clone(), slot.tuples.len());
            slot.tuples.push(tuple);
        }
    }

    pub fn get(&self, pred: PredId, args: &Args) -> Option<&EvidenceTuple> {
        let slot = self.by_pred.get(&pred)?;
        slot.index.get(args).map(|&i| &slot.tuples[i])
    }

    /// All observed tuples of a predicate, in observation order.
    pub fn tuples(&self, pred: PredId) -> &[EvidenceTuple] {
        self.by_pred
            .get(&pred)
            .map(|s| s.tuples.as_slice())
            .unwrap_or(&[])
    }

    /// Whether any tuple of `pred` carries a soft prior.
    pub fn has_soft_evidence(&self, pred: PredId) -> bool {
        self.tuples(pred).iter().any(|t| t.prior.is_some())
    }

    pub fn num_tuples(&self) -> usize {
        self.by_pred.values().map(|s| s.tuples.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn observe_and_lookup() {
        let mut db = EvidenceDb::new();
        let p = PredId(0);
        let args: Args = smallvec![crate::Constant(1), crate::Constant(2)];
        db.observe(p, args.clone(), true);
        let t = db.get(p, &args).unwrap();
        assert_eq!(t.truth, Some(true));
        assert_eq!(t.club, Club::Evidence);
        assert!(t.club.is_fixed());
        assert!(db.get(PredId(1), &args).is_none());
    }

    #[test]
    fn soft_evidence_is_unknown_truth() {
        let mut db = EvidenceDb::new();
        let p = PredId(0);
        let args: Args = smallvec![crate::Constant(0)];
        db.observe_soft(p, args.clone(), 0.8);
        let t = db.get(p, &args).unwrap();
        assert_eq!(t.truth, None);
        assert_eq!(t.prior, Some(0.8));
        assert!(!t.club.is_fixed());
        assert!(db.has_soft_evidence(p));
    }

    #[test]
    fn reobservation_overwrites() {
        let mut db = EvidenceDb::new();
        let p = PredId(0);
        let args: Args = smallvec![crate::Constant(0)];
        db.observe(p, args.clone(), false);
        db.observe(p, args.clone(), true);
        assert_eq!(db.tuples(p).len(), 1);
        assert_eq!(db.get(p, &args).unwrap().truth, Some(true));
    }
}
