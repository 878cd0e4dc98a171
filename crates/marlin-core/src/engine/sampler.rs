//! Stochastic local search: WalkSAT for MAP, SampleSAT and MC-SAT for
//! marginals.
//!
//! All three entry points share the MRF flip kernel. Randomness comes from
//! explicitly seeded streams so runs are reproducible; the driver derives one
//! stream per phase from the configured seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::deadline::Deadline;
use crate::engine::clause::AtomId;
use crate::engine::errors::InferError;
use crate::engine::mrf::Mrf;
use crate::metrics::Metrics;

/// Sampler knobs, extracted from the validated config.
#[derive(Debug, Clone, Copy)]
pub struct SamplerParams {
    pub max_flips: usize,
    pub max_tries: usize,
    /// Probability of a random (non-greedy) WalkSAT step.
    pub random_step_prob: f64,
    /// Probability of a simulated-annealing step inside SampleSAT.
    pub sa_prob: f64,
    /// Inverse temperature of the annealing acceptance test.
    pub sa_coef: f64,
}

/// Derives a deterministic per-phase random stream from the run seed.
pub fn rng_stream(seed: u64, phase: u64) -> StdRng {
    // SplitMix-style mixing keeps the phase streams decorrelated even for
    // small seeds.
    let mixed = seed
        .wrapping_add(phase.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_mul(0xBF58_476D_1CE4_E5B9);
    StdRng::seed_from_u64(mixed ^ (mixed >> 31))
}

/// Phase tags for [`rng_stream`].
pub mod phases {
    /// Initial assignment dither.
    pub const INIT: u64 = 1;
    /// WalkSAT step choices.
    pub const WALKSAT: u64 = 2;
    /// SampleSAT annealing and step mix.
    pub const SAMPLESAT: u64 = 3;
    /// MC-SAT clause retention.
    pub const RETENTION: u64 = 4;
}

/// The result of a WalkSAT search.
#[derive(Debug, Clone)]
pub struct WalkSatOutcome {
    /// Cost of the best assignment seen.
    pub best_cost: f64,
    /// Whether a zero-cost assignment (all hard clauses satisfied, no soft
    /// cost) was reached.
    pub solved: bool,
    pub flips: usize,
    pub timed_out: bool,
}

/// MAP search: restarts of greedy/noisy descent over violated clauses.
/// Leaves the MRF at the best assignment found.
pub fn walksat(
    mrf: &mut Mrf,
    params: &SamplerParams,
    rng: &mut StdRng,
    deadline: &Deadline,
) -> WalkSatOutcome {
    let mut best_cost = f64::INFINITY;
    let mut best = mrf.assignment();
    let mut solved = false;
    let mut flips = 0usize;
    let mut timed_out = false;

    'tries: for _ in 0..params.max_tries.max(1) {
        mrf.randomize(rng);
        mrf.recount();
        if mrf.cost() < best_cost {
            best_cost = mrf.cost();
            best = mrf.assignment();
        }
        for _ in 0..params.max_flips {
            if deadline.expired() {
                timed_out = true;
                break 'tries;
            }
            if !mrf.has_violations() {
                solved = true;
                best_cost = mrf.cost();
                best = mrf.assignment();
                break 'tries;
            }
            if let Some(atom) = pick_walksat_flip(mrf, params.random_step_prob, rng) {
                mrf.flip(atom);
                flips += 1;
                if mrf.cost() < best_cost {
                    best_cost = mrf.cost();
                    best = mrf.assignment();
                }
            }
        }
    }

    mrf.apply_assignment(&best);
    if !mrf.has_violations() {
        solved = true;
    }
    WalkSatOutcome {
        best_cost,
        solved,
        flips,
        timed_out,
    }
}

/// One WalkSAT atom choice: pick a violated clause uniformly, then either a
/// uniformly random flippable atom of it or the one minimising the cost
/// delta, ties broken uniformly.
fn pick_walksat_flip(mrf: &Mrf, random_step_prob: f64, rng: &mut StdRng) -> Option<AtomId> {
    let cidx = mrf.pick_violated(rng)?;
    let candidates: Vec<AtomId> = mrf.clauses()[cidx as usize]
        .lits
        .iter()
        .map(|l| l.atom())
        .filter(|&a| mrf.atom(a).map(|atom| !atom.fixed).unwrap_or(false))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    if rng.gen_bool(random_step_prob) {
        return Some(candidates[rng.gen_range(0..candidates.len())]);
    }
    let mut best_delta = f64::INFINITY;
    let mut best: Vec<AtomId> = Vec::new();
    for &atom in &candidates {
        let delta = mrf.delta_cost(atom);
        if delta < best_delta - 1e-12 {
            best_delta = delta;
            best.clear();
            best.push(atom);
        } else if (delta - best_delta).abs() <= 1e-12 {
            best.push(atom);
        }
    }
    Some(best[rng.gen_range(0..best.len())])
}

/// Draws a near-uniform model of an all-hard sub-problem: each step is a
/// Bernoulli choice between a simulated-annealing move over a random atom and
/// a WalkSAT move over the currently violated clauses. Runs its whole flip
/// budget so the walk keeps mixing inside the solution space; returns whether
/// the final assignment satisfies every constraint.
pub fn sample_sat(
    mrf: &mut Mrf,
    params: &SamplerParams,
    rng: &mut StdRng,
    deadline: &Deadline,
) -> bool {
    let flippable = mrf.flippable_atoms();
    if flippable.is_empty() {
        return !mrf.has_violations();
    }
    for _ in 0..params.max_flips {
        if deadline.expired() {
            break;
        }
        if rng.gen_bool(params.sa_prob) {
            let atom = flippable[rng.gen_range(0..flippable.len())];
            let delta = mrf.delta_cost(atom);
            let accept = delta <= 0.0 || rng.gen_bool((-delta * params.sa_coef).exp().min(1.0));
            if accept {
                mrf.flip(atom);
            }
        } else if let Some(atom) = pick_walksat_flip(mrf, params.random_step_prob, rng) {
            mrf.flip(atom);
        }
    }
    !mrf.has_violations()
}

/// The MC-SAT tallies.
#[derive(Debug, Clone)]
pub struct McSatOutcome {
    /// Samples actually drawn (shorter than requested on timeout).
    pub samples: usize,
    /// Total cost of the drawn samples under the full MRF.
    pub sum_cost: f64,
    pub timed_out: bool,
}

/// Slice sampling for marginals. Per sample: keep every hard clause, retain
/// each currently in-state soft clause with probability `1 - exp(-|w|)`,
/// draw a near-uniform model of the retained set with SampleSAT, and tally
/// atom truth values. A failed SampleSAT keeps the previous assignment.
#[allow(clippy::too_many_arguments)]
pub fn mc_sat(
    mrf: &mut Mrf,
    samples: usize,
    params: &SamplerParams,
    retention_rng: &mut StdRng,
    samplesat_rng: &mut StdRng,
    deadline: &Deadline,
    metrics: &mut Metrics,
) -> Result<McSatOutcome, InferError> {
    let hard_weight = mrf.hard_weight();
    let mut sum_cost = 0.0;
    let mut drawn = 0usize;
    let mut timed_out = false;

    for _ in 0..samples {
        if deadline.expired() {
            metrics.samples_at_timeout = drawn;
            timed_out = true;
            break;
        }

        // Clause retention pass: one sweep over the full clause list.
        let mut selected: Vec<u32> = Vec::new();
        for (idx, clause) in mrf.clauses().iter().enumerate() {
            if clause.is_hard(hard_weight) {
                selected.push(idx as u32);
                continue;
            }
            let n_sat = mrf.n_sat(idx as u32);
            let in_state = if clause.weight >= 0.0 {
                n_sat > 0
            } else {
                n_sat == 0
            };
            if in_state && retention_rng.gen_bool(1.0 - (-clause.weight.abs()).exp()) {
                selected.push(idx as u32);
            }
        }

        let mut sub = mrf.sub_mrf(&selected)?;
        if sample_sat(&mut sub, params, samplesat_rng, deadline) {
            mrf.copy_assignment_from(&sub);
        } else {
            metrics.sample_sat_fails += 1;
        }

        mrf.tally_sample();
        sum_cost += mrf.cost();
        drawn += 1;
    }

    Ok(McSatOutcome {
        samples: drawn,
        sum_cost,
        timed_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clause::{GroundClause, Lit};
    use crate::engine::mrf::GroundAtom;

    const HARD: f64 = 1e7;

    fn clause(lits: &[i32], weight: f64) -> GroundClause {
        GroundClause::build(lits.iter().map(|&l| Lit(l)), weight).unwrap()
    }

    fn mrf_of(clauses: Vec<GroundClause>, num_atoms: i32) -> Mrf {
        let atoms = (1..=num_atoms)
            .map(|i| GroundAtom::unknown(AtomId(i)))
            .collect();
        Mrf::new(atoms, clauses, HARD).unwrap()
    }

    fn params(max_flips: usize) -> SamplerParams {
        SamplerParams {
            max_flips,
            max_tries: 3,
            random_step_prob: 0.5,
            sa_prob: 0.5,
            sa_coef: 10.0,
        }
    }

    #[test]
    fn walksat_solves_xor_constraint() {
        // x v y, -x v -y: exactly one of the two atoms true.
        let mut solved_fast = 0;
        for seed in 0..100 {
            let mut mrf = mrf_of(
                vec![clause(&[1, 2], HARD), clause(&[-1, -2], HARD)],
                2,
            );
            let mut rng = rng_stream(seed, phases::WALKSAT);
            let outcome = walksat(&mut mrf, &params(10), &mut rng, &Deadline::unlimited());
            assert!(outcome.solved);
            assert_eq!(mrf.cost(), 0.0);
            let x = mrf.atom(AtomId(1)).unwrap().truth;
            let y = mrf.atom(AtomId(2)).unwrap().truth;
            assert_ne!(x, y);
            if outcome.flips <= 10 {
                solved_fast += 1;
            }
        }
        assert!(solved_fast >= 99, "solved within 10 flips: {solved_fast}");
    }

    #[test]
    fn walksat_reports_best_cost_on_unsat_input() {
        let mut mrf = mrf_of(vec![clause(&[1], HARD), clause(&[-1], HARD)], 1);
        let mut rng = rng_stream(0, phases::WALKSAT);
        let outcome = walksat(&mut mrf, &params(25), &mut rng, &Deadline::unlimited());
        assert!(!outcome.solved);
        assert!((outcome.best_cost - HARD).abs() < 1e-3);
        assert!((mrf.cost() - outcome.best_cost).abs() < 1e-3);
    }

    #[test]
    fn walksat_respects_fixed_atoms() {
        let mut atoms: Vec<GroundAtom> = (1..=2).map(|i| GroundAtom::unknown(AtomId(i))).collect();
        atoms[0].fixed = true;
        atoms[0].truth = false;
        let mut mrf = Mrf::new(
            atoms,
            vec![clause(&[1, 2], HARD)],
            HARD,
        )
        .unwrap();
        let mut rng = rng_stream(3, phases::WALKSAT);
        let outcome = walksat(&mut mrf, &params(50), &mut rng, &Deadline::unlimited());
        assert!(outcome.solved);
        assert!(!mrf.atom(AtomId(1)).unwrap().truth);
        assert!(mrf.atom(AtomId(2)).unwrap().truth);
    }

    #[test]
    fn sample_sat_lands_in_the_solution_space() {
        for seed in 0..20 {
            let mut mrf = mrf_of(
                vec![clause(&[1, 2], HARD), clause(&[-1, -2], HARD)],
                2,
            );
            let mut init = rng_stream(seed, phases::INIT);
            mrf.randomize(&mut init);
            mrf.recount();
            let mut rng = rng_stream(seed, phases::SAMPLESAT);
            assert!(sample_sat(
                &mut mrf,
                &params(200),
                &mut rng,
                &Deadline::unlimited()
            ));
        }
    }

    #[test]
    fn mcsat_single_soft_unit_approaches_sigmoid() {
        // One soft clause {x} with weight 1: the marginal of x converges to
        // 1/(1+e^-1) ~= 0.731.
        let mut mrf = mrf_of(vec![clause(&[1], 1.0)], 1);
        let mut retention = rng_stream(11, phases::RETENTION);
        let mut samplesat = rng_stream(11, phases::SAMPLESAT);
        let mut metrics = Metrics::default();
        let outcome = mc_sat(
            &mut mrf,
            20_000,
            &params(10),
            &mut retention,
            &mut samplesat,
            &Deadline::unlimited(),
            &mut metrics,
        )
        .unwrap();
        assert_eq!(outcome.samples, 20_000);
        let p = mrf.atom(AtomId(1)).unwrap().n_true as f64 / outcome.samples as f64;
        assert!((p - 0.731).abs() < 0.02, "estimated p = {p}");
        assert_eq!(metrics.sample_sat_fails, 0);
    }

    #[test]
    fn mcsat_timeout_reports_partial_tallies() {
        let mut mrf = mrf_of(vec![clause(&[1], 1.0)], 1);
        let mut retention = rng_stream(0, phases::RETENTION);
        let mut samplesat = rng_stream(0, phases::SAMPLESAT);
        let mut metrics = Metrics::default();
        let deadline = Deadline::new(Some(std::time::Duration::ZERO));
        let outcome = mc_sat(
            &mut mrf,
            1000,
            &params(10),
            &mut retention,
            &mut samplesat,
            &deadline,
            &mut metrics,
        )
        .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.samples, 0);
        assert_eq!(metrics.samples_at_timeout, 0);
    }

    #[test]
    fn rng_streams_differ_per_phase() {
        let mut a = rng_stream(42, phases::WALKSAT);
        let mut b = rng_stream(42, phases::SAMPLESAT);
        let xs: Vec<u64> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.gen()).collect();
        assert_ne!(xs, ys);
    }
}
