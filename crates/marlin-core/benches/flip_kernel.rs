//! Benchmarks for the MRF flip kernel.
//!
//! Run with `cargo bench --bench flip_kernel`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use marlin_core::engine::mrf::GroundAtom;
use marlin_core::{AtomId, GroundClause, Lit, Mrf};

const HARD: f64 = 1e7;

/// Deterministic 3-literal clauses over `num_atoms` atoms.
fn make_clauses(num_atoms: i32, num_clauses: usize, seed: u64) -> Vec<GroundClause> {
    let mut state = seed;
    let mut next = || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state
    };
    let mut clauses = Vec::with_capacity(num_clauses);
    while clauses.len() < num_clauses {
        let lits: Vec<Lit> = (0..3)
            .map(|_| {
                let raw = next();
                let atom = (raw % num_atoms as u64) as i32 + 1;
                Lit(if raw & (1 << 40) == 0 { atom } else { -atom })
            })
            .collect();
        let weight = ((next() % 100) as f64 + 1.0) / 10.0;
        if let Some(clause) = GroundClause::build(lits, weight) {
            clauses.push(clause);
        }
    }
    clauses
}

fn bench_flip(c: &mut Criterion) {
    let mut group = c.benchmark_group("mrf_flip");
    for &(num_atoms, num_clauses) in &[(100i32, 400usize), (1000, 4000), (10_000, 40_000)] {
        let atoms: Vec<GroundAtom> = (1..=num_atoms).map(|i| GroundAtom::unknown(AtomId(i))).collect();
        let clauses = make_clauses(num_atoms, num_clauses, 0xA5A5);
        let mut mrf = Mrf::new(atoms, clauses, HARD).unwrap();
        mrf.recount();

        let mut cursor = 0i32;
        group.bench_with_input(
            BenchmarkId::new("flip", format!("{num_atoms}a_{num_clauses}c")),
            &num_atoms,
            |b, &n| {
                b.iter(|| {
                    cursor = cursor % n + 1;
                    mrf.flip(black_box(AtomId(cursor)));
                    black_box(mrf.cost())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_flip);
criterion_main!(benches);
