//! Unit solvers for iterative unit propagation.
//!
//! The grounder hands the accumulated hard CNF to a [`UnitSolver`] between
//! hard-clause templates; the returned unit literals become derived evidence
//! that prunes later groundings. Implementations must be pure: no state may
//! persist between calls.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::engine::clause::{AtomId, GroundClause, Lit};

/// Failures of a unit solver call.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The hard clauses admit no model. Fatal for the whole run.
    #[error("hard clauses are unsatisfiable")]
    Unsat,
    /// The solver could not produce an answer (process failure, parse
    /// failure). Recoverable: the grounder skips the propagation step and
    /// only loses pruning.
    #[error("unit solver failed: {0}")]
    Failed(String),
}

/// Computes the literals forced true by the hard clauses of a CNF.
pub trait UnitSolver {
    /// Returns all forced literals of the hard sub-CNF (clauses with
    /// `|weight| >= hard_weight`), or `SolverError::Unsat` on contradiction.
    fn units(&self, clauses: &[GroundClause], hard_weight: f64) -> Result<Vec<Lit>, SolverError>;
}

impl<T: UnitSolver + ?Sized> UnitSolver for Box<T> {
    fn units(&self, clauses: &[GroundClause], hard_weight: f64) -> Result<Vec<Lit>, SolverError> {
        (**self).units(clauses, hard_weight)
    }
}

/// The built-in solver selected by the configuration: backbone probing when
/// `use_backbones` is set, plain unit propagation otherwise.
pub fn builtin_solver(config: &crate::config::InferConfig) -> Box<dyn UnitSolver> {
    if config.use_backbones {
        Box::new(BackboneSolver)
    } else {
        Box::new(PropagationSolver)
    }
}

/// Hard clauses in propagation form. A hard clause with negative weight must
/// stay unsatisfied, which forces the negation of each of its literals; it is
/// expanded into those unit clauses up front.
fn hard_clause_views(clauses: &[GroundClause], hard_weight: f64) -> Vec<Vec<Lit>> {
    let mut views = Vec::new();
    for clause in clauses {
        if !clause.is_hard(hard_weight) {
            continue;
        }
        if clause.weight >= 0.0 {
            views.push(clause.lits.to_vec());
        } else {
            for &lit in &clause.lits {
                views.push(vec![lit.negated()]);
            }
        }
    }
    views
}

fn propagate(
    views: &[Vec<Lit>],
    mut assignment: FxHashMap<AtomId, bool>,
) -> Result<FxHashMap<AtomId, bool>, SolverError> {
    loop {
        let mut changed = false;
        for clause in views {
            let mut satisfied = false;
            let mut unassigned: Option<Lit> = None;
            let mut open = 0usize;
            for &lit in clause {
                match assignment.get(&lit.atom()) {
                    Some(&truth) if lit.holds(truth) => {
                        satisfied = true;
                        break;
                    }
                    Some(_) => {}
                    None => {
                        open += 1;
                        unassigned = Some(lit);
                    }
                }
            }
            if satisfied {
                continue;
            }
            match open {
                0 => return Err(SolverError::Unsat),
                1 => {
                    let lit = unassigned.expect("open count tracked an unassigned literal");
                    assignment.insert(lit.atom(), lit.is_positive());
                    changed = true;
                }
                _ => {}
            }
        }
        if !changed {
            return Ok(assignment);
        }
    }
}

fn assignment_to_lits(assignment: &FxHashMap<AtomId, bool>) -> Vec<Lit> {
    let mut lits: Vec<Lit> = assignment
        .iter()
        .map(|(&atom, &truth)| Lit::new(atom, truth))
        .collect();
    lits.sort_unstable_by_key(|l| l.atom());
    lits
}

/// Queue-based Boolean unit propagation over the hard clauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationSolver;

impl UnitSolver for PropagationSolver {
    fn units(&self, clauses: &[GroundClause], hard_weight: f64) -> Result<Vec<Lit>, SolverError> {
        let views = hard_clause_views(clauses, hard_weight);
        let assignment = propagate(&views, FxHashMap::default())?;
        Ok(assignment_to_lits(&assignment))
    }
}

/// Backbone extraction by failed-literal probing: assume each open literal in
/// turn, propagate, and keep the complement of every assumption that yields a
/// contradiction. Finds the propagation-provable subset of the backbone.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackboneSolver;

impl UnitSolver for BackboneSolver {
    fn units(&self, clauses: &[GroundClause], hard_weight: f64) -> Result<Vec<Lit>, SolverError> {
        let views = hard_clause_views(clauses, hard_weight);
        let mut base = propagate(&views, FxHashMap::default())?;
        let mut atoms: Vec<AtomId> = views
            .iter()
            .flat_map(|c| c.iter().map(|l| l.atom()))
            .collect();
        atoms.sort_unstable();
        atoms.dedup();

        loop {
            let mut grew = false;
            for &atom in &atoms {
                if base.contains_key(&atom) {
                    continue;
                }
                for truth in [true, false] {
                    let mut probe = base.clone();
                    probe.insert(atom, truth);
                    if propagate(&views, probe).is_err() {
                        // The assumption closes every model: its complement
                        // is forced.
                        base.insert(atom, !truth);
                        base = propagate(&views, base)?;
                        grew = true;
                        break;
                    }
                }
            }
            if !grew {
                return Ok(assignment_to_lits(&base));
            }
        }
    }
}

/// DIMACS CNF encoding of the hard sub-CNF, the dump format consumed by an
/// external solver process.
pub mod dimacs {
    use super::*;

    /// Writes `p cnf <atoms> <clauses>` followed by one zero-terminated
    /// literal line per hard clause.
    pub fn write_cnf<W: Write>(
        w: &mut W,
        num_atoms: i32,
        clauses: &[GroundClause],
        hard_weight: f64,
    ) -> io::Result<()> {
        let views = hard_clause_views(clauses, hard_weight);
        writeln!(w, "p cnf {} {}", num_atoms, views.len())?;
        for clause in views {
            for lit in clause {
                write!(w, "{} ", lit.0)?;
            }
            writeln!(w, "0")?;
        }
        Ok(())
    }
}

/// Invokes an external CDCL solver process on the DIMACS dump and parses the
/// `UNITS`/`BACKBONE` line of its output. Any process or parse failure is a
/// recoverable [`SolverError::Failed`].
#[derive(Debug, Clone)]
pub struct CommandSolver {
    path: PathBuf,
    use_backbones: bool,
}

impl CommandSolver {
    pub fn new(path: impl Into<PathBuf>, use_backbones: bool) -> Self {
        Self {
            path: path.into(),
            use_backbones,
        }
    }
}

impl UnitSolver for CommandSolver {
    fn units(&self, clauses: &[GroundClause], hard_weight: f64) -> Result<Vec<Lit>, SolverError> {
        let cnf_path = std::env::temp_dir().join(format!("marlin-{}.cnf", std::process::id()));
        let mut buf = Vec::new();
        let max_atom = clauses
            .iter()
            .flat_map(|c| c.lits.iter().map(|l| l.0.abs()))
            .max()
            .unwrap_or(0);
        dimacs::write_cnf(&mut buf, max_atom, clauses, hard_weight)
            .map_err(|e| SolverError::Failed(e.to_string()))?;
        std::fs::write(&cnf_path, &buf).map_err(|e| SolverError::Failed(e.to_string()))?;

        let flag = if self.use_backbones {
            "-printbackbone"
        } else {
            "-printunits"
        };
        let output = Command::new(&self.path)
            .arg(flag)
            .arg(&cnf_path)
            .output()
            .map_err(|e| SolverError::Failed(e.to_string()));
        let _ = std::fs::remove_file(&cnf_path);
        let output = output?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.lines().any(|l| l.trim() == "UNSATISFIABLE") {
            return Err(SolverError::Unsat);
        }
        let marker = if self.use_backbones { "BACKBONE" } else { "UNITS" };
        let line = stdout
            .lines()
            .find(|l| l.starts_with(marker))
            .ok_or_else(|| SolverError::Failed(format!("no {marker} line in solver output")))?;
        let mut lits = Vec::new();
        for token in line.split_whitespace().skip(1) {
            let raw: i32 = token
                .parse()
                .map_err(|_| SolverError::Failed(format!("bad literal token '{token}'")))?;
            if raw != 0 {
                lits.push(Lit(raw));
            }
        }
        Ok(lits)
    }
}
