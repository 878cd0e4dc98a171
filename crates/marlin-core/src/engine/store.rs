//! The ground store: the join engine behind grounding.
//!
//! [`GroundStore`] is the seam between the grounder and whatever engine
//! produces groundings: the grounder only consumes active-atom sets and
//! streams of literal tuples, so an implementation may push the joins into a
//! relational database or run them in memory. [`MemGroundStore`] is the
//! in-memory implementation: a recursive variable-binding enumeration over
//! typed domains with per-literal pruning against evidence and the current
//! active set.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use marlin_ir::{
    predicate, Args, ClauseTemplate, Club, Constant, MlnProgram, PredId, TemplateLiteral, Term,
    VarId,
};

use crate::engine::clause::{AtomId, Lit, LitVec, SAT_SENTINEL};
use crate::engine::errors::InferError;

/// One could-be-violated grounding: a literal multiset and the template
/// weight. Consolidation dedupes and sums.
#[derive(Debug, Clone)]
pub struct Grounding {
    pub lits: LitVec,
    pub weight: f64,
}

/// Join-engine interface consumed by the grounder and the driver.
pub trait GroundStore {
    fn program(&self) -> &MlnProgram;

    /// Activation pass over one template for the given clause sign: returns
    /// the atoms that could-be-violated groundings want activated.
    fn ground_activation(
        &mut self,
        template: usize,
        positive: bool,
    ) -> Result<Vec<AtomId>, InferError>;

    /// Clause pass over one template: the literal tuples of every grounding
    /// that can still be violated under current evidence.
    fn ground_clauses(&mut self, template: usize) -> Result<Vec<Grounding>, InferError>;

    /// Unions atoms into the active set; idempotent. Returns the atoms that
    /// were newly activated.
    fn activate(&mut self, atoms: &[AtomId]) -> Vec<AtomId>;

    fn active_count(&self, pred: PredId) -> usize;

    /// Active atoms of one predicate, ascending by id.
    fn active_atoms(&self, pred: PredId) -> Vec<AtomId>;

    /// Every active atom, ascending by id.
    fn all_active_atoms(&self) -> Vec<AtomId>;

    /// Active atoms of one predicate with their argument tuples, ascending
    /// by id. Used for the key-constraint clauses.
    fn active_tuples(&self, pred: PredId) -> Vec<(AtomId, Args)>;

    /// Injects derived evidence (iterative unit propagation).
    fn set_truth(&mut self, atom: AtomId, truth: bool);

    /// Known truth of an atom: input evidence or derived units.
    fn known_truth(&self, atom: AtomId) -> Option<bool>;

    fn atom_pred(&self, atom: AtomId) -> PredId;

    fn prior(&self, atom: AtomId) -> Option<f64>;

    fn club(&self, atom: AtomId) -> Club;

    fn print_form(&self, atom: AtomId) -> String;

    /// Atoms carrying a soft prior at or above the threshold; activated up
    /// front by the grounder.
    fn soft_evidence_atoms(&mut self, threshold: f64) -> Vec<AtomId>;

    /// Every unknown-truth atom of every mutable predicate; only used by the
    /// closure bypass.
    fn all_unknown_atoms(&mut self) -> Result<Vec<AtomId>, InferError>;
}

#[derive(Debug, Clone)]
struct AtomRecord {
    pred: PredId,
    args: Args,
    truth: Option<bool>,
    prior: Option<f64>,
    club: Club,
    active: bool,
}

/// In-memory ground store over an [`MlnProgram`].
#[derive(Debug, Clone)]
pub struct MemGroundStore {
    program: MlnProgram,
    records: Vec<AtomRecord>,
    index: FxHashMap<(PredId, Args), AtomId>,
    active: FxHashMap<PredId, FxHashSet<AtomId>>,
}

/// Evaluation of one template literal under a complete variable binding.
#[derive(Debug, Clone, Copy)]
enum LitEval {
    /// Known truth satisfies the literal; the grounding cannot be violated.
    Satisfied,
    /// The tuple cannot exist (completely specified predicate, tuple absent).
    Excluded,
    /// Known truth falsifies the literal. Carries the signed literal when the
    /// atom is active (it stays in the clause array), `None` otherwise.
    Falsified(Option<Lit>),
    /// Truth unknown.
    Open {
        atom: AtomId,
        active: bool,
        club: Club,
        open_world: bool,
    },
}

impl MemGroundStore {
    pub fn new(program: MlnProgram) -> Result<Self, InferError> {
        program.validate()?;
        let mut store = Self {
            program,
            records: Vec::new(),
            index: FxHashMap::default(),
            active: FxHashMap::default(),
        };
        // Seed records from the evidence database.
        let preds: Vec<PredId> = store.program.predicates.iter().map(|p| p.id).collect();
        for pred in preds {
            let tuples: Vec<_> = store.program.evidence.tuples(pred).to_vec();
            for t in tuples {
                let id = store.mint(pred, t.args.clone());
                let rec = store.record_mut(id);
                rec.truth = t.truth;
                rec.prior = t.prior;
                rec.club = t.club;
            }
        }
        Ok(store)
    }

    pub fn into_program(self) -> MlnProgram {
        self.program
    }

    fn record(&self, id: AtomId) -> &AtomRecord {
        &self.records[(id.0 - 1) as usize]
    }

    fn record_mut(&mut self, id: AtomId) -> &mut AtomRecord {
        &mut self.records[(id.0 - 1) as usize]
    }

    fn lookup(&self, pred: PredId, args: &Args) -> Option<AtomId> {
        self.index.get(&(pred, args.clone())).copied()
    }

    fn mint(&mut self, pred: PredId, args: Args) -> AtomId {
        if let Some(&id) = self.index.get(&(pred, args.clone())) {
            return id;
        }
        let id = AtomId(self.records.len() as i32 + 1);
        let club = if self.program.is_query(pred) {
            Club::Query
        } else {
            Club::Unknown
        };
        self.records.push(AtomRecord {
            pred,
            args: args.clone(),
            truth: None,
            prior: None,
            club,
            active: false,
        });
        self.index.insert((pred, args), id);
        id
    }

    fn resolve_args(lit: &TemplateLiteral, binding: &FxHashMap<VarId, Constant>) -> Args {
        lit.terms
            .iter()
            .map(|t| match t {
                Term::Const(c) => *c,
                Term::Var(v) => binding[v],
            })
            .collect()
    }

    fn eval_literal(&mut self, lit: &TemplateLiteral, args: Args) -> LitEval {
        let pred = &self.program.predicates[lit.pred.0 as usize];
        let closed_world = pred.closed_world;
        let completely = pred.completely_specified;
        match self.lookup(lit.pred, &args) {
            Some(id) => {
                let rec = self.record(id);
                match rec.truth {
                    Some(t) if t == lit.sense => LitEval::Satisfied,
                    Some(_) => LitEval::Falsified(if rec.active {
                        Some(Lit::new(id, lit.sense))
                    } else {
                        None
                    }),
                    None => LitEval::Open {
                        atom: id,
                        active: rec.active,
                        club: rec.club,
                        open_world: !closed_world,
                    },
                }
            }
            None => {
                if !closed_world {
                    // Open-world tuples exist implicitly with unknown truth.
                    let id = self.mint(lit.pred, args);
                    LitEval::Open {
                        atom: id,
                        active: false,
                        club: self.record(id).club,
                        open_world: true,
                    }
                } else if completely {
                    LitEval::Excluded
                } else if lit.sense {
                    // Implicit false evidence under the closed-world default.
                    LitEval::Falsified(None)
                } else {
                    LitEval::Satisfied
                }
            }
        }
    }

    /// Whether an unknown-truth literal blocks the grounding in activation
    /// mode. An unknown atom passes if it is already active, or if its
    /// predicate is open-world and the tuple may still be flipped.
    fn activation_blocks(eval: &LitEval) -> bool {
        match eval {
            LitEval::Satisfied | LitEval::Excluded => true,
            LitEval::Falsified(_) => false,
            LitEval::Open {
                active,
                club,
                open_world,
                ..
            } => !(*active || (*open_world && *club < Club::Evidence)),
        }
    }

    /// Whether a literal blocks the grounding in clause mode.
    fn clause_blocks(eval: &LitEval, sense: bool, pos_clause: bool) -> bool {
        match eval {
            LitEval::Satisfied | LitEval::Excluded => true,
            LitEval::Falsified(_) => false,
            LitEval::Open {
                active, open_world, ..
            } => {
                if sense || !pos_clause {
                    // A closed-world tuple with unknown truth is a soft
                    // evidence row: it participates only once activated.
                    if *open_world {
                        false
                    } else {
                        !*active
                    }
                } else {
                    // Negative literal of a positive clause: only active
                    // atoms can be flipped to false.
                    !*active
                }
            }
        }
    }

    /// Depth (number of bound variables) at which each literal is fully
    /// ground, given the variable binding order.
    fn ready_depths(template: &ClauseTemplate, order: &[VarId]) -> Vec<usize> {
        template
            .literals
            .iter()
            .map(|lit| {
                lit.terms
                    .iter()
                    .filter_map(|t| match t {
                        Term::Var(v) => order.iter().position(|o| o == v).map(|p| p + 1),
                        Term::Const(_) => None,
                    })
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn var_columns(
        &self,
        template: &ClauseTemplate,
        order: &[VarId],
    ) -> Result<Vec<(VarId, Vec<Constant>)>, InferError> {
        let domains = self.program.var_domains(template)?;
        order
            .iter()
            .map(|v| {
                let (_, dom) = domains
                    .iter()
                    .find(|(ov, _)| ov == v)
                    .ok_or_else(|| InferError::Internal(format!("unbound variable {:?}", v)))?;
                Ok((*v, self.program.domain(*dom).constants.clone()))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn recurse_activation(
        &mut self,
        template: &ClauseTemplate,
        vars: &[(VarId, Vec<Constant>)],
        ready: &[usize],
        depth: usize,
        binding: &mut FxHashMap<VarId, Constant>,
        positive: bool,
        out: &mut Vec<AtomId>,
    ) {
        if depth == vars.len() {
            self.activation_leaf(template, binding, positive, out);
            return;
        }
        let (var, ref column) = vars[depth];
        for i in 0..column.len() {
            binding.insert(var, column[i]);
            let mut pruned = false;
            for (li, lit) in template.literals.iter().enumerate() {
                if ready[li] != depth + 1 {
                    continue;
                }
                let args = Self::resolve_args(lit, binding);
                let eval = self.eval_literal(lit, args);
                if Self::activation_blocks(&eval) {
                    pruned = true;
                    break;
                }
            }
            if !pruned {
                self.recurse_activation(template, vars, ready, depth + 1, binding, positive, out);
            }
        }
    }

    fn activation_leaf(
        &mut self,
        template: &ClauseTemplate,
        binding: &FxHashMap<VarId, Constant>,
        positive: bool,
        out: &mut Vec<AtomId>,
    ) {
        let mut neg_act = positive;
        let mut candidates: SmallVec<[AtomId; 4]> = SmallVec::new();
        for lit in &template.literals {
            let args = Self::resolve_args(lit, binding);
            let eval = self.eval_literal(lit, args);
            if Self::activation_blocks(&eval) {
                return;
            }
            if let LitEval::Open {
                atom,
                active,
                club,
                open_world,
            } = eval
            {
                if !positive && (active || (!lit.sense && open_world && club < Club::Evidence)) {
                    neg_act = true;
                }
                let immutable = self.program.predicate(lit.pred).immutable;
                if lit.sense == positive && !immutable {
                    candidates.push(atom);
                }
            }
        }
        if neg_act {
            out.extend(candidates);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn recurse_clauses(
        &mut self,
        template: &ClauseTemplate,
        vars: &[(VarId, Vec<Constant>)],
        ready: &[usize],
        depth: usize,
        binding: &mut FxHashMap<VarId, Constant>,
        out: &mut Vec<Grounding>,
    ) {
        let pos_clause = template.is_positive();
        if depth == vars.len() {
            self.clause_leaf(template, binding, out);
            return;
        }
        let (var, ref column) = vars[depth];
        for i in 0..column.len() {
            binding.insert(var, column[i]);
            let mut pruned = false;
            for (li, lit) in template.literals.iter().enumerate() {
                if ready[li] != depth + 1 {
                    continue;
                }
                let args = Self::resolve_args(lit, binding);
                let eval = self.eval_literal(lit, args);
                if Self::clause_blocks(&eval, lit.sense, pos_clause) {
                    pruned = true;
                    break;
                }
            }
            if !pruned {
                self.recurse_clauses(template, vars, ready, depth + 1, binding, out);
            }
        }
    }

    fn clause_leaf(
        &mut self,
        template: &ClauseTemplate,
        binding: &FxHashMap<VarId, Constant>,
        out: &mut Vec<Grounding>,
    ) {
        let pos_clause = template.is_positive();
        let mut lits: LitVec = SmallVec::new();
        let mut neg_act = pos_clause;
        for lit in &template.literals {
            let args = Self::resolve_args(lit, binding);
            let eval = self.eval_literal(lit, args);
            if Self::clause_blocks(&eval, lit.sense, pos_clause) {
                return;
            }
            match eval {
                LitEval::Falsified(Some(l)) => lits.push(l),
                LitEval::Falsified(None) => {}
                LitEval::Open {
                    atom,
                    active,
                    club,
                    open_world,
                } => {
                    if active {
                        lits.push(Lit::new(atom, lit.sense));
                    }
                    if !pos_clause && (active || (!lit.sense && open_world && club < Club::Evidence))
                    {
                        neg_act = true;
                    }
                }
                LitEval::Satisfied | LitEval::Excluded => return,
            }
        }
        if neg_act && !lits.is_empty() {
            out.push(Grounding {
                lits,
                weight: template.weight,
            });
        }
    }

    /// Existential templates: enumerate free-variable bindings, aggregate the
    /// literal instances over all existential assignments, and discard any
    /// grounding in which some instance is already satisfied by evidence.
    fn recurse_exist_free(
        &mut self,
        template: &ClauseTemplate,
        free: &[(VarId, Vec<Constant>)],
        exist: &[(VarId, Vec<Constant>)],
        depth: usize,
        binding: &mut FxHashMap<VarId, Constant>,
        out: &mut Vec<Grounding>,
    ) {
        if depth == free.len() {
            self.exist_leaf(template, exist, binding, out);
            return;
        }
        let (var, ref column) = free[depth];
        for i in 0..column.len() {
            binding.insert(var, column[i]);
            self.recurse_exist_free(template, free, exist, depth + 1, binding, out);
        }
    }

    fn exist_leaf(
        &mut self,
        template: &ClauseTemplate,
        exist: &[(VarId, Vec<Constant>)],
        binding: &mut FxHashMap<VarId, Constant>,
        out: &mut Vec<Grounding>,
    ) {
        let mut lits: Vec<Lit> = Vec::new();
        let mut indices = vec![0usize; exist.len()];
        loop {
            for (slot, idx) in indices.iter().enumerate() {
                binding.insert(exist[slot].0, exist[slot].1[*idx]);
            }
            for lit in &template.literals {
                let args = Self::resolve_args(lit, binding);
                match self.eval_literal(lit, args) {
                    // An evidence-satisfied instance means the whole
                    // disjunction already holds; record the sentinel so the
                    // aggregated grounding is discarded below.
                    LitEval::Satisfied => lits.push(Lit::new(AtomId(SAT_SENTINEL), lit.sense)),
                    LitEval::Falsified(Some(l)) => lits.push(l),
                    LitEval::Falsified(None) | LitEval::Excluded => {}
                    LitEval::Open { atom, active, .. } => {
                        if active {
                            lits.push(Lit::new(atom, lit.sense));
                        }
                    }
                }
            }
            // Advance the odometer over existential assignments.
            let mut slot = exist.len();
            loop {
                if slot == 0 {
                    let satisfied = lits.iter().any(|l| l.0.abs() == SAT_SENTINEL);
                    if !satisfied && !lits.is_empty() {
                        out.push(Grounding {
                            lits: lits.into_iter().collect(),
                            weight: template.weight,
                        });
                    }
                    return;
                }
                slot -= 1;
                indices[slot] += 1;
                if indices[slot] < exist[slot].1.len() {
                    break;
                }
                indices[slot] = 0;
            }
        }
    }
}

impl GroundStore for MemGroundStore {
    fn program(&self) -> &MlnProgram {
        &self.program
    }

    fn ground_activation(
        &mut self,
        template: usize,
        positive: bool,
    ) -> Result<Vec<AtomId>, InferError> {
        let template = self.program.templates[template].clone();
        let order = template.vars();
        let vars = self.var_columns(&template, &order)?;
        let ready = Self::ready_depths(&template, &order);
        let mut binding = FxHashMap::default();
        let mut out = Vec::new();
        self.recurse_activation(&template, &vars, &ready, 0, &mut binding, positive, &mut out);
        Ok(out)
    }

    fn ground_clauses(&mut self, template: usize) -> Result<Vec<Grounding>, InferError> {
        let template = self.program.templates[template].clone();
        let mut out = Vec::new();
        if template.has_existentials() {
            let free_order = template.free_vars();
            let free = self.var_columns(&template, &free_order)?;
            let exist_order: Vec<VarId> = template
                .vars()
                .into_iter()
                .filter(|v| template.exist_vars.contains(v))
                .collect();
            let exist = self.var_columns(&template, &exist_order)?;
            let mut binding = FxHashMap::default();
            self.recurse_exist_free(&template, &free, &exist, 0, &mut binding, &mut out);
        } else {
            let order = template.vars();
            let vars = self.var_columns(&template, &order)?;
            let ready = Self::ready_depths(&template, &order);
            let mut binding = FxHashMap::default();
            self.recurse_clauses(&template, &vars, &ready, 0, &mut binding, &mut out);
        }
        Ok(out)
    }

    fn activate(&mut self, atoms: &[AtomId]) -> Vec<AtomId> {
        let mut fresh = Vec::new();
        for &id in atoms {
            let rec = self.record_mut(id);
            if rec.active {
                continue;
            }
            rec.active = true;
            let pred = rec.pred;
            self.active.entry(pred).or_default().insert(id);
            fresh.push(id);
        }
        fresh
    }

    fn active_count(&self, pred: PredId) -> usize {
        self.active.get(&pred).map(|s| s.len()).unwrap_or(0)
    }

    fn active_atoms(&self, pred: PredId) -> Vec<AtomId> {
        let mut ids: Vec<AtomId> = self
            .active
            .get(&pred)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    fn all_active_atoms(&self) -> Vec<AtomId> {
        let mut ids: Vec<AtomId> = self
            .active
            .values()
            .flat_map(|s| s.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    fn active_tuples(&self, pred: PredId) -> Vec<(AtomId, Args)> {
        self.active_atoms(pred)
            .into_iter()
            .map(|id| (id, self.record(id).args.clone()))
            .collect()
    }

    fn set_truth(&mut self, atom: AtomId, truth: bool) {
        self.record_mut(atom).truth = Some(truth);
    }

    fn known_truth(&self, atom: AtomId) -> Option<bool> {
        self.record(atom).truth
    }

    fn atom_pred(&self, atom: AtomId) -> PredId {
        self.record(atom).pred
    }

    fn prior(&self, atom: AtomId) -> Option<f64> {
        self.record(atom).prior
    }

    fn club(&self, atom: AtomId) -> Club {
        self.record(atom).club
    }

    fn print_form(&self, atom: AtomId) -> String {
        let rec = self.record(atom);
        predicate::print_form(
            self.program.predicate(rec.pred),
            &rec.args,
            &self.program.symbols,
        )
    }

    fn soft_evidence_atoms(&mut self, threshold: f64) -> Vec<AtomId> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.prior.map(|p| p >= threshold).unwrap_or(false))
            .map(|(i, _)| AtomId(i as i32 + 1))
            .collect()
    }

    fn all_unknown_atoms(&mut self) -> Result<Vec<AtomId>, InferError> {
        let preds: Vec<PredId> = self
            .program
            .predicates
            .iter()
            .filter(|p| !p.immutable)
            .map(|p| p.id)
            .collect();
        let mut out = Vec::new();
        for pred in preds {
            let columns: Vec<Vec<Constant>> = self
                .program
                .predicate(pred)
                .arg_domains
                .iter()
                .map(|&d| self.program.domain(d).constants.clone())
                .collect();
            if columns.iter().any(|c| c.is_empty()) {
                continue;
            }
            let mut indices = vec![0usize; columns.len()];
            loop {
                let args: Args = indices
                    .iter()
                    .enumerate()
                    .map(|(slot, &i)| columns[slot][i])
                    .collect();
                let id = self.mint(pred, args);
                if self.record(id).truth.is_none() {
                    out.push(id);
                }
                let mut slot = columns.len();
                loop {
                    if slot == 0 {
                        break;
                    }
                    slot -= 1;
                    indices[slot] += 1;
                    if indices[slot] < columns[slot].len() {
                        break;
                    }
                    indices[slot] = 0;
                }
                if indices.iter().all(|&i| i == 0) {
                    break;
                }
            }
        }
        out.sort_unstable();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_ir::TemplateLiteral;

    /// P(x) => Q(x) over a small person domain with P fully observed.
    fn implication_program(n: usize) -> (MlnProgram, PredId, PredId) {
        let mut p = MlnProgram::new();
        let names: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let dom = p.add_domain("thing", &refs);
        let pe = p.add_predicate("P", &[dom]);
        let q = p.add_predicate("Q", &[dom]);
        p.mark_query(q);
        p.add_template(
            vec![
                TemplateLiteral::new(pe, false, [Term::Var(VarId(0))]),
                TemplateLiteral::new(q, true, [Term::Var(VarId(0))]),
            ],
            1.0,
        );
        for name in &names {
            let args = p.args(&[name.as_str()]);
            p.evidence.observe(pe, args, true);
        }
        (p, pe, q)
    }

    #[test]
    fn activation_closure_is_minimal() {
        let (program, pe, q) = implication_program(50);
        let mut store = MemGroundStore::new(program).unwrap();
        let acts = store.ground_activation(0, true).unwrap();
        assert_eq!(acts.len(), 50);
        let fresh = store.activate(&acts);
        assert_eq!(fresh.len(), 50);
        assert_eq!(store.active_count(q), 50);
        assert_eq!(store.active_count(pe), 0);
        // Second pass finds nothing new.
        let acts = store.ground_activation(0, true).unwrap();
        let fresh = store.activate(&acts);
        assert!(fresh.is_empty());
    }

    #[test]
    fn clause_pass_emits_unit_clauses_over_active_atoms() {
        let (program, _, _) = implication_program(10);
        let mut store = MemGroundStore::new(program).unwrap();
        let acts = store.ground_activation(0, true).unwrap();
        store.activate(&acts);
        let groundings = store.ground_clauses(0).unwrap();
        assert_eq!(groundings.len(), 10);
        for g in &groundings {
            // The falsified evidence literal P(x) is inactive and drops out.
            assert_eq!(g.lits.len(), 1);
            assert!(g.lits[0].is_positive());
            assert_eq!(g.weight, 1.0);
        }
    }

    #[test]
    fn derived_truth_prunes_groundings() {
        let (program, _, q) = implication_program(4);
        let mut store = MemGroundStore::new(program).unwrap();
        let acts = store.ground_activation(0, true).unwrap();
        store.activate(&acts);
        // Derive Q(c0) = true; the grounding over c0 is satisfied.
        let q0 = store.active_atoms(q)[0];
        store.set_truth(q0, true);
        let groundings = store.ground_clauses(0).unwrap();
        assert_eq!(groundings.len(), 3);
    }

    #[test]
    fn negative_clause_needs_a_flippable_literal() {
        let mut p = MlnProgram::new();
        let dom = p.add_domain("d", &["a", "b"]);
        let r = p.add_predicate("R", &[dom]);
        let s = p.add_predicate("S", &[dom]);
        p.mark_query(r);
        p.mark_query(s);
        // Negative clause over positive literals: costs when satisfied.
        p.add_template(
            vec![
                TemplateLiteral::new(r, true, [Term::Var(VarId(0))]),
                TemplateLiteral::new(s, true, [Term::Var(VarId(0))]),
            ],
            -0.5,
        );
        let mut store = MemGroundStore::new(p).unwrap();
        // Nothing active: no negative-sense unknown literal, nothing emitted.
        assert!(store.ground_clauses(0).unwrap().is_empty());
        // Activation for the negative sign finds nothing to activate either.
        let acts = store.ground_activation(0, false).unwrap();
        assert!(acts.is_empty());
        let r_a = store.all_unknown_atoms().unwrap()[0];
        store.activate(&[r_a]);
        let groundings = store.ground_clauses(0).unwrap();
        assert_eq!(groundings.len(), 1);
    }

    #[test]
    fn print_form_renders_constants() {
        let (program, pe, _) = implication_program(2);
        let mut store = MemGroundStore::new(program).unwrap();
        let args: Args = [store.program.symbols.get("c0").unwrap()].into_iter().collect();
        let id = store.lookup(pe, &args).unwrap();
        assert_eq!(store.print_form(id), "P(c0)");
        assert_eq!(store.known_truth(id), Some(true));
        assert_eq!(store.club(id), Club::Evidence);
    }
}
