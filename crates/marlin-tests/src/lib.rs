//! Shared builders for the Marlin integration tests.

use marlin_ir::{MlnProgram, PredId, TemplateLiteral, Term, VarId};

/// A single-atom program: one propositional predicate `X()` marked as query,
/// plus one unit template `{X}` with the given weight.
pub fn unit_program(weight: f64) -> (MlnProgram, PredId) {
    let mut program = MlnProgram::new();
    let x = program.add_predicate("X", &[]);
    program.mark_query(x);
    program.add_template(vec![TemplateLiteral::new(x, true, [])], weight);
    (program, x)
}

/// `P(x) => Q(x)` over `n` constants, with every `P` tuple observed true.
pub fn implication_program(n: usize, weight: f64) -> (MlnProgram, PredId, PredId) {
    let mut program = MlnProgram::new();
    let names: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
    let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let dom = program.add_domain("thing", &refs);
    let p = program.add_predicate("P", &[dom]);
    let q = program.add_predicate("Q", &[dom]);
    program.mark_query(q);
    program.add_template(
        vec![
            TemplateLiteral::new(p, false, [Term::Var(VarId(0))]),
            TemplateLiteral::new(q, true, [Term::Var(VarId(0))]),
        ],
        weight,
    );
    for name in &names {
        let args = program.args(&[name.as_str()]);
        program.evidence.observe(p, args, true);
    }
    (program, p, q)
}
