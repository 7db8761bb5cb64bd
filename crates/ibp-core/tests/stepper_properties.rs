//! Execution properties of verified programs and the end-to-end sample walk.

#![allow(clippy::pedantic, clippy::nursery)]

use ibp_core::{
    iteration_table, verify, BinaryOp, BranchEvent, Expr, LineRange, Program, RunBoundary, Session,
    Statement, StepOutcome, Stepper, TraceEvent, Transition, UnaryOp, VariableTable,
};
use proptest::prelude::*;
use rand as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const NAMES: [&str; 4] = ["i", "a", "b", "c"];

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-20i64..20).prop_map(Expr::number),
        prop::sample::select(NAMES.to_vec()).prop_map(|name| Expr::var(name)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (
                prop::sample::select(BinaryOp::ALL.to_vec()),
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(op, lhs, rhs)| Expr::binary(op, lhs, rhs)),
            inner.clone().prop_map(|e| Expr::unary(UnaryOp::Not, e)),
            inner.clone().prop_map(|e| Expr::unary(UnaryOp::BitNot, e)),
            inner.prop_map(Expr::random),
        ]
    })
}

fn statement_strategy() -> impl Strategy<Value = Statement> {
    let leaf = (prop::sample::select(NAMES[1..].to_vec()), expr_strategy())
        .prop_map(|(name, value)| Statement::let_binding(name, value, LineRange::single(1)));
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            (expr_strategy(), prop::collection::vec(inner.clone(), 0..3)).prop_map(
                |(cond, body)| Statement::if_block(cond, body, LineRange::new(1, 1))
            ),
            inner,
        ]
    })
}

fn program_strategy() -> impl Strategy<Value = Program> {
    prop::collection::vec(statement_strategy(), 0..6).prop_map(Program::new)
}

fn depth(statements: &[Statement]) -> usize {
    statements
        .iter()
        .map(|statement| match statement {
            Statement::If { body, .. } if !body.is_empty() => 1 + depth(body),
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

fn sample_program() -> Program {
    // let x = 5;
    // if (x > 0) {
    //     let y = 1;
    // }
    Program::new(vec![
        Statement::let_binding("x", Expr::number(5), LineRange::single(1)),
        Statement::if_block(
            Expr::binary(BinaryOp::Gt, Expr::var("x"), Expr::number(0)),
            vec![Statement::let_binding("y", Expr::number(1), LineRange::single(3))],
            LineRange::new(2, 4),
        ),
    ])
}

proptest! {
    #[test]
    fn verified_programs_never_hit_unbound_variables(
        program in program_strategy(),
        seed in any::<u64>()
    ) {
        if verify(&iteration_table(0), &program).is_ok() {
            let max_depth = depth(program.statements());
            let mut stepper = Stepper::with_seed(program, seed).expect("verified");
            for _ in 0..300 {
                prop_assert!(stepper.step().is_ok());
                prop_assert!(stepper.frames().len() <= 1 + max_depth);
            }
        } else {
            prop_assert!(Stepper::new(program).is_err());
        }
    }

    #[test]
    fn new_iterations_start_from_the_induction_variable_alone(
        program in program_strategy(),
        seed in any::<u64>()
    ) {
        let Ok(mut stepper) = Stepper::with_seed(program, seed) else {
            return Ok(());
        };
        for _ in 0..300 {
            let before = stepper.iteration();
            let outcome = stepper.step().expect("verified");
            if outcome.started_iteration() {
                prop_assert_eq!(stepper.iteration(), before + 1);
                prop_assert_eq!(stepper.frames().len(), 1);
                prop_assert_eq!(stepper.current_table(), Some(&iteration_table(before + 1)));
            }
        }
    }

    #[test]
    fn empty_program_never_emits_branches(steps in 0u32..200) {
        let mut session = Session::default();
        session.compile(Program::default()).expect("empty program verifies");
        for _ in 0..steps {
            let step = session.step().expect("compiled");
            prop_assert_eq!(step.outcome, StepOutcome::Idle);
            prop_assert!(step.prediction.is_none());
        }
        prop_assert_eq!(session.accuracy().global().total, 0);
    }
}

#[test]
fn straight_line_pass_wraps_after_one_step_per_statement() {
    let program = Program::new(vec![
        Statement::let_binding("a", Expr::var("i"), LineRange::single(1)),
        Statement::if_block(
            Expr::number(0),
            vec![Statement::let_binding("b", Expr::number(1), LineRange::single(3))],
            LineRange::new(2, 4),
        ),
        Statement::let_binding(
            "c",
            Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::number(1)),
            LineRange::single(5),
        ),
    ]);
    let mut stepper = Stepper::new(program).expect("verifies");

    for iteration in 0..3u64 {
        let mut last = StepOutcome::Idle;
        for _ in 0..3 {
            last = stepper.step().expect("verified");
        }
        assert!(last.started_iteration());
        assert_eq!(stepper.iteration(), iteration + 1);
        assert_eq!(
            stepper.current_table(),
            Some(&iteration_table(iteration + 1))
        );
    }
}

#[test]
fn sample_program_walk_matches_expected_trace() {
    let program = sample_program();
    assert_eq!(verify(&iteration_table(0), &program), Ok(()));
    let mut stepper = Stepper::new(program).expect("verifies");

    let first = stepper.step().expect("let x");
    assert_eq!(first.lines(), Some(LineRange::single(1)));
    assert_eq!(first.branch(), None);

    let second = stepper.step().expect("if");
    assert_eq!(second.branch(), Some(BranchEvent { pc: 2, taken: true }));
    assert!(matches!(
        second,
        StepOutcome::Executed {
            transition: Transition::EnteredBlock,
            ..
        }
    ));
    assert_eq!(stepper.frames().len(), 2);

    let third = stepper.step().expect("let y");
    assert_eq!(third.lines(), Some(LineRange::single(3)));
    assert!(third.started_iteration());

    assert_eq!(stepper.iteration(), 1);
    let table = stepper.current_table().expect("one frame");
    assert_eq!(table, &VariableTable::with_binding("i", 1));
    assert!(!table.contains("x"));
    assert!(!table.contains("y"));

    let fourth = stepper.step().expect("let x again");
    assert_eq!(fourth.lines(), Some(LineRange::single(1)));
}

#[test]
fn session_scores_the_sample_branch_every_iteration() {
    let mut session = Session::default();
    session.compile(sample_program()).expect("verifies");
    let mut trace: Vec<TraceEvent> = Vec::new();

    let outcome = session
        .run(RunBoundary::Steps, 30, &mut trace)
        .expect("runs");

    assert_eq!(outcome.steps, 30);
    assert_eq!(outcome.branches, 10);
    let site = session.accuracy().site(2);
    assert_eq!(site.total, 10);
    // History visits tables 0 and 1 once, then table 3 needs two warm-up misses.
    assert_eq!(site.correct, 6);
}
