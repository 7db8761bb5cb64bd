//! Resumable single-statement execution over the nested block structure.
//!
//! The stepper holds an explicit stack of [`Frame`]s, innermost last. Entering
//! a taken `if` pushes a frame whose table is a copy of the enclosing one;
//! leaving the body pops it and its bindings with it. When the top-level block
//! is exhausted the stack is rebuilt for the next iteration with only the
//! induction variable bound.

mod frame;

pub use frame::Frame;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use frame::block_for;

use crate::{
    evaluate, verify, BranchEvent, EvalError, LineRange, Program, ScopeError, Statement,
    StepOutcome, Transition, VariableTable,
};

/// Name of the variable rebound to the iteration number on every pass.
pub const INDUCTION_VARIABLE: &str = "i";

/// Table every iteration starts from: `{i: iteration}`.
#[must_use]
pub fn iteration_table(iteration: u64) -> VariableTable {
    VariableTable::with_binding(
        INDUCTION_VARIABLE,
        i64::try_from(iteration).unwrap_or(i64::MAX),
    )
}

/// Read-only snapshot of the execution position for renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StepperView {
    /// Iteration currently running.
    pub iteration: u64,
    /// Lines of the statement the next step will execute.
    pub lines: Option<LineRange>,
    /// Variable tables from outermost to innermost block.
    pub frames: Vec<VariableTable>,
}

/// Execution engine for one verified program.
///
/// A stepper only exists for a program that passed [`verify`], so stepping
/// never has to re-check scoping.
#[derive(Debug, Clone)]
pub struct Stepper {
    program: Program,
    frames: Vec<Frame>,
    iteration: u64,
    rng: SmallRng,
}

impl Stepper {
    /// Verifies `program` and positions execution at iteration 0.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScopeError`] found by [`verify`].
    pub fn new(program: Program) -> Result<Self, ScopeError> {
        Self::with_seed(program, 0)
    }

    /// Like [`Stepper::new`], seeding the generator behind `rand(..)`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScopeError`] found by [`verify`].
    pub fn with_seed(program: Program, seed: u64) -> Result<Self, ScopeError> {
        verify(&iteration_table(0), &program)?;
        Ok(Self {
            program,
            frames: vec![Frame::new(iteration_table(0))],
            iteration: 0,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// The program being executed.
    #[must_use]
    pub const fn program(&self) -> &Program {
        &self.program
    }

    /// Iteration currently running, starting at 0.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Active frames, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Bindings visible to the next statement.
    #[must_use]
    pub fn current_table(&self) -> Option<&VariableTable> {
        self.frames.last().map(Frame::table)
    }

    /// Statement the next step will execute; `None` for an empty program.
    #[must_use]
    pub fn current_statement(&self) -> Option<&Statement> {
        let (top, parents) = self.frames.split_last()?;
        let block = block_for(self.program.statements(), parents);
        block.get(top.index())
    }

    /// Lines to highlight for the next statement.
    #[must_use]
    pub fn current_lines(&self) -> Option<LineRange> {
        self.current_statement().map(Statement::lines)
    }

    /// Snapshot of iteration, highlight and tables.
    #[must_use]
    pub fn view(&self) -> StepperView {
        StepperView {
            iteration: self.iteration,
            lines: self.current_lines(),
            frames: self
                .frames
                .iter()
                .map(|frame| frame.table().clone())
                .collect(),
        }
    }

    /// Restarts from iteration 0 with `{i: 0}`.
    pub fn reset(&mut self) {
        self.start_iteration(0);
    }

    /// Executes exactly one statement.
    ///
    /// On error nothing is modified: the statement is evaluated before any
    /// binding or cursor changes.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if evaluation references a missing name.
    pub fn step(&mut self) -> Result<StepOutcome, EvalError> {
        let Some((top, parents)) = self.frames.split_last() else {
            return Ok(StepOutcome::Idle);
        };
        let block = block_for(self.program.statements(), parents);
        let Some(statement) = block.get(top.index()) else {
            return Ok(StepOutcome::Idle);
        };

        match statement {
            Statement::Let { name, value, lines } => {
                let lines = *lines;
                let value = evaluate(value, top.table(), &mut self.rng)?;
                let name = name.clone();
                if let Some(frame) = self.frames.last_mut() {
                    frame.table_mut().set(name, value);
                }
                let transition = self.advance();
                Ok(StepOutcome::Executed {
                    lines,
                    branch: None,
                    transition,
                })
            }
            Statement::If { cond, body, lines } => {
                let lines = *lines;
                let taken = evaluate(cond, top.table(), &mut self.rng)? != 0;
                let branch = BranchEvent {
                    pc: lines.start,
                    taken,
                };
                let transition = if taken && !body.is_empty() {
                    let table = top.table().clone();
                    self.frames.push(Frame::new(table));
                    Transition::EnteredBlock
                } else {
                    self.advance()
                };
                Ok(StepOutcome::Executed {
                    lines,
                    branch: Some(branch),
                    transition,
                })
            }
        }
    }

    fn advance(&mut self) -> Transition {
        let mut popped = 0;
        while let Some((top, parents)) = self.frames.split_last() {
            let len = block_for(self.program.statements(), parents).len();
            if top.index() + 1 < len {
                if let Some(frame) = self.frames.last_mut() {
                    frame.advance();
                }
                return if popped == 0 {
                    Transition::Advanced
                } else {
                    Transition::LeftBlocks { popped }
                };
            }
            if parents.is_empty() {
                break;
            }
            self.frames.pop();
            popped += 1;
        }

        self.start_iteration(self.iteration.wrapping_add(1));
        Transition::NewIteration {
            iteration: self.iteration,
        }
    }

    fn start_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
        self.frames.clear();
        self.frames.push(Frame::new(iteration_table(iteration)));
    }
}
