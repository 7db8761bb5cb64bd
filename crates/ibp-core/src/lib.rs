//! Core interpreter and branch-predictor simulator for the IBP workbench.

/// Program tree, line ranges and variable tables.
pub mod ast;
pub use ast::{BinaryOp, Expr, LineRange, Program, Statement, UnaryOp, VariableTable};

/// Error taxonomy for verification, evaluation, configuration and sessions.
pub mod error;
pub use error::{ConfigError, EvalError, ScopeError, SessionError};

/// Static scope verification.
pub mod scope;
pub use scope::verify;

/// Expression evaluation over a variable table.
pub mod eval;
pub use eval::{apply_binary, apply_unary, draw_random, evaluate};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{BranchEvent, RunBoundary, RunOutcome, StepOutcome, TraceEvent, TraceSink, Transition};

/// Branch predictor tables, counters and accuracy.
pub mod predictor;
pub use predictor::{
    Accuracy, CounterMode, CounterState, Prediction, PredictorBank, PredictorConfig, PredictorTable,
    SiteAccuracy, DEFAULT_HISTORY_BITS, DEFAULT_TABLE_SIZE, MAX_HISTORY_BITS,
};

/// Statement-at-a-time program execution.
pub mod stepper;
pub use stepper::{iteration_table, Frame, Stepper, StepperView, INDUCTION_VARIABLE};

/// Interactive session tying program, predictor and accuracy together.
pub mod session;
pub use session::{AutoRunTicket, PaceControl, Pacer, Session, SessionStep, Unpaced};

#[cfg(test)]
use proptest as _;
