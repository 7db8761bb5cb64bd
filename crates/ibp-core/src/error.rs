use thiserror::Error;

/// Static verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ScopeError {
    /// A variable is referenced before any binding of it is in scope.
    #[error("undefined identifier `{name}` (line {line})")]
    UndefinedIdentifier {
        /// The unbound name.
        name: String,
        /// Start line of the statement containing the reference.
        line: usize,
    },
}

/// Evaluation failure; unreachable for verified programs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum EvalError {
    /// A variable was missing from the evaluation table.
    #[error("variable `{name}` is not bound in the current context")]
    UnboundVariable {
        /// The missing name.
        name: String,
    },
}

/// Rejected predictor configuration input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// Table size was negative.
    #[error("table size must not be negative (got {0})")]
    NegativeTableSize(i64),
    /// Table size was zero.
    #[error("table size must be at least 1")]
    EmptyTable,
    /// History width was negative.
    #[error("history width must not be negative (got {0})")]
    NegativeHistory(i64),
    /// History width exceeds the supported maximum.
    #[error("history width {got} exceeds the maximum of {max} bits")]
    HistoryTooWide {
        /// Requested width.
        got: i64,
        /// Largest supported width.
        max: u32,
    },
    /// Counter mode was not `1` or `2`.
    #[error("counter mode must be \"1\" or \"2\" (got {0:?})")]
    UnknownCounterMode(String),
}

/// Failure of a session-level operation. Prior state is left intact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Stepping was requested before a program compiled successfully.
    #[error("no verified program; compile before stepping")]
    NotVerified,
    /// The program failed scope verification.
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// A step failed to evaluate.
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),
    /// Predictor configuration was rejected.
    #[error("invalid predictor configuration: {0}")]
    Config(#[from] ConfigError),
    /// An auto-run ticket outlived an edit, reset or newer auto-run.
    #[error("auto-run was cancelled by a later edit or reset")]
    StaleAutoRun,
}
