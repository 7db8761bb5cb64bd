//! Host-facing value types exchanged between the stepper, the predictor bank
//! and whatever drives them.

use crate::LineRange;

/// Outcome of one resolved `if` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BranchEvent {
    /// Program counter: the start line of the `if` statement.
    pub pc: usize,
    /// `true` when the condition evaluated nonzero.
    pub taken: bool,
}

/// How the execution cursor moved after a statement retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Transition {
    /// Cursor moved to the next statement of the same block.
    Advanced,
    /// A taken `if` pushed a context for its body.
    EnteredBlock,
    /// One or more exhausted blocks were popped before advancing.
    LeftBlocks {
        /// Number of contexts popped.
        popped: usize,
    },
    /// The top-level block was exhausted and a fresh iteration began.
    NewIteration {
        /// Iteration number now running.
        iteration: u64,
    },
}

/// Output status from one `step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// Nothing to execute (empty program).
    Idle,
    /// Exactly one statement executed.
    Executed {
        /// Lines of the executed statement.
        lines: LineRange,
        /// Branch event when the statement was an `if`.
        branch: Option<BranchEvent>,
        /// Cursor movement after execution.
        transition: Transition,
    },
}

impl StepOutcome {
    /// Branch event emitted by this step, if any.
    #[must_use]
    pub const fn branch(&self) -> Option<BranchEvent> {
        match self {
            Self::Executed { branch, .. } => *branch,
            Self::Idle => None,
        }
    }

    /// Lines of the executed statement, if any.
    #[must_use]
    pub const fn lines(&self) -> Option<LineRange> {
        match self {
            Self::Executed { lines, .. } => Some(*lines),
            Self::Idle => None,
        }
    }

    /// Returns `true` when this step wrapped into a new iteration.
    #[must_use]
    pub const fn started_iteration(&self) -> bool {
        matches!(
            self,
            Self::Executed {
                transition: Transition::NewIteration { .. },
                ..
            }
        )
    }
}

/// Stop condition for batched stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunBoundary {
    /// Run exactly the requested number of steps.
    Steps,
    /// Stop right after the next `if` resolves.
    NextBranch,
    /// Stop right after the current iteration wraps.
    IterationEnd,
}

/// Aggregated outcome of a batched run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Number of steps executed during the call.
    pub steps: u32,
    /// Number of branch events fed to the predictor.
    pub branches: u32,
    /// Last step-level status observed before returning.
    pub final_step: StepOutcome,
}

/// Deterministic trace events emitted at step boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// A statement retired.
    StatementExecuted {
        /// Lines of the statement.
        lines: LineRange,
    },
    /// An `if` condition resolved.
    BranchResolved {
        /// Program counter of the branch.
        pc: usize,
        /// Resolved direction.
        taken: bool,
    },
    /// The predictor scored a branch.
    PredictionRecorded {
        /// Program counter of the branch.
        pc: usize,
        /// Predicted direction before the update.
        predicted: bool,
        /// Whether the prediction matched the outcome.
        correct: bool,
    },
    /// A fresh iteration began.
    IterationStarted {
        /// Iteration number now running.
        iteration: u64,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{BranchEvent, StepOutcome, TraceEvent, TraceSink, Transition};
    use crate::LineRange;

    #[test]
    fn idle_outcome_has_no_branch_or_lines() {
        assert_eq!(StepOutcome::Idle.branch(), None);
        assert_eq!(StepOutcome::Idle.lines(), None);
        assert!(!StepOutcome::Idle.started_iteration());
    }

    #[test]
    fn executed_outcome_exposes_branch_and_wrap() {
        let event = BranchEvent { pc: 2, taken: true };
        let outcome = StepOutcome::Executed {
            lines: LineRange::new(2, 4),
            branch: Some(event),
            transition: Transition::NewIteration { iteration: 1 },
        };
        assert_eq!(outcome.branch(), Some(event));
        assert_eq!(outcome.lines(), Some(LineRange::new(2, 4)));
        assert!(outcome.started_iteration());
    }

    #[test]
    fn vec_sink_preserves_order() {
        let mut sink: Vec<TraceEvent> = Vec::new();
        sink.on_event(TraceEvent::IterationStarted { iteration: 1 });
        sink.on_event(TraceEvent::BranchResolved {
            pc: 3,
            taken: false,
        });
        assert_eq!(
            sink,
            vec![
                TraceEvent::IterationStarted { iteration: 1 },
                TraceEvent::BranchResolved {
                    pc: 3,
                    taken: false
                },
            ]
        );
    }
}
