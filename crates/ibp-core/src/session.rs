//! Process-scoped owner of the program slot, predictor bank and accuracy ledger.
//!
//! The three pieces have independent lifecycles. Editing or resetting the
//! program drops the stepper but never touches predictor tables or accuracy
//! counters; reconfiguring the predictor never touches the program.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::{
    Accuracy, Prediction, PredictorBank, PredictorConfig, Program, RunBoundary, RunOutcome,
    SessionError, StepOutcome, Stepper, TraceEvent, TraceSink, Transition,
};

/// Result of one session step: the stepper outcome plus the predictor's
/// verdict when the statement was a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SessionStep {
    /// What the stepper executed.
    pub outcome: StepOutcome,
    /// Predictor result for the branch, if one resolved.
    pub prediction: Option<Prediction>,
}

/// Permission to run a bounded number of paced steps.
///
/// A ticket is tied to the run generation it was issued in. Any edit, reset,
/// recompile or newer auto-run bumps the generation and invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoRunTicket {
    generation: u64,
    remaining: u32,
}

impl AutoRunTicket {
    /// Steps left to run.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns `true` once every requested step has run.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

/// Decision returned by a [`Pacer`] between two auto-run steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaceControl {
    /// Run the next step.
    Continue,
    /// Stop and invalidate the ticket.
    Cancel,
}

/// Inter-step delay hook for auto-run.
pub trait Pacer {
    /// Waits between steps and decides whether to keep going.
    fn pause(&mut self) -> PaceControl;
}

/// Pacer that never waits and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpaced;

impl Pacer for Unpaced {
    fn pause(&mut self) -> PaceControl {
        PaceControl::Continue
    }
}

struct DiscardTrace;

impl TraceSink for DiscardTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Interactive workbench state for one user.
#[derive(Debug, Clone)]
pub struct Session {
    stepper: Option<Stepper>,
    bank: PredictorBank,
    accuracy: Accuracy,
    generation: u64,
    seeds: SmallRng,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl Session {
    /// Creates a session with no program and a fresh predictor.
    #[must_use]
    pub fn new(config: PredictorConfig) -> Self {
        Self::with_seed(config, 0)
    }

    /// Creates a session whose `rand(..)` draws derive from `seed`.
    #[must_use]
    pub fn with_seed(config: PredictorConfig, seed: u64) -> Self {
        Self {
            stepper: None,
            bank: PredictorBank::new(config),
            accuracy: Accuracy::new(),
            generation: 0,
            seeds: SmallRng::seed_from_u64(seed),
        }
    }

    /// Verifies `program` and installs it at iteration 0.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Scope`] when verification fails; the previous
    /// program, if any, stays installed.
    pub fn compile(&mut self, program: Program) -> Result<(), SessionError> {
        let stepper = Stepper::with_seed(program, self.seeds.next_u64())?;
        self.stepper = Some(stepper);
        self.generation += 1;
        Ok(())
    }

    /// Drops the compiled program after a source edit.
    pub fn edit(&mut self) {
        self.stepper = None;
        self.generation += 1;
    }

    /// Restarts the compiled program from iteration 0.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotVerified`] when nothing is compiled.
    pub fn reset_execution(&mut self) -> Result<(), SessionError> {
        let stepper = self.stepper.as_mut().ok_or(SessionError::NotVerified)?;
        stepper.reset();
        self.generation += 1;
        Ok(())
    }

    /// Returns `true` when a verified program is installed.
    #[must_use]
    pub const fn is_compiled(&self) -> bool {
        self.stepper.is_some()
    }

    /// Installed stepper, if any.
    #[must_use]
    pub const fn stepper(&self) -> Option<&Stepper> {
        self.stepper.as_ref()
    }

    /// Predictor bank.
    #[must_use]
    pub const fn bank(&self) -> &PredictorBank {
        &self.bank
    }

    /// Accuracy ledger.
    #[must_use]
    pub const fn accuracy(&self) -> &Accuracy {
        &self.accuracy
    }

    /// Current run generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the predictor bank; the accuracy ledger is kept.
    pub fn reconfigure(&mut self, config: PredictorConfig) {
        self.bank.reconfigure(config);
    }

    /// Validates raw form inputs and reconfigures on success.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] and leaves the bank untouched when any
    /// input is rejected.
    pub fn configure(
        &mut self,
        table_size: i64,
        mode: &str,
        history_bits: i64,
    ) -> Result<(), SessionError> {
        let config = PredictorConfig::from_raw(table_size, mode, history_bits)?;
        self.reconfigure(config);
        Ok(())
    }

    /// Zeroes accuracy counters; predictor tables are kept.
    pub fn reset_accuracy(&mut self) {
        self.accuracy.reset();
    }

    /// Executes one statement and scores any resulting branch.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotVerified`] when nothing is compiled and
    /// [`SessionError::Eval`] when evaluation fails.
    pub fn step(&mut self) -> Result<SessionStep, SessionError> {
        self.step_traced(&mut DiscardTrace)
    }

    /// Like [`Session::step`], reporting trace events to `sink`.
    ///
    /// # Errors
    ///
    /// Same as [`Session::step`].
    pub fn step_traced(&mut self, sink: &mut dyn TraceSink) -> Result<SessionStep, SessionError> {
        let stepper = self.stepper.as_mut().ok_or(SessionError::NotVerified)?;
        let outcome = stepper.step()?;

        let StepOutcome::Executed {
            lines,
            branch,
            transition,
        } = outcome
        else {
            return Ok(SessionStep {
                outcome,
                prediction: None,
            });
        };

        sink.on_event(TraceEvent::StatementExecuted { lines });
        let prediction = branch.map(|event| {
            sink.on_event(TraceEvent::BranchResolved {
                pc: event.pc,
                taken: event.taken,
            });
            let prediction = self.bank.predict_and_update(event, &mut self.accuracy);
            sink.on_event(TraceEvent::PredictionRecorded {
                pc: event.pc,
                predicted: prediction.predicted,
                correct: prediction.correct,
            });
            prediction
        });
        if let Transition::NewIteration { iteration } = transition {
            sink.on_event(TraceEvent::IterationStarted { iteration });
        }

        Ok(SessionStep {
            outcome,
            prediction,
        })
    }

    /// Steps up to `max_steps` times, stopping early at `boundary`.
    ///
    /// An empty program stops the run immediately.
    ///
    /// # Errors
    ///
    /// Propagates the first step error; steps already taken stay applied.
    pub fn run(
        &mut self,
        boundary: RunBoundary,
        max_steps: u32,
        sink: &mut dyn TraceSink,
    ) -> Result<RunOutcome, SessionError> {
        let mut steps = 0;
        let mut branches = 0;
        let mut final_step = StepOutcome::Idle;

        while steps < max_steps {
            let step = self.step_traced(sink)?;
            final_step = step.outcome;
            if final_step == StepOutcome::Idle {
                break;
            }
            steps += 1;
            if step.prediction.is_some() {
                branches += 1;
            }
            let stop = match boundary {
                RunBoundary::Steps => false,
                RunBoundary::NextBranch => final_step.branch().is_some(),
                RunBoundary::IterationEnd => final_step.started_iteration(),
            };
            if stop {
                break;
            }
        }

        Ok(RunOutcome {
            steps,
            branches,
            final_step,
        })
    }

    /// Starts an auto-run of `steps` steps, cancelling any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotVerified`] when nothing is compiled.
    pub fn begin_auto_run(&mut self, steps: u32) -> Result<AutoRunTicket, SessionError> {
        if self.stepper.is_none() {
            return Err(SessionError::NotVerified);
        }
        self.generation += 1;
        Ok(AutoRunTicket {
            generation: self.generation,
            remaining: steps,
        })
    }

    /// Invalidates any outstanding auto-run ticket.
    pub fn cancel_auto_run(&mut self) {
        self.generation += 1;
    }

    /// Runs the next step of an auto-run; `Ok(None)` once it is finished.
    ///
    /// An idle step (empty program) finishes the ticket without counting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StaleAutoRun`] for a ticket from an older
    /// generation, otherwise the errors of [`Session::step`].
    pub fn advance_auto_run(
        &mut self,
        ticket: &mut AutoRunTicket,
        sink: &mut dyn TraceSink,
    ) -> Result<Option<SessionStep>, SessionError> {
        if ticket.generation != self.generation {
            return Err(SessionError::StaleAutoRun);
        }
        if ticket.is_finished() {
            return Ok(None);
        }
        let step = self.step_traced(sink)?;
        if step.outcome == StepOutcome::Idle {
            ticket.remaining = 0;
            return Ok(None);
        }
        ticket.remaining -= 1;
        Ok(Some(step))
    }

    /// Drives `ticket` to completion, consulting `pacer` between steps.
    ///
    /// Returns the number of steps executed. A [`PaceControl::Cancel`] stops
    /// the run and invalidates the ticket.
    ///
    /// # Errors
    ///
    /// Same as [`Session::advance_auto_run`].
    pub fn run_paced(
        &mut self,
        mut ticket: AutoRunTicket,
        pacer: &mut dyn Pacer,
        sink: &mut dyn TraceSink,
    ) -> Result<u32, SessionError> {
        let mut executed = 0;
        while self.advance_auto_run(&mut ticket, sink)?.is_some() {
            executed += 1;
            if ticket.is_finished() {
                break;
            }
            if pacer.pause() == PaceControl::Cancel {
                self.cancel_auto_run();
                break;
            }
        }
        Ok(executed)
    }
}
