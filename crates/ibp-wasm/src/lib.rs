#![allow(clippy::missing_errors_doc)]

use ibp_core::{
    AutoRunTicket, BranchEvent, LineRange, Prediction, PredictorConfig, Session, SessionError,
    SiteAccuracy, StepOutcome, Stepper, StepperView, TraceEvent,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format!($($t)*)))
}

/// JS-compatible result of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub idle: bool,
    pub lines: Option<LineRange>,
    pub branch: Option<BranchEvent>,
    pub prediction: Option<Prediction>,
    pub iteration: u64,
    pub next_lines: Option<LineRange>,
}

/// One predictor table as counter labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub index: usize,
    pub entries: Vec<String>,
}

/// Predictor configuration, tables and history register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorView {
    pub table_size: usize,
    pub counter_bits: u8,
    pub history_bits: u32,
    pub history: String,
    pub tables: Vec<TableView>,
    pub last_touched: Option<(usize, usize)>,
}

/// Hit counts for one branch site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteView {
    pub pc: usize,
    pub total: u64,
    pub correct: u64,
    pub ratio: Option<f64>,
}

/// Global and per-site accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyView {
    pub global: SiteView,
    pub sites: Vec<SiteView>,
}

fn site_view(pc: usize, site: SiteAccuracy) -> SiteView {
    SiteView {
        pc,
        total: site.total,
        correct: site.correct,
        ratio: site.ratio(),
    }
}

#[wasm_bindgen]
pub struct WasmSession {
    session: Session,
    auto_run: Option<(u32, AutoRunTicket)>,
    next_ticket: u32,
}

impl Default for WasmSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seed = (js_sys::Math::random() * 4_294_967_296.0) as u64;
        Self::with_seed(seed)
    }

    /// Parses and verifies `source`, replacing the current program.
    pub fn compile(&mut self, source: &str) -> Result<(), JsValue> {
        self.compile_source(source).map_err(JsValue::from)?;
        console_log!(
            "Compiled {} top-level statements",
            self.session
                .stepper()
                .map_or(0, |stepper| stepper.program().statements().len())
        );
        Ok(())
    }

    /// Drops the compiled program after an editor change.
    pub fn edit(&mut self) {
        self.mark_edited();
    }

    /// Restarts the compiled program from iteration 0.
    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.restart().map_err(JsValue::from)
    }

    /// Executes one statement and returns a `StepView`.
    pub fn step(&mut self) -> Result<JsValue, JsValue> {
        let view = self.step_once().map_err(JsValue::from)?;
        Ok(serde_wasm_bindgen::to_value(&view)?)
    }

    /// Starts a paced run of `steps` statements and returns its ticket id.
    pub fn begin_auto_run(&mut self, steps: u32) -> Result<u32, JsValue> {
        self.start_auto_run(steps).map_err(JsValue::from)
    }

    /// Runs the next auto-run step; `null` once the ticket is finished or stale.
    pub fn auto_step(&mut self, ticket: u32) -> Result<JsValue, JsValue> {
        match self.advance_ticket(ticket).map_err(JsValue::from)? {
            Some(view) => Ok(serde_wasm_bindgen::to_value(&view)?),
            None => Ok(JsValue::NULL),
        }
    }

    /// Cancels any auto-run in progress.
    pub fn stop_auto_run(&mut self) {
        self.auto_run = None;
        self.session.cancel_auto_run();
    }

    /// Validates raw form values and rebuilds the predictor tables.
    pub fn configure(
        &mut self,
        table_size: i32,
        counter: &str,
        history_bits: i32,
    ) -> Result<(), JsValue> {
        self.apply_config(i64::from(table_size), counter, i64::from(history_bits))
            .map_err(JsValue::from)?;
        let config = self.session.bank().config();
        console_log!(
            "Predictor reconfigured: {} entries, {}, {} history bits",
            config.table_size(),
            config.mode(),
            config.history_bits()
        );
        Ok(())
    }

    /// Zeroes accuracy counters.
    pub fn reset_accuracy(&mut self) {
        self.session.reset_accuracy();
    }

    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.session.is_compiled()
    }

    /// Returns a `PredictorView`.
    pub fn predictor(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.predictor_view())?)
    }

    /// Returns an `AccuracyView`.
    pub fn accuracy(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.accuracy_view())?)
    }

    /// Returns the stepper snapshot, or `null` before compilation.
    pub fn stepper(&self) -> Result<JsValue, JsValue> {
        match self.stepper_view() {
            Some(view) => Ok(serde_wasm_bindgen::to_value(&view)?),
            None => Ok(JsValue::NULL),
        }
    }
}

impl WasmSession {
    /// Session with the default predictor and a fixed `rand(..)` seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            session: Session::with_seed(PredictorConfig::default(), seed),
            auto_run: None,
            next_ticket: 0,
        }
    }

    /// Parses and verifies `source`; errors are user-facing messages.
    pub fn compile_source(&mut self, source: &str) -> Result<(), String> {
        let program = ibp_frontend::parse(source).map_err(|e| e.to_string())?;
        self.auto_run = None;
        self.session.compile(program).map_err(|e| e.to_string())
    }

    pub fn mark_edited(&mut self) {
        self.auto_run = None;
        self.session.edit();
    }

    pub fn restart(&mut self) -> Result<(), String> {
        self.auto_run = None;
        self.session.reset_execution().map_err(|e| e.to_string())
    }

    pub fn step_once(&mut self) -> Result<StepView, String> {
        let step = self.session.step().map_err(|e| e.to_string())?;
        Ok(self.step_view(step.outcome, step.prediction))
    }

    pub fn start_auto_run(&mut self, steps: u32) -> Result<u32, String> {
        let ticket = self
            .session
            .begin_auto_run(steps)
            .map_err(|e| e.to_string())?;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.auto_run = Some((self.next_ticket, ticket));
        Ok(self.next_ticket)
    }

    /// `Ok(None)` once the ticket is finished, superseded or invalidated.
    pub fn advance_ticket(&mut self, id: u32) -> Result<Option<StepView>, String> {
        let Some((current, mut ticket)) = self.auto_run else {
            return Ok(None);
        };
        if current != id {
            return Ok(None);
        }
        let mut sink: Vec<TraceEvent> = Vec::new();
        match self.session.advance_auto_run(&mut ticket, &mut sink) {
            Ok(Some(step)) => {
                self.auto_run = (!ticket.is_finished()).then_some((current, ticket));
                Ok(Some(self.step_view(step.outcome, step.prediction)))
            }
            Ok(None) | Err(SessionError::StaleAutoRun) => {
                self.auto_run = None;
                Ok(None)
            }
            Err(e) => {
                self.auto_run = None;
                Err(e.to_string())
            }
        }
    }

    /// Rejected values leave the predictor unchanged.
    pub fn apply_config(
        &mut self,
        table_size: i64,
        counter: &str,
        history_bits: i64,
    ) -> Result<(), String> {
        self.session
            .configure(table_size, counter, history_bits)
            .map_err(|e| e.to_string())
    }

    fn step_view(&self, outcome: StepOutcome, prediction: Option<Prediction>) -> StepView {
        let stepper = self.session.stepper();
        StepView {
            idle: outcome == StepOutcome::Idle,
            lines: outcome.lines(),
            branch: outcome.branch(),
            prediction,
            iteration: stepper.map_or(0, Stepper::iteration),
            next_lines: stepper.and_then(Stepper::current_lines),
        }
    }

    #[must_use]
    pub fn predictor_view(&self) -> PredictorView {
        let bank = self.session.bank();
        let config = bank.config();
        PredictorView {
            table_size: config.table_size(),
            counter_bits: config.mode().bits(),
            history_bits: config.history_bits(),
            history: bank.history_string(),
            tables: bank
                .tables()
                .iter()
                .enumerate()
                .map(|(index, table)| TableView {
                    index,
                    entries: table
                        .entries()
                        .iter()
                        .map(|state| state.label().to_string())
                        .collect(),
                })
                .collect(),
            last_touched: bank.last_touched(),
        }
    }

    #[must_use]
    pub fn accuracy_view(&self) -> AccuracyView {
        let accuracy = self.session.accuracy();
        AccuracyView {
            global: site_view(0, accuracy.global()),
            sites: accuracy
                .sites()
                .map(|(pc, site)| site_view(pc, site))
                .collect(),
        }
    }

    #[must_use]
    pub fn stepper_view(&self) -> Option<StepperView> {
        self.session.stepper().map(Stepper::view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "let x = 5;\nif (x > 0) {\n    let y = 1;\n}\n";

    #[test]
    fn stepping_requires_a_compiled_program() {
        let mut session = WasmSession::with_seed(1);
        let error = session.step_once().expect_err("nothing compiled");
        assert!(error.contains("no verified program"), "{error}");
    }

    #[test]
    fn compile_surfaces_parse_and_scope_errors() {
        let mut session = WasmSession::with_seed(1);
        let parse = session.compile_source("let = 1;").expect_err("syntax");
        assert!(parse.starts_with("1:5:"), "{parse}");

        let scope = session.compile_source("let a = b;").expect_err("scope");
        assert_eq!(scope, "undefined identifier `b` (line 1)");
        assert!(!session.session.is_compiled());
    }

    #[test]
    fn step_views_follow_the_sample_program() {
        let mut session = WasmSession::with_seed(1);
        session.compile_source(SAMPLE).expect("compiles");

        let first = session.step_once().expect("step");
        assert_eq!(first.lines, Some(LineRange::single(1)));
        assert_eq!(first.next_lines, Some(LineRange::new(2, 4)));

        let second = session.step_once().expect("step");
        assert_eq!(second.branch, Some(BranchEvent { pc: 2, taken: true }));
        let prediction = second.prediction.expect("scored");
        assert!(!prediction.correct);

        let third = session.step_once().expect("step");
        assert_eq!(third.iteration, 1);
        assert_eq!(third.next_lines, Some(LineRange::single(1)));
    }

    #[test]
    fn auto_run_ticket_is_dropped_on_edit() {
        let mut session = WasmSession::with_seed(1);
        session.compile_source(SAMPLE).expect("compiles");
        let ticket = session.start_auto_run(2).expect("compiled");

        assert!(session.advance_ticket(ticket).expect("step").is_some());
        session.mark_edited();
        assert_eq!(session.advance_ticket(ticket), Ok(None));
    }

    #[test]
    fn auto_run_ends_after_requested_steps() {
        let mut session = WasmSession::with_seed(1);
        session.compile_source(SAMPLE).expect("compiles");
        let ticket = session.start_auto_run(2).expect("compiled");

        assert!(session.advance_ticket(ticket).expect("step").is_some());
        assert!(session.advance_ticket(ticket).expect("step").is_some());
        assert_eq!(session.advance_ticket(ticket), Ok(None));
    }

    #[test]
    fn newer_ticket_supersedes_older() {
        let mut session = WasmSession::with_seed(1);
        session.compile_source(SAMPLE).expect("compiles");
        let old = session.start_auto_run(5).expect("compiled");
        let new = session.start_auto_run(5).expect("compiled");

        assert_eq!(session.advance_ticket(old), Ok(None));
        assert!(session.advance_ticket(new).expect("step").is_some());
    }

    #[test]
    fn configure_rejects_bad_values_and_keeps_tables() {
        let mut session = WasmSession::with_seed(1);
        let before = session.predictor_view();

        assert!(session.apply_config(-1, "2", 2).is_err());
        assert!(session.apply_config(16, "3", 2).is_err());
        assert_eq!(session.predictor_view(), before);

        session.apply_config(4, "1", 1).expect("valid");
        let view = session.predictor_view();
        assert_eq!(view.counter_bits, 1);
        assert_eq!(view.tables.len(), 2);
        assert_eq!(view.tables[0].entries, vec!["N"; 4]);
        assert_eq!(view.history, "0");
    }

    #[test]
    fn views_serialize_for_the_renderer() {
        let mut session = WasmSession::with_seed(1);
        session.compile_source(SAMPLE).expect("compiles");
        session.step_once().expect("step");
        session.step_once().expect("step");

        let predictor = serde_json::to_value(session.predictor_view()).expect("json");
        assert_eq!(predictor["history"], "01");
        assert_eq!(predictor["last_touched"], serde_json::json!([0, 2]));

        let accuracy = serde_json::to_value(session.accuracy_view()).expect("json");
        assert_eq!(accuracy["global"]["total"], 1);
        assert_eq!(accuracy["sites"][0]["pc"], 2);

        let stepper = serde_json::to_value(session.stepper_view()).expect("json");
        assert_eq!(stepper["frames"][1]["x"], 5);
    }
}
