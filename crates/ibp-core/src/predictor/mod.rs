//! Branch predictor simulator: counters, tables, history and accuracy.

/// Accuracy ledger.
pub mod accuracy;
/// Pattern-history table bank and configuration.
pub mod bank;
/// Saturating counter state machines.
pub mod counter;

pub use accuracy::{Accuracy, SiteAccuracy};
pub use bank::{
    Prediction, PredictorBank, PredictorConfig, PredictorTable, DEFAULT_HISTORY_BITS,
    DEFAULT_TABLE_SIZE, MAX_HISTORY_BITS,
};
pub use counter::{CounterMode, CounterState};
