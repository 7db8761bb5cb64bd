//! Pattern-history tables selected by a global history shift register.

use crate::{Accuracy, BranchEvent, ConfigError, CounterMode, CounterState};

/// Widest supported global history register.
pub const MAX_HISTORY_BITS: u32 = 16;

/// Default entries per table.
pub const DEFAULT_TABLE_SIZE: usize = 16;

/// Default global history width.
pub const DEFAULT_HISTORY_BITS: u32 = 2;

/// Validated predictor geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PredictorConfig {
    table_size: usize,
    mode: CounterMode,
    history_bits: u32,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            table_size: DEFAULT_TABLE_SIZE,
            mode: CounterMode::TwoBit,
            history_bits: DEFAULT_HISTORY_BITS,
        }
    }
}

impl PredictorConfig {
    /// Creates a configuration from typed values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTable`] for a zero table size and
    /// [`ConfigError::HistoryTooWide`] above [`MAX_HISTORY_BITS`].
    pub fn new(
        table_size: usize,
        mode: CounterMode,
        history_bits: u32,
    ) -> Result<Self, ConfigError> {
        if table_size == 0 {
            return Err(ConfigError::EmptyTable);
        }
        if history_bits > MAX_HISTORY_BITS {
            return Err(ConfigError::HistoryTooWide {
                got: i64::from(history_bits),
                max: MAX_HISTORY_BITS,
            });
        }
        Ok(Self {
            table_size,
            mode,
            history_bits,
        })
    }

    /// Creates a configuration from raw form inputs (`M`, `N`, `P`).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for negative sizes or widths, a zero table
    /// size, an oversized history, or a mode other than `"1"`/`"2"`.
    pub fn from_raw(table_size: i64, mode: &str, history_bits: i64) -> Result<Self, ConfigError> {
        if table_size < 0 {
            return Err(ConfigError::NegativeTableSize(table_size));
        }
        if history_bits < 0 {
            return Err(ConfigError::NegativeHistory(history_bits));
        }
        let mode = mode.parse::<CounterMode>()?;
        let history = u32::try_from(history_bits)
            .ok()
            .filter(|bits| *bits <= MAX_HISTORY_BITS)
            .ok_or(ConfigError::HistoryTooWide {
                got: history_bits,
                max: MAX_HISTORY_BITS,
            })?;
        let size =
            usize::try_from(table_size).map_err(|_| ConfigError::NegativeTableSize(table_size))?;
        Self::new(size, mode, history)
    }

    /// Entries per table (`M`).
    #[must_use]
    pub const fn table_size(&self) -> usize {
        self.table_size
    }

    /// Counter width (`N`).
    #[must_use]
    pub const fn mode(&self) -> CounterMode {
        self.mode
    }

    /// Global history width (`P`).
    #[must_use]
    pub const fn history_bits(&self) -> u32 {
        self.history_bits
    }

    /// Number of tables in the bank (`2^P`).
    #[must_use]
    pub const fn table_count(&self) -> usize {
        1 << self.history_bits
    }

    /// Mask keeping the history register inside `[0, 2^P)`.
    #[must_use]
    pub const fn history_mask(&self) -> u32 {
        (1 << self.history_bits) - 1
    }
}

/// One pattern-history table of `M` counters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PredictorTable {
    entries: Vec<CounterState>,
}

impl PredictorTable {
    fn new(config: &PredictorConfig) -> Self {
        Self {
            entries: vec![CounterState::initial(config.mode); config.table_size],
        }
    }

    /// Entries in address order.
    #[must_use]
    pub fn entries(&self) -> &[CounterState] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for a table without entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of scoring and learning one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Prediction {
    /// Table selected by the history register before the update.
    pub table: usize,
    /// Entry index (`pc mod M`) inside that table.
    pub entry: usize,
    /// Direction predicted before seeing the outcome.
    pub predicted: bool,
    /// Actual outcome.
    pub taken: bool,
    /// Whether `predicted == taken`.
    pub correct: bool,
    /// Entry state after the update.
    pub state: CounterState,
}

/// `2^P` tables of `M` counters plus the global history register.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PredictorBank {
    config: PredictorConfig,
    tables: Vec<PredictorTable>,
    history: u32,
    last_touched: Option<(usize, usize)>,
}

impl Default for PredictorBank {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl PredictorBank {
    /// Creates a bank with every entry not-taken and an empty history.
    #[must_use]
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            tables: vec![PredictorTable::new(&config); config.table_count()],
            history: 0,
            last_touched: None,
        }
    }

    /// Replaces every table and clears the history register.
    pub fn reconfigure(&mut self, config: PredictorConfig) {
        *self = Self::new(config);
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Tables indexed by history value.
    #[must_use]
    pub fn tables(&self) -> &[PredictorTable] {
        &self.tables
    }

    /// Current global history register value.
    #[must_use]
    pub const fn history(&self) -> u32 {
        self.history
    }

    /// History register as a `P`-character bitstring, most recent outcome last.
    #[must_use]
    pub fn history_string(&self) -> String {
        let width = self.config.history_bits as usize;
        if width == 0 {
            return String::new();
        }
        format!("{:0width$b}", self.history)
    }

    /// `(table, entry)` updated by the most recent branch.
    #[must_use]
    pub const fn last_touched(&self) -> Option<(usize, usize)> {
        self.last_touched
    }

    /// Entry index addressed by `pc`.
    #[must_use]
    pub const fn entry_index(&self, pc: usize) -> usize {
        pc % self.config.table_size
    }

    /// Prediction the bank would make for `pc` right now.
    #[must_use]
    pub fn predict(&self, pc: usize) -> bool {
        self.current_state(pc).predicts_taken()
    }

    fn current_state(&self, pc: usize) -> CounterState {
        let table = &self.tables[self.history as usize];
        table.entries[self.entry_index(pc)]
    }

    /// Scores `event` against the current prediction, records the result in
    /// `accuracy`, then trains the entry and shifts the history register.
    pub fn predict_and_update(
        &mut self,
        event: BranchEvent,
        accuracy: &mut Accuracy,
    ) -> Prediction {
        let table = self.history as usize;
        let entry = self.entry_index(event.pc);
        let before = self.tables[table].entries[entry];
        let predicted = before.predicts_taken();
        let correct = predicted == event.taken;
        accuracy.record(event.pc, correct);

        let state = before.observe(event.taken);
        self.tables[table].entries[entry] = state;
        self.last_touched = Some((table, entry));

        if self.config.history_bits > 0 {
            self.history =
                ((self.history << 1) | u32::from(event.taken)) & self.config.history_mask();
        }

        Prediction {
            table,
            entry,
            predicted,
            taken: event.taken,
            correct,
            state,
        }
    }
}
