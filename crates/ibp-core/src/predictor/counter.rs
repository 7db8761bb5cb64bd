//! Per-entry saturating counter state machines.

use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Counter width used by every entry of a predictor bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CounterMode {
    /// Single stored bit: predict the last outcome.
    OneBit,
    /// Classic four-state saturating counter.
    #[default]
    TwoBit,
}

impl CounterMode {
    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::OneBit => 1,
            Self::TwoBit => 2,
        }
    }
}

impl FromStr for CounterMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::OneBit),
            "2" => Ok(Self::TwoBit),
            other => Err(ConfigError::UnknownCounterMode(other.to_string())),
        }
    }
}

impl fmt::Display for CounterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// State of one predictor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CounterState {
    /// 1-bit entry holding the last observed outcome.
    LastOutcome(bool),
    /// 2-bit entry, confident not-taken.
    StronglyNotTaken,
    /// 2-bit entry, leaning not-taken.
    WeaklyNotTaken,
    /// 2-bit entry, leaning taken.
    WeaklyTaken,
    /// 2-bit entry, confident taken.
    StronglyTaken,
}

impl CounterState {
    /// Not-taken reset state for `mode`.
    #[must_use]
    pub const fn initial(mode: CounterMode) -> Self {
        match mode {
            CounterMode::OneBit => Self::LastOutcome(false),
            CounterMode::TwoBit => Self::StronglyNotTaken,
        }
    }

    /// Current prediction: `true` means taken.
    #[must_use]
    pub const fn predicts_taken(self) -> bool {
        match self {
            Self::LastOutcome(bit) => bit,
            Self::WeaklyTaken | Self::StronglyTaken => true,
            Self::StronglyNotTaken | Self::WeaklyNotTaken => false,
        }
    }

    /// Next state after observing `taken`.
    #[must_use]
    pub const fn observe(self, taken: bool) -> Self {
        match (self, taken) {
            (Self::LastOutcome(_), outcome) => Self::LastOutcome(outcome),
            (Self::StronglyNotTaken, true) => Self::WeaklyNotTaken,
            (Self::WeaklyNotTaken, true) => Self::WeaklyTaken,
            (Self::WeaklyTaken | Self::StronglyTaken, true) => Self::StronglyTaken,
            (Self::StronglyTaken, false) => Self::WeaklyTaken,
            (Self::WeaklyTaken, false) => Self::WeaklyNotTaken,
            (Self::WeaklyNotTaken | Self::StronglyNotTaken, false) => Self::StronglyNotTaken,
        }
    }

    /// Raw counter value: 0/1 for 1-bit, 0..=3 for 2-bit.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::LastOutcome(false) | Self::StronglyNotTaken => 0,
            Self::LastOutcome(true) | Self::WeaklyNotTaken => 1,
            Self::WeaklyTaken => 2,
            Self::StronglyTaken => 3,
        }
    }

    /// Short label for table rendering.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LastOutcome(false) => "N",
            Self::LastOutcome(true) => "T",
            Self::StronglyNotTaken => "SN",
            Self::WeaklyNotTaken => "WN",
            Self::WeaklyTaken => "WT",
            Self::StronglyTaken => "ST",
        }
    }
}
