//! Prediction accuracy bookkeeping, global and per branch site.

use std::collections::BTreeMap;

/// Total and correct prediction counts for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SiteAccuracy {
    /// Branches observed.
    pub total: u64,
    /// Branches whose prediction matched the outcome.
    pub correct: u64,
}

impl SiteAccuracy {
    /// Records one scored branch.
    pub const fn record(&mut self, correct: bool) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    /// Fraction of correct predictions, or `None` before the first branch.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Process-lifetime accuracy ledger, reset only on request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Accuracy {
    global: SiteAccuracy,
    sites: BTreeMap<usize, SiteAccuracy>,
}

impl Accuracy {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            global: SiteAccuracy {
                total: 0,
                correct: 0,
            },
            sites: BTreeMap::new(),
        }
    }

    /// Records a scored branch at `pc`.
    pub fn record(&mut self, pc: usize, correct: bool) {
        self.global.record(correct);
        self.sites.entry(pc).or_default().record(correct);
    }

    /// Counters over every branch.
    #[must_use]
    pub const fn global(&self) -> SiteAccuracy {
        self.global
    }

    /// Counters for one site; zero when the site never branched.
    #[must_use]
    pub fn site(&self, pc: usize) -> SiteAccuracy {
        self.sites.get(&pc).copied().unwrap_or_default()
    }

    /// Sites in ascending line order.
    pub fn sites(&self) -> impl Iterator<Item = (usize, SiteAccuracy)> + '_ {
        self.sites.iter().map(|(pc, site)| (*pc, *site))
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
