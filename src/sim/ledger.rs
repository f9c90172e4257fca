//! Append-only record of settled intervals.

use super::settlement::IntervalOutcome;
use super::types::{IntervalResult, PeerTrade};

/// Ordered ledger rows and peer trades of one run.
///
/// Rows are grouped by interval in time order and, within an interval, by
/// ascending entity id. Nothing already recorded is ever modified.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    rows: Vec<IntervalResult>,
    trades: Vec<PeerTrade>,
    intervals: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the outcome of one interval.
    pub(crate) fn append(&mut self, outcome: IntervalOutcome) {
        self.rows.extend(outcome.results);
        self.trades.extend(outcome.trades);
        self.intervals += 1;
    }

    pub fn rows(&self) -> &[IntervalResult] {
        &self.rows
    }

    pub fn trades(&self) -> &[PeerTrade] {
        &self.trades
    }

    /// Number of intervals recorded.
    pub fn intervals(&self) -> usize {
        self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one entity in time order.
    pub fn for_entity<'a>(
        &'a self,
        entity_id: &'a str,
    ) -> impl Iterator<Item = &'a IntervalResult> + 'a {
        self.rows.iter().filter(move |r| r.entity_id == entity_id)
    }

    /// Rows grouped by interval, in time order.
    pub fn by_interval(&self) -> impl Iterator<Item = &[IntervalResult]> {
        self.rows.chunk_by(|a, b| a.timestamp == b.timestamp)
    }
}
