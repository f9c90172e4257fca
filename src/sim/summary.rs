//! Post-hoc aggregates computed from a complete ledger.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::ledger::Ledger;

/// Community-wide energy totals for one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalTotals {
    pub timestamp: NaiveDateTime,
    pub consumption_kwh: f64,
    pub production_kwh: f64,
    pub peer_traded_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
}

/// Run-level indicators derived from a complete ledger.
///
/// Computed post-hoc so the reported figures always agree with the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub intervals: usize,
    pub entities: usize,
    pub total_consumption_kwh: f64,
    pub total_production_kwh: f64,
    pub total_grid_import_kwh: f64,
    pub total_grid_export_kwh: f64,
    /// Energy delivered between peers (sum of all trades).
    pub peer_traded_kwh: f64,
    /// Share of consumption not covered by grid imports (%).
    pub self_sufficiency_pct: f64,
    /// Largest community grid import in any single interval (kWh).
    pub peak_interval_import_kwh: f64,
    pub per_interval: Vec<IntervalTotals>,
}

impl LedgerSummary {
    /// Aggregates every row and trade of `ledger`.
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let per_interval: Vec<IntervalTotals> = ledger
            .by_interval()
            .map(|rows| IntervalTotals {
                timestamp: rows[0].timestamp,
                consumption_kwh: rows.iter().map(|r| r.consumption_kwh).sum(),
                production_kwh: rows.iter().map(|r| r.production_kwh).sum(),
                peer_traded_kwh: rows.iter().map(|r| r.peer_sold_kwh).sum(),
                grid_import_kwh: rows.iter().map(|r| r.grid_import_kwh).sum(),
                grid_export_kwh: rows.iter().map(|r| r.grid_export_kwh).sum(),
            })
            .collect();

        let total_consumption_kwh: f64 = per_interval.iter().map(|t| t.consumption_kwh).sum();
        let total_grid_import_kwh: f64 = per_interval.iter().map(|t| t.grid_import_kwh).sum();
        let self_sufficiency_pct = if total_consumption_kwh > 0.0 {
            (100.0 * (1.0 - total_grid_import_kwh / total_consumption_kwh)).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let mut entity_ids: Vec<&str> =
            ledger.rows().iter().map(|r| r.entity_id.as_str()).collect();
        entity_ids.sort_unstable();
        entity_ids.dedup();

        Self {
            intervals: per_interval.len(),
            entities: entity_ids.len(),
            total_consumption_kwh,
            total_production_kwh: per_interval.iter().map(|t| t.production_kwh).sum(),
            total_grid_import_kwh,
            total_grid_export_kwh: per_interval.iter().map(|t| t.grid_export_kwh).sum(),
            peer_traded_kwh: ledger.trades().iter().map(|t| t.energy_kwh).sum(),
            self_sufficiency_pct,
            peak_interval_import_kwh: per_interval
                .iter()
                .map(|t| t.grid_import_kwh)
                .fold(0.0, f64::max),
            per_interval,
        }
    }
}

impl fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Community Summary ---")?;
        writeln!(f, "Intervals x entities:  {} x {}", self.intervals, self.entities)?;
        writeln!(f, "Total consumption:     {:.2} kWh", self.total_consumption_kwh)?;
        writeln!(f, "Total production:      {:.2} kWh", self.total_production_kwh)?;
        writeln!(f, "Peer energy traded:    {:.2} kWh", self.peer_traded_kwh)?;
        writeln!(f, "Grid import:           {:.2} kWh", self.total_grid_import_kwh)?;
        writeln!(f, "Grid export:           {:.2} kWh", self.total_grid_export_kwh)?;
        writeln!(f, "Peak interval import:  {:.2} kWh", self.peak_interval_import_kwh)?;
        write!(f, "Self-sufficiency:      {:.1}%", self.self_sufficiency_pct)
    }
}
