//! Core simulation types: run configuration, per-interval inputs, and ledger rows.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Weekday};
use serde::Serialize;

use crate::devices::{Jitter, Season};
use crate::error::ConfigError;

/// Minutes in one day; interval lengths must divide it evenly.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// How the season tag of each interval is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeasonMode {
    /// No seasonal adjustment.
    #[default]
    Off,
    /// The same season for every interval.
    Fixed(Season),
    /// Derived from the month of each interval's timestamp.
    Auto,
}

impl SeasonMode {
    pub fn resolve(&self, timestamp: NaiveDateTime) -> Option<Season> {
        match self {
            SeasonMode::Off => None,
            SeasonMode::Fixed(season) => Some(*season),
            SeasonMode::Auto => Some(Season::for_month(timestamp.month())),
        }
    }
}

/// Centralized simulation configuration.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use p2p_energy_sim::sim::types::SimConfig;
///
/// let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let cfg = SimConfig::new(start, 30, 48, 42);
/// assert_eq!(cfg.dt_hours(), 0.5);
/// assert!(cfg.validate().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Timestamp of the first interval.
    pub start: NaiveDateTime,
    /// Interval length in minutes; divides a day evenly.
    pub interval_minutes: u32,
    /// Number of intervals to simulate.
    pub intervals: usize,
    /// Master random seed for reproducibility.
    pub seed: u64,
    pub season: SeasonMode,
    /// Battery fraction a surplus entity must hold before it may sell to peers.
    pub min_reserve_fraction: f64,
    /// Demand jitter range.
    pub jitter: Jitter,
}

impl SimConfig {
    /// Creates a configuration with no seasonal adjustment, zero reserve, and
    /// the default 0.8–1.2 jitter.
    ///
    /// # Panics
    ///
    /// Panics if `interval_minutes` is zero or does not divide 1440.
    pub fn new(start: NaiveDateTime, interval_minutes: u32, intervals: usize, seed: u64) -> Self {
        assert!(
            interval_minutes > 0 && MINUTES_PER_DAY % interval_minutes == 0,
            "interval_minutes must divide a day evenly"
        );
        Self {
            start,
            interval_minutes,
            intervals,
            seed,
            season: SeasonMode::Off,
            min_reserve_fraction: 0.0,
            jitter: Jitter::default(),
        }
    }

    /// Duration of one interval in hours.
    pub fn dt_hours(&self) -> f64 {
        f64::from(self.interval_minutes) / 60.0
    }

    pub fn interval(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.interval_minutes))
    }

    /// Checks every run setting, collecting all failures.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.interval_minutes == 0 || MINUTES_PER_DAY % self.interval_minutes != 0 {
            errors.push(ConfigError::new(
                "simulation.interval_minutes",
                format!("must be > 0 and divide {MINUTES_PER_DAY}, got {}", self.interval_minutes),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_reserve_fraction) {
            errors.push(ConfigError::new(
                "simulation.min_reserve_fraction",
                format!("must be in [0, 1], got {}", self.min_reserve_fraction),
            ));
        }
        if self.interval_minutes > 0 {
            errors.extend(check_run_length(self.start, self.interval_minutes, self.intervals));
        }
        errors
    }
}

/// Rejects runs whose last interval lies past the representable calendar.
pub(crate) fn check_run_length(
    start: NaiveDateTime,
    interval_minutes: u32,
    intervals: usize,
) -> Option<ConfigError> {
    let end = i64::try_from(intervals)
        .ok()
        .and_then(|n| n.checked_mul(i64::from(interval_minutes)))
        .and_then(TimeDelta::try_minutes)
        .and_then(|span| start.checked_add_signed(span));
    match end {
        Some(_) => None,
        None => Some(ConfigError::new(
            "simulation.intervals",
            format!("{intervals} intervals of {interval_minutes} min overrun the calendar"),
        )),
    }
}

/// Clock and weather readings for one interval, shared by every entity.
#[derive(Debug, Clone)]
pub struct IntervalInput {
    /// Interval index from the start of the run.
    pub index: usize,
    pub timestamp: NaiveDateTime,
    /// Fractional hour of day in `[0, 24)`.
    pub hour: f64,
    /// Whole hour of day (0-23).
    pub hour_of_day: u32,
    pub weekday: Weekday,
    pub season: Option<Season>,
    /// Effective cloud cover fraction per entity id.
    pub cloud_cover: BTreeMap<String, f64>,
}

impl IntervalInput {
    /// Cloud cover for an entity, or full clear sky if none was supplied.
    pub fn cloud_for(&self, entity: &str) -> f64 {
        self.cloud_cover.get(entity).copied().unwrap_or(0.0)
    }
}

/// Energy routed directly from one entity to another within an interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerTrade {
    pub timestamp: NaiveDateTime,
    pub seller: String,
    pub buyer: String,
    pub energy_kwh: f64,
}

/// Ledger row: the settled energy balance of one entity over one interval.
///
/// All energy fields are kWh over the interval and never negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalResult {
    pub timestamp: NaiveDateTime,
    pub entity_id: String,
    pub consumption_kwh: f64,
    pub production_kwh: f64,
    /// Energy stored into the battery this interval.
    pub battery_charge_kwh: f64,
    /// Energy drawn from the battery this interval.
    pub battery_discharge_kwh: f64,
    /// Battery level after settlement.
    pub battery_level_kwh: f64,
    pub peer_sold_kwh: f64,
    pub peer_bought_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
}

impl IntervalResult {
    /// Energy entering the entity's balance: production, battery, peers, grid.
    pub fn inflow_kwh(&self) -> f64 {
        self.production_kwh
            + self.battery_discharge_kwh
            + self.peer_bought_kwh
            + self.grid_import_kwh
    }

    /// Energy leaving the entity's balance: demand, battery, peers, grid.
    pub fn outflow_kwh(&self) -> f64 {
        self.consumption_kwh + self.battery_charge_kwh + self.peer_sold_kwh + self.grid_export_kwh
    }
}

impl fmt::Display for IntervalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<10} | cons={:>7.3} prod={:>7.3} | bat +{:.3}/-{:.3} -> {:>7.3} kWh | \
             peer sold={:.3} bought={:.3} | grid in={:.3} out={:.3}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.entity_id,
            self.consumption_kwh,
            self.production_kwh,
            self.battery_charge_kwh,
            self.battery_discharge_kwh,
            self.battery_level_kwh,
            self.peer_sold_kwh,
            self.peer_bought_kwh,
            self.grid_import_kwh,
            self.grid_export_kwh,
        )
    }
}
