use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike, Weekday};

use super::types::SimConfig;

/// One step of the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Interval index from the start of the run.
    pub index: usize,
    /// Start of the interval.
    pub timestamp: NaiveDateTime,
}

impl Tick {
    /// Fractional hour of day, e.g. `12.5` for 12:30.
    pub fn hour(&self) -> f64 {
        f64::from(self.timestamp.hour()) + f64::from(self.timestamp.minute()) / 60.0
    }

    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn weekday(&self) -> Weekday {
        self.timestamp.weekday()
    }
}

/// A simulation clock that walks a fixed number of equal-length intervals.
///
/// Timestamps advance strictly in order from the configured start; the clock
/// never skips or reorders intervals and stops once the count is reached.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use p2p_energy_sim::sim::clock::SimulationClock;
///
/// let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(22, 0, 0).unwrap();
/// let clock = SimulationClock::new(start, TimeDelta::hours(1), 3);
/// let hours: Vec<u32> = clock.map(|tick| tick.hour_of_day()).collect();
/// assert_eq!(hours, vec![22, 23, 0]);
/// ```
pub struct SimulationClock {
    /// Timestamp of the next interval
    next: NaiveDateTime,
    /// Interval length
    interval: TimeDelta,
    /// Current step of the simulation
    current: usize,
    /// Total steps to run in the simulation
    total: usize,
}

impl SimulationClock {
    /// Creates a new clock.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of the first interval
    /// * `interval` - Length of each interval
    /// * `total` - The total number of intervals the clock will produce
    pub fn new(start: NaiveDateTime, interval: TimeDelta, total: usize) -> Self {
        Self {
            next: start,
            interval,
            current: 0,
            total,
        }
    }

    /// Creates a clock covering the configured run.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.start, config.interval(), config.intervals)
    }

    /// Advances the clock by one interval.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The interval just reached
    /// * `None` - If the clock has produced all of its intervals
    pub fn tick(&mut self) -> Option<Tick> {
        if self.current >= self.total {
            return None;
        }
        let tick = Tick {
            index: self.current,
            timestamp: self.next,
        };
        self.current += 1;
        match self.next.checked_add_signed(self.interval) {
            Some(next) => self.next = next,
            // Calendar overflow: nothing further can be represented.
            None => self.total = self.current,
        }
        Some(tick)
    }
}

impl Iterator for SimulationClock {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        self.tick()
    }
}
