use chrono::Weekday;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::devices::types::Jitter;
use crate::profile::{ConsumptionPattern, EntityProfile};

/// Climate season used for the additive demand adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Summer,
    Winter,
    Monsoon,
}

impl Season {
    /// Season for a calendar month (1-12): Mar–Jun summer, Jul–Sep monsoon,
    /// Oct–Feb winter.
    pub fn for_month(month: u32) -> Season {
        match month {
            3..=6 => Season::Summer,
            7..=9 => Season::Monsoon,
            _ => Season::Winter,
        }
    }
}

/// Pattern-driven multiplicative factor on base demand.
///
/// | pattern | high window | high | low |
/// |---|---|---|---|
/// | DayWorker | 07:00–19:00 | 1.5 | 0.8 |
/// | NightWorker | before 06:00 or from 20:00 | 1.5 | 0.8 |
/// | HomeOffice | 09:00–17:00 | 1.2 | 1.0 |
/// | WeekendActive | Saturday, Sunday | 1.5 | 1.0 |
pub fn hour_factor(pattern: ConsumptionPattern, hour: u32, weekday: Weekday) -> f64 {
    match pattern {
        ConsumptionPattern::DayWorker => {
            if (7..=19).contains(&hour) {
                1.5
            } else {
                0.8
            }
        }
        ConsumptionPattern::NightWorker => {
            if hour < 6 || hour >= 20 {
                1.5
            } else {
                0.8
            }
        }
        ConsumptionPattern::HomeOffice => {
            if (9..=17).contains(&hour) {
                1.2
            } else {
                1.0
            }
        }
        ConsumptionPattern::WeekendActive => {
            if matches!(weekday, Weekday::Sat | Weekday::Sun) {
                1.5
            } else {
                1.0
            }
        }
    }
}

/// Additive adjustment to the hour factor for the given season.
///
/// Winter evenings (from 18:00) add 0.1, the rest of a winter day subtracts 0.1.
pub fn seasonal_adjustment(season: Option<Season>, hour: u32) -> f64 {
    match season {
        Some(Season::Summer) => 0.2,
        Some(Season::Winter) if hour >= 18 => 0.1,
        Some(Season::Winter) => -0.1,
        Some(Season::Monsoon) | None => 0.0,
    }
}

/// Deterministic demand rate (kWh per hour) before jitter.
///
/// Never negative; a zero base consumption yields zero regardless of factors.
pub fn hourly_demand(
    hour: u32,
    weekday: Weekday,
    season: Option<Season>,
    profile: &EntityProfile,
) -> f64 {
    let base = profile.base_consumption.max(0.0);
    if base == 0.0 {
        return 0.0;
    }
    let hour = hour % 24;
    let factor = hour_factor(profile.pattern, hour, weekday) + seasonal_adjustment(season, hour);
    (base * factor).max(0.0)
}

/// Demand model combining pattern, season, and an injected random jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumptionModel {
    jitter: Jitter,
}

impl ConsumptionModel {
    pub fn new(jitter: Jitter) -> Self {
        Self { jitter }
    }

    /// Demand rate (kWh per hour) for one entity, drawing one jitter factor from `rng`.
    pub fn consumption<R: Rng + ?Sized>(
        &self,
        hour: u32,
        weekday: Weekday,
        season: Option<Season>,
        profile: &EntityProfile,
        rng: &mut R,
    ) -> f64 {
        let factor = self.jitter.sample(rng);
        (hourly_demand(hour, weekday, season, profile) * factor).max(0.0)
    }
}
