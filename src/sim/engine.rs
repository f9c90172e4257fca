//! Simulation engine that drives the models, settlement, and ledger.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info};

use crate::devices::{ConsumptionModel, SolarModel};
use crate::error::{ConfigError, SimError};
use crate::profile::{EntityProfile, validate_profiles};
use crate::weather::CloudForecast;

use super::clock::{SimulationClock, Tick};
use super::ledger::Ledger;
use super::settlement::{EntityFlow, IntervalOutcome, SettlementEngine};
use super::types::{IntervalInput, SimConfig};

/// Simulation engine owning the entity population, models, and batteries.
///
/// Generic over the jitter source so tests can inject any seeded `Rng`.
/// Jitter is drawn once per entity per interval in ascending id order, so a
/// given seed always reproduces the same ledger.
pub struct Engine<R: Rng = StdRng> {
    config: SimConfig,
    /// Sorted by id.
    profiles: Vec<EntityProfile>,
    forecast: CloudForecast,
    solar: SolarModel,
    consumption: ConsumptionModel,
    settlement: SettlementEngine,
    rng: R,
}

impl Engine<StdRng> {
    /// Creates an engine whose jitter source is seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` listing every invalid setting or profile.
    pub fn new(
        config: SimConfig,
        profiles: Vec<EntityProfile>,
        forecast: CloudForecast,
    ) -> Result<Self, SimError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, profiles, forecast, rng)
    }
}

impl<R: Rng> Engine<R> {
    /// Creates an engine drawing jitter from `rng`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` listing every invalid setting or profile.
    pub fn with_rng(
        config: SimConfig,
        mut profiles: Vec<EntityProfile>,
        forecast: CloudForecast,
        rng: R,
    ) -> Result<Self, SimError> {
        let mut errors = config.validate();
        if profiles.is_empty() {
            errors.push(ConfigError::new("entity", "at least one entity is required"));
        }
        errors.extend(validate_profiles(&profiles));
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }

        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        let settlement = SettlementEngine::from_profiles(&profiles, config.min_reserve_fraction);
        let consumption = ConsumptionModel::new(config.jitter);

        Ok(Self {
            config,
            profiles,
            forecast,
            solar: SolarModel::default(),
            consumption,
            settlement,
            rng,
        })
    }

    /// Clock, season, and per-entity cloud cover for one tick.
    pub fn input(&self, tick: &Tick) -> IntervalInput {
        let hour_of_day = tick.hour_of_day();
        IntervalInput {
            index: tick.index,
            timestamp: tick.timestamp,
            hour: tick.hour(),
            hour_of_day,
            weekday: tick.weekday(),
            season: self.config.season.resolve(tick.timestamp),
            cloud_cover: self
                .profiles
                .iter()
                .map(|p| {
                    let cloud = self.forecast.cloud_for(hour_of_day, p.weather_sensitivity);
                    (p.id.clone(), cloud)
                })
                .collect(),
        }
    }

    /// Computes production and consumption for every entity and settles the interval.
    ///
    /// # Errors
    ///
    /// Propagates `SimError::InvariantViolation` from the post-interval checks.
    pub fn step(&mut self, tick: &Tick) -> Result<IntervalOutcome, SimError> {
        let input = self.input(tick);
        let dt = self.config.dt_hours();

        let mut flows = Vec::with_capacity(self.profiles.len());
        for profile in &self.profiles {
            let cloud = input.cloud_for(&profile.id);
            let production = self.solar.production(input.hour, profile.solar_capacity, cloud) * dt;
            let consumption = self.consumption.consumption(
                input.hour_of_day,
                input.weekday,
                input.season,
                profile,
                &mut self.rng,
            ) * dt;
            flows.push(EntityFlow::new(&profile.id, production, consumption));
        }

        debug!(
            index = input.index,
            timestamp = %input.timestamp,
            season = ?input.season,
            production_kwh = flows.iter().map(|f| f.production_kwh).sum::<f64>(),
            consumption_kwh = flows.iter().map(|f| f.consumption_kwh).sum::<f64>(),
            "interval inputs"
        );

        self.settlement.settle(input.timestamp, &flows)
    }

    /// Runs every configured interval and returns the ledger.
    ///
    /// Battery levels carry over between calls; a second call continues from
    /// the state the first one left behind.
    ///
    /// # Errors
    ///
    /// Stops at the first failing interval. Rows from earlier intervals are
    /// discarded with the partial ledger.
    pub fn run(&mut self) -> Result<Ledger, SimError> {
        let clock = SimulationClock::from_config(&self.config);
        info!(
            start = %self.config.start,
            intervals = self.config.intervals,
            interval_minutes = self.config.interval_minutes,
            entities = self.profiles.len(),
            seed = self.config.seed,
            "simulation started"
        );

        let mut ledger = Ledger::new();
        for tick in clock {
            ledger.append(self.step(&tick)?);
        }

        info!(
            intervals = ledger.intervals(),
            rows = ledger.rows().len(),
            trades = ledger.trades().len(),
            "simulation finished"
        );
        Ok(ledger)
    }

    /// Profiles in settlement order.
    pub fn profiles(&self) -> &[EntityProfile] {
        &self.profiles
    }

    /// Settlement state, including every entity's battery.
    pub fn settlement(&self) -> &SettlementEngine {
        &self.settlement
    }
}

/// Runs a complete simulation with jitter seeded from `config.seed`.
///
/// `config` carries the start time, interval count, and interval length.
///
/// # Errors
///
/// `SimError::Configuration` before any interval runs, or
/// `SimError::InvariantViolation` if a settled interval fails its checks.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use p2p_energy_sim::profile::{ConsumptionPattern, EntityProfile};
/// use p2p_energy_sim::sim::{self, types::SimConfig};
/// use p2p_energy_sim::weather::CloudForecast;
///
/// let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let profiles = vec![
///     EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 5.0, 10.0).with_can_sell(true),
///     EntityProfile::new("b", ConsumptionPattern::NightWorker, 2.0, 0.0, 0.0),
/// ];
/// let config = SimConfig::new(start, 60, 24, 7);
/// let ledger = sim::run(profiles, &config, &CloudForecast::constant(0.0)).unwrap();
/// assert_eq!(ledger.rows().len(), 48);
/// ```
pub fn run(
    profiles: Vec<EntityProfile>,
    config: &SimConfig,
    forecast: &CloudForecast,
) -> Result<Ledger, SimError> {
    Engine::new(config.clone(), profiles, forecast.clone())?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{BatteryStore, Jitter};
    use crate::profile::ConsumptionPattern;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn start(hour: u32) -> NaiveDateTime {
        // 2025-06-02 is a Monday.
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn flat_config(hour: u32, interval_minutes: u32, intervals: usize) -> SimConfig {
        let mut cfg = SimConfig::new(start(hour), interval_minutes, intervals, 1);
        cfg.jitter = Jitter::NONE;
        cfg
    }

    fn engine(cfg: SimConfig, profiles: Vec<EntityProfile>) -> Engine {
        Engine::new(cfg, profiles, CloudForecast::constant(0.0)).unwrap()
    }

    #[test]
    fn noon_step_matches_models() {
        let a = EntityProfile::new("a", ConsumptionPattern::HomeOffice, 2.0, 5.0, 0.0);
        let mut e = engine(flat_config(12, 60, 1), vec![a]);
        let tick = Tick { index: 0, timestamp: start(12) };
        let outcome = e.step(&tick).unwrap();
        let r = &outcome.results[0];
        assert_relative_eq!(r.production_kwh, 5.0, epsilon = 1e-9);
        // HomeOffice high window: 2.0 * 1.2
        assert_relative_eq!(r.consumption_kwh, 2.4, epsilon = 1e-9);
        assert_relative_eq!(r.grid_export_kwh, 2.6, epsilon = 1e-9);
    }

    #[test]
    fn sub_hourly_intervals_scale_energy() {
        let a = EntityProfile::new("a", ConsumptionPattern::HomeOffice, 2.0, 5.0, 0.0);
        let mut e = engine(flat_config(12, 15, 1), vec![a]);
        let tick = Tick { index: 0, timestamp: start(12) };
        let r = &e.step(&tick).unwrap().results[0];
        assert_relative_eq!(r.production_kwh, 1.25, epsilon = 1e-9);
        assert_relative_eq!(r.consumption_kwh, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn input_scales_cloud_by_sensitivity() {
        let a = EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 1.0, 0.0)
            .with_weather_sensitivity(0.5);
        let b = EntityProfile::new("b", ConsumptionPattern::DayWorker, 1.0, 1.0, 0.0);
        let e = Engine::new(
            flat_config(0, 60, 1),
            vec![b, a],
            CloudForecast::constant(0.8),
        )
        .unwrap();
        let input = e.input(&Tick { index: 0, timestamp: start(9) });
        assert_relative_eq!(input.cloud_for("a"), 0.4);
        assert_relative_eq!(input.cloud_for("b"), 0.8);
        assert_eq!(input.hour_of_day, 9);
        assert_eq!(input.season, None);
    }

    #[test]
    fn profiles_sorted_by_id() {
        let e = engine(
            flat_config(0, 60, 1),
            vec![
                EntityProfile::new("c", ConsumptionPattern::DayWorker, 1.0, 0.0, 0.0),
                EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 0.0, 0.0),
            ],
        );
        let ids: Vec<&str> = e.profiles().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn run_produces_one_row_per_entity_per_interval() {
        let profiles = vec![
            EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 5.0, 10.0)
                .with_can_sell(true),
            EntityProfile::new("b", ConsumptionPattern::NightWorker, 2.0, 0.0, 0.0),
        ];
        let ledger = run(profiles, &SimConfig::new(start(0), 30, 96, 3), &CloudForecast::default())
            .unwrap();
        assert_eq!(ledger.intervals(), 96);
        assert_eq!(ledger.rows().len(), 192);
        let last = start(0) + chrono::TimeDelta::minutes(30 * 95);
        assert_eq!(ledger.rows().last().map(|r| r.timestamp), Some(last));
    }

    #[test]
    fn battery_state_carries_across_intervals() {
        let a = EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 0.0, 10.0)
            .with_initial_battery(2.0);
        let mut e = engine(flat_config(0, 60, 3), vec![a]);
        let ledger = e.run().unwrap();
        // Night-time DayWorker demand is 0.8 kWh per hour.
        let levels: Vec<f64> = ledger.for_entity("a").map(|r| r.battery_level_kwh).collect();
        assert_relative_eq!(levels[0], 1.2, epsilon = 1e-9);
        assert_relative_eq!(levels[1], 0.4, epsilon = 1e-9);
        assert_relative_eq!(levels[2], 0.0, epsilon = 1e-9);
        assert_eq!(
            e.settlement().battery("a").map(BatteryStore::level_kwh),
            Some(levels[2])
        );
    }

    #[test]
    fn same_seed_same_ledger() {
        let profiles = vec![
            EntityProfile::new("a", ConsumptionPattern::WeekendActive, 3.0, 4.0, 5.0),
            EntityProfile::new("b", ConsumptionPattern::HomeOffice, 2.0, 0.0, 0.0),
        ];
        let cfg = SimConfig::new(start(0), 60, 48, 99);
        let first = run(profiles.clone(), &cfg, &CloudForecast::default()).unwrap();
        let second = run(profiles, &cfg, &CloudForecast::default()).unwrap();
        assert_eq!(first.rows(), second.rows());
    }

    #[test]
    fn invalid_setup_reports_every_problem() {
        let mut cfg = SimConfig::new(start(0), 60, 1, 0);
        cfg.min_reserve_fraction = 2.0;
        let bad = EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, -1.0, 0.0);
        let err = Engine::new(cfg, vec![bad], CloudForecast::default()).err();
        match err {
            Some(SimError::Configuration(errors)) => assert!(errors.len() >= 2),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn run_past_calendar_end_rejected_before_running() {
        let profiles = vec![
            EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 5.0, 10.0),
            EntityProfile::new("b", ConsumptionPattern::NightWorker, 2.0, 0.0, 0.0),
            EntityProfile::new("c", ConsumptionPattern::HomeOffice, 1.5, 0.0, 0.0),
        ];
        let cfg = SimConfig::new(start(0), 60, usize::MAX / 2, 1);
        match run(profiles, &cfg, &CloudForecast::default()) {
            Err(SimError::Configuration(errors)) => {
                assert!(errors.iter().any(|e| e.field == "simulation.intervals"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    fn jittered_profiles() -> Vec<EntityProfile> {
        vec![
            EntityProfile::new("a", ConsumptionPattern::DayWorker, 2.0, 4.0, 6.0)
                .with_can_sell(true),
            EntityProfile::new("b", ConsumptionPattern::NightWorker, 1.5, 0.0, 0.0),
        ]
    }

    #[test]
    fn injected_rng_drives_jitter() {
        let mut cfg = SimConfig::new(start(0), 60, 24, 17);
        let seeded = engine(cfg.clone(), jittered_profiles()).run().unwrap();

        let mut injected = Engine::with_rng(
            cfg.clone(),
            jittered_profiles(),
            CloudForecast::constant(0.0),
            StdRng::seed_from_u64(17),
        )
        .unwrap();
        assert_eq!(injected.run().unwrap().rows(), seeded.rows());

        // The injected source wins over `config.seed`.
        cfg.seed = 18;
        let mut other = Engine::with_rng(
            cfg,
            jittered_profiles(),
            CloudForecast::constant(0.0),
            StdRng::seed_from_u64(17),
        )
        .unwrap();
        assert_eq!(other.run().unwrap().rows(), seeded.rows());

        let mut reseeded = Engine::with_rng(
            SimConfig::new(start(0), 60, 24, 17),
            jittered_profiles(),
            CloudForecast::constant(0.0),
            StdRng::seed_from_u64(18),
        )
        .unwrap();
        assert_ne!(reseeded.run().unwrap().rows(), seeded.rows());
    }

    #[test]
    fn empty_population_rejected() {
        let err = Engine::new(flat_config(0, 60, 1), Vec::new(), CloudForecast::default()).err();
        assert!(matches!(err, Some(SimError::Configuration(_))));
    }
}
