//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use p2p_energy_sim::devices::Jitter;
use p2p_energy_sim::profile::{ConsumptionPattern, EntityProfile};
use p2p_energy_sim::sim::Ledger;
use p2p_energy_sim::sim::balance::CONSERVATION_TOLERANCE;
use p2p_energy_sim::sim::types::SimConfig;

/// Monday 2025-06-02 at the given hour.
pub fn monday_at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

/// Hourly, one day from midnight, seed 42, default jitter.
pub fn default_config() -> SimConfig {
    SimConfig::new(monday_at(0), 60, 24, 42)
}

/// Like `default_config` but without demand jitter, starting at `hour`.
pub fn flat_config(hour: u32, intervals: usize) -> SimConfig {
    let mut config = SimConfig::new(monday_at(hour), 60, intervals, 42);
    config.jitter = Jitter::NONE;
    config
}

/// Selling prosumer: 5 kWh/h solar, 10 kWh battery at 5 kWh.
///
/// Weekend-active demand has a factor of exactly 1.0 on weekdays, so
/// consumption equals `base` at every weekday hour.
pub fn prosumer_a(base: f64) -> EntityProfile {
    EntityProfile::new("a", ConsumptionPattern::WeekendActive, base, 5.0, 10.0)
        .with_initial_battery(5.0)
        .with_can_sell(true)
}

/// Pure consumer without solar or battery.
pub fn consumer_b(base: f64) -> EntityProfile {
    EntityProfile::new("b", ConsumptionPattern::WeekendActive, base, 0.0, 0.0)
}

/// Mixed population covering every pattern, sellers with and without batteries.
pub fn mixed_population() -> Vec<EntityProfile> {
    vec![
        EntityProfile::new("house_1", ConsumptionPattern::DayWorker, 1.2, 4.0, 8.0)
            .with_can_sell(true),
        EntityProfile::new("house_2", ConsumptionPattern::NightWorker, 1.5, 0.0, 5.0),
        EntityProfile::new("house_3", ConsumptionPattern::HomeOffice, 0.8, 3.0, 0.0)
            .with_can_sell(true),
        EntityProfile::new("shop", ConsumptionPattern::WeekendActive, 3.0, 6.0, 12.0)
            .with_initial_battery(1.0)
            .with_can_sell(true),
        EntityProfile::new("flat", ConsumptionPattern::DayWorker, 0.6, 0.0, 0.0),
    ]
}

/// Asserts every row and interval of `ledger` satisfies the engine invariants.
pub fn assert_ledger_invariants(ledger: &Ledger, profiles: &[EntityProfile]) {
    for r in ledger.rows() {
        let residual = r.inflow_kwh() - r.outflow_kwh();
        assert!(
            residual.abs() <= CONSERVATION_TOLERANCE,
            "conservation broken for {} at {}: {residual}",
            r.entity_id,
            r.timestamp
        );
        for value in [
            r.consumption_kwh,
            r.production_kwh,
            r.battery_charge_kwh,
            r.battery_discharge_kwh,
            r.peer_sold_kwh,
            r.peer_bought_kwh,
            r.grid_import_kwh,
            r.grid_export_kwh,
        ] {
            assert!(value >= 0.0 && value.is_finite(), "negative flow in {r}");
        }
        let capacity = profiles
            .iter()
            .find(|p| p.id == r.entity_id)
            .map(|p| p.battery_capacity)
            .unwrap_or(0.0);
        assert!(
            (0.0..=capacity).contains(&r.battery_level_kwh),
            "battery out of bounds in {r}"
        );
    }

    for rows in ledger.by_interval() {
        let sold: f64 = rows.iter().map(|r| r.peer_sold_kwh).sum();
        let bought: f64 = rows.iter().map(|r| r.peer_bought_kwh).sum();
        assert!((sold - bought).abs() <= CONSERVATION_TOLERANCE);
    }
}
