//! Per-interval settlement: battery first, then peers, then the grid.
//!
//! Each entity's net energy (`production - consumption`) is first pushed into
//! or drawn from its own battery. Whatever the battery cannot absorb or supply
//! is settled through a shared peer pool: eligible sellers contribute their
//! surplus, and buyers drain it greedily in ascending id order. The grid takes
//! every kWh left over on either side.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::devices::BatteryStore;
use crate::error::{ConfigError, SimError};
use crate::profile::EntityProfile;

use super::balance::{check_peer_totals, check_row};
use super::types::{IntervalResult, PeerTrade};

/// Production and consumption of one entity over one interval (kWh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityFlow<'a> {
    pub entity_id: &'a str,
    pub production_kwh: f64,
    pub consumption_kwh: f64,
}

impl<'a> EntityFlow<'a> {
    pub fn new(entity_id: &'a str, production_kwh: f64, consumption_kwh: f64) -> Self {
        Self {
            entity_id,
            production_kwh,
            consumption_kwh,
        }
    }
}

/// Settled rows and peer trades for one interval.
#[derive(Debug, Clone, Default)]
pub struct IntervalOutcome {
    /// One row per entity, ascending by id.
    pub results: Vec<IntervalResult>,
    /// Peer deliveries in settlement order.
    pub trades: Vec<PeerTrade>,
}

#[derive(Debug, Clone)]
struct Account {
    can_sell: bool,
    battery: BatteryStore,
}

/// Working state of one entity while an interval is being settled.
#[derive(Debug)]
struct Position<'a> {
    entity_id: &'a str,
    production: f64,
    consumption: f64,
    charge: f64,
    discharge: f64,
    surplus: f64,
    deficit: f64,
    eligible_seller: bool,
    sold: f64,
    bought: f64,
}

/// Owns every entity's battery and resolves each interval's imbalances.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use p2p_energy_sim::profile::{ConsumptionPattern, EntityProfile};
/// use p2p_energy_sim::sim::settlement::{EntityFlow, SettlementEngine};
///
/// let seller = EntityProfile::new("a", ConsumptionPattern::DayWorker, 1.0, 5.0, 0.0)
///     .with_can_sell(true);
/// let buyer = EntityProfile::new("b", ConsumptionPattern::DayWorker, 1.0, 0.0, 0.0);
/// let mut engine = SettlementEngine::from_profiles(&[seller, buyer], 0.0);
///
/// let ts = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// let outcome = engine
///     .settle(ts, &[EntityFlow::new("a", 5.0, 1.0), EntityFlow::new("b", 0.0, 3.0)])
///     .unwrap();
///
/// assert_eq!(outcome.results[0].peer_sold_kwh, 3.0);
/// assert_eq!(outcome.results[0].grid_export_kwh, 1.0);
/// assert_eq!(outcome.results[1].peer_bought_kwh, 3.0);
/// assert_eq!(outcome.results[1].grid_import_kwh, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    min_reserve_fraction: f64,
    accounts: BTreeMap<String, Account>,
}

impl SettlementEngine {
    /// Creates an engine with no registered entities.
    ///
    /// # Panics
    ///
    /// Panics if `min_reserve_fraction` is outside `[0, 1]`.
    pub fn new(min_reserve_fraction: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&min_reserve_fraction),
            "min_reserve_fraction must be in [0, 1]"
        );
        Self {
            min_reserve_fraction,
            accounts: BTreeMap::new(),
        }
    }

    /// Creates an engine with an account for every profile.
    pub fn from_profiles(profiles: &[EntityProfile], min_reserve_fraction: f64) -> Self {
        let mut engine = Self::new(min_reserve_fraction);
        for profile in profiles {
            engine.register(profile);
        }
        engine
    }

    /// Opens (or resets) the account for `profile` with its initial battery level.
    pub fn register(&mut self, profile: &EntityProfile) {
        self.accounts.insert(
            profile.id.clone(),
            Account {
                can_sell: profile.can_sell,
                battery: BatteryStore::new(
                    profile.battery_capacity.max(0.0),
                    profile.initial_battery,
                ),
            },
        );
    }

    /// The battery of a registered entity.
    pub fn battery(&self, entity_id: &str) -> Option<&BatteryStore> {
        self.accounts.get(entity_id).map(|a| &a.battery)
    }

    /// Settles one interval.
    ///
    /// Flows may arrive in any order; entities are always processed in
    /// ascending id order so results do not depend on caller iteration order.
    ///
    /// # Errors
    ///
    /// * `SimError::UnknownEntity` if a flow names an unregistered entity.
    /// * `SimError::Configuration` if an entity appears twice.
    /// * `SimError::InvariantViolation` if a flow is negative or not finite,
    ///   or if a settled row fails the conservation or bounds checks.
    pub fn settle(
        &mut self,
        timestamp: NaiveDateTime,
        flows: &[EntityFlow<'_>],
    ) -> Result<IntervalOutcome, SimError> {
        let mut ordered: Vec<&EntityFlow<'_>> = flows.iter().collect();
        ordered.sort_by(|a, b| a.entity_id.cmp(b.entity_id));
        if let Some(pair) = ordered.windows(2).find(|w| w[0].entity_id == w[1].entity_id) {
            return Err(ConfigError::new(
                "settlement",
                format!("entity \"{}\" appears twice in one interval", pair[0].entity_id),
            )
            .into());
        }

        // Validate everything before any battery is touched.
        for flow in &ordered {
            for (name, value) in [
                ("production", flow.production_kwh),
                ("consumption", flow.consumption_kwh),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(SimError::InvariantViolation {
                        timestamp,
                        entity: flow.entity_id.to_string(),
                        detail: format!("{name} is {value}, expected a finite value >= 0"),
                    });
                }
            }
            if !self.accounts.contains_key(flow.entity_id) {
                return Err(SimError::UnknownEntity(flow.entity_id.to_string()));
            }
        }

        // Step A: battery.
        let mut positions = Vec::with_capacity(ordered.len());
        for flow in ordered {
            positions.push(self.apply_battery(flow));
        }

        // Step B: peer pool.
        let trades = match_peers(timestamp, &mut positions);

        // Step C: grid fallback, then verification.
        let mut results = Vec::with_capacity(positions.len());
        for p in &positions {
            let battery = self
                .battery(p.entity_id)
                .ok_or_else(|| SimError::UnknownEntity(p.entity_id.to_string()))?;
            let row = IntervalResult {
                timestamp,
                entity_id: p.entity_id.to_string(),
                consumption_kwh: p.consumption,
                production_kwh: p.production,
                battery_charge_kwh: p.charge,
                battery_discharge_kwh: p.discharge,
                battery_level_kwh: battery.level_kwh(),
                peer_sold_kwh: p.sold,
                peer_bought_kwh: p.bought,
                grid_import_kwh: (p.deficit - p.bought).max(0.0),
                grid_export_kwh: (p.surplus - p.sold).max(0.0),
            };
            check_row(&row, battery.capacity_kwh())?;
            results.push(row);
        }
        check_peer_totals(&results)?;

        debug!(
            %timestamp,
            entities = results.len(),
            trades = trades.len(),
            peer_kwh = trades.iter().map(|t| t.energy_kwh).sum::<f64>(),
            "interval settled"
        );

        Ok(IntervalOutcome { results, trades })
    }

    fn apply_battery<'a>(&mut self, flow: &EntityFlow<'a>) -> Position<'a> {
        let min_reserve_fraction = self.min_reserve_fraction;
        let mut position = Position {
            entity_id: flow.entity_id,
            production: flow.production_kwh,
            consumption: flow.consumption_kwh,
            charge: 0.0,
            discharge: 0.0,
            surplus: 0.0,
            deficit: 0.0,
            eligible_seller: false,
            sold: 0.0,
            bought: 0.0,
        };
        let Some(account) = self.accounts.get_mut(flow.entity_id) else {
            return position;
        };

        let net = flow.production_kwh - flow.consumption_kwh;
        if net > 0.0 {
            let (to_battery, surplus) = account.battery.charge(net);
            position.charge = to_battery;
            position.surplus = surplus;
        } else if net < 0.0 {
            let (from_battery, deficit) = account.battery.discharge(-net);
            position.discharge = from_battery;
            position.deficit = deficit;
        }

        position.eligible_seller = account.can_sell
            && position.surplus > 0.0
            && meets_reserve(min_reserve_fraction, &account.battery);
        position
    }
}

/// Whether a surplus entity holding `battery` may offer energy to peers.
///
/// With a zero reserve any seller qualifies; a positive reserve requires the
/// level to be strictly above that fraction of capacity, so an entity without
/// a battery never qualifies.
fn meets_reserve(min_reserve_fraction: f64, battery: &BatteryStore) -> bool {
    min_reserve_fraction == 0.0
        || battery.level_kwh() > min_reserve_fraction * battery.capacity_kwh()
}

/// Greedy-priority clearinghouse over positions sorted by id.
///
/// Buyers in ascending id order drain the pooled seller surplus; within the
/// pool, sellers are drawn down in ascending id order too, which yields
/// entity-to-entity trade attribution.
fn match_peers(timestamp: NaiveDateTime, positions: &mut [Position<'_>]) -> Vec<PeerTrade> {
    let sellers: Vec<usize> = (0..positions.len())
        .filter(|&i| positions[i].eligible_seller)
        .collect();
    let buyers: Vec<usize> = (0..positions.len())
        .filter(|&i| positions[i].deficit > 0.0)
        .collect();

    let mut remaining: Vec<f64> = sellers.iter().map(|&i| positions[i].surplus).collect();
    let mut cursor = 0;
    let mut trades = Vec::new();

    for &b in &buyers {
        let mut need = positions[b].deficit;
        while need > 0.0 && cursor < sellers.len() {
            let s = sellers[cursor];
            let qty = need.min(remaining[cursor]);
            if qty >= remaining[cursor] {
                remaining[cursor] = 0.0;
                cursor += 1;
            } else {
                remaining[cursor] -= qty;
            }
            need = if qty >= need { 0.0 } else { need - qty };
            if qty <= 0.0 {
                continue;
            }

            positions[s].sold += qty;
            positions[b].bought += qty;
            trades.push(PeerTrade {
                timestamp,
                seller: positions[s].entity_id.to_string(),
                buyer: positions[b].entity_id.to_string(),
                energy_kwh: qty,
            });
        }
    }

    trades
}
