//! Entity profiles: the immutable per-run description of one prosumer or consumer.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Kind of entity being simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Residential,
    Business,
    Prosumer,
    PureConsumer,
}

/// Daily consumption behaviour keyed by hour of day or day of week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionPattern {
    #[serde(alias = "Day Worker")]
    DayWorker,
    #[serde(alias = "Night Worker")]
    NightWorker,
    #[serde(alias = "Home Office")]
    HomeOffice,
    #[serde(alias = "Weekend Active")]
    WeekendActive,
}

impl ConsumptionPattern {
    pub const ALL: [ConsumptionPattern; 4] = [
        ConsumptionPattern::DayWorker,
        ConsumptionPattern::NightWorker,
        ConsumptionPattern::HomeOffice,
        ConsumptionPattern::WeekendActive,
    ];
}

impl fmt::Display for ConsumptionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumptionPattern::DayWorker => "Day Worker",
            ConsumptionPattern::NightWorker => "Night Worker",
            ConsumptionPattern::HomeOffice => "Home Office",
            ConsumptionPattern::WeekendActive => "Weekend Active",
        };
        f.write_str(name)
    }
}

/// Where the entity is sited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Urban,
    Suburban,
    Rural,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Urban, Locale::Suburban, Locale::Rural];
}

/// Immutable description of one simulated entity.
///
/// Rates (`base_consumption`, `solar_capacity`) are kWh per hour; capacities
/// are kWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// Unique identifier; settlement processes entities in ascending id order.
    pub id: String,
    pub category: EntityCategory,
    /// Baseline demand before pattern, season, and jitter factors (kWh/h).
    pub base_consumption: f64,
    /// Peak solar output at zero cloud cover (kWh/h).
    pub solar_capacity: f64,
    /// Usable battery capacity (kWh). Zero means no battery.
    pub battery_capacity: f64,
    /// Battery level at simulation start (kWh).
    pub initial_battery: f64,
    pub pattern: ConsumptionPattern,
    pub locale: Locale,
    /// Multiplier applied to the forecast cloud cover for this entity.
    pub weather_sensitivity: f64,
    /// Whether surplus may be offered to peers before exporting to the grid.
    pub can_sell: bool,
    pub price_ceiling: Option<f64>,
    pub price_floor: Option<f64>,
}

impl EntityProfile {
    /// Creates a profile with neutral defaults for everything but the energy figures.
    ///
    /// The battery starts half full and weather sensitivity is 1.0.
    pub fn new(
        id: impl Into<String>,
        pattern: ConsumptionPattern,
        base_consumption: f64,
        solar_capacity: f64,
        battery_capacity: f64,
    ) -> Self {
        let category = match (solar_capacity > 0.0, battery_capacity > 0.0) {
            (true, _) => EntityCategory::Prosumer,
            (false, true) => EntityCategory::Residential,
            (false, false) => EntityCategory::PureConsumer,
        };
        Self {
            id: id.into(),
            category,
            base_consumption,
            solar_capacity,
            battery_capacity,
            initial_battery: battery_capacity * 0.5,
            pattern,
            locale: Locale::default(),
            weather_sensitivity: 1.0,
            can_sell: false,
            price_ceiling: None,
            price_floor: None,
        }
    }

    pub fn with_initial_battery(mut self, kwh: f64) -> Self {
        self.initial_battery = kwh;
        self
    }

    pub fn with_can_sell(mut self, can_sell: bool) -> Self {
        self.can_sell = can_sell;
        self
    }

    pub fn with_category(mut self, category: EntityCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_weather_sensitivity(mut self, sensitivity: f64) -> Self {
        self.weather_sensitivity = sensitivity;
        self
    }

    pub fn with_price_ceiling(mut self, price: f64) -> Self {
        self.price_ceiling = Some(price);
        self
    }

    /// Validates this profile, reporting failures under `prefix` (e.g. `"entity[3]"`).
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let field = |name: &str| format!("{prefix}.{name}");

        if self.id.trim().is_empty() {
            errors.push(ConfigError::new(field("id"), "must not be empty"));
        }
        for (name, value) in [
            ("base_consumption", self.base_consumption),
            ("solar_capacity", self.solar_capacity),
            ("battery_capacity", self.battery_capacity),
            ("weather_sensitivity", self.weather_sensitivity),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(
                    field(name),
                    format!("must be a finite value >= 0, got {value}"),
                ));
            }
        }
        if !self.initial_battery.is_finite()
            || self.initial_battery < 0.0
            || self.initial_battery > self.battery_capacity
        {
            errors.push(ConfigError::new(
                field("initial_battery"),
                format!(
                    "must be in [0, battery_capacity={}], got {}",
                    self.battery_capacity, self.initial_battery
                ),
            ));
        }
        if let (Some(floor), Some(ceiling)) = (self.price_floor, self.price_ceiling) {
            if floor > ceiling {
                errors.push(ConfigError::new(
                    field("price_floor"),
                    "must be <= price_ceiling",
                ));
            }
        }
        if self.can_sell && self.solar_capacity <= 0.0 {
            warn!(entity = %self.id, "can_sell is set but the entity has no solar capacity");
        }

        errors
    }
}

/// Validates a whole population, including id uniqueness.
pub fn validate_profiles(profiles: &[EntityProfile]) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for (i, profile) in profiles.iter().enumerate() {
        let prefix = format!("entity[{i}]");
        errors.extend(profile.validate(&prefix));
        if !seen.insert(profile.id.as_str()) {
            errors.push(ConfigError::new(
                format!("{prefix}.id"),
                format!("duplicate id \"{}\"", profile.id),
            ));
        }
    }
    errors
}
