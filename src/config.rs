//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::devices::{Jitter, Season};
use crate::error::{ConfigError, SimError};
use crate::population::generate_profiles;
use crate::profile::{ConsumptionPattern, EntityCategory, EntityProfile, Locale, validate_profiles};
use crate::sim::types::{MINUTES_PER_DAY, SeasonMode, SimConfig, check_run_length};
use crate::weather::{CloudForecast, StaticWeather};

/// Accepted format of `simulation.start`.
pub const START_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Seed offset for the population generator so it does not share a stream with jitter.
const POPULATION_SEED_OFFSET: u64 = 57;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or pick a built-in preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Cloud cover input.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Synthetic population settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Explicit entity profiles, used when no population is generated.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityConfig>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First interval, local time, e.g. `"2025-06-02T00:00:00"`.
    pub start: String,
    /// Interval length (minutes, must divide a day).
    pub interval_minutes: u32,
    /// Number of intervals to simulate.
    pub intervals: usize,
    /// Master random seed.
    pub seed: u64,
    /// `"none"`, `"summer"`, `"winter"`, `"monsoon"`, or `"auto"`.
    pub season: String,
    /// Battery fraction a seller must exceed before trading (0.0-1.0).
    pub min_reserve_fraction: f64,
    /// Lower bound of the demand jitter factor.
    pub jitter_min: f64,
    /// Upper bound of the demand jitter factor.
    pub jitter_max: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: "2025-06-02T00:00:00".to_string(),
            interval_minutes: 60,
            intervals: 24,
            seed: 42,
            season: "none".to_string(),
            min_reserve_fraction: 0.0,
            jitter_min: 0.8,
            jitter_max: 1.2,
        }
    }
}

/// Cloud cover input.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Cloud cover fraction used for hours without data (0.0-1.0).
    pub default_cloud_cover: f64,
    /// Cloud cover percent per hour of day; index 0 is midnight.
    pub cloud_cover_pct: Vec<f64>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            default_cloud_cover: 0.5,
            cloud_cover_pct: Vec::new(),
        }
    }
}

/// Synthetic population settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    /// Number of profiles to generate; 0 uses the `[[entity]]` list.
    pub generate: usize,
}

/// One explicitly configured entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub id: String,
    /// Inferred from solar and battery sizes when omitted.
    #[serde(default)]
    pub category: Option<EntityCategory>,
    /// Baseline demand (kWh per hour).
    pub base_consumption: f64,
    /// Peak solar output (kWh per hour).
    #[serde(default)]
    pub solar_capacity: f64,
    /// Battery capacity (kWh).
    #[serde(default)]
    pub battery_capacity: f64,
    /// Starting battery level (kWh); half the capacity when omitted.
    #[serde(default)]
    pub initial_battery: Option<f64>,
    pub pattern: ConsumptionPattern,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_sensitivity")]
    pub weather_sensitivity: f64,
    #[serde(default)]
    pub can_sell: bool,
    #[serde(default)]
    pub price_ceiling: Option<f64>,
    #[serde(default)]
    pub price_floor: Option<f64>,
}

fn default_sensitivity() -> f64 {
    1.0
}

impl EntityConfig {
    /// Converts to a profile, filling in the optional fields.
    pub fn to_profile(&self) -> EntityProfile {
        let mut profile = EntityProfile::new(
            self.id.clone(),
            self.pattern,
            self.base_consumption,
            self.solar_capacity,
            self.battery_capacity,
        )
        .with_weather_sensitivity(self.weather_sensitivity)
        .with_can_sell(self.can_sell);
        if let Some(category) = self.category {
            profile = profile.with_category(category);
        }
        if let Some(level) = self.initial_battery {
            profile = profile.with_initial_battery(level);
        }
        profile.locale = self.locale;
        profile.price_ceiling = self.price_ceiling;
        profile.price_floor = self.price_floor;
        profile
    }
}

/// A fully resolved run: timing, population, and weather.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub sim: SimConfig,
    pub profiles: Vec<EntityProfile>,
    pub forecast: CloudForecast,
}

impl ScenarioConfig {
    /// Two neighbours: a home-office prosumer that sells, and a day worker without solar.
    pub fn two_party() -> Self {
        Self {
            simulation: SimulationConfig {
                season: "summer".to_string(),
                min_reserve_fraction: 0.1,
                ..SimulationConfig::default()
            },
            weather: WeatherConfig::default(),
            population: PopulationConfig::default(),
            entities: vec![
                EntityConfig {
                    id: "user_1".to_string(),
                    category: Some(EntityCategory::Prosumer),
                    base_consumption: 2.75,
                    solar_capacity: 6.0,
                    battery_capacity: 10.0,
                    initial_battery: Some(5.0),
                    pattern: ConsumptionPattern::HomeOffice,
                    locale: Locale::Urban,
                    weather_sensitivity: 1.0,
                    can_sell: true,
                    price_ceiling: None,
                    price_floor: None,
                },
                EntityConfig {
                    id: "user_2".to_string(),
                    category: Some(EntityCategory::PureConsumer),
                    base_consumption: 2.75,
                    solar_capacity: 0.0,
                    battery_capacity: 0.0,
                    initial_battery: None,
                    pattern: ConsumptionPattern::DayWorker,
                    locale: Locale::Urban,
                    weather_sensitivity: 1.0,
                    can_sell: false,
                    price_ceiling: None,
                    price_floor: None,
                },
            ],
        }
    }

    /// Ten generated households and businesses over one day, season from the calendar.
    pub fn neighborhood() -> Self {
        Self {
            simulation: SimulationConfig {
                season: "auto".to_string(),
                ..SimulationConfig::default()
            },
            weather: WeatherConfig::default(),
            population: PopulationConfig { generate: 10 },
            entities: Vec::new(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["two_party", "neighborhood"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "two_party" => Ok(Self::two_party()),
            "neighborhood" => Ok(Self::neighborhood()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        let interval_ok = s.interval_minutes > 0 && MINUTES_PER_DAY % s.interval_minutes == 0;
        match parse_start(&s.start) {
            Ok(start) if interval_ok => {
                errors.extend(check_run_length(start, s.interval_minutes, s.intervals));
            }
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
        if !interval_ok {
            errors.push(ConfigError::new(
                "simulation.interval_minutes",
                format!("must be > 0 and divide {MINUTES_PER_DAY}, got {}", s.interval_minutes),
            ));
        }
        if let Err(e) = parse_season(&s.season) {
            errors.push(e);
        }
        if !(0.0..=1.0).contains(&s.min_reserve_fraction) {
            errors.push(ConfigError::new(
                "simulation.min_reserve_fraction",
                "must be in [0.0, 1.0]",
            ));
        }
        if !(s.jitter_min.is_finite() && s.jitter_min >= 0.0) {
            errors.push(ConfigError::new("simulation.jitter_min", "must be >= 0"));
        } else if !(s.jitter_max.is_finite() && s.jitter_max >= s.jitter_min) {
            errors.push(ConfigError::new(
                "simulation.jitter_max",
                "must be >= simulation.jitter_min",
            ));
        }

        let w = &self.weather;
        if !(0.0..=1.0).contains(&w.default_cloud_cover) {
            errors.push(ConfigError::new(
                "weather.default_cloud_cover",
                "must be in [0.0, 1.0]",
            ));
        }
        if w.cloud_cover_pct.len() > 24 {
            errors.push(ConfigError::new(
                "weather.cloud_cover_pct",
                format!("at most 24 hourly values, got {}", w.cloud_cover_pct.len()),
            ));
        }
        for (hour, pct) in w.cloud_cover_pct.iter().enumerate() {
            if !(0.0..=100.0).contains(pct) {
                errors.push(ConfigError::new(
                    format!("weather.cloud_cover_pct[{hour}]"),
                    format!("must be in [0, 100], got {pct}"),
                ));
            }
        }

        if self.population.generate == 0 {
            if self.entities.is_empty() {
                errors.push(ConfigError::new(
                    "entity",
                    "at least one [[entity]] is required when population.generate = 0",
                ));
            }
            let profiles: Vec<EntityProfile> =
                self.entities.iter().map(EntityConfig::to_profile).collect();
            errors.extend(validate_profiles(&profiles));
        } else if !self.entities.is_empty() {
            errors.push(ConfigError::new(
                "entity",
                "[[entity]] cannot be combined with population.generate > 0",
            ));
        }

        errors
    }

    /// Validates and resolves the configuration into a runnable scenario.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` with every validation failure.
    pub fn build(&self) -> Result<Scenario, SimError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }
        let s = &self.simulation;

        let start = parse_start(&s.start)?;
        let mut sim = SimConfig::new(start, s.interval_minutes, s.intervals, s.seed);
        sim.season = parse_season(&s.season)?;
        sim.min_reserve_fraction = s.min_reserve_fraction;
        sim.jitter = Jitter::new(s.jitter_min, s.jitter_max);

        let profiles = if self.population.generate > 0 {
            let mut rng = StdRng::seed_from_u64(s.seed.wrapping_add(POPULATION_SEED_OFFSET));
            generate_profiles(self.population.generate, &mut rng)
        } else {
            self.entities.iter().map(EntityConfig::to_profile).collect()
        };

        let forecast = CloudForecast::from_source(
            &StaticWeather::new(self.weather.cloud_cover_pct.clone()),
            self.weather.default_cloud_cover,
        );

        Ok(Scenario {
            sim,
            profiles,
            forecast,
        })
    }
}

fn parse_start(s: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(s, START_FORMAT).map_err(|e| {
        ConfigError::new(
            "simulation.start",
            format!("\"{s}\" is not a datetime like 2025-06-02T00:00:00: {e}"),
        )
    })
}

fn parse_season(s: &str) -> Result<SeasonMode, ConfigError> {
    match s {
        "none" => Ok(SeasonMode::Off),
        "summer" => Ok(SeasonMode::Fixed(Season::Summer)),
        "winter" => Ok(SeasonMode::Fixed(Season::Winter)),
        "monsoon" => Ok(SeasonMode::Fixed(Season::Monsoon)),
        "auto" => Ok(SeasonMode::Auto),
        other => Err(ConfigError::new(
            "simulation.season",
            format!("must be one of none, summer, winter, monsoon, auto; got \"{other}\""),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_entities() {
        let errors = ScenarioConfig::default().validate();
        assert!(errors.iter().any(|e| e.field == "entity"));
    }

    #[test]
    fn from_preset_two_party() {
        let cfg = ScenarioConfig::from_preset("two_party");
        assert!(cfg.is_ok());
        assert_eq!(cfg.map(|c| c.entities.len()).ok(), Some(2));
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err_and(|e| e.message.contains("unknown preset")));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
start = "2025-01-06T06:00:00"
interval_minutes = 30
intervals = 48
seed = 99
season = "winter"
min_reserve_fraction = 0.3
jitter_min = 1.0
jitter_max = 1.0

[weather]
default_cloud_cover = 0.2
cloud_cover_pct = [10.0, 20.0, 30.0]

[[entity]]
id = "house"
base_consumption = 2.0
solar_capacity = 5.0
battery_capacity = 10.0
initial_battery = 2.5
pattern = "home_office"
locale = "rural"
can_sell = true
price_ceiling = 0.18

[[entity]]
id = "shop"
category = "business"
base_consumption = 4.0
pattern = "Day Worker"
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert!(cfg.as_ref().is_some_and(|c| c.validate().is_empty()));

        let scenario = cfg.map(|c| c.build());
        let Some(Ok(scenario)) = scenario else {
            panic!("scenario should build");
        };
        assert_eq!(scenario.sim.interval_minutes, 30);
        assert_eq!(scenario.sim.season, SeasonMode::Fixed(Season::Winter));
        assert_eq!(scenario.sim.jitter, Jitter::NONE);
        assert_eq!(scenario.forecast.cloud_at(1), 0.2);
        assert_eq!(scenario.forecast.cloud_at(5), 0.2);

        let house = &scenario.profiles[0];
        assert_eq!(house.initial_battery, 2.5);
        assert_eq!(house.locale, Locale::Rural);
        assert_eq!(house.price_ceiling, Some(0.18));

        let shop = &scenario.profiles[1];
        assert_eq!(shop.category, EntityCategory::Business);
        assert_eq!(shop.pattern, ConsumptionPattern::DayWorker);
        assert_eq!(shop.weather_sensitivity, 1.0);
        assert!(!shop.can_sell);
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
intervals = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_pattern_rejected_at_parse() {
        let toml = r#"
[[entity]]
id = "a"
base_consumption = 1.0
pattern = "night_owl"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_collects_every_failure() {
        let mut cfg = ScenarioConfig::two_party();
        cfg.simulation.start = "yesterday".to_string();
        cfg.simulation.interval_minutes = 7;
        cfg.simulation.season = "spring".to_string();
        cfg.simulation.min_reserve_fraction = -0.1;
        cfg.weather.cloud_cover_pct = vec![50.0, 120.0];
        cfg.entities[0].battery_capacity = -1.0;

        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        for expected in [
            "simulation.start",
            "simulation.interval_minutes",
            "simulation.season",
            "simulation.min_reserve_fraction",
            "weather.cloud_cover_pct[1]",
            "entity[0].battery_capacity",
        ] {
            assert!(fields.iter().any(|f| f == expected), "missing {expected} in {fields:?}");
        }
    }

    #[test]
    fn validation_catches_inverted_jitter() {
        let mut cfg = ScenarioConfig::two_party();
        cfg.simulation.jitter_min = 1.2;
        cfg.simulation.jitter_max = 0.8;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.jitter_max"));
    }

    #[test]
    fn validation_rejects_run_past_calendar() {
        let mut cfg = ScenarioConfig::two_party();
        cfg.simulation.intervals = usize::MAX / 2;
        let err = cfg.build().err();
        match err {
            Some(SimError::Configuration(errors)) => {
                assert!(errors.iter().any(|e| e.field == "simulation.intervals"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn generate_excludes_explicit_entities() {
        let mut cfg = ScenarioConfig::two_party();
        cfg.population.generate = 5;
        assert!(cfg.validate().iter().any(|e| e.field == "entity"));
    }

    #[test]
    fn build_rejects_invalid() {
        let mut cfg = ScenarioConfig::two_party();
        cfg.simulation.interval_minutes = 0;
        assert!(matches!(cfg.build(), Err(SimError::Configuration(_))));
    }

    #[test]
    fn neighborhood_generates_population() {
        let scenario = ScenarioConfig::neighborhood().build();
        let profiles = scenario.map(|s| s.profiles).unwrap_or_default();
        assert_eq!(profiles.len(), 10);
        assert_eq!(profiles[0].id, "user_001");
    }

    #[test]
    fn initial_battery_defaults_to_half_capacity() {
        let cfg = ScenarioConfig::two_party();
        let mut entity = cfg.entities[0].clone();
        entity.initial_battery = None;
        assert_eq!(entity.to_profile().initial_battery, 5.0);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99

[population]
generate = 3
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        assert_eq!(cfg.as_ref().map(|c| c.simulation.intervals), Some(24));
        assert_eq!(cfg.as_ref().map(|c| c.weather.default_cloud_cover), Some(0.5));
        assert!(cfg.is_some_and(|c| c.validate().is_empty()));
    }
}
