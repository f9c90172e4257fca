//! Error taxonomy for configuration, weather input, and engine defects.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.interval_minutes"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Weather data could not be obtained or interpreted.
///
/// Never surfaced by the engine: [`crate::weather::CloudForecast`] recovers
/// by falling back to the default cloud cover.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("weather source unavailable: {0}")]
    Unavailable(String),
    #[error("cloud cover for hour {hour} out of range: {value}")]
    OutOfRange { hour: u32, value: f64 },
}

/// Errors returned by a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid profiles or settings, detected before any interval runs.
    #[error("invalid configuration: {}", join_errors(.0))]
    Configuration(Vec<ConfigError>),
    /// Settlement was handed an entity it has no account for.
    #[error("unknown entity \"{0}\"")]
    UnknownEntity(String),
    /// A post-interval check failed: the engine itself is wrong.
    #[error("invariant violated at {timestamp} for \"{entity}\": {detail}")]
    InvariantViolation {
        timestamp: NaiveDateTime,
        entity: String,
        detail: String,
    },
}

impl SimError {
    /// Returns `true` when the error points at an engine bug rather than bad input.
    pub fn is_engine_defect(&self) -> bool {
        matches!(self, SimError::InvariantViolation { .. })
    }
}

impl From<ConfigError> for SimError {
    fn from(err: ConfigError) -> Self {
        SimError::Configuration(vec![err])
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_lists_every_field() {
        let err = SimError::Configuration(vec![
            ConfigError::new("entity[0].solar_capacity", "must be >= 0"),
            ConfigError::new("simulation.intervals", "must be > 0"),
        ]);
        let s = err.to_string();
        assert!(s.contains("entity[0].solar_capacity"));
        assert!(s.contains("simulation.intervals"));
        assert!(!err.is_engine_defect());
    }

    #[test]
    fn invariant_violation_is_engine_defect() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 6, 2)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let err = SimError::InvariantViolation {
            timestamp: ts,
            entity: "user_1".into(),
            detail: "battery level 11.0 exceeds capacity 10.0".into(),
        };
        assert!(err.is_engine_defect());
        assert!(err.to_string().contains("user_1"));
    }
}
