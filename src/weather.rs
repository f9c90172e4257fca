//! Hourly cloud-cover forecast with silent fallback to a default.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::WeatherError;

/// Cloud cover assumed when no weather data is available (50%).
pub const DEFAULT_CLOUD_COVER: f64 = 0.5;

/// Supplier of hourly cloud cover, in percent (0-100) keyed by hour of day.
pub trait WeatherSource {
    /// Fetches the forecast. Missing hours are allowed.
    ///
    /// # Errors
    ///
    /// Returns a `WeatherError` when the source cannot be reached or parsed.
    fn hourly_cloud_pct(&self) -> Result<BTreeMap<u32, f64>, WeatherError>;
}

/// Fixed per-hour table, e.g. taken from scenario configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticWeather {
    pct_by_hour: Vec<f64>,
}

impl StaticWeather {
    /// Builds a source where index `h` of `pct_by_hour` is the cloud cover at hour `h`.
    pub fn new(pct_by_hour: Vec<f64>) -> Self {
        Self { pct_by_hour }
    }
}

impl WeatherSource for StaticWeather {
    fn hourly_cloud_pct(&self) -> Result<BTreeMap<u32, f64>, WeatherError> {
        if self.pct_by_hour.is_empty() {
            return Err(WeatherError::Unavailable("no cloud cover table configured".into()));
        }
        Ok((0u32..)
            .zip(self.pct_by_hour.iter().copied())
            .take(24)
            .collect())
    }
}

/// Cloud cover fraction for each hour of the day.
///
/// # Examples
///
/// ```
/// use p2p_energy_sim::weather::{CloudForecast, StaticWeather};
///
/// let forecast = CloudForecast::from_source(&StaticWeather::new(vec![20.0; 12]), 0.5);
/// assert_eq!(forecast.cloud_at(3), 0.2);
/// assert_eq!(forecast.cloud_at(15), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CloudForecast {
    hourly: [f64; 24],
}

impl CloudForecast {
    /// The same cloud cover fraction for every hour (clamped to `[0, 1]`).
    pub fn constant(fraction: f64) -> Self {
        Self {
            hourly: [clamp_fraction(fraction); 24],
        }
    }

    /// Resolves a forecast from `source`, never failing.
    ///
    /// A failing source yields the constant `default_fraction`; hours the
    /// source omits or reports outside 0-100% also take the default.
    pub fn from_source(source: &dyn WeatherSource, default_fraction: f64) -> Self {
        let mut forecast = Self::constant(default_fraction);
        let pct = match source.hourly_cloud_pct() {
            Ok(pct) => pct,
            Err(err) => {
                warn!(
                    error = %err,
                    default = forecast.hourly[0],
                    "weather unavailable, using default cloud cover"
                );
                return forecast;
            }
        };

        for (hour, value) in pct {
            let checked = if hour >= 24 || !(0.0..=100.0).contains(&value) {
                Err(WeatherError::OutOfRange { hour, value })
            } else {
                Ok(value / 100.0)
            };
            match checked {
                Ok(fraction) => forecast.hourly[hour as usize] = fraction,
                Err(err) => warn!(error = %err, "ignoring cloud cover reading"),
            }
        }
        forecast
    }

    /// Cloud cover fraction at `hour` (wrapped modulo 24).
    pub fn cloud_at(&self, hour: u32) -> f64 {
        self.hourly[(hour % 24) as usize]
    }

    /// Cloud cover seen by an entity with the given weather sensitivity.
    pub fn cloud_for(&self, hour: u32, weather_sensitivity: f64) -> f64 {
        clamp_fraction(self.cloud_at(hour) * weather_sensitivity.max(0.0))
    }
}

impl Default for CloudForecast {
    fn default() -> Self {
        Self::constant(DEFAULT_CLOUD_COVER)
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        DEFAULT_CLOUD_COVER
    } else {
        value.clamp(0.0, 1.0)
    }
}
