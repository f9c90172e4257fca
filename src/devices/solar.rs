use std::f64::consts::PI;

/// Default start of the daylight window (hour of day, inclusive).
pub const SUNRISE_HOUR: f64 = 6.0;
/// Default end of the daylight window (hour of day, inclusive).
pub const SUNSET_HOUR: f64 = 18.0;

/// Stateless solar generation model.
///
/// Production follows a half-sine between sunrise and sunset, peaking at the
/// midpoint, scaled by the entity's solar capacity and by the clear-sky
/// fraction `1 - cloud_cover`.
///
/// # Examples
///
/// ```
/// use p2p_energy_sim::devices::solar::SolarModel;
///
/// let solar = SolarModel::default();
/// assert_eq!(solar.production(12.0, 5.0, 0.0), 5.0);
/// assert_eq!(solar.production(19.0, 5.0, 0.0), 0.0);
/// assert_eq!(solar.production(12.0, 5.0, 0.5), 2.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarModel {
    sunrise_hour: f64,
    sunset_hour: f64,
}

impl SolarModel {
    /// Creates a model with a custom daylight window.
    ///
    /// # Panics
    ///
    /// Panics unless `0 <= sunrise_hour < sunset_hour <= 24`.
    pub fn new(sunrise_hour: f64, sunset_hour: f64) -> Self {
        assert!(
            (0.0..24.0).contains(&sunrise_hour) && sunrise_hour < sunset_hour && sunset_hour <= 24.0
        );
        Self {
            sunrise_hour,
            sunset_hour,
        }
    }

    /// Fraction of peak output from sun position alone, in `[0, 1]`.
    ///
    /// `hour` is wrapped into `[0, 24)`; fractional hours are allowed.
    /// Returns exactly zero at and outside the window boundaries.
    pub fn daylight_frac(&self, hour: f64) -> f64 {
        if !hour.is_finite() {
            return 0.0;
        }
        let hour = hour.rem_euclid(24.0);
        if hour <= self.sunrise_hour || hour >= self.sunset_hour {
            return 0.0;
        }
        let pos = (hour - self.sunrise_hour) / (self.sunset_hour - self.sunrise_hour);
        (PI * pos).sin().max(0.0)
    }

    /// Instantaneous production (kWh per hour) for the given conditions.
    ///
    /// Cloud cover outside `[0, 1]` is clamped; NaN is treated as full overcast.
    /// Negative capacity produces nothing.
    pub fn production(&self, hour: f64, solar_capacity: f64, cloud_cover: f64) -> f64 {
        let capacity = solar_capacity.max(0.0);
        if capacity == 0.0 {
            return 0.0;
        }
        let cloud = if cloud_cover.is_nan() {
            1.0
        } else {
            cloud_cover.clamp(0.0, 1.0)
        };
        (capacity * self.daylight_frac(hour) * (1.0 - cloud)).max(0.0)
    }
}

impl Default for SolarModel {
    fn default() -> Self {
        Self::new(SUNRISE_HOUR, SUNSET_HOUR)
    }
}
