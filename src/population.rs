//! Seeded generator for synthetic entity populations.

use rand::Rng;

use crate::profile::{ConsumptionPattern, EntityCategory, EntityProfile, Locale};

/// Template for generated entities: baseline demand, solar, and battery sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Archetype {
    pub name: &'static str,
    pub category: EntityCategory,
    pub base_consumption: f64,
    pub solar_capacity: f64,
    pub battery_capacity: f64,
}

pub const ARCHETYPES: [Archetype; 6] = [
    archetype("Residential Small", EntityCategory::Residential, 8.0, 3.0, 5.0),
    archetype("Residential Medium", EntityCategory::Residential, 15.0, 5.0, 10.0),
    archetype("Residential Large", EntityCategory::Residential, 25.0, 8.0, 15.0),
    archetype("Small Business", EntityCategory::Business, 40.0, 10.0, 20.0),
    archetype("Medium Business", EntityCategory::Business, 80.0, 20.0, 40.0),
    archetype("Large Business", EntityCategory::Business, 150.0, 40.0, 80.0),
];

const fn archetype(
    name: &'static str,
    category: EntityCategory,
    base_consumption: f64,
    solar_capacity: f64,
    battery_capacity: f64,
) -> Archetype {
    Archetype {
        name,
        category,
        base_consumption,
        solar_capacity,
        battery_capacity,
    }
}

/// Size multiplier range applied to an archetype.
const VARIATION: (f64, f64) = (0.8, 1.2);
/// Weather sensitivity range of generated entities.
const SENSITIVITY: (f64, f64) = (0.5, 1.5);
/// Initial battery level range as a fraction of capacity.
const INITIAL_FILL: (f64, f64) = (0.2, 0.8);

/// Generates `count` profiles from `rng`.
///
/// The first two are fixed: `user_001`, a selling prosumer, and `user_002`,
/// a grid-dependent consumer. The rest are drawn from [`ARCHETYPES`].
/// Ids are zero-padded so lexical order matches generation order.
///
/// # Examples
///
/// ```
/// use rand::{SeedableRng, rngs::StdRng};
/// use p2p_energy_sim::population::generate_profiles;
///
/// let profiles = generate_profiles(5, &mut StdRng::seed_from_u64(7));
/// assert_eq!(profiles.len(), 5);
/// assert_eq!(profiles[0].id, "user_001");
/// assert!(profiles[0].can_sell);
/// assert_eq!(profiles[4].id, "user_005");
/// ```
pub fn generate_profiles<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<EntityProfile> {
    let width = count.to_string().len().max(3);
    let mut profiles = Vec::with_capacity(count);

    for n in 1..=count {
        let id = format!("user_{n:0width$}");
        let profile = match n {
            1 => EntityProfile::new(id, ConsumptionPattern::DayWorker, 20.0, 10.0, 15.0)
                .with_can_sell(true)
                .with_price_ceiling(0.18),
            2 => EntityProfile::new(id, ConsumptionPattern::NightWorker, 25.0, 0.0, 0.0)
                .with_weather_sensitivity(0.8)
                .with_price_ceiling(0.15),
            _ => random_profile(id, rng),
        };
        let fill = rng.random_range(INITIAL_FILL.0..=INITIAL_FILL.1);
        let initial = profile.battery_capacity * fill;
        profiles.push(profile.with_initial_battery(initial));
    }
    profiles
}

fn random_profile<R: Rng + ?Sized>(id: String, rng: &mut R) -> EntityProfile {
    let kind = ARCHETYPES[rng.random_range(0..ARCHETYPES.len())];
    let variation = rng.random_range(VARIATION.0..=VARIATION.1);
    let pattern = ConsumptionPattern::ALL[rng.random_range(0..ConsumptionPattern::ALL.len())];
    let locale = Locale::ALL[rng.random_range(0..Locale::ALL.len())];
    let sensitivity = rng.random_range(SENSITIVITY.0..=SENSITIVITY.1);

    let mut profile = EntityProfile::new(
        id,
        pattern,
        kind.base_consumption * variation,
        kind.solar_capacity * variation,
        kind.battery_capacity * variation,
    )
    .with_category(kind.category)
    .with_weather_sensitivity(sensitivity);
    profile.locale = locale;
    profile
}
