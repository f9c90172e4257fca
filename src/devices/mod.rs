//! Per-entity energy models: generation, demand, and storage.

/// Entity battery with capacity clamping.
pub mod battery;
/// Pattern- and season-driven demand model.
pub mod consumption;
/// Stateless solar generation curve.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use battery::BatteryStore;
pub use consumption::{ConsumptionModel, Season};
pub use solar::SolarModel;
pub use types::Jitter;
