/// One entity's battery: stored energy clamped to `[0, capacity]`.
///
/// Energy is tracked in kWh with no rate limits or efficiency losses; each
/// operation reports how much of the request it absorbed or supplied and
/// passes the remainder onward to settlement.
///
/// # Examples
///
/// ```
/// use p2p_energy_sim::devices::battery::BatteryStore;
///
/// let mut battery = BatteryStore::new(10.0, 5.0);
/// assert_eq!(battery.charge(3.0), (3.0, 0.0));
/// assert_eq!(battery.charge(4.0), (2.0, 2.0));
/// assert_eq!(battery.level_kwh(), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryStore {
    /// Capacity in kilowatt-hours, fixed for the run.
    capacity_kwh: f64,

    /// Stored energy in kilowatt-hours.
    level_kwh: f64,
}

impl BatteryStore {
    /// Creates a battery holding `level_kwh`, clamped into `[0, capacity_kwh]`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity_kwh` is negative or not finite.
    pub fn new(capacity_kwh: f64, level_kwh: f64) -> Self {
        assert!(capacity_kwh.is_finite() && capacity_kwh >= 0.0);
        Self {
            capacity_kwh,
            level_kwh: level_kwh.clamp(0.0, capacity_kwh),
        }
    }

    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    pub fn level_kwh(&self) -> f64 {
        self.level_kwh
    }

    /// Free space left before the battery is full.
    pub fn headroom_kwh(&self) -> f64 {
        (self.capacity_kwh - self.level_kwh).max(0.0)
    }

    /// Stores up to `amount` kWh.
    ///
    /// Returns `(accepted, passthrough)` where `accepted + passthrough == amount`.
    /// Negative requests are treated as zero.
    pub fn charge(&mut self, amount: f64) -> (f64, f64) {
        let amount = amount.max(0.0);
        let accepted = amount.min(self.headroom_kwh());
        self.level_kwh = (self.level_kwh + accepted).clamp(0.0, self.capacity_kwh);
        (accepted, amount - accepted)
    }

    /// Releases up to `amount` kWh.
    ///
    /// Returns `(released, unmet)` where `released + unmet == amount`.
    /// Negative requests are treated as zero.
    pub fn discharge(&mut self, amount: f64) -> (f64, f64) {
        let amount = amount.max(0.0);
        let released = amount.min(self.level_kwh);
        self.level_kwh = (self.level_kwh - released).clamp(0.0, self.capacity_kwh);
        (released, amount - released)
    }
}
