//! Post-settlement checks of energy conservation and storage bounds.

use crate::error::SimError;

use super::types::IntervalResult;

/// Absolute tolerance for conservation checks (kWh).
pub const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Signed energy imbalance of one ledger row.
///
/// `production + discharge + bought + import - (consumption + charge + sold + export)`;
/// zero for a correctly settled row.
pub fn conservation_residual(row: &IntervalResult) -> f64 {
    row.inflow_kwh() - row.outflow_kwh()
}

/// Verifies conservation, non-negativity, and battery bounds for one row.
///
/// # Errors
///
/// Returns `SimError::InvariantViolation` describing the first failed check.
pub fn check_row(row: &IntervalResult, battery_capacity_kwh: f64) -> Result<(), SimError> {
    let violation = |detail: String| SimError::InvariantViolation {
        timestamp: row.timestamp,
        entity: row.entity_id.clone(),
        detail,
    };

    for (name, value) in [
        ("consumption", row.consumption_kwh),
        ("production", row.production_kwh),
        ("battery_charge", row.battery_charge_kwh),
        ("battery_discharge", row.battery_discharge_kwh),
        ("peer_sold", row.peer_sold_kwh),
        ("peer_bought", row.peer_bought_kwh),
        ("grid_import", row.grid_import_kwh),
        ("grid_export", row.grid_export_kwh),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(violation(format!("{name} is {value}, expected a finite value >= 0")));
        }
    }

    if !(0.0..=battery_capacity_kwh).contains(&row.battery_level_kwh) {
        return Err(violation(format!(
            "battery level {} outside [0, {}]",
            row.battery_level_kwh, battery_capacity_kwh
        )));
    }

    let residual = conservation_residual(row);
    if residual.abs() > CONSERVATION_TOLERANCE {
        return Err(violation(format!(
            "energy not conserved: inflow {} vs outflow {} (residual {residual:e})",
            row.inflow_kwh(),
            row.outflow_kwh()
        )));
    }

    Ok(())
}

/// Verifies that peer sales and purchases of one interval match.
///
/// # Errors
///
/// Returns `SimError::InvariantViolation` attributed to the pseudo-entity
/// `"<peers>"` when totals differ by more than the tolerance.
pub fn check_peer_totals(rows: &[IntervalResult]) -> Result<(), SimError> {
    let sold: f64 = rows.iter().map(|r| r.peer_sold_kwh).sum();
    let bought: f64 = rows.iter().map(|r| r.peer_bought_kwh).sum();
    if (sold - bought).abs() > CONSERVATION_TOLERANCE {
        if let Some(first) = rows.first() {
            return Err(SimError::InvariantViolation {
                timestamp: first.timestamp,
                entity: "<peers>".to_string(),
                detail: format!("peer energy sold {sold} != bought {bought}"),
            });
        }
    }
    Ok(())
}
