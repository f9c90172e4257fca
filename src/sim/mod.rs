/// Post-interval conservation and bounds checks.
pub mod balance;
/// Simulation clock for interval management.
pub mod clock;
pub mod engine;
pub mod ledger;
/// Battery, peer, and grid settlement of one interval.
pub mod settlement;
pub mod summary;
pub mod types;

pub use engine::{Engine, run};
pub use ledger::Ledger;
pub use summary::LedgerSummary;
