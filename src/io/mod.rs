/// CSV export of ledger rows and peer trades.
pub mod export;
