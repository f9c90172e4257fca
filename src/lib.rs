//! Hour-by-hour energy flow simulator for a neighbourhood of prosumers and consumers.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
/// Ledger and trade export.
pub mod io;
pub mod population;
pub mod profile;
/// Simulation clock, settlement, engine, and ledger modules.
pub mod sim;
pub mod weather;
