//! Simulator entry point: CLI wiring and config-driven engine construction.

use std::process;

use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use p2p_energy_sim::cli::{self, CliOptions};
use p2p_energy_sim::config::ScenarioConfig;
use p2p_energy_sim::error::SimError;
use p2p_energy_sim::io::export::{export_ledger_csv, export_trades_csv};
use p2p_energy_sim::sim::{Engine, Ledger, LedgerSummary};

/// Exit code for invalid arguments or configuration.
const EXIT_CONFIG: i32 = 1;
/// Exit code for an engine invariant violation.
const EXIT_DEFECT: i32 = 2;

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging unavailable: {e}");
    }
}

/// Resolves the scenario source and applies CLI overrides.
fn load_scenario(opts: &CliOptions) -> Result<ScenarioConfig, SimError> {
    let mut scenario = match (&opts.scenario, &opts.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
        (None, Some(name)) => ScenarioConfig::from_preset(name)?,
        (None, None) => ScenarioConfig::from_preset(cli::DEFAULT_PRESET)?,
    };

    if let Some(seed) = opts.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(users) = opts.users {
        scenario.population.generate = users;
        scenario.entities.clear();
    }
    Ok(scenario)
}

fn simulate(opts: &CliOptions) -> Result<Ledger, SimError> {
    let scenario = load_scenario(opts)?.build()?;
    let mut engine = Engine::new(scenario.sim, scenario.profiles, scenario.forecast)?;
    engine.run()
}

fn print_ledger(ledger: &Ledger, json: bool) {
    for r in ledger.rows() {
        if json {
            match serde_json::to_string(r) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, "failed to serialize ledger row"),
            }
        } else {
            println!("{r}");
        }
    }
}

fn main() {
    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(EXIT_CONFIG);
        }
    };
    if opts.help {
        cli::print_usage();
        return;
    }
    init_logging(opts.verbose);

    let ledger = match simulate(&opts) {
        Ok(ledger) => ledger,
        Err(SimError::Configuration(errors)) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(EXIT_CONFIG);
        }
        Err(e) if e.is_engine_defect() => {
            error!(error = %e, "simulation aborted");
            process::exit(EXIT_DEFECT);
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(EXIT_CONFIG);
        }
    };

    print_ledger(&ledger, opts.json);
    if !opts.json {
        println!("\n{}", LedgerSummary::from_ledger(&ledger));
    }

    if let Some(ref path) = opts.ledger_out {
        if let Err(e) = export_ledger_csv(ledger.rows(), path) {
            eprintln!("error: failed to write ledger CSV: {e}");
            process::exit(EXIT_CONFIG);
        }
        info!(path = %path.display(), rows = ledger.rows().len(), "ledger written");
    }
    if let Some(ref path) = opts.trades_out {
        if let Err(e) = export_trades_csv(ledger.trades(), path) {
            eprintln!("error: failed to write trades CSV: {e}");
            process::exit(EXIT_CONFIG);
        }
        info!(path = %path.display(), trades = ledger.trades().len(), "trades written");
    }
}
