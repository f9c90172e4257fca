use std::env;
use std::path::PathBuf;

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    /// Generate this many profiles instead of using the configured ones.
    pub users: Option<usize>,
    pub ledger_out: Option<PathBuf>,
    pub trades_out: Option<PathBuf>,
    /// Print ledger rows as JSON lines instead of text.
    pub json: bool,
    pub verbose: bool,
    pub help: bool,
}

/// Default preset when neither `--scenario` nor `--preset` is given.
pub const DEFAULT_PRESET: &str = "two_party";

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                opts.seed = Some(seed);
            }
            "--users" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --users (expected a count)")?;
                let users = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| format!("--users value \"{raw}\" is not a positive integer"))?;
                opts.users = Some(users);
            }
            "--ledger-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --ledger-out (expected a file path)",
                )?;
                opts.ledger_out = Some(PathBuf::from(path));
            }
            "--trades-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --trades-out (expected a file path)",
                )?;
                opts.trades_out = Some(PathBuf::from(path));
            }
            "--json" => opts.json = true,
            "--verbose" | "-v" => opts.verbose = true,
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if opts.scenario.is_none() && opts.preset.is_none() {
        opts.preset = Some(DEFAULT_PRESET.to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("p2p-energy-sim: peer-to-peer energy flow simulator");
    eprintln!();
    eprintln!("Usage: p2p-energy-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>     Load scenario from TOML config file");
    eprintln!("  --preset <name>       Use a built-in preset (two_party, neighborhood)");
    eprintln!("  --seed <u64>          Override random seed");
    eprintln!("  --users <n>           Generate n profiles instead of the configured ones");
    eprintln!("  --ledger-out <path>   Export ledger rows to CSV");
    eprintln!("  --trades-out <path>   Export peer trades to CSV");
    eprintln!("  --json                Print ledger rows as JSON lines");
    eprintln!("  -v, --verbose         Log every interval");
    eprintln!("  -h, --help            Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the {DEFAULT_PRESET} preset is used.");
}
