//! CLI entry point for the weightbook rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use weightbook_rebalancer::config::Config;
use weightbook_rebalancer::cycle::CycleSnapshot;
use weightbook_rebalancer::error::Error;
use weightbook_rebalancer::execution::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Equal-weight long/short rebalancer: cycle snapshot -> target-weight intents")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan the cycle, confirm, and write intents
    Run {
        /// Path to cycle.json
        cycle: PathBuf,

        /// Show plan without writing intents
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,

        /// Run even if today is not a scheduled rebalance day
        #[arg(long)]
        ignore_schedule: bool,
    },

    /// Show the plan for a cycle
    Plan {
        /// Path to cycle.json
        cycle: PathBuf,
    },

    /// Run the trend allocator on the cycle's price history
    Trend {
        /// Path to cycle.json
        cycle: PathBuf,

        /// Show allocation without writing intents
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Run even if today is not a scheduled rebalance day
        #[arg(long)]
        ignore_schedule: bool,
    },

    /// Count long and short positions held
    Tally {
        /// Path to cycle.json
        cycle: PathBuf,
    },
}

fn load_cycle(path: &Path) -> CycleSnapshot {
    match CycleSnapshot::load(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading cycle: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run {
            cycle,
            dry_run,
            force,
            ignore_schedule,
        } => {
            let snapshot = load_cycle(&cycle);
            let opts = RunOptions {
                dry_run,
                force,
                ignore_schedule,
                cycle_file: cycle.display().to_string(),
            };
            execution::run(&config, &snapshot, &opts).map(drop)
        }
        Command::Plan { cycle } => execution::show_plan(&config, &load_cycle(&cycle)),
        Command::Trend {
            cycle,
            dry_run,
            force,
            ignore_schedule,
        } => {
            let snapshot = load_cycle(&cycle);
            let opts = RunOptions {
                dry_run,
                force,
                ignore_schedule,
                cycle_file: cycle.display().to_string(),
            };
            execution::run_trend(&config, &snapshot, &opts).map(drop)
        }
        Command::Tally { cycle } => execution::show_tally(&load_cycle(&cycle)),
    };

    if let Err(e) = result {
        match &e {
            Error::Core(weightbook::Error::DegenerateBucket { .. }) => {
                eprintln!("\nAborted: {e}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
