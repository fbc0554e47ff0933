//! rkopt - Command Line Search for Optimal Runge-Kutta Methods
//!
//! Operational entry point for the rkopt coefficient optimiser.
//!
//! # Commands
//!
//! - `rkopt search <stages> <order> <class> <objective>` - Run a multi-start
//!   search and write persistable methods as JSON
//! - `rkopt classes` - List method classes with their parameter counts
//!
//! # Architecture
//!
//! The service layer: orchestrates `rkopt_optimiser` and `rkopt_methods`
//! behind a command-line interface with TOML configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rkopt_methods::analysis::ConditionMode;
use rkopt_optimiser::{StartMode, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use config::{build_config, LogLevel, SearchOverrides};

/// Runge-Kutta coefficient optimiser CLI
#[derive(Parser)]
#[command(name = "rkopt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (defaults to ./rkopt.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for an optimal method
    Search {
        /// Number of stages
        stages: usize,

        /// Requested order of accuracy
        order: usize,

        /// Method class (erk, irk, dirk, sdirk, 2S, 2S*, 3S*, 2Semb, 3S*emb)
        class: String,

        /// Objective (ssp or acc)
        objective: String,

        /// Number of steps (multistep Butcher classes)
        #[arg(short = 'k', long)]
        steps: Option<usize>,

        /// Number of starting points
        #[arg(short = 'n', long)]
        starts: Option<usize>,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Start mode: random, smart, or a comma-separated vector
        #[arg(long)]
        start_mode: Option<StartMode>,

        /// Project starting points onto the order conditions first
        #[arg(long)]
        solve_order_first: bool,

        /// Order-condition set (nonlinear or linear)
        #[arg(long)]
        problem_type: Option<ConditionMode>,

        /// Minimum acceptable SSP coefficient
        #[arg(long)]
        min_radius: Option<f64>,

        /// Session seed for reproducible starting points
        #[arg(long)]
        seed: Option<u64>,

        /// Progress reporting (off, final, iter)
        #[arg(long)]
        display: Option<Verbosity>,

        /// Output directory for persistable methods
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List method classes and parameter counts
    Classes {
        /// Number of stages
        #[arg(short, long, default_value = "4")]
        stages: usize,

        /// Requested order
        #[arg(short, long, default_value = "3")]
        order: usize,

        /// Number of steps
        #[arg(short = 'k', long, default_value = "1")]
        steps: usize,
    },
}

fn init_tracing(level: LogLevel, verbose: bool) {
    let default = if verbose {
        LogLevel::Debug.as_filter_str()
    } else {
        level.as_filter_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = build_config(cli.config.as_deref())?;
    init_tracing(config.log_level, cli.verbose);

    match cli.command {
        Commands::Search {
            stages,
            order,
            class,
            objective,
            steps,
            starts,
            workers,
            start_mode,
            solve_order_first,
            problem_type,
            min_radius,
            seed,
            display,
            output_dir,
        } => {
            config.merge_with_cli(&SearchOverrides {
                steps,
                starts,
                workers,
                start_mode,
                solve_order_first,
                problem_type,
                min_radius,
                seed,
                verbosity: display,
                output_dir,
            });
            config.validate()?;
            commands::search::run(stages, order, &class, &objective, &config)
        }
        Commands::Classes {
            stages,
            order,
            steps,
        } => commands::classes::run(stages, order, steps),
    }
}
