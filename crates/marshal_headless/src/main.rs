//! Headless scenario runner.
//!
//! Runs the decision layer against the built-in world simulation with
//! no graphics and prints a JSON summary to stdout.
//!
//! # Usage
//!
//! ```bash
//! # Run the default skirmish
//! cargo run -p marshal_headless -- run
//!
//! # Run a scenario file for a bounded number of frames
//! cargo run -p marshal_headless -- run --scenario demos/skirmish.ron --frames 10000
//! ```
//!
//! Output (stdout): one JSON run summary.
//! Logs (stderr): tracing output, `-v` for debug.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marshal_core::config::BotConfig;
use marshal_headless::runner;
use marshal_headless::scenario::Scenario;

#[derive(Parser)]
#[command(name = "marshal_headless")]
#[command(about = "Headless scenario runner for the marshal decision layer")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario
    Run {
        /// Scenario file to load (RON); defaults to the built-in
        /// skirmish
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's frame budget
        #[arg(short, long)]
        frames: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let (scenario_path, frames) = match cli.command {
        Some(Commands::Run { scenario, frames }) => (scenario, frames),
        None => (None, None),
    };

    let mut scenario = match scenario_path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(err) => {
                tracing::error!(%err, "could not load scenario");
                return ExitCode::FAILURE;
            }
        },
        None => Scenario::default(),
    };
    if let Some(frames) = frames {
        scenario.max_frames = frames;
    }

    let summary = runner::run(&scenario, BotConfig::default());
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "could not serialize summary");
            ExitCode::FAILURE
        }
    }
}
