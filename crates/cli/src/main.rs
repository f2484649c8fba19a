//! osprey — continuous threat-indicator monitoring.
//!
//! Subcommands:
//! - `validate` — load every rule and report validation findings
//! - `run` — evaluate rules once (optionally in parallel) and exit
//! - `daemon` — tick loop evaluating rules on their schedules
//! - `classify` — print the type tag of a single value

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Continuous threat-indicator monitoring pipeline.
#[derive(Parser, Debug)]
#[command(name = "osprey", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate every rule in the rules directory.
    Validate {
        /// Directory containing rule YAML files.
        #[arg(long, env = "OSPREY_RULES_DIR", default_value = "data/rules")]
        rules_dir: PathBuf,
    },

    /// Evaluate rules once and exit.
    Run {
        #[arg(long, env = "OSPREY_RULES_DIR", default_value = "data/rules")]
        rules_dir: PathBuf,

        /// Evaluate only this rule ID.
        #[arg(long)]
        rule: Option<String>,

        /// How many rules to evaluate concurrently.
        #[arg(long, env = "OSPREY_PARALLELISM", default_value_t = 4)]
        parallelism: usize,

        /// Recency cache retention, e.g. "7d", "12h".
        #[arg(long, env = "OSPREY_RETENTION", default_value = "7d")]
        retention: String,
    },

    /// Run the scheduler loop, evaluating rules as they come due.
    Daemon {
        #[arg(long, env = "OSPREY_RULES_DIR", default_value = "data/rules")]
        rules_dir: PathBuf,

        /// Seconds between scheduler ticks.
        #[arg(long, env = "OSPREY_TICK", default_value_t = 30)]
        tick: u64,

        /// Cadence for rules without a schedule block, e.g. "10m".
        #[arg(long, env = "OSPREY_DEFAULT_EVERY", default_value = "10m")]
        default_every: String,

        #[arg(long, env = "OSPREY_PARALLELISM", default_value_t = 4)]
        parallelism: usize,

        #[arg(long, env = "OSPREY_RETENTION", default_value = "7d")]
        retention: String,
    },

    /// Classify a single value and print its type tag.
    Classify { value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { rules_dir } => commands::validate(&rules_dir),
        Command::Run {
            rules_dir,
            rule,
            parallelism,
            retention,
        } => commands::run(&rules_dir, rule.as_deref(), parallelism, &retention).await,
        Command::Daemon {
            rules_dir,
            tick,
            default_every,
            parallelism,
            retention,
        } => commands::daemon(&rules_dir, tick, &default_every, parallelism, &retention).await,
        Command::Classify { value } => {
            commands::classify(&value);
            Ok(())
        }
    }
}
