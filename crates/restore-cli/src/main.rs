//! restore-audit - Command-line interface for restore plan hashing and audit replay.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod output;

use commands::{canonicalize, legacy, pit, plan, replay};

#[derive(Parser)]
#[command(name = "restore-audit")]
#[command(about = "Plan hashing, PIT selection and audit replay ordering for the restore pipeline")]
struct Cli {
    /// Reject inputs larger than SIZE bytes (default: unlimited)
    #[arg(long, global = true)]
    max_size: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canonical text for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Compute the plan hash of a plan-hash input
    PlanHash {
        /// Plan-hash input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Output the full record (canonical_json + plan_hash) as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-verify a stored plan hash record
    VerifyPlan {
        /// Plan hash record JSON file (or stdin if not provided)
        input: Option<String>,
        /// Exit with error code if verification fails
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Select the authoritative row version from PIT tuples
    PitLatest {
        /// JSON array of PIT tuples (or stdin if not provided)
        input: Option<String>,
        /// Print every tuple in ascending order instead of the winner
        #[arg(long)]
        all: bool,
    },
    /// Sort audit events into replay order
    ReplaySort {
        /// JSON array of audit events (or stdin if not provided)
        input: Option<String>,
        /// Collapse redelivered events and emit a versioned replay batch
        #[arg(long)]
        assemble: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate that audit events are unique and in replay order
    ReplayValidate {
        /// Replay batch or JSON array of audit events (or stdin if not provided)
        input: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Translate legacy events into audit events
    LegacyMap {
        /// JSON array of legacy events (or stdin if not provided)
        input: Option<String>,
        /// Legacy event shape
        #[arg(long, value_enum)]
        kind: legacy::LegacyKind,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let max_size = cli.max_size;

    let result = match cli.command {
        Commands::Canonicalize { input } => canonicalize::run(input, max_size),
        Commands::PlanHash { input, json } => plan::run_hash(input, json, max_size),
        Commands::VerifyPlan {
            input,
            strict,
            json,
        } => plan::run_verify(input, strict, json, max_size),
        Commands::PitLatest { input, all } => pit::run(input, all, max_size),
        Commands::ReplaySort {
            input,
            assemble,
            json,
        } => replay::run_sort(input, assemble, json, max_size),
        Commands::ReplayValidate { input, json } => replay::run_validate(input, json, max_size),
        Commands::LegacyMap { input, kind, json } => legacy::run(input, kind, json, max_size),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
