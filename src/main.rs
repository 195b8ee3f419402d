//! # Civic Match CLI (`cmatch`)
//!
//! ## Usage
//!
//! ```bash
//! cmatch --config ./config/cmatch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cmatch records <kind>` | List records of one kind |
//! | `cmatch rank <kind> <id>` | Rank related records across all kinds |
//! | `cmatch explain <kindA> <idA> <kindB> <idB>` | Explain one pair's score |
//!
//! Kinds are `bill`, `budget_line`, `project`, and `lobby_filing`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use civic_match::{config, explain_cmd, logging, rank_cmd, records_cmd};

/// Civic Match CLI: related bills, budget lines, projects, and lobbying
/// filings, with explanations.
#[derive(Parser)]
#[command(
    name = "cmatch",
    about = "Civic Match: cross-kind matching for bills, budgets, projects, and lobbying filings",
    version,
    long_about = "Civic Match scores records of different kinds against each other using \
    semantic similarity, shared topics, geography, time proximity, and keyword overlap, \
    and explains every score in plain statements."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cmatch.toml`. When the file does not exist,
    /// built-in defaults are used (hashing embeddings, `data/seed.json`).
    #[arg(long, global = true, default_value = "./config/cmatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List records of one kind in store order.
    Records {
        /// Record kind: `bill`, `budget_line`, `project`, or `lobby_filing`.
        kind: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Rank the records most related to one record.
    ///
    /// Every record of every requested kind is scored against the query
    /// record, except the query itself. Results are sorted by score,
    /// highest first.
    Rank {
        /// Kind of the query record.
        kind: String,

        /// Id of the query record.
        id: String,

        /// Maximum number of matches (defaults to `ranking.default_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Comma-separated candidate kinds, e.g. `budget_line,project`.
        #[arg(long)]
        kinds: Option<String>,

        /// Print JSON (matches and stats) instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Explain the score between two records.
    Explain {
        /// Kind of the first record.
        kind_a: String,
        /// Id of the first record.
        id_a: String,
        /// Kind of the second record.
        kind_b: String,
        /// Id of the second record.
        id_b: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_or_minimal(&cli.config)?;
    logging::init_tracing(&cfg.logging.level);

    match cli.command {
        Commands::Records { kind, json } => {
            records_cmd::run_records(&cfg, &kind, json).await?;
        }
        Commands::Rank {
            kind,
            id,
            limit,
            kinds,
            json,
        } => {
            rank_cmd::run_rank(&cfg, &kind, &id, limit, kinds, json).await?;
        }
        Commands::Explain {
            kind_a,
            id_a,
            kind_b,
            id_b,
            json,
        } => {
            explain_cmd::run_explain(&cfg, &kind_a, &id_a, &kind_b, &id_b, json).await?;
        }
    }

    Ok(())
}
