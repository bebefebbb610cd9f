//! # Docent CLI (`docent`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docent build` | Build the corpus CSV from the page directory |
//! | `docent ask "<question>"` | Answer a question |
//! | `docent search "<query>"` | Show the best-matching passages |
//! | `docent split <file>` | Show the passages produced for one page |
//! | `docent stats` | Summarize the corpus file |
//! | `docent serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! docent build --dry-run --config ./config/docent.toml
//! docent build --config ./config/docent.toml
//! docent ask "When was the club founded?" --show-prompt
//! docent serve
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docent::answer::Answerer;
use docent::config::{self, Config};
use docent::corpus_file::load_corpus;
use docent::{ingest, search, server, stats};

/// Docent: answer questions from a corpus of encyclopedia pages.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docent.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docent",
    about = "Docent: retrieval-augmented question answering over a page corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docent.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the corpus: split pages into passages, embed them, write the CSV.
    Build {
        /// Report page, section, and passage counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question from the corpus.
    Ask {
        question: String,

        /// Print the assembled prompt before the answer.
        #[arg(long)]
        show_prompt: bool,
    },

    /// Rank corpus passages against a query and print the best matches.
    Search {
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_n`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the passages a single page file splits into.
    Split {
        file: PathBuf,

        /// Override `chunking.max_tokens`.
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Show corpus statistics.
    Stats,

    /// Start the HTTP server.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "docent=debug,docent_core=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg: Config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build { dry_run } => {
            ingest::run_build(&cfg, dry_run).await?;
        }
        Commands::Ask {
            question,
            show_prompt,
        } => {
            search::run_ask(&cfg, &question, show_prompt).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Split { file, max_tokens } => {
            let passages = ingest::split_page(&file, &cfg, max_tokens)?;
            for (i, passage) in passages.iter().enumerate() {
                let marker = if passage.truncated { " (truncated)" } else { "" };
                println!("--- passage {}{} ---", i + 1, marker);
                println!("{}", passage.text);
            }
            println!("{} passages", passages.len());
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Serve => {
            let corpus = load_corpus(&cfg.corpus.path)?;
            let answerer = Answerer::from_config(&cfg, Arc::new(corpus))?;
            server::run_server(&cfg.server.bind, Arc::new(answerer)).await?;
        }
    }

    Ok(())
}
