//! # PressPaper CLI (`presspaper`)
//!
//! ## Usage
//!
//! ```bash
//! presspaper --config ./config/presspaper.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `presspaper init` | Create the SQLite database and run schema migrations |
//! | `presspaper run` | Collect, extract, classify and store once |
//! | `presspaper serve` | Start the trigger server and background scheduler |
//! | `presspaper list` | List stored articles with filters |
//! | `presspaper get <id>` | Show one article |
//! | `presspaper save <id>` | Toggle the saved flag |
//! | `presspaper set <id> <field> <value>` | Write a reader-owned field |
//! | `presspaper distinct <column>` | Distinct topics or organisations |
//! | `presspaper summarize <id>` | Summarise an article and store the result |
//! | `presspaper translate <id> --lang <L>` | Translate an article and store the result |
//! | `presspaper context <id>` | Store the document context block |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use presspaper::store::ArticleQuery;
use presspaper::{articles, config, ingest, migrate, server};

/// PressPaper: ingest government publication listings into a local
/// article store.
#[derive(Parser)]
#[command(name = "presspaper", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// The database location may instead come from `PRESSPAPER_DB_PATH`.
    #[arg(long, global = true, default_value = "./config/presspaper.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Run the ingestion pipeline once.
    Run {
        /// Listing pages to walk per category (default `[source].max_pages_each`).
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Start the HTTP trigger server (`GET /health`, `POST /run`).
    ///
    /// Also runs the pipeline every `[schedule].interval_minutes` unless the
    /// schedule is disabled.
    Serve,

    /// List stored articles, newest first.
    List {
        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive substring of the title.
        #[arg(long)]
        keyword: Option<String>,

        /// Topic filter; repeat to match any of several.
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Organisation filter; repeat to match any of several.
        #[arg(long = "org")]
        organisations: Vec<String>,

        /// Only saved articles.
        #[arg(long)]
        saved: bool,

        #[arg(long, default_value_t = presspaper::store::DEFAULT_QUERY_LIMIT)]
        limit: i64,
    },

    /// Show one article.
    Get { id: i64 },

    /// Toggle the saved flag of an article.
    Save { id: i64 },

    /// Write a reader-owned field: summary, context, translation, notes,
    /// summary_feedback.
    Set {
        id: i64,
        field: String,
        value: String,
        /// Language of the translation (only with `translation`).
        #[arg(long)]
        lang: Option<String>,
    },

    /// Distinct values of `topics` or `organisations`.
    Distinct { column: String },

    /// Summarise an article with the configured AI provider.
    Summarize { id: i64 },

    /// Translate an article with the configured AI provider.
    Translate {
        id: i64,
        #[arg(long)]
        lang: String,
    },

    /// Build and store the document context block.
    Context { id: i64 },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Run { max_pages } => {
            ingest::run_once(&cfg, max_pages).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::List {
            category,
            keyword,
            topics,
            organisations,
            saved,
            limit,
        } => {
            let query = ArticleQuery {
                category,
                keyword,
                topics,
                organisations,
                saved_only: saved,
                limit,
            };
            articles::run_list(&cfg, &query).await?;
        }
        Commands::Get { id } => {
            articles::run_get(&cfg, id).await?;
        }
        Commands::Save { id } => {
            articles::run_toggle_saved(&cfg, id).await?;
        }
        Commands::Set {
            id,
            field,
            value,
            lang,
        } => {
            articles::run_set(&cfg, id, &field, &value, lang.as_deref()).await?;
        }
        Commands::Distinct { column } => {
            articles::run_distinct(&cfg, &column).await?;
        }
        Commands::Summarize { id } => {
            articles::run_summarize(&cfg, id).await?;
        }
        Commands::Translate { id, lang } => {
            articles::run_translate(&cfg, id, &lang).await?;
        }
        Commands::Context { id } => {
            articles::run_context(&cfg, id).await?;
        }
    }

    Ok(())
}
