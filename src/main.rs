use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use prepdeck::app::query::QuestionQuery;
use prepdeck::leetcode::LeetCodeClient;
use prepdeck::model::{Difficulty, ProgressPatch, ProgressStatus};
use prepdeck::store::{CompanyMode, QuestionSort};
use prepdeck::{App, AppError, Config, MemoryStore, StaticIdentity};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "prepdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load per-company CSV question lists into the catalog
    Ingest {
        /// Directory holding one subdirectory per company
        dir: PathBuf,
    },
    /// Mark your accepted LeetCode problems as solved
    Sync {
        /// Value of the LEETCODE_SESSION cookie
        #[arg(long)]
        session: String,
    },
    /// Show your practice statistics
    Stats,
    /// Show the most common questions and hidden gems
    Insights {
        /// Entries per ranking
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Read or edit your progress
    Progress {
        #[command(subcommand)]
        action: ProgressCommand,
    },
    /// Browse the catalog
    Questions {
        /// Company name fragments, comma separated
        #[arg(long, value_delimiter = ',')]
        company: Vec<String>,
        /// How multiple companies combine: and, or
        #[arg(long, default_value = "or")]
        company_mode: CompanyMode,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Title fragment
        #[arg(long)]
        search: Option<String>,
        /// Minimum appearance frequency, in percent
        #[arg(long)]
        min_frequency: Option<f64>,
        /// Minimum acceptance rate, in percent
        #[arg(long)]
        min_acceptance: Option<f64>,
        /// Maximum acceptance rate, in percent
        #[arg(long)]
        max_acceptance: Option<f64>,
        /// Question ids, comma separated
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<String>>,
        /// Only questions with this progress status
        #[arg(long)]
        status: Option<ProgressStatus>,
        /// Only bookmarked questions
        #[arg(long)]
        bookmarked: bool,
        /// Sort key: id, title, acceptanceRate, companyCount, updatedAt
        #[arg(long, default_value = "id")]
        sort: QuestionSort,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one question with all its appearances
    Question {
        id: String,
    },
    /// List companies by question count
    Companies,
    /// Delete progress for questions no longer in the catalog
    PurgeOrphans,
    /// Delete every question from the catalog
    PurgeCatalog {
        /// Confirm the purge
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProgressCommand {
    /// Show progress on one question
    Get { id: String },
    /// Update status, notes or bookmark on one question
    Set {
        id: String,
        /// todo, attempted, solved
        #[arg(long)]
        status: Option<ProgressStatus>,
        #[arg(long)]
        notes: Option<String>,
        /// true or false
        #[arg(long)]
        bookmark: Option<bool>,
    },
    /// List your progress records
    List {
        /// Question ids, comma separated
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<String>>,
        /// Only bookmarked questions
        #[arg(long)]
        bookmarked: bool,
    },
}

impl Commands {
    /// Whether the command can change stored state
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Ingest { .. }
                | Commands::Sync { .. }
                | Commands::Progress { action: ProgressCommand::Set { .. } }
                | Commands::PurgeOrphans
                | Commands::PurgeCatalog { .. }
        )
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

async fn execute(
    app: &App,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<Value, AppError> {
    match command {
        Commands::Ingest { dir } => to_json(&app.ingest(&dir, cancel).await?),
        Commands::Sync { session } => {
            let client = LeetCodeClient::new(&app.config().leetcode)?;
            to_json(&app.sync_leetcode(&session, &client, cancel).await?)
        }
        Commands::Stats => to_json(&app.stats().await?),
        Commands::Insights { limit } => to_json(&app.insights(limit).await?),
        Commands::Progress { action } => match action {
            ProgressCommand::Get { id } => {
                Ok(json!({ "progress": to_json(&app.get_progress(&id).await?)? }))
            }
            ProgressCommand::Set { id, status, notes, bookmark } => {
                let patch = ProgressPatch { status, notes, is_bookmarked: bookmark };
                if patch.is_empty() {
                    tracing::warn!("Nothing to change for {}; only the timestamp is updated", id);
                }
                Ok(json!({ "progress": to_json(&app.update_progress(&id, patch).await?)? }))
            }
            ProgressCommand::List { ids, bookmarked } => {
                Ok(json!({ "progress": to_json(&app.list_progress(ids, bookmarked).await?)? }))
            }
        },
        Commands::Questions {
            company,
            company_mode,
            difficulty,
            search,
            min_frequency,
            min_acceptance,
            max_acceptance,
            ids,
            status,
            bookmarked,
            sort,
            page,
            limit,
        } => {
            let query = QuestionQuery {
                page,
                limit,
                companies: company,
                company_mode,
                difficulty,
                search,
                min_frequency,
                min_acceptance,
                max_acceptance,
                ids,
                status,
                bookmarked_only: bookmarked,
                sort,
            };
            to_json(&app.list_questions(&query).await?)
        }
        Commands::Question { id } => to_json(&app.get_question(&id).await?),
        Commands::Companies => to_json(&app.list_companies().await?),
        Commands::PurgeOrphans => Ok(json!({ "deleted": app.purge_orphan_progress().await? })),
        Commands::PurgeCatalog { yes } => {
            if !yes {
                return Err(AppError::InvalidInput(
                    "Refusing to purge the catalog without --yes".to_string(),
                ));
            }
            Ok(json!({ "deleted": app.purge_catalog().await? }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prepdeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let store = Arc::new(MemoryStore::open(config.store_path()?).await?);
    let identity = Arc::new(StaticIdentity::from(config.identity()));
    let app = App::with_store(store.clone(), identity, config);

    // Ctrl-C abandons the running operation; committed work is kept
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mutates = cli.command.mutates();
    let result = execute(&app, cli.command, &cancel).await;

    if mutates {
        store.save().await?;
    }

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("{}", e);
            eprintln!("{}", serde_json::to_string_pretty(&json!({ "error": e.public_message() }))?);
            std::process::exit(if e.is_auth_failure() { 2 } else { 1 });
        }
    }
}
