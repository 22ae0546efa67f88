//! Catalog ingestion from a directory of per-company CSV files
//!
//! The root directory holds one subdirectory per company; each contains CSV
//! files whose names encode the time period they cover. Rows are merged by
//! exact title before anything is written, then upserted in batches.

pub mod reader;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use self::reader::{CsvQuestion, derive_slug, read_company_file};
use crate::model::{Appearance, Difficulty, Period, QuestionUpsert};
use crate::store::{CatalogStore, StoreError};

/// Default number of questions per storage batch
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Errors that abort an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    /// The root directory does not exist or is not a directory
    #[error("Data directory not found: {0:?}")]
    MissingRoot(PathBuf),

    /// Listing a directory failed
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV file could not be opened or has no readable header
    #[error("Failed to parse CSV {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A batch write failed; earlier batches stay committed
    #[error("Storage failed after {committed} writes: {source}")]
    Store {
        committed: usize,
        #[source]
        source: StoreError,
    },

    /// The caller abandoned the run; earlier batches stay committed
    #[error("Ingestion cancelled after {committed} writes")]
    Cancelled { committed: usize },

    /// The blocking scan task panicked or was aborted
    #[error("Directory scan failed: {0}")]
    Scan(String),
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Rows accepted across all files
    pub processed: usize,
    /// Distinct titles found
    pub unique_questions: usize,
    /// Upserts written to the catalog
    pub db_operations: usize,
    /// Rows dropped for missing or invalid fields
    pub skipped_rows: usize,
}

/// A question being assembled from every row sharing its title
#[derive(Debug, Clone)]
struct PendingQuestion {
    id: String,
    title: String,
    url: String,
    difficulty: Difficulty,
    acceptance_rate: f64,
    companies: BTreeSet<String>,
    appearances: Vec<Appearance>,
}

impl PendingQuestion {
    fn into_upsert(self, now: DateTime<Utc>) -> QuestionUpsert {
        QuestionUpsert {
            id: self.id,
            title: self.title,
            url: self.url,
            difficulty: self.difficulty,
            acceptance_rate: self.acceptance_rate,
            companies: self.companies,
            appearances: self.appearances,
            updated_at: now,
        }
    }
}

/// In-memory merge of every row found under the root directory
#[derive(Debug, Default)]
pub struct CatalogScan {
    questions: Vec<PendingQuestion>,
    by_title: HashMap<String, usize>,
    processed: usize,
    skipped: usize,
}

impl CatalogScan {
    /// Merge one row. The first row seen for a title fixes its id, URL,
    /// difficulty and acceptance; later rows only add a company and an
    /// appearance.
    fn add(&mut self, row: CsvQuestion, company: &str, period: Period, source_file: &str) {
        let appearance = Appearance {
            company: company.to_string(),
            period,
            frequency: row.frequency,
            source_file: source_file.to_string(),
        };

        match self.by_title.get(&row.title) {
            Some(&index) => {
                let pending = &mut self.questions[index];
                pending.companies.insert(company.to_string());
                pending.appearances.push(appearance);
            }
            None => {
                self.by_title.insert(row.title.clone(), self.questions.len());
                self.questions.push(PendingQuestion {
                    id: derive_slug(&row.url, &row.title),
                    title: row.title,
                    url: row.url,
                    difficulty: row.difficulty,
                    acceptance_rate: row.acceptance_rate,
                    companies: BTreeSet::from([company.to_string()]),
                    appearances: vec![appearance],
                });
            }
        }

        self.processed += 1;
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn unique_questions(&self) -> usize {
        self.questions.len()
    }

    /// Upserts in first-seen order, all stamped with `now`
    pub fn into_upserts(self, now: DateTime<Utc>) -> Vec<QuestionUpsert> {
        self.questions.into_iter().map(|q| q.into_upsert(now)).collect()
    }
}

/// Sorted entries of a directory matching `keep`
fn sorted_entries(
    path: &Path,
    keep: impl Fn(&fs::DirEntry) -> bool,
) -> Result<Vec<fs::DirEntry>, IngestError> {
    let io_error = |source| IngestError::Io { path: path.to_path_buf(), source };

    let mut entries: Vec<_> =
        fs::read_dir(path).map_err(io_error)?.filter_map(|e| e.ok()).filter(|e| keep(e)).collect();
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Walk `root/<company>/*.csv` and merge every row by title.
///
/// Companies and files are visited in name order so the first occurrence of a
/// title is deterministic.
pub fn scan_directory(root: &Path) -> Result<CatalogScan, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::MissingRoot(root.to_path_buf()));
    }

    let mut scan = CatalogScan::default();

    for company_dir in sorted_entries(root, |e| e.path().is_dir())? {
        let company = company_dir.file_name().to_string_lossy().to_string();
        let csv_files = sorted_entries(&company_dir.path(), |e| {
            e.path().is_file() && e.path().extension().is_some_and(|ext| ext == "csv")
        })?;

        for file in csv_files {
            let file_name = file.file_name().to_string_lossy().to_string();
            let period = Period::from_file_name(&file_name);
            let source_file = format!("{}/{}", company, file_name);

            let parsed = read_company_file(&file.path())?;
            if parsed.skipped > 0 {
                tracing::warn!("Skipped {} unusable rows in {}", parsed.skipped, source_file);
            }
            scan.skipped += parsed.skipped;

            for row in parsed.rows {
                scan.add(row, &company, period, &source_file);
            }
        }
    }

    Ok(scan)
}

/// Loads CSV data into the catalog
pub struct Ingestor {
    catalog: Arc<dyn CatalogStore>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog, batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Override the batch size (values below 1 are treated as 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Scan `root` and upsert everything found.
    ///
    /// A storage failure or cancellation stops the remaining batches; batches
    /// already written are kept, and re-running the ingestion is safe.
    pub async fn run(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary, IngestError> {
        let scan_root = root.to_path_buf();
        let scan = tokio::task::spawn_blocking(move || scan_directory(&scan_root))
            .await
            .map_err(|e| IngestError::Scan(e.to_string()))??;

        let mut summary = IngestSummary {
            processed: scan.processed(),
            unique_questions: scan.unique_questions(),
            db_operations: 0,
            skipped_rows: scan.skipped(),
        };

        let mut pending = scan.into_upserts(Utc::now()).into_iter();
        loop {
            let batch: Vec<QuestionUpsert> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let committed = summary.db_operations;
            let written = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(IngestError::Cancelled { committed });
                }
                result = self.catalog.upsert_questions(batch) => {
                    result.map_err(|source| IngestError::Store { committed, source })?
                }
            };

            summary.db_operations += written;
            tracing::debug!(
                "Wrote batch of {} questions ({} total)",
                written,
                summary.db_operations
            );
        }

        tracing::info!(
            "Ingested {:?}: {} rows, {} unique questions, {} writes, {} skipped",
            root,
            summary.processed,
            summary.unique_questions,
            summary.db_operations,
            summary.skipped_rows
        );

        Ok(summary)
    }
}
