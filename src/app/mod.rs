//! The public operations, wired to injected stores and the current identity
//!
//! Every operation returns a serializable payload or a single [`AppError`].
//! Operations that act on a user's progress decline with
//! [`AppError::NotAuthenticated`] when nobody is signed in.

pub mod query;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::auth::{Identity, IdentityProvider};
use crate::config::Config;
use crate::error::AppError;
use crate::ingest::{IngestSummary, Ingestor};
use crate::leetcode::SolveHistory;
use crate::model::{ProgressPatch, ProgressView, Question};
use crate::stats::{Insights, StatsAggregator, StatsReport};
use crate::store::{CatalogStore, FindOptions, ProgressFilter, ProgressFind, ProgressStore};
use crate::sync::{ProgressSynchronizer, SyncSummary};
use query::{CompanyCount, Pagination, QuestionPage, QuestionQuery};

/// Ranking size for insights when none is given
pub const DEFAULT_INSIGHTS_LIMIT: usize = 50;

/// The application facade
pub struct App {
    catalog: Arc<dyn CatalogStore>,
    progress: Arc<dyn ProgressStore>,
    identity: Arc<dyn IdentityProvider>,
    config: Config,
}

impl App {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        progress: Arc<dyn ProgressStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
    ) -> Self {
        Self { catalog, progress, identity, config }
    }

    /// Use one backend for both the catalog and progress
    pub fn with_store<S>(store: Arc<S>, identity: Arc<dyn IdentityProvider>, config: Config) -> Self
    where
        S: CatalogStore + ProgressStore + 'static,
    {
        Self::new(store.clone(), store, identity, config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn require_user(&self) -> Result<Identity, AppError> {
        self.identity.current_user().ok_or(AppError::NotAuthenticated)
    }

    fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(self.catalog.clone(), self.progress.clone())
    }

    /// Load the per-company CSV tree under `root` into the catalog
    pub async fn ingest(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary, AppError> {
        let summary = Ingestor::new(self.catalog.clone())
            .with_batch_size(self.config.ingest_batch_size)
            .run(root, cancel)
            .await?;
        Ok(summary)
    }

    /// Fetch the account's LeetCode solves and record them as solved
    pub async fn sync_leetcode(
        &self,
        session: &str,
        history: &dyn SolveHistory,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, AppError> {
        let user = self.require_user()?;

        let solved = history.fetch_solved(session, cancel).await?;
        tracing::info!("Fetched {} solved problems for {}", solved.len(), user.user_id);

        let summary = ProgressSynchronizer::new(self.catalog.clone(), self.progress.clone())
            .sync(&user.user_id, &solved, cancel)
            .await?;
        Ok(summary)
    }

    /// The dashboard report for the current user
    pub async fn stats(&self) -> Result<StatsReport, AppError> {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> Result<StatsReport, AppError> {
        let user = self.require_user()?;
        Ok(self.aggregator().report_at(&user.user_id, now).await?)
    }

    /// Catalog-wide rankings; no sign-in needed
    pub async fn insights(&self, limit: Option<usize>) -> Result<Insights, AppError> {
        let limit = limit.unwrap_or(DEFAULT_INSIGHTS_LIMIT);
        if limit == 0 {
            return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
        }
        Ok(self.aggregator().insights(limit).await?)
    }

    /// Progress on one question; a default TODO view when nothing is stored
    pub async fn get_progress(&self, question_id: &str) -> Result<ProgressView, AppError> {
        let user = self.require_user()?;
        let record = self.progress.get_progress(&user.user_id, question_id).await?;
        Ok(record.map(|p| p.view()).unwrap_or_else(|| ProgressView::untouched(question_id)))
    }

    /// Apply a user edit, creating the record on first write
    pub async fn update_progress(
        &self,
        question_id: &str,
        patch: ProgressPatch,
    ) -> Result<ProgressView, AppError> {
        self.update_progress_at(question_id, patch, Utc::now()).await
    }

    pub async fn update_progress_at(
        &self,
        question_id: &str,
        patch: ProgressPatch,
        now: DateTime<Utc>,
    ) -> Result<ProgressView, AppError> {
        let user = self.require_user()?;
        let question_id = question_id.trim();
        if question_id.is_empty() {
            return Err(AppError::InvalidInput("questionId is required".to_string()));
        }

        let record = self
            .progress
            .upsert_progress(&user.user_id, question_id, patch.into_write(now))
            .await?;
        tracing::debug!(
            "Updated progress {} for {}: {:?}",
            question_id,
            user.user_id,
            record.status
        );
        Ok(record.view())
    }

    /// The current user's records keyed by question id
    pub async fn list_progress(
        &self,
        question_ids: Option<Vec<String>>,
        bookmarked_only: bool,
    ) -> Result<BTreeMap<String, ProgressView>, AppError> {
        let user = self.require_user()?;

        let mut filter = ProgressFilter::for_user(&user.user_id);
        if let Some(ids) = question_ids {
            filter = filter.with_question_ids(ids);
        }
        if bookmarked_only {
            filter = filter.bookmarked_only();
        }

        let records = self.progress.find_progress(&filter, &ProgressFind::default()).await?;
        Ok(records.into_iter().map(|p| (p.question_id.clone(), p.view())).collect())
    }

    /// A filtered, sorted page of the catalog
    pub async fn list_questions(&self, query: &QuestionQuery) -> Result<QuestionPage, AppError> {
        query.validate()?;
        let mut filter = query.to_filter();

        // Progress filters apply only when someone is signed in
        if query.uses_progress() {
            if let Some(user) = self.identity.current_user() {
                let mut progress_filter = ProgressFilter::for_user(&user.user_id);
                if let Some(status) = query.status {
                    progress_filter = progress_filter.with_statuses(vec![status]);
                }
                if query.bookmarked_only {
                    progress_filter = progress_filter.bookmarked_only();
                }

                let records =
                    self.progress.find_progress(&progress_filter, &ProgressFind::default()).await?;
                let mut ids: Vec<String> = records.into_iter().map(|p| p.question_id).collect();
                if let Some(requested) = &filter.ids {
                    let requested: HashSet<&String> = requested.iter().collect();
                    ids.retain(|id| requested.contains(id));
                }
                if ids.is_empty() {
                    return Ok(QuestionPage::empty(query.page()));
                }
                filter = filter.with_ids(ids);
            }
        }

        let options = FindOptions::sorted(query.sort).skip(query.offset()).limit(query.page_size());
        let questions = self.catalog.find_questions(&filter, &options).await?;
        let total = self.catalog.count_questions(&filter).await?;

        Ok(QuestionPage {
            data: questions.iter().map(|q| q.summary()).collect(),
            pagination: Pagination::new(total, query.page(), query.page_size()),
        })
    }

    pub async fn get_question(&self, id: &str) -> Result<Question, AppError> {
        self.catalog
            .get_question(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {}", id)))
    }

    /// Every company with its question count, largest first
    pub async fn list_companies(&self) -> Result<Vec<CompanyCount>, AppError> {
        let groups = self.catalog.company_groups(None).await?;
        Ok(groups
            .into_iter()
            .map(|g| CompanyCount { company: g.company, count: g.total })
            .collect())
    }

    /// Delete progress pointing at questions no longer in the catalog
    pub async fn purge_orphan_progress(&self) -> Result<u64, AppError> {
        let known = self.catalog.question_ids().await?;
        let deleted = self.progress.delete_progress_outside(&known).await?;
        tracing::info!("Removed {} orphaned progress records", deleted);
        Ok(deleted)
    }

    /// Empty the catalog
    pub async fn purge_catalog(&self) -> Result<u64, AppError> {
        let deleted = self.catalog.purge_questions().await?;
        tracing::info!("Purged {} questions from the catalog", deleted);
        Ok(deleted)
    }
}
