//! Reconciliation of external solve history into a user's progress
//!
//! Each solved problem is matched against the catalog, by exact title first
//! and then by URL slug, and the matching progress record is upserted as
//! SOLVED. Solve dates, bookmarks and notes already on a record are never
//! overwritten, so the operation is idempotent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::leetcode::SolvedProblem;
use crate::model::{ProgressFields, ProgressStatus, ProgressWrite, Question};
use crate::store::{CatalogStore, ProgressStore, StoreError};

/// Per-item error messages kept in a summary
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Errors that stop a sync part-way
#[derive(Debug, Error)]
pub enum SyncError {
    /// The caller abandoned the sync; records already written stay written
    #[error("Sync cancelled after {synced} problems")]
    Cancelled { synced: usize },
}

/// Outcome of a sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub status: String,
    /// Solved problems reported by the external platform
    pub total_solved_on_external: usize,
    /// Problems matched to the catalog and recorded as solved
    pub synced_count: usize,
    /// Problems with no catalog counterpart
    pub unmatched_count: usize,
    /// First few per-item failures
    pub errors: Vec<String>,
}

/// Build the URL pattern for a title slug: `/<slug>` at the end, optional `/`
fn slug_pattern(slug: &str) -> Option<Regex> {
    let slug = slug.trim();
    if slug.is_empty() {
        return None;
    }
    Regex::new(&format!("/{}/?$", regex::escape(slug))).ok()
}

enum ItemOutcome {
    Synced,
    Unmatched,
}

/// Writes external solves into the progress store
pub struct ProgressSynchronizer {
    catalog: Arc<dyn CatalogStore>,
    progress: Arc<dyn ProgressStore>,
}

impl ProgressSynchronizer {
    pub fn new(catalog: Arc<dyn CatalogStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { catalog, progress }
    }

    /// Find the catalog question for an external problem
    pub async fn match_question(
        &self,
        problem: &SolvedProblem,
    ) -> Result<Option<Question>, StoreError> {
        if let Some(question) = self.catalog.find_by_title(&problem.title).await? {
            return Ok(Some(question));
        }

        match slug_pattern(&problem.title_slug) {
            Some(pattern) => self.catalog.find_by_url(&pattern).await,
            None => Ok(None),
        }
    }

    async fn sync_one(
        &self,
        user_id: &str,
        problem: &SolvedProblem,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, StoreError> {
        let Some(question) = self.match_question(problem).await? else {
            return Ok(ItemOutcome::Unmatched);
        };

        let write = ProgressWrite {
            set: ProgressFields { status: Some(ProgressStatus::Solved), ..Default::default() },
            set_on_insert: ProgressFields {
                notes: Some(String::new()),
                is_bookmarked: Some(false),
                date_solved: Some(now),
                ..Default::default()
            },
            updated_at: now,
        };

        self.progress.upsert_progress(user_id, &question.id, write).await?;
        Ok(ItemOutcome::Synced)
    }

    /// Sync `problems` into `user_id`'s progress
    pub async fn sync(
        &self,
        user_id: &str,
        problems: &[SolvedProblem],
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        self.sync_at(user_id, problems, Utc::now(), cancel).await
    }

    /// Sync with an explicit timestamp for new solve dates
    pub async fn sync_at(
        &self,
        user_id: &str,
        problems: &[SolvedProblem],
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary {
            status: "Success".to_string(),
            total_solved_on_external: problems.len(),
            synced_count: 0,
            unmatched_count: 0,
            errors: Vec::new(),
        };
        let mut failed = 0;

        for problem in problems {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(SyncError::Cancelled { synced: summary.synced_count });
                }
                outcome = self.sync_one(user_id, problem, now) => outcome,
            };

            match outcome {
                Ok(ItemOutcome::Synced) => summary.synced_count += 1,
                Ok(ItemOutcome::Unmatched) => {
                    tracing::debug!(
                        "No catalog entry for {} ({})",
                        problem.title,
                        problem.title_slug
                    );
                    summary.unmatched_count += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to sync {}: {}", problem.title, e);
                    failed += 1;
                    if summary.errors.len() < MAX_REPORTED_ERRORS {
                        summary
                            .errors
                            .push(format!("Error syncing {}: storage error", problem.title));
                    }
                }
            }
        }

        tracing::info!(
            "Synced {}/{} solved problems for {} ({} unmatched, {} failed)",
            summary.synced_count,
            summary.total_solved_on_external,
            user_id,
            summary.unmatched_count,
            failed
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use async_trait::async_trait;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Difficulty, Progress, QuestionUpsert};
    use crate::store::{MemoryStore, ProgressFilter, ProgressFind};

    fn problem(title: &str, slug: &str) -> SolvedProblem {
        SolvedProblem {
            title: title.to_string(),
            title_slug: slug.to_string(),
            difficulty: "Easy".to_string(),
            topic_tags: Vec::new(),
        }
    }

    fn question(id: &str, title: &str, url: &str) -> QuestionUpsert {
        QuestionUpsert {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            difficulty: Difficulty::Easy,
            acceptance_rate: 0.5,
            companies: BTreeSet::from(["Google".to_string()]),
            appearances: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_questions(vec![
                question("two-sum", "Two Sum", "https://leetcode.com/problems/two-sum"),
                question("lru-cache", "LRU Cache", "https://leetcode.com/problems/lru-cache/"),
            ])
            .await
            .unwrap();
        store
    }

    fn synchronizer(store: &Arc<MemoryStore>) -> ProgressSynchronizer {
        ProgressSynchronizer::new(store.clone(), store.clone())
    }

    #[test]
    fn slug_pattern_is_anchored_and_escaped() {
        let pattern = slug_pattern("two-sum").unwrap();
        assert!(pattern.is_match("https://leetcode.com/problems/two-sum"));
        assert!(pattern.is_match("https://leetcode.com/problems/two-sum/"));
        assert!(!pattern.is_match("https://leetcode.com/problems/two-sum-ii"));
        assert!(!pattern.is_match("https://leetcode.com/problems/two-sum/description"));

        let pattern = slug_pattern("a.b").unwrap();
        assert!(!pattern.is_match("https://x/aXb"));
        assert!(slug_pattern("  ").is_none());
    }

    #[tokio::test]
    async fn matches_by_title_then_slug() {
        let store = seeded().await;
        let sync = synchronizer(&store);

        let by_title = sync.match_question(&problem("Two Sum", "nope")).await.unwrap();
        assert_eq!(by_title.unwrap().id, "two-sum");

        let by_slug =
            sync.match_question(&problem("LRU cache (renamed)", "lru-cache")).await.unwrap();
        assert_eq!(by_slug.unwrap().id, "lru-cache");

        let missing = sync.match_question(&problem("Three Sum", "3sum")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn unmatched_problem_is_not_an_error() {
        let store = seeded().await;
        let summary = synchronizer(&store)
            .sync("u1", &[problem("Three Sum", "3sum")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.synced_count, 0);
        assert_eq!(summary.unmatched_count, 1);
        assert!(summary.errors.is_empty());
        assert_eq!(store.count_progress(&ProgressFilter::for_user("u1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn resync_preserves_date_and_notes() {
        let store = seeded().await;
        let sync = synchronizer(&store);
        let cancel = CancellationToken::new();
        let first_sync = Utc::now() - Duration::days(7);
        let second_sync = Utc::now();

        sync.sync_at("u1", &[problem("Two Sum", "two-sum")], first_sync, &cancel).await.unwrap();

        let mut record = store.get_progress("u1", "two-sum").await.unwrap().unwrap();
        assert_eq!(record.status, ProgressStatus::Solved);
        assert_eq!(record.date_solved, Some(first_sync));

        // A note written between syncs must survive
        record.notes = "hash map".to_string();
        store
            .upsert_progress(
                "u1",
                "two-sum",
                ProgressWrite {
                    set: ProgressFields { notes: Some(record.notes.clone()), ..Default::default() },
                    set_on_insert: ProgressFields::default(),
                    updated_at: first_sync,
                },
            )
            .await
            .unwrap();

        let summary = sync
            .sync_at("u1", &[problem("Two Sum", "two-sum")], second_sync, &cancel)
            .await
            .unwrap();
        assert_eq!(summary.synced_count, 1);

        let record = store.get_progress("u1", "two-sum").await.unwrap().unwrap();
        assert_eq!(record.date_solved, Some(first_sync));
        assert_eq!(record.notes, "hash map");
        assert_eq!(record.updated_at, second_sync);
    }

    #[tokio::test]
    async fn existing_attempt_becomes_solved_without_date() {
        let store = seeded().await;
        store
            .upsert_progress(
                "u1",
                "two-sum",
                ProgressWrite {
                    set: ProgressFields {
                        status: Some(ProgressStatus::Attempted),
                        is_bookmarked: Some(true),
                        ..Default::default()
                    },
                    set_on_insert: ProgressFields::default(),
                    updated_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        synchronizer(&store)
            .sync("u1", &[problem("Two Sum", "two-sum")], &CancellationToken::new())
            .await
            .unwrap();

        let record = store.get_progress("u1", "two-sum").await.unwrap().unwrap();
        assert_eq!(record.status, ProgressStatus::Solved);
        assert!(record.is_bookmarked);
        assert!(record.date_solved.is_none());
    }

    /// Progress store that rejects writes for chosen questions and can
    /// cancel the sync once a write lands
    struct FlakyProgress {
        inner: Arc<MemoryStore>,
        rejected: HashSet<String>,
        cancel_after_write: Option<CancellationToken>,
    }

    impl FlakyProgress {
        fn rejecting(inner: &Arc<MemoryStore>, question_id: &str) -> Self {
            Self {
                inner: inner.clone(),
                rejected: HashSet::from([question_id.to_string()]),
                cancel_after_write: None,
            }
        }

        fn cancelling(inner: &Arc<MemoryStore>, cancel: &CancellationToken) -> Self {
            Self {
                inner: inner.clone(),
                rejected: HashSet::new(),
                cancel_after_write: Some(cancel.clone()),
            }
        }
    }

    #[async_trait]
    impl ProgressStore for FlakyProgress {
        async fn get_progress(
            &self,
            user_id: &str,
            question_id: &str,
        ) -> Result<Option<Progress>, StoreError> {
            self.inner.get_progress(user_id, question_id).await
        }
        async fn upsert_progress(
            &self,
            user_id: &str,
            question_id: &str,
            write: ProgressWrite,
        ) -> Result<Progress, StoreError> {
            if self.rejected.contains(question_id) {
                return Err(StoreError::Unavailable("write conflict".to_string()));
            }
            let written = self.inner.upsert_progress(user_id, question_id, write).await?;
            if let Some(cancel) = &self.cancel_after_write {
                cancel.cancel();
            }
            Ok(written)
        }
        async fn find_progress(
            &self,
            filter: &ProgressFilter,
            options: &ProgressFind,
        ) -> Result<Vec<Progress>, StoreError> {
            self.inner.find_progress(filter, options).await
        }
        async fn count_progress(&self, filter: &ProgressFilter) -> Result<u64, StoreError> {
            self.inner.count_progress(filter).await
        }
        async fn delete_progress_outside(
            &self,
            known: &HashSet<String>,
        ) -> Result<u64, StoreError> {
            self.inner.delete_progress_outside(known).await
        }
    }

    #[tokio::test]
    async fn item_failure_does_not_abort_batch() {
        let store = seeded().await;
        let progress = Arc::new(FlakyProgress::rejecting(&store, "two-sum"));
        let sync = ProgressSynchronizer::new(store.clone(), progress);

        let summary = sync
            .sync(
                "u1",
                &[problem("Two Sum", "two-sum"), problem("LRU Cache", "lru-cache")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(summary.total_solved_on_external, 2);
        assert_eq!(summary.synced_count, 1);
        assert_eq!(summary.errors, vec!["Error syncing Two Sum: storage error".to_string()]);
        assert!(store.get_progress("u1", "lru-cache").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn error_list_is_capped() {
        let store = seeded().await;
        let progress = Arc::new(FlakyProgress::rejecting(&store, "two-sum"));
        let sync = ProgressSynchronizer::new(store.clone(), progress);
        let problems: Vec<_> = (0..15).map(|_| problem("Two Sum", "two-sum")).collect();

        let summary = sync.sync("u1", &problems, &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.errors.len(), MAX_REPORTED_ERRORS);
    }

    #[tokio::test]
    async fn cancelled_sync_reports_progress_so_far() {
        let store = seeded().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = synchronizer(&store)
            .sync("u1", &[problem("Two Sum", "two-sum")], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Cancelled { synced: 0 }));
    }

    #[tokio::test]
    async fn cancellation_between_items_keeps_committed_writes() {
        let store = seeded().await;
        let cancel = CancellationToken::new();
        let progress = Arc::new(FlakyProgress::cancelling(&store, &cancel));
        let sync = ProgressSynchronizer::new(store.clone(), progress);

        let problems = [problem("Two Sum", "two-sum"), problem("LRU Cache", "lru-cache")];
        let err = sync.sync("u1", &problems, &cancel).await.unwrap_err();

        assert!(matches!(err, SyncError::Cancelled { synced: 1 }));
        assert!(store.get_progress("u1", "two-sum").await.unwrap().is_some());
        assert!(store.get_progress("u1", "lru-cache").await.unwrap().is_none());
    }
}
