//! Document storage for the question catalog and user progress
//!
//! The stores are injected as trait objects so the ingestion, sync and
//! statistics layers never depend on a concrete backend. Every single-document
//! upsert is atomic; batches of upserts are not transactional.

pub mod error;
pub mod filter;
pub mod memory;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, Progress, ProgressWrite, Question, QuestionUpsert};

pub use error::StoreError;
pub use filter::{
    CompanyMode, FindOptions, ProgressFilter, ProgressFind, ProgressSort, QuestionFilter,
    QuestionSort,
};
pub use memory::MemoryStore;

/// Questions grouped under one company (companies unwound, then grouped)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyGroup {
    pub company: String,
    pub total: usize,
    pub question_ids: Vec<String>,
}

/// The question catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Upsert a batch of questions, returning the number of writes performed
    async fn upsert_questions(&self, batch: Vec<QuestionUpsert>) -> Result<usize, StoreError>;

    async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError>;

    /// Fetch every question whose id is in `ids`; missing ids are ignored
    async fn get_questions(&self, ids: &[String]) -> Result<Vec<Question>, StoreError>;

    /// Exact, case-sensitive title lookup
    async fn find_by_title(&self, title: &str) -> Result<Option<Question>, StoreError>;

    /// First question (by id) whose URL matches `pattern`
    async fn find_by_url(&self, pattern: &Regex) -> Result<Option<Question>, StoreError>;

    async fn find_questions(
        &self,
        filter: &QuestionFilter,
        options: &FindOptions,
    ) -> Result<Vec<Question>, StoreError>;

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u64, StoreError>;

    /// Question totals grouped by difficulty; absent tiers are omitted
    async fn count_by_difficulty(&self) -> Result<HashMap<Difficulty, u64>, StoreError>;

    /// Companies with their questions, largest first, ties by name
    async fn company_groups(&self, limit: Option<usize>) -> Result<Vec<CompanyGroup>, StoreError>;

    async fn question_ids(&self) -> Result<HashSet<String>, StoreError>;

    /// Remove every question, returning how many were deleted
    async fn purge_questions(&self) -> Result<u64, StoreError>;
}

/// Per-user progress records keyed by (user, question)
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_progress(
        &self,
        user_id: &str,
        question_id: &str,
    ) -> Result<Option<Progress>, StoreError>;

    /// Atomically apply `write` to the record, creating it when absent
    async fn upsert_progress(
        &self,
        user_id: &str,
        question_id: &str,
        write: ProgressWrite,
    ) -> Result<Progress, StoreError>;

    async fn find_progress(
        &self,
        filter: &ProgressFilter,
        options: &ProgressFind,
    ) -> Result<Vec<Progress>, StoreError>;

    async fn count_progress(&self, filter: &ProgressFilter) -> Result<u64, StoreError>;

    /// Delete records (of any user) whose question id is not in `known`
    async fn delete_progress_outside(&self, known: &HashSet<String>) -> Result<u64, StoreError>;
}
