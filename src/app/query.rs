//! Catalog browsing queries and paged results

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::{Difficulty, ProgressStatus, QuestionSummary};
use crate::store::{CompanyMode, QuestionFilter, QuestionSort};

/// Questions per page when no limit is given
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A catalog listing request. Percentages are on a 0-100 scale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionQuery {
    /// 1-based page number
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub companies: Vec<String>,
    pub company_mode: CompanyMode,
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive title fragment
    pub search: Option<String>,
    pub min_frequency: Option<f64>,
    pub min_acceptance: Option<f64>,
    pub max_acceptance: Option<f64>,
    pub ids: Option<Vec<String>>,
    /// Only questions the current user has at this status
    pub status: Option<ProgressStatus>,
    /// Only questions the current user has bookmarked
    pub bookmarked_only: bool,
    pub sort: QuestionSort,
}

impl QuestionQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Whether the query narrows by the user's own progress
    pub fn uses_progress(&self) -> bool {
        self.status.is_some() || self.bookmarked_only
    }

    /// Reject paging or percentages that cannot be satisfied
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page() == 0 {
            return Err(AppError::InvalidInput("page must be at least 1".to_string()));
        }
        if self.page_size() == 0 {
            return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
        }

        let percents = [
            ("minFrequency", self.min_frequency),
            ("minAcceptance", self.min_acceptance),
            ("maxAcceptance", self.max_acceptance),
        ];
        for (name, value) in percents {
            if value.is_some_and(|v| !(0.0..=100.0).contains(&v)) {
                return Err(AppError::InvalidInput(format!("{} must be between 0 and 100", name)));
            }
        }

        Ok(())
    }

    /// Catalog criteria for this query, percentages converted to fractions
    pub fn to_filter(&self) -> QuestionFilter {
        let companies: Vec<String> = self
            .companies
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        QuestionFilter {
            ids: self.ids.clone(),
            companies,
            company_mode: self.company_mode,
            difficulty: self.difficulty,
            title_contains: self.search.clone().filter(|s| !s.trim().is_empty()),
            min_frequency: self.min_frequency.map(|p| p / 100.0),
            min_acceptance: self.min_acceptance.map(|p| p / 100.0),
            max_acceptance: self.max_acceptance.map(|p| p / 100.0),
            ..Default::default()
        }
    }

    /// Rows to skip for the requested page
    pub fn offset(&self) -> usize {
        self.page().saturating_sub(1).saturating_mul(self.page_size())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: usize,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: usize, page_size: usize) -> Self {
        Self { total, page, pages: total.div_ceil(page_size.max(1) as u64) }
    }
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPage {
    pub data: Vec<QuestionSummary>,
    pub pagination: Pagination,
}

impl QuestionPage {
    pub fn empty(page: usize) -> Self {
        Self { data: Vec::new(), pagination: Pagination { total: 0, page, pages: 0 } }
    }
}

/// A company and the number of catalog questions tagged with it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyCount {
    pub company: String,
    pub count: usize,
}
