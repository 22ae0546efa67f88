//! Typed query criteria for the stores
//!
//! Every field is optional; an unset field does not constrain the match.

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, Progress, ProgressStatus, Question};

/// How a multi-company filter combines its companies
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompanyMode {
    /// Question must be tagged with at least one of the companies
    #[default]
    Or,
    /// Question must be tagged with every company
    And,
}

impl std::str::FromStr for CompanyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OR" => Ok(Self::Or),
            "AND" => Ok(Self::And),
            _ => Err(format!("Unknown company mode: {}. Options: and, or", s)),
        }
    }
}

/// Criteria over catalog questions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionFilter {
    /// Restrict to these question ids
    pub ids: Option<Vec<String>>,
    /// Company name fragments, matched case-insensitively
    pub companies: Vec<String>,
    pub company_mode: CompanyMode,
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive title fragment
    pub title_contains: Option<String>,
    /// At least one appearance must reach this frequency fraction
    pub min_frequency: Option<f64>,
    pub min_acceptance: Option<f64>,
    pub max_acceptance: Option<f64>,
    pub min_companies: Option<usize>,
    pub max_companies: Option<usize>,
}

impl QuestionFilter {
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_companies(mut self, companies: Vec<String>, mode: CompanyMode) -> Self {
        self.companies = companies;
        self.company_mode = mode;
        self
    }

    pub fn with_min_acceptance(mut self, fraction: f64) -> Self {
        self.min_acceptance = Some(fraction);
        self
    }

    pub fn with_company_count(mut self, min: usize, max: usize) -> Self {
        self.min_companies = Some(min);
        self.max_companies = Some(max);
        self
    }

    /// Evaluate the criteria against one question
    pub fn matches(&self, question: &Question) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| *id == question.id) {
                return false;
            }
        }

        if !self.companies.is_empty() {
            let tagged = |needle: &String| {
                let needle = needle.to_lowercase();
                question.companies.iter().any(|c| c.to_lowercase().contains(&needle))
            };
            let hit = match self.company_mode {
                CompanyMode::Or => self.companies.iter().any(tagged),
                CompanyMode::And => self.companies.iter().all(tagged),
            };
            if !hit {
                return false;
            }
        }

        if self.difficulty.is_some_and(|d| d != question.difficulty) {
            return false;
        }

        if let Some(fragment) = &self.title_contains {
            if !question.title.to_lowercase().contains(&fragment.to_lowercase()) {
                return false;
            }
        }

        if let Some(min) = self.min_frequency {
            if question.max_frequency() < min {
                return false;
            }
        }

        if self.min_acceptance.is_some_and(|min| question.acceptance_rate < min) {
            return false;
        }
        if self.max_acceptance.is_some_and(|max| question.acceptance_rate > max) {
            return false;
        }

        let count = question.company_count();
        if self.min_companies.is_some_and(|min| count < min) {
            return false;
        }
        if self.max_companies.is_some_and(|max| count > max) {
            return false;
        }

        true
    }
}

/// Sort key for question listings. Everything except `Id` sorts descending.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuestionSort {
    #[default]
    Id,
    Title,
    AcceptanceRate,
    CompanyCount,
    UpdatedAt,
}

impl std::str::FromStr for QuestionSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "acceptanceRate" | "acceptance" => Ok(Self::AcceptanceRate),
            "companyCount" | "companies" => Ok(Self::CompanyCount),
            "updatedAt" | "updated" => Ok(Self::UpdatedAt),
            _ => Err(format!(
                "Unknown sort: {}. Options: id, title, acceptanceRate, companyCount, updatedAt",
                s
            )),
        }
    }
}

impl QuestionSort {
    /// Order two questions by this key, ties broken by id ascending
    pub fn compare(&self, a: &Question, b: &Question) -> std::cmp::Ordering {
        let primary = match self {
            Self::Id => std::cmp::Ordering::Equal,
            Self::Title => b.title.cmp(&a.title),
            Self::AcceptanceRate => b.acceptance_rate.total_cmp(&a.acceptance_rate),
            Self::CompanyCount => b.company_count().cmp(&a.company_count()),
            Self::UpdatedAt => b.updated_at.cmp(&a.updated_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Sort, skip and limit for a question query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: QuestionSort,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn sorted(sort: QuestionSort) -> Self {
        Self { sort, ..Default::default() }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// Criteria over one user's progress records
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressFilter {
    pub user_id: String,
    pub question_ids: Option<Vec<String>>,
    pub statuses: Option<Vec<ProgressStatus>>,
    pub bookmarked: Option<bool>,
}

impl ProgressFilter {
    /// All records belonging to a user
    pub fn for_user(user_id: &str) -> Self {
        Self { user_id: user_id.to_string(), question_ids: None, statuses: None, bookmarked: None }
    }

    pub fn with_question_ids(mut self, ids: Vec<String>) -> Self {
        self.question_ids = Some(ids);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ProgressStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn bookmarked_only(mut self) -> Self {
        self.bookmarked = Some(true);
        self
    }

    pub fn matches(&self, record: &Progress) -> bool {
        record.user_id == self.user_id
            && self.question_ids.as_ref().is_none_or(|ids| ids.contains(&record.question_id))
            && self.statuses.as_ref().is_none_or(|s| s.contains(&record.status))
            && self.bookmarked.is_none_or(|b| record.is_bookmarked == b)
    }
}

/// Ordering for progress listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressSort {
    #[default]
    QuestionId,
    /// Most recently modified first
    RecentlyUpdated,
}

/// Sort and limit for a progress query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressFind {
    pub sort: ProgressSort,
    pub limit: Option<usize>,
}
