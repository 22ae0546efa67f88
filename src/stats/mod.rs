//! Per-user statistics and catalog-wide insight rankings
//!
//! Everything here is read-only. A user with no progress gets an all-zero
//! report rather than an error.

pub mod calendar;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, ProgressStatus, QuestionInsight};
use crate::store::{
    CatalogStore, FindOptions, ProgressFilter, ProgressFind, ProgressSort, ProgressStore,
    QuestionFilter, QuestionSort, StoreError,
};

pub use calendar::{HeatmapDay, distinct_days, heatmap, percentage, streak};

/// Companies shown in the readiness table
pub const READINESS_COMPANIES: usize = 20;
/// Entries in the recent-activity feed
pub const RECENT_ACTIVITY_LIMIT: usize = 10;
/// Entries in each ranking on the dashboard
pub const DASHBOARD_RANKING_LIMIT: usize = 10;
/// Minimum acceptance rate for a hidden gem
pub const HIDDEN_GEM_MIN_ACCEPTANCE: f64 = 0.6;

/// Company-count window for hidden gems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemRange {
    /// The compact dashboard list, 3 to 10 companies
    Dashboard,
    /// The standalone insights list, 3 to 15 companies
    Explorer,
}

impl GemRange {
    pub fn bounds(&self) -> (usize, usize) {
        match self {
            Self::Dashboard => (3, 10),
            Self::Explorer => (3, 15),
        }
    }
}

/// Headline counts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_solved: u64,
    pub total_attempted: u64,
    pub total_bookmarked: u64,
    pub streak_days: u32,
    pub last_solved_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierProgress {
    pub solved: u64,
    pub total: u64,
}

/// Solved versus total per difficulty tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DifficultyBreakdown {
    pub easy: TierProgress,
    pub medium: TierProgress,
    pub hard: TierProgress,
}

impl DifficultyBreakdown {
    pub fn tier(&self, difficulty: Difficulty) -> &TierProgress {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    fn tier_mut(&mut self, difficulty: Difficulty) -> &mut TierProgress {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }
}

/// Share of a company's questions the user has solved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyReadiness {
    pub company: String,
    pub solved: usize,
    pub total: usize,
    pub percentage: f64,
}

/// A recently touched progress record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub question_id: String,
    pub title: String,
    pub difficulty: String,
    pub status: ProgressStatus,
    pub date: DateTime<Utc>,
}

/// The full dashboard snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub overview: Overview,
    pub by_difficulty: DifficultyBreakdown,
    pub activity_heatmap: Vec<HeatmapDay>,
    pub company_readiness: Vec<CompanyReadiness>,
    pub recent_activity: Vec<RecentActivity>,
    pub most_common_questions: Vec<QuestionInsight>,
    pub hidden_gems: Vec<QuestionInsight>,
}

/// Catalog-wide rankings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub most_common_questions: Vec<QuestionInsight>,
    pub hidden_gems: Vec<QuestionInsight>,
}

/// Builds reports from the catalog and progress stores
pub struct StatsAggregator {
    catalog: Arc<dyn CatalogStore>,
    progress: Arc<dyn ProgressStore>,
}

impl StatsAggregator {
    pub fn new(catalog: Arc<dyn CatalogStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { catalog, progress }
    }

    /// Questions tagged by the most companies
    pub async fn most_common(&self, limit: usize) -> Result<Vec<QuestionInsight>, StoreError> {
        let options = FindOptions::sorted(QuestionSort::CompanyCount).limit(limit);
        let questions = self.catalog.find_questions(&QuestionFilter::default(), &options).await?;
        Ok(questions.iter().map(|q| q.insight()).collect())
    }

    /// High-acceptance questions with moderate company coverage
    pub async fn hidden_gems(
        &self,
        range: GemRange,
        limit: usize,
    ) -> Result<Vec<QuestionInsight>, StoreError> {
        let (min, max) = range.bounds();
        let filter = QuestionFilter::default()
            .with_min_acceptance(HIDDEN_GEM_MIN_ACCEPTANCE)
            .with_company_count(min, max);
        let options = FindOptions::sorted(QuestionSort::AcceptanceRate).limit(limit);

        let questions = self.catalog.find_questions(&filter, &options).await?;
        Ok(questions.iter().map(|q| q.insight()).collect())
    }

    /// Both rankings with the wide hidden-gem window
    pub async fn insights(&self, limit: usize) -> Result<Insights, StoreError> {
        Ok(Insights {
            most_common_questions: self.most_common(limit).await?,
            hidden_gems: self.hidden_gems(GemRange::Explorer, limit).await?,
        })
    }

    pub async fn report(&self, user_id: &str) -> Result<StatsReport, StoreError> {
        self.report_at(user_id, Utc::now()).await
    }

    /// Build the report as seen at `now`
    pub async fn report_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StatsReport, StoreError> {
        let today = now.date_naive();

        let solved = self
            .progress
            .find_progress(
                &ProgressFilter::for_user(user_id).with_statuses(vec![ProgressStatus::Solved]),
                &ProgressFind::default(),
            )
            .await?;
        let total_attempted = self
            .progress
            .count_progress(
                &ProgressFilter::for_user(user_id).with_statuses(vec![ProgressStatus::Attempted]),
            )
            .await?;
        let total_bookmarked = self
            .progress
            .count_progress(&ProgressFilter::for_user(user_id).bookmarked_only())
            .await?;

        let solve_times: Vec<DateTime<Utc>> = solved.iter().filter_map(|p| p.date_solved).collect();
        let solve_days = distinct_days(&solve_times);
        let solved_ids: Vec<String> = solved.iter().map(|p| p.question_id.clone()).collect();

        let overview = Overview {
            total_solved: solved.len() as u64,
            total_attempted,
            total_bookmarked,
            streak_days: streak(&solve_days, today),
            last_solved_date: solve_days.range(..=today).next_back().copied(),
        };

        let report = StatsReport {
            overview,
            by_difficulty: self.difficulty_breakdown(&solved_ids).await?,
            activity_heatmap: heatmap(&solve_times, today),
            company_readiness: self.company_readiness(&solved_ids).await?,
            recent_activity: self.recent_activity(user_id).await?,
            most_common_questions: self.most_common(DASHBOARD_RANKING_LIMIT).await?,
            hidden_gems: self.hidden_gems(GemRange::Dashboard, DASHBOARD_RANKING_LIMIT).await?,
        };

        tracing::debug!(
            "Stats for {}: {} solved, streak {}",
            user_id,
            report.overview.total_solved,
            report.overview.streak_days
        );

        Ok(report)
    }

    async fn difficulty_breakdown(
        &self,
        solved_ids: &[String],
    ) -> Result<DifficultyBreakdown, StoreError> {
        let mut breakdown = DifficultyBreakdown::default();

        for (difficulty, total) in self.catalog.count_by_difficulty().await? {
            breakdown.tier_mut(difficulty).total = total;
        }
        for question in self.catalog.get_questions(solved_ids).await? {
            breakdown.tier_mut(question.difficulty).solved += 1;
        }

        Ok(breakdown)
    }

    async fn company_readiness(
        &self,
        solved_ids: &[String],
    ) -> Result<Vec<CompanyReadiness>, StoreError> {
        let solved: HashSet<&str> = solved_ids.iter().map(String::as_str).collect();

        let mut readiness: Vec<CompanyReadiness> = self
            .catalog
            .company_groups(Some(READINESS_COMPANIES))
            .await?
            .into_iter()
            .filter(|group| group.total > 0)
            .map(|group| {
                let done =
                    group.question_ids.iter().filter(|id| solved.contains(id.as_str())).count();
                CompanyReadiness {
                    percentage: percentage(done, group.total),
                    company: group.company,
                    solved: done,
                    total: group.total,
                }
            })
            .collect();

        // Stable, so equal percentages keep the largest-company-first order
        readiness.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
        Ok(readiness)
    }

    async fn recent_activity(&self, user_id: &str) -> Result<Vec<RecentActivity>, StoreError> {
        let filter = ProgressFilter::for_user(user_id)
            .with_statuses(vec![ProgressStatus::Solved, ProgressStatus::Attempted]);
        let options = ProgressFind {
            sort: ProgressSort::RecentlyUpdated,
            limit: Some(RECENT_ACTIVITY_LIMIT),
        };
        let records = self.progress.find_progress(&filter, &options).await?;

        let ids: Vec<String> = records.iter().map(|p| p.question_id.clone()).collect();
        let questions: HashMap<String, (String, Difficulty)> = self
            .catalog
            .get_questions(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id, (q.title, q.difficulty)))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let (title, difficulty) = match questions.get(&record.question_id) {
                    Some((title, difficulty)) => (title.clone(), difficulty.to_string()),
                    None => ("Unknown".to_string(), Difficulty::Medium.to_string()),
                };
                RecentActivity {
                    question_id: record.question_id,
                    title,
                    difficulty,
                    status: record.status,
                    date: record.updated_at,
                }
            })
            .collect())
    }
}
