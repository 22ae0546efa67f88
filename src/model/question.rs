//! Interview questions and their company appearances

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Question difficulty tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a difficulty label, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| format!("Unknown difficulty: {}. Options: easy, medium, hard", s))
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window a company's question list covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Period {
    #[serde(rename = "30 days")]
    ThirtyDays,
    #[serde(rename = "3 months")]
    ThreeMonths,
    #[serde(rename = "6 months")]
    SixMonths,
    #[serde(rename = "> 6 months")]
    MoreThanSixMonths,
    #[serde(rename = "2 years")]
    TwoYears,
    #[serde(rename = "All time")]
    AllTime,
}

impl Period {
    /// File name fragments checked in order; the first hit wins.
    ///
    /// `more-than-six-months` must precede `six-months` since it contains it.
    const FILE_MARKERS: &'static [(&'static str, Period)] = &[
        ("thirty-days", Period::ThirtyDays),
        ("three-months", Period::ThreeMonths),
        ("more-than-six-months", Period::MoreThanSixMonths),
        ("six-months", Period::SixMonths),
        ("two-years", Period::TwoYears),
        ("all", Period::AllTime),
    ];

    /// Determine the period a CSV file covers from its file name
    pub fn from_file_name(name: &str) -> Self {
        Self::FILE_MARKERS
            .iter()
            .find(|(marker, _)| name.contains(marker))
            .map_or(Period::AllTime, |(_, period)| *period)
    }
}

/// One (company, period) observation of a question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub company: String,
    pub period: Period,
    /// Fraction in [0, 1]
    pub frequency: f64,
    /// `<company>/<file name>` of the CSV that produced this row
    pub source_file: String,
}

/// A catalog question, keyed by its slug
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    pub url: String,
    pub difficulty: Difficulty,
    /// Fraction in [0, 1]
    pub acceptance_rate: f64,
    pub companies: BTreeSet<String>,
    pub appearances: Vec<Appearance>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn company_count(&self) -> usize {
        self.companies.len()
    }

    /// Highest frequency across all appearances, 0 when there are none
    pub fn max_frequency(&self) -> f64 {
        self.appearances.iter().map(|a| a.frequency).fold(0.0, f64::max)
    }

    /// Catalog listing view without the appearance list
    pub fn summary(&self) -> QuestionSummary {
        QuestionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            difficulty: self.difficulty,
            acceptance_rate: self.acceptance_rate,
            companies: self.companies.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Ranking view used by the insight lists
    pub fn insight(&self) -> QuestionInsight {
        QuestionInsight {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            difficulty: self.difficulty,
            acceptance_rate: self.acceptance_rate,
            company_count: self.company_count(),
        }
    }
}

/// Question without its appearance list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub difficulty: Difficulty,
    pub acceptance_rate: f64,
    pub companies: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

/// Question projected for ranking lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInsight {
    pub id: String,
    pub title: String,
    pub url: String,
    pub difficulty: Difficulty,
    pub acceptance_rate: f64,
    pub company_count: usize,
}

/// Write issued by ingestion for one question.
///
/// Scalar fields and the appearance list replace what is stored; companies
/// are unioned into the stored set and never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionUpsert {
    pub id: String,
    pub title: String,
    pub url: String,
    pub difficulty: Difficulty,
    pub acceptance_rate: f64,
    pub companies: BTreeSet<String>,
    pub appearances: Vec<Appearance>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionUpsert {
    /// Apply this write to an existing document, or build a new one
    pub fn apply(self, existing: Option<Question>) -> Question {
        let mut companies = existing.map(|q| q.companies).unwrap_or_default();
        companies.extend(self.companies);

        Question {
            id: self.id,
            title: self.title,
            url: self.url,
            difficulty: self.difficulty,
            acceptance_rate: self.acceptance_rate,
            companies,
            appearances: self.appearances,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(companies: &[&str]) -> QuestionUpsert {
        QuestionUpsert {
            id: "two-sum".to_string(),
            title: "Two Sum".to_string(),
            url: "https://leetcode.com/problems/two-sum".to_string(),
            difficulty: Difficulty::Easy,
            acceptance_rate: 0.5,
            companies: companies.iter().map(|c| c.to_string()).collect(),
            appearances: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn difficulty_parse_ignores_case() {
        assert_eq!(Difficulty::parse("EASY"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse(" hard "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("impossible"), None);
    }

    #[test]
    fn period_from_file_name() {
        assert_eq!(Period::from_file_name("google-thirty-days.csv"), Period::ThirtyDays);
        assert_eq!(Period::from_file_name("google-three-months.csv"), Period::ThreeMonths);
        assert_eq!(Period::from_file_name("google-six-months.csv"), Period::SixMonths);
        assert_eq!(
            Period::from_file_name("google-more-than-six-months.csv"),
            Period::MoreThanSixMonths
        );
        assert_eq!(Period::from_file_name("google-two-years.csv"), Period::TwoYears);
        assert_eq!(Period::from_file_name("google-alltime.csv"), Period::AllTime);
        assert_eq!(Period::from_file_name("google.csv"), Period::AllTime);
    }

    #[test]
    fn period_serializes_as_label() {
        let json = serde_json::to_string(&Period::MoreThanSixMonths).unwrap();
        assert_eq!(json, "\"> 6 months\"");
    }

    #[test]
    fn upsert_unions_companies_with_existing() {
        let first = upsert(&["Google"]).apply(None);
        let second = upsert(&["Amazon"]).apply(Some(first));

        let companies: Vec<_> = second.companies.iter().cloned().collect();
        assert_eq!(companies, vec!["Amazon".to_string(), "Google".to_string()]);
    }

    #[test]
    fn upsert_replaces_appearances() {
        let mut first = upsert(&["Google"]);
        first.appearances.push(Appearance {
            company: "Google".to_string(),
            period: Period::AllTime,
            frequency: 0.4,
            source_file: "Google/all.csv".to_string(),
        });
        let stored = first.apply(None);
        assert_eq!(stored.appearances.len(), 1);

        let replaced = upsert(&["Google"]).apply(Some(stored));
        assert!(replaced.appearances.is_empty());
    }
}
