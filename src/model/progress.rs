//! Per-user progress records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a user stands on a question
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgressStatus {
    #[default]
    Todo,
    Attempted,
    Solved,
}

impl ProgressStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TODO" => Some(Self::Todo),
            "ATTEMPTED" => Some(Self::Attempted),
            "SOLVED" => Some(Self::Solved),
            _ => None,
        }
    }
}

impl std::str::FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| format!("Unknown status: {}. Options: todo, attempted, solved", s))
    }
}

/// A persisted progress record, unique per (user, question)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub user_id: String,
    pub question_id: String,
    pub status: ProgressStatus,
    pub notes: String,
    pub is_bookmarked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_solved: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// A fresh record with every field at its default
    pub fn new(user_id: &str, question_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            question_id: question_id.to_string(),
            status: ProgressStatus::Todo,
            notes: String::new(),
            is_bookmarked: false,
            date_solved: None,
            updated_at: now,
        }
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            question_id: self.question_id.clone(),
            status: self.status,
            notes: self.notes.clone(),
            is_bookmarked: self.is_bookmarked,
            date_solved: self.date_solved,
        }
    }
}

/// What callers see for a question's progress, persisted or not
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub question_id: String,
    pub status: ProgressStatus,
    pub notes: String,
    pub is_bookmarked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_solved: Option<DateTime<Utc>>,
}

impl ProgressView {
    /// The virtual record returned when nothing is stored yet
    pub fn untouched(question_id: &str) -> Self {
        Self {
            question_id: question_id.to_string(),
            status: ProgressStatus::Todo,
            notes: String::new(),
            is_bookmarked: false,
            date_solved: None,
        }
    }
}

/// Field assignments for a progress write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressFields {
    pub status: Option<ProgressStatus>,
    pub notes: Option<String>,
    pub is_bookmarked: Option<bool>,
    pub date_solved: Option<DateTime<Utc>>,
}

impl ProgressFields {
    fn apply_to(self, record: &mut Progress) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
        if let Some(is_bookmarked) = self.is_bookmarked {
            record.is_bookmarked = is_bookmarked;
        }
        if let Some(date_solved) = self.date_solved {
            record.date_solved = Some(date_solved);
        }
    }
}

/// An atomic upsert against one progress record.
///
/// `set` is applied on every write; `set_on_insert` only when the record is
/// being created by this write. `updated_at` is always refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressWrite {
    pub set: ProgressFields,
    pub set_on_insert: ProgressFields,
    pub updated_at: DateTime<Utc>,
}

impl ProgressWrite {
    /// Apply this write to the stored record, creating it when absent
    pub fn apply(self, user_id: &str, question_id: &str, existing: Option<Progress>) -> Progress {
        let mut record = match existing {
            Some(record) => record,
            None => {
                let mut record = Progress::new(user_id, question_id, self.updated_at);
                self.set_on_insert.apply_to(&mut record);
                record
            }
        };

        self.set.apply_to(&mut record);
        record.updated_at = self.updated_at;
        record
    }
}

/// A user edit to a progress record; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProgressStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bookmarked: Option<bool>,
}

impl ProgressPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.is_bookmarked.is_none()
    }

    /// Setting SOLVED stamps the solve date, even on a record already solved
    pub fn into_write(self, now: DateTime<Utc>) -> ProgressWrite {
        let date_solved = (self.status == Some(ProgressStatus::Solved)).then_some(now);
        ProgressWrite {
            set: ProgressFields {
                status: self.status,
                notes: self.notes,
                is_bookmarked: self.is_bookmarked,
                date_solved,
            },
            set_on_insert: ProgressFields::default(),
            updated_at: now,
        }
    }
}
