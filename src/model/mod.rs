//! Domain types shared by the catalog, progress tracking and statistics

pub mod progress;
pub mod question;

pub use progress::{
    Progress, ProgressFields, ProgressPatch, ProgressStatus, ProgressView, ProgressWrite,
};
pub use question::{
    Appearance, Difficulty, Period, Question, QuestionInsight, QuestionSummary, QuestionUpsert,
};
