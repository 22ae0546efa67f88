//! LeetCode solve-history integration
//!
//! Fetches every problem the session's account has an accepted submission
//! for, through LeetCode's GraphQL problem-list query.

pub mod client;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use client::{FetchOptions, LeetCodeClient, ProblemPageSource, SolveHistory, collect_solved};
pub use error::LeetCodeError;
pub use models::{ProblemPage, ProblemRecord, SolvedProblem};
