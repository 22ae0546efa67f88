//! Prepdeck - interview question catalog, LeetCode progress sync and statistics
//!
//! Prepdeck ingests per-company interview question lists into a catalog,
//! pulls a user's accepted LeetCode submissions into their progress, and
//! aggregates that progress into practice statistics.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingest;
pub mod leetcode;
pub mod model;
pub mod stats;
pub mod store;
pub mod sync;

pub use app::App;
pub use auth::{Identity, IdentityProvider, StaticIdentity};
pub use config::Config;
pub use error::AppError;
pub use store::MemoryStore;
