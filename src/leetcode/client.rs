//! HTTP client for LeetCode's GraphQL endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::error::LeetCodeError;
use super::models::{
    GraphQlRequest, GraphQlResponse, PROBLEM_LIST_QUERY, ProblemListData, ProblemListVariables,
    ProblemPage, SolvedProblem,
};
use crate::config::LeetCodeConfig;

/// Pagination and pacing for a solve-history fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Problems requested per page
    pub page_size: u32,
    /// Pause between consecutive page requests
    pub request_delay: Duration,
    /// Hard ceiling on pages, in case the reported total is inconsistent
    pub max_pages: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { page_size: 100, request_delay: Duration::from_millis(500), max_pages: 100 }
    }
}

impl From<&LeetCodeConfig> for FetchOptions {
    fn from(config: &LeetCodeConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            request_delay: Duration::from_millis(config.request_delay_ms),
            max_pages: config.max_pages.max(1),
        }
    }
}

/// Source of raw problem-list pages
#[async_trait]
pub trait ProblemPageSource: Send + Sync {
    async fn fetch_page(
        &self,
        session: &str,
        skip: u32,
        limit: u32,
    ) -> Result<ProblemPage, LeetCodeError>;
}

/// Anything that can report the full list of problems an account has solved
#[async_trait]
pub trait SolveHistory: Send + Sync {
    async fn fetch_solved(
        &self,
        session: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SolvedProblem>, LeetCodeError>;
}

/// Page through the accepted-problem list until it is exhausted.
///
/// Stops on an empty page, once the returned item count reaches the reported
/// total, or after `max_pages` pages. Any error aborts the whole fetch and no
/// partial list is returned.
pub async fn collect_solved(
    source: &dyn ProblemPageSource,
    session: &str,
    options: &FetchOptions,
    cancel: &CancellationToken,
) -> Result<Vec<SolvedProblem>, LeetCodeError> {
    if session.trim().is_empty() {
        return Err(LeetCodeError::MissingSession);
    }

    let mut solved = Vec::new();
    let mut returned: u64 = 0;
    let mut skip: u32 = 0;

    for page_index in 0..options.max_pages {
        if page_index > 0 {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LeetCodeError::Cancelled),
                _ = tokio::time::sleep(options.request_delay) => {}
            }
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LeetCodeError::Cancelled),
            page = source.fetch_page(session, skip, options.page_size) => page?,
        };

        if page.questions.is_empty() {
            break;
        }

        returned += page.questions.len() as u64;
        solved.extend(
            page.questions.into_iter().filter(|q| q.is_accepted()).map(SolvedProblem::from),
        );
        tracing::debug!("Fetched page {} ({}/{} problems)", page_index + 1, returned, page.total);

        if returned >= page.total {
            break;
        }
        if page_index + 1 == options.max_pages {
            tracing::warn!(
                "Stopped after {} pages with {}/{} problems returned",
                options.max_pages,
                returned,
                page.total
            );
        }

        skip = skip.saturating_add(options.page_size);
    }

    Ok(solved)
}

/// LeetCode GraphQL client authenticated by a session cookie
pub struct LeetCodeClient {
    /// HTTP client
    client: Client,
    /// GraphQL endpoint
    endpoint: String,
    /// Pagination settings
    options: FetchOptions,
}

impl LeetCodeClient {
    /// Referer LeetCode expects on GraphQL calls
    const REFERER: &'static str = "https://leetcode.com";
    /// Cookie carrying the session token
    const SESSION_COOKIE: &'static str = "LEETCODE_SESSION";

    /// Create a client from configuration
    pub fn new(config: &LeetCodeConfig) -> Result<Self, LeetCodeError> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self { client, endpoint: config.endpoint.clone(), options: FetchOptions::from(config) })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }
}

#[async_trait]
impl ProblemPageSource for LeetCodeClient {
    async fn fetch_page(
        &self,
        session: &str,
        skip: u32,
        limit: u32,
    ) -> Result<ProblemPage, LeetCodeError> {
        let request = GraphQlRequest {
            query: PROBLEM_LIST_QUERY,
            variables: ProblemListVariables::accepted_page(skip, limit),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("cookie", format!("{}={}", Self::SESSION_COOKIE, session))
            .header("referer", Self::REFERER)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(LeetCodeError::RateLimited { retry_after_seconds: retry_after });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LeetCodeError::Unauthorized { status: status.as_u16() });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LeetCodeError::ApiError { status: status.as_u16(), message });
        }

        let body = response.text().await?;
        parse_problem_page(&body)
    }
}

#[async_trait]
impl SolveHistory for LeetCodeClient {
    async fn fetch_solved(
        &self,
        session: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SolvedProblem>, LeetCodeError> {
        collect_solved(self, session, &self.options, cancel).await
    }
}

/// Decode a problem-list response body, surfacing GraphQL errors
fn parse_problem_page(body: &str) -> Result<ProblemPage, LeetCodeError> {
    let response: GraphQlResponse<ProblemListData> = serde_json::from_str(body)?;

    if let Some(error) = response.errors.as_ref().and_then(|errors| errors.first()) {
        return Err(LeetCodeError::GraphQl(error.message.clone()));
    }

    response
        .data
        .and_then(|data| data.problemset_question_list)
        .ok_or_else(|| LeetCodeError::InvalidResponse("missing problemsetQuestionList".to_string()))
}
