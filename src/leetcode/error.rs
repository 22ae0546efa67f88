//! Error types for the LeetCode GraphQL integration

use thiserror::Error;

/// Errors that can occur when fetching solve history from LeetCode
#[derive(Debug, Error)]
pub enum LeetCodeError {
    /// No session cookie was supplied
    #[error("LeetCode session cookie is required")]
    MissingSession,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// The session cookie was rejected
    #[error("LeetCode rejected the session cookie ({status})")]
    Unauthorized {
        /// HTTP status code
        status: u16,
    },

    /// Rate limited by LeetCode
    #[error("Rate limited. Retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_seconds: u64,
    },

    /// Non-success HTTP response
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The response carried a GraphQL `errors` payload
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The response did not have the expected shape
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// Request was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LeetCodeError {
    /// Check if retrying later might succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LeetCodeError::RateLimited { .. }
                | LeetCodeError::RequestError(_)
                | LeetCodeError::Cancelled
        )
    }

    /// Check if the user must supply a fresh session cookie
    pub fn requires_new_session(&self) -> bool {
        matches!(self, LeetCodeError::MissingSession | LeetCodeError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(LeetCodeError::RateLimited { retry_after_seconds: 5 }.is_recoverable());
        assert!(!LeetCodeError::GraphQl("boom".to_string()).is_recoverable());
        assert!(LeetCodeError::Unauthorized { status: 403 }.requires_new_session());
        assert!(!LeetCodeError::Cancelled.requires_new_session());
    }
}
