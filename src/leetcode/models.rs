//! Request and response shapes for LeetCode's GraphQL API

use serde::{Deserialize, Serialize};

/// Query listing problems for the authenticated session
pub const PROBLEM_LIST_QUERY: &str = r#"
query problemsetQuestionList(
    $categorySlug: String
    $limit: Int
    $skip: Int
    $filters: QuestionListFilterInput
) {
    problemsetQuestionList: questionList(
        categorySlug: $categorySlug
        limit: $limit
        skip: $skip
        filters: $filters
    ) {
        total: totalNum
        questions: data {
            title
            titleSlug
            difficulty
            topicTags {
                name
            }
            status
        }
    }
}
"#;

/// Status filter value for accepted submissions
pub const ACCEPTED_FILTER: &str = "AC";

/// Per-problem status LeetCode reports for accepted problems
pub const ACCEPTED_STATUS: &str = "ac";

/// GraphQL request envelope
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<V> {
    pub query: &'static str,
    pub variables: V,
}

/// Variables for [`PROBLEM_LIST_QUERY`]
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemListVariables {
    pub category_slug: String,
    pub limit: u32,
    pub skip: u32,
    pub filters: ProblemListFilters,
}

impl ProblemListVariables {
    /// One page of accepted problems
    pub fn accepted_page(skip: u32, limit: u32) -> Self {
        Self {
            category_slug: String::new(),
            limit,
            skip,
            filters: ProblemListFilters { status: ACCEPTED_FILTER.to_string() },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProblemListFilters {
    pub status: String,
}

/// GraphQL response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemListData {
    pub problemset_question_list: Option<ProblemPage>,
}

/// One page of the problem list
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProblemPage {
    /// Total matching problems reported by the server
    pub total: u64,
    pub questions: Vec<ProblemRecord>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub title: String,
    pub title_slug: String,
    pub difficulty: String,
    #[serde(default)]
    pub topic_tags: Vec<TopicTag>,
    pub status: Option<String>,
}

impl ProblemRecord {
    pub fn is_accepted(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(ACCEPTED_STATUS))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TopicTag {
    pub name: String,
}

/// A problem the account has an accepted submission for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolvedProblem {
    pub title: String,
    pub title_slug: String,
    pub difficulty: String,
    pub topic_tags: Vec<String>,
}

impl From<ProblemRecord> for SolvedProblem {
    fn from(record: ProblemRecord) -> Self {
        Self {
            title: record.title,
            title_slug: record.title_slug,
            difficulty: record.difficulty,
            topic_tags: record.topic_tags.into_iter().map(|t| t.name).collect(),
        }
    }
}
