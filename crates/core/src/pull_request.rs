use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::help::HelpEntry;

const REQUIRED_GROUPS: [&str; 3] = ["project", "repo", "number"];

/// Identifiers captured from a pull-request link.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub project: String,
    pub repo: String,
    pub number: u64,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.project, self.repo, self.number)
    }
}

/// Snapshot of a pull request as reported by the review service.
///
/// `merged` and `declined` are read independently; a service reporting both is
/// resolved by the reaction table's precedence, not rejected here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestState {
    pub merged: bool,
    pub declined: bool,
    pub in_review: bool,
    pub approvers: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("pull request {0} not found")]
    NotFound(PullRequestRef),
    #[error("access to pull request {0} was denied")]
    Unauthorized(PullRequestRef),
    #[error("review service answered with status {status} for {pull_request}")]
    Status { pull_request: PullRequestRef, status: u16 },
    #[error("review service request failed: {0}")]
    Transport(String),
    #[error("review service response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PullRequestFetcher: Send + Sync {
    async fn fetch(&self, pull_request: &PullRequestRef) -> Result<PullRequestState, FetchError>;

    fn help(&self) -> Vec<HelpEntry>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatcherError {
    #[error("invalid pull request pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("pull request pattern `{pattern}` is missing the `{group}` capture group")]
    MissingGroup { pattern: String, group: &'static str },
}

/// Regex matcher extracting `project`, `repo` and `number` from message text.
#[derive(Clone, Debug)]
pub struct PullRequestMatcher {
    pattern: Regex,
}

impl PullRequestMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let compiled = Regex::new(pattern).map_err(|error| MatcherError::InvalidPattern {
            pattern: pattern.to_owned(),
            message: error.to_string(),
        })?;

        for group in REQUIRED_GROUPS {
            if !compiled.capture_names().flatten().any(|name| name == group) {
                return Err(MatcherError::MissingGroup { pattern: pattern.to_owned(), group });
            }
        }

        Ok(Self { pattern: compiled })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn capture(&self, text: &str) -> Option<PullRequestRef> {
        let captures = self.pattern.captures(text)?;
        let project = captures.name("project")?.as_str();
        let repo = captures.name("repo")?.as_str();
        let number = captures.name("number")?.as_str().parse::<u64>().ok()?;

        Some(PullRequestRef { project: project.to_owned(), repo: repo.to_owned(), number })
    }
}
