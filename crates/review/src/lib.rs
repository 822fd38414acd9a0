//! Pull-request fetchers for the review services prwatch understands.
//!
//! Each fetcher implements [`prwatch_core::PullRequestFetcher`] and turns the
//! service's own JSON into a [`prwatch_core::PullRequestState`].

pub mod bitbucket;
pub mod github;
pub mod gitlab;
mod http;

pub use bitbucket::BitbucketFetcher;
pub use github::GithubFetcher;
pub use gitlab::GitlabFetcher;
pub use http::build_client;
