use async_trait::async_trait;
use prwatch_core::{FetchError, HelpEntry, PullRequestFetcher, PullRequestRef, PullRequestState};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::http::{endpoint, get_json};

/// Bitbucket Server / Data Center REST API (`/rest/api/1.0`).
pub struct BitbucketFetcher {
    client: Client,
    host: String,
    api_key: Option<SecretString>,
}

impl BitbucketFetcher {
    pub fn new(client: Client, host: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self { client, host: host.into(), api_key }
    }
}

#[derive(Debug, Deserialize)]
struct BitbucketPullRequest {
    state: String,
    #[serde(default)]
    reviewers: Vec<BitbucketReviewer>,
}

#[derive(Debug, Deserialize)]
struct BitbucketReviewer {
    user: BitbucketUser,
    #[serde(default)]
    approved: bool,
}

#[derive(Debug, Deserialize)]
struct BitbucketUser {
    name: String,
}

impl From<BitbucketPullRequest> for PullRequestState {
    fn from(raw: BitbucketPullRequest) -> Self {
        let in_review = !raw.reviewers.is_empty();
        let approvers = raw
            .reviewers
            .into_iter()
            .filter(|reviewer| reviewer.approved)
            .map(|reviewer| reviewer.user.name)
            .collect();

        Self {
            merged: raw.state.eq_ignore_ascii_case("MERGED"),
            declined: raw.state.eq_ignore_ascii_case("DECLINED"),
            in_review,
            approvers,
        }
    }
}

#[async_trait]
impl PullRequestFetcher for BitbucketFetcher {
    async fn fetch(&self, pull_request: &PullRequestRef) -> Result<PullRequestState, FetchError> {
        let number = pull_request.number.to_string();
        let url = endpoint(
            &self.host,
            &[
                "rest",
                "api",
                "1.0",
                "projects",
                &pull_request.project,
                "repos",
                &pull_request.repo,
                "pull-requests",
                &number,
            ],
        )?;

        let mut request = self.client.get(url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let raw: BitbucketPullRequest = get_json(request, pull_request).await?;
        Ok(raw.into())
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(
            "bitbucket pull request",
            "Post a Bitbucket pull request link; reactions follow its review state.",
        )
        .example(format!(
            "{}/projects/CORE/repos/api/pull-requests/42",
            self.host.trim_end_matches('/')
        ))]
    }
}
