use async_trait::async_trait;
use prwatch_core::{FetchError, HelpEntry, PullRequestFetcher, PullRequestRef, PullRequestState};
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::http::{endpoint, get_json};

/// GitLab REST API (`/api/v4`). Merge requests are addressed by the full
/// `namespace/project` path, URL-encoded as a single segment.
pub struct GitlabFetcher {
    client: Client,
    host: String,
    access_token: SecretString,
}

impl GitlabFetcher {
    pub fn new(client: Client, host: impl Into<String>, access_token: SecretString) -> Self {
        Self { client, host: host.into(), access_token }
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url).header("PRIVATE-TOKEN", self.access_token.expose_secret())
    }
}

#[derive(Debug, Deserialize)]
struct GitlabMergeRequest {
    state: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    reviewers: Vec<GitlabUser>,
}

#[derive(Debug, Deserialize)]
struct GitlabApprovals {
    #[serde(default)]
    approved_by: Vec<GitlabApproval>,
}

#[derive(Debug, Deserialize)]
struct GitlabApproval {
    user: GitlabUser,
}

#[derive(Debug, Deserialize)]
struct GitlabUser {
    username: String,
}

#[async_trait]
impl PullRequestFetcher for GitlabFetcher {
    async fn fetch(&self, pull_request: &PullRequestRef) -> Result<PullRequestState, FetchError> {
        let project_path = format!("{}/{}", pull_request.project, pull_request.repo);
        let number = pull_request.number.to_string();
        let mut segments = vec!["api", "v4", "projects", project_path.as_str(), "merge_requests"];
        segments.push(&number);

        let raw: GitlabMergeRequest =
            get_json(self.get(endpoint(&self.host, &segments)?), pull_request).await?;

        segments.push("approvals");
        let approvals: GitlabApprovals =
            get_json(self.get(endpoint(&self.host, &segments)?), pull_request).await?;

        let opened = raw.state == "opened";
        Ok(PullRequestState {
            merged: raw.state == "merged",
            declined: raw.state == "closed",
            in_review: opened && !raw.draft && !raw.reviewers.is_empty(),
            approvers: approvals
                .approved_by
                .into_iter()
                .map(|approval| approval.user.username)
                .collect(),
        })
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(
            "gitlab merge request",
            "Post a GitLab merge request link; reactions follow its review state.",
        )
        .example(format!("{}/group/app/-/merge_requests/42", self.host.trim_end_matches('/')))]
    }
}
