use async_trait::async_trait;
use prwatch_core::{FetchError, HelpEntry, PullRequestFetcher, PullRequestRef, PullRequestState};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::http::{endpoint, get_json};

const REVIEWS_PER_PAGE: usize = 100;
/// Stops paging after this many pages; later reviews are ignored.
const MAX_REVIEW_PAGES: usize = 10;

/// GitHub REST API (`api.github.com` or a GitHub Enterprise `/api/v3` base).
pub struct GithubFetcher {
    client: Client,
    api_url: String,
    access_token: SecretString,
}

impl GithubFetcher {
    pub fn new(client: Client, api_url: impl Into<String>, access_token: SecretString) -> Self {
        Self { client, api_url: api_url.into(), access_token }
    }

    fn get(&self, url: reqwest::Url) -> RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .header("Accept", "application/vnd.github+json")
    }

    /// Every review of the pull request, oldest first, across pages.
    async fn reviews(
        &self,
        reviews_url: &reqwest::Url,
        pull_request: &PullRequestRef,
    ) -> Result<Vec<GithubReview>, FetchError> {
        let mut reviews = Vec::new();

        for page in 1..=MAX_REVIEW_PAGES {
            let mut url = reviews_url.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &REVIEWS_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<GithubReview> = get_json(self.get(url), pull_request).await?;
            let last_page = batch.len() < REVIEWS_PER_PAGE;
            reviews.extend(batch);
            if last_page {
                break;
            }
        }

        Ok(reviews)
    }
}

#[derive(Debug, Deserialize)]
struct GithubPullRequest {
    state: String,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    requested_reviewers: Vec<GithubUser>,
}

#[derive(Debug, Deserialize)]
struct GithubReview {
    user: Option<GithubUser>,
    state: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

/// Reviewers whose latest deciding review is an approval, in first-review order.
/// Plain comments do not change a reviewer's verdict.
fn approvers(reviews: &[GithubReview]) -> Vec<String> {
    let mut verdicts: Vec<(&str, bool)> = Vec::new();

    for review in reviews {
        let Some(user) = &review.user else {
            continue;
        };
        let approved = match review.state.as_str() {
            "APPROVED" => true,
            "CHANGES_REQUESTED" | "DISMISSED" => false,
            _ => continue,
        };
        match verdicts.iter_mut().find(|(login, _)| *login == user.login) {
            Some(entry) => entry.1 = approved,
            None => verdicts.push((&user.login, approved)),
        }
    }

    verdicts
        .into_iter()
        .filter(|(_, approved)| *approved)
        .map(|(login, _)| login.to_owned())
        .collect()
}

#[async_trait]
impl PullRequestFetcher for GithubFetcher {
    async fn fetch(&self, pull_request: &PullRequestRef) -> Result<PullRequestState, FetchError> {
        let number = pull_request.number.to_string();
        let mut segments =
            vec!["repos", pull_request.project.as_str(), pull_request.repo.as_str(), "pulls"];
        segments.push(&number);

        let pull_url = endpoint(&self.api_url, &segments)?;
        let raw: GithubPullRequest = get_json(self.get(pull_url), pull_request).await?;

        segments.push("reviews");
        let reviews_url = endpoint(&self.api_url, &segments)?;
        let reviews = self.reviews(&reviews_url, pull_request).await?;

        let closed = raw.state.eq_ignore_ascii_case("closed");
        Ok(PullRequestState {
            merged: raw.merged,
            declined: closed && !raw.merged,
            in_review: !reviews.is_empty() || !raw.requested_reviewers.is_empty(),
            approvers: approvers(&reviews),
        })
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(
            "github pull request",
            "Post a GitHub pull request link; reactions follow its review state.",
        )
        .example("https://github.com/octo-org/octo-repo/pull/42")]
    }
}

#[cfg(test)]
mod tests {
    use prwatch_core::{FetchError, PullRequestFetcher, PullRequestRef};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::GithubFetcher;
    use crate::http::build_client;

    fn reference() -> PullRequestRef {
        PullRequestRef { project: "octo-org".to_owned(), repo: "octo-repo".to_owned(), number: 42 }
    }

    async fn mount(server: &MockServer, pull: serde_json::Value, reviews: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/octo-repo/pulls/42"))
            .and(header("authorization", "Bearer ghp-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pull))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/octo-repo/pulls/42/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reviews))
            .mount(server)
            .await;
    }

    fn fetcher(server: &MockServer) -> GithubFetcher {
        let client = build_client(5).expect("client");
        GithubFetcher::new(client, server.uri(), "ghp-test".to_owned().into())
    }

    #[tokio::test]
    async fn latest_verdict_per_reviewer_decides_approval() {
        let server = MockServer::start().await;
        mount(
            &server,
            json!({ "state": "open", "merged": false, "requested_reviewers": [] }),
            json!([
                { "user": { "login": "alice" }, "state": "APPROVED" },
                { "user": { "login": "bob" }, "state": "APPROVED" },
                { "user": { "login": "alice" }, "state": "CHANGES_REQUESTED" },
                { "user": { "login": "bob" }, "state": "COMMENTED" },
                { "user": null, "state": "APPROVED" }
            ]),
        )
        .await;

        let state = fetcher(&server).fetch(&reference()).await.expect("fetch");

        assert_eq!(state.approvers, vec!["bob".to_owned()]);
        assert!(state.in_review);
        assert!(!state.merged && !state.declined);
    }

    #[tokio::test]
    async fn closed_without_merge_is_declined() {
        let server = MockServer::start().await;
        mount(&server, json!({ "state": "closed", "merged": false }), json!([])).await;

        let state = fetcher(&server).fetch(&reference()).await.expect("fetch");

        assert!(state.declined);
        assert!(!state.merged);
        assert!(!state.in_review);
    }

    #[tokio::test]
    async fn merged_pull_request_is_not_declined() {
        let server = MockServer::start().await;
        mount(&server, json!({ "state": "closed", "merged": true }), json!([])).await;

        let state = fetcher(&server).fetch(&reference()).await.expect("fetch");

        assert!(state.merged);
        assert!(!state.declined);
    }

    #[tokio::test]
    async fn requested_reviewer_marks_in_review() {
        let server = MockServer::start().await;
        mount(
            &server,
            json!({
                "state": "open",
                "merged": false,
                "requested_reviewers": [{ "login": "carol" }]
            }),
            json!([]),
        )
        .await;

        let state = fetcher(&server).fetch(&reference()).await.expect("fetch");

        assert!(state.in_review);
        assert!(state.approvers.is_empty());
    }

    #[tokio::test]
    async fn reviews_are_read_across_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/octo-repo/pulls/42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "state": "open", "merged": false })),
            )
            .mount(&server)
            .await;
        let first_page: Vec<serde_json::Value> = (0..100)
            .map(|index| {
                json!({ "user": { "login": format!("user{index}") }, "state": "COMMENTED" })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/octo-repo/pulls/42/reviews"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo-org/octo-repo/pulls/42/reviews"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user": { "login": "dave" }, "state": "APPROVED" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let state = fetcher(&server).fetch(&reference()).await.expect("fetch");

        assert_eq!(state.approvers, vec!["dave".to_owned()]);
        assert!(state.in_review);
    }

    #[tokio::test]
    async fn forbidden_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let error = fetcher(&server).fetch(&reference()).await.expect_err("forbidden");

        assert_eq!(error, FetchError::Unauthorized(reference()));
    }
}
