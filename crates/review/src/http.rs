use std::time::Duration;

use prwatch_core::{FetchError, PullRequestRef};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

const USER_AGENT: &str = concat!("prwatch/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).timeout(Duration::from_secs(timeout_secs)).build()
}

/// Joins `segments` onto `base`, percent-encoding each segment (including `/`).
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url = Url::parse(base)
        .map_err(|error| FetchError::Transport(format!("invalid base url `{base}`: {error}")))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::Transport(format!("base url `{base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) async fn get_json<T>(
    request: RequestBuilder,
    pull_request: &PullRequestRef,
) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let response =
        request.send().await.map_err(|error| FetchError::Transport(error.to_string()))?;
    let status = response.status();
    debug!(
        event_name = "review.fetch.response",
        pull_request = %pull_request,
        status = status.as_u16(),
        "review service responded"
    );

    match status {
        StatusCode::NOT_FOUND => return Err(FetchError::NotFound(pull_request.clone())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(FetchError::Unauthorized(pull_request.clone()))
        }
        status if !status.is_success() => {
            return Err(FetchError::Status {
                pull_request: pull_request.clone(),
                status: status.as_u16(),
            })
        }
        _ => {}
    }

    response.json::<T>().await.map_err(|error| FetchError::Decode(error.to_string()))
}
