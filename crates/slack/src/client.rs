use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::blocks::{self, MessageTemplate};

/// Identifies one chat message: the channel and the message timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MessageRef {
    pub channel_id: String,
    pub timestamp: String,
}

impl MessageRef {
    pub fn new(channel_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), timestamp: timestamp.into() }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("slack request `{method}` failed: {message}")]
    Transport { method: &'static str, message: String },
    #[error("slack method `{method}` returned `{error}`")]
    Api { method: &'static str, error: String },
    #[error("slack method `{method}` returned an unreadable body: {message}")]
    Decode { method: &'static str, message: String },
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn add_reaction(&self, message: &MessageRef, name: &str) -> Result<(), ChatError>;
    async fn remove_reaction(&self, message: &MessageRef, name: &str) -> Result<(), ChatError>;
    async fn get_reactions(&self, message: &MessageRef) -> Result<Vec<String>, ChatError>;
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), ChatError>;

    /// Posts `error` as an error reply in the thread of `thread_ts`.
    async fn reply_error(
        &self,
        channel_id: &str,
        thread_ts: &str,
        error: &str,
        correlation_id: &str,
    ) -> Result<(), ChatError> {
        let message = blocks::error_message(error, correlation_id);
        self.post_message(channel_id, Some(thread_ts), &message).await
    }
}

/// Slack Web API client authenticated with the bot token.
pub struct SlackWebClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<ReactedMessage>,
}

#[derive(Debug, Deserialize)]
struct ReactedMessage {
    #[serde(default)]
    reactions: Vec<Reaction>,
}

#[derive(Debug, Deserialize)]
struct Reaction {
    name: String,
}

impl SlackWebClient {
    pub fn new(client: Client, base_url: impl Into<String>, bot_token: SecretString) -> Self {
        Self { client, base_url: base_url.into(), bot_token }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.trim_end_matches('/'))
    }

    async fn read(
        method: &'static str,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<ApiResponse, ChatError> {
        let response =
            response.map_err(|error| ChatError::Transport { method, message: error.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Transport { method, message: format!("http status {status}") });
        }

        let body = response
            .json::<ApiResponse>()
            .await
            .map_err(|error| ChatError::Decode { method, message: error.to_string() })?;
        debug!(event_name = "slack.api.response", method, ok = body.ok, "slack api responded");
        Ok(body)
    }

    async fn call(
        &self,
        method: &'static str,
        payload: serde_json::Value,
        benign_errors: &[&str],
    ) -> Result<ApiResponse, ChatError> {
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send()
            .await;
        let body = Self::read(method, response).await?;
        check(method, body, benign_errors)
    }
}

fn check(
    method: &'static str,
    body: ApiResponse,
    benign_errors: &[&str],
) -> Result<ApiResponse, ChatError> {
    if body.ok {
        return Ok(body);
    }
    let error = body.error.clone().unwrap_or_else(|| "unknown_error".to_owned());
    if benign_errors.contains(&error.as_str()) {
        return Ok(body);
    }
    Err(ChatError::Api { method, error })
}

#[async_trait]
impl ChatClient for SlackWebClient {
    async fn add_reaction(&self, message: &MessageRef, name: &str) -> Result<(), ChatError> {
        let payload =
            json!({ "channel": message.channel_id, "timestamp": message.timestamp, "name": name });
        self.call("reactions.add", payload, &["already_reacted"]).await.map(|_| ())
    }

    async fn remove_reaction(&self, message: &MessageRef, name: &str) -> Result<(), ChatError> {
        let payload =
            json!({ "channel": message.channel_id, "timestamp": message.timestamp, "name": name });
        self.call("reactions.remove", payload, &["no_reaction"]).await.map(|_| ())
    }

    async fn get_reactions(&self, message: &MessageRef) -> Result<Vec<String>, ChatError> {
        let method = "reactions.get";
        let response = self
            .client
            .get(self.url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[
                ("channel", message.channel_id.as_str()),
                ("timestamp", message.timestamp.as_str()),
                ("full", "true"),
            ])
            .send()
            .await;
        let body = check(method, Self::read(method, response).await?, &[])?;

        Ok(body
            .message
            .map(|message| message.reactions.into_iter().map(|reaction| reaction.name).collect())
            .unwrap_or_default())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), ChatError> {
        let mut payload = json!({
            "channel": channel_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = json!(thread_ts);
        }
        self.call("chat.postMessage", payload, &[]).await.map(|_| ())
    }
}
