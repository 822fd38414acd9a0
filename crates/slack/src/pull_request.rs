use std::sync::Arc;

use async_trait::async_trait;
use prwatch_core::{HelpEntry, PullRequestFetcher, PullRequestMatcher, ReactionNames};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::commands::{Command, CommandError};
use crate::events::{EventContext, MessageEvent};
use crate::reconcile::{ReactionReconciler, ReconcileReport};

/// Watches messages for pull request links of one review service and mirrors
/// the pull request's state as reactions on the message.
pub struct PullRequestCommand {
    name: String,
    matcher: PullRequestMatcher,
    fetcher: Arc<dyn PullRequestFetcher>,
    chat: Arc<dyn ChatClient>,
    reconciler: ReactionReconciler,
    completions: Option<UnboundedSender<ReconcileReport>>,
}

impl PullRequestCommand {
    pub fn new(
        name: impl Into<String>,
        matcher: PullRequestMatcher,
        fetcher: Arc<dyn PullRequestFetcher>,
        chat: Arc<dyn ChatClient>,
        names: ReactionNames,
    ) -> Self {
        let reconciler = ReactionReconciler::new(chat.clone(), names);
        Self { name: name.into(), matcher, fetcher, chat, reconciler, completions: None }
    }

    /// Sends every finished reconciliation to `sender`.
    pub fn with_completions(mut self, sender: UnboundedSender<ReconcileReport>) -> Self {
        self.completions = Some(sender);
        self
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }
}

#[async_trait]
impl Command for PullRequestCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, event: &MessageEvent) -> bool {
        self.matcher.capture(&event.text).is_some()
    }

    async fn execute(&self, event: &MessageEvent, ctx: &EventContext) -> Result<(), CommandError> {
        let Some(pull_request) = self.matcher.capture(&event.text) else {
            return Ok(());
        };

        info!(
            event_name = "command.pull_request.matched",
            command = %self.name,
            pull_request = %pull_request,
            channel_id = %event.channel_id,
            correlation_id = %ctx.correlation_id,
            "pull request link found"
        );

        let state = match self.fetcher.fetch(&pull_request).await {
            Ok(state) => state,
            Err(error) => {
                warn!(
                    event_name = "command.pull_request.fetch_failed",
                    command = %self.name,
                    pull_request = %pull_request,
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "pull request fetch failed"
                );
                let reply = self
                    .chat
                    .reply_error(
                        &event.channel_id,
                        event.reply_thread(),
                        &error.to_string(),
                        &ctx.correlation_id,
                    )
                    .await;
                if let Err(reply_error) = reply {
                    warn!(
                        event_name = "command.pull_request.reply_failed",
                        command = %self.name,
                        channel_id = %event.channel_id,
                        correlation_id = %ctx.correlation_id,
                        error = %reply_error,
                        "could not tell the channel about the failed fetch"
                    );
                }
                return Ok(());
            }
        };

        let task = self.reconciler.spawn(event.message_ref(), state, ctx.correlation_id.clone());

        if let Some(sender) = self.completions.clone() {
            let correlation_id = ctx.correlation_id.clone();
            tokio::spawn(async move {
                match task.await {
                    Ok(report) => {
                        if sender.send(report).is_err() {
                            debug!(
                                correlation_id = %correlation_id,
                                "reconcile report receiver dropped"
                            );
                        }
                    }
                    Err(error) => {
                        warn!(
                            correlation_id = %correlation_id,
                            error = %error,
                            "reconcile task did not finish"
                        );
                    }
                }
            });
        }

        Ok(())
    }

    fn help(&self) -> Vec<HelpEntry> {
        self.fetcher.help()
    }
}
