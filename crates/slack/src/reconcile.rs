//! Applies a pull request's reaction plan to the message that linked it.
//!
//! The plan comes from [`plan_reactions`] and is applied as-is. The message's
//! current reactions are read first and kept in the report for logging, but
//! they do not change what gets applied. Individual mutation failures are
//! logged and recorded; the remaining changes still run.

use std::sync::Arc;

use prwatch_core::{plan_reactions, PullRequestState, ReactionChange, ReactionNames};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client::{ChatClient, MessageRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionFailure {
    pub change: ReactionChange,
    pub error: String,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub message: MessageRef,
    /// Reactions on the message before any change, `None` if they could not be read.
    pub current: Option<Vec<String>>,
    pub applied: Vec<ReactionChange>,
    pub failures: Vec<ReactionFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct ReactionReconciler {
    chat: Arc<dyn ChatClient>,
    names: ReactionNames,
}

impl ReactionReconciler {
    pub fn new(chat: Arc<dyn ChatClient>, names: ReactionNames) -> Self {
        Self { chat, names }
    }

    pub async fn apply(
        &self,
        message: &MessageRef,
        state: &PullRequestState,
        correlation_id: &str,
    ) -> ReconcileReport {
        let current = match self.chat.get_reactions(message).await {
            Ok(names) => Some(names),
            Err(error) => {
                warn!(
                    event_name = "reaction.reconcile.list_failed",
                    channel_id = %message.channel_id,
                    timestamp = %message.timestamp,
                    correlation_id,
                    error = %error,
                    "could not read current reactions"
                );
                None
            }
        };

        let mut report = ReconcileReport {
            message: message.clone(),
            current,
            applied: Vec::new(),
            failures: Vec::new(),
        };

        for change in plan_reactions(state) {
            let name = self.names.name(change.kind());
            let result = match change {
                ReactionChange::Remove(_) => self.chat.remove_reaction(message, name).await,
                ReactionChange::Add(_) => self.chat.add_reaction(message, name).await,
            };

            match result {
                Ok(()) => report.applied.push(change),
                Err(error) => {
                    warn!(
                        event_name = "reaction.reconcile.change_failed",
                        channel_id = %message.channel_id,
                        timestamp = %message.timestamp,
                        correlation_id,
                        reaction = name,
                        reaction_kind = change.kind().as_str(),
                        change = ?change,
                        error = %error,
                        "reaction change failed"
                    );
                    report.failures.push(ReactionFailure { change, error: error.to_string() });
                }
            }
        }

        info!(
            event_name = "reaction.reconcile.completed",
            channel_id = %message.channel_id,
            timestamp = %message.timestamp,
            correlation_id,
            applied = report.applied.len(),
            failed = report.failures.len(),
            clean = report.is_clean(),
            "reactions reconciled"
        );
        report
    }

    /// Runs [`ReactionReconciler::apply`] on its own task.
    pub fn spawn(
        &self,
        message: MessageRef,
        state: PullRequestState,
        correlation_id: String,
    ) -> JoinHandle<ReconcileReport> {
        let reconciler = self.clone();
        tokio::spawn(async move { reconciler.apply(&message, &state, &correlation_id).await })
    }
}
