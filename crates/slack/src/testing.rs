//! In-memory fakes shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use prwatch_core::{FetchError, HelpEntry, PullRequestFetcher, PullRequestRef, PullRequestState};

use crate::blocks::MessageTemplate;
use crate::client::{ChatClient, ChatError, MessageRef};
use crate::commands::{Command, CommandError};
use crate::events::{EventContext, MessageEvent, SlackEnvelope, SlackEvent};

pub fn message_event(text: &str) -> MessageEvent {
    MessageEvent {
        channel_id: "C1".to_owned(),
        ts: "1730000000.1000".to_owned(),
        thread_ts: None,
        user_id: "U1".to_owned(),
        text: text.to_owned(),
    }
}

pub fn message_envelope(text: &str) -> SlackEnvelope {
    SlackEnvelope {
        envelope_id: "env-1".to_owned(),
        event: SlackEvent::Message(message_event(text)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCall {
    GetReactions { timestamp: String },
    Add { name: String },
    Remove { name: String },
    Post { channel_id: String, thread_ts: Option<String>, message: MessageTemplate },
}

impl ChatCall {
    pub fn add(name: &str) -> Self {
        Self::Add { name: name.to_owned() }
    }

    pub fn remove(name: &str) -> Self {
        Self::Remove { name: name.to_owned() }
    }
}

#[derive(Default)]
pub struct RecordingChat {
    calls: Mutex<Vec<ChatCall>>,
    reactions: Vec<String>,
    failing: Option<String>,
    failing_posts: bool,
}

impl RecordingChat {
    pub fn with_reactions(reactions: Vec<String>) -> Self {
        Self { reactions, ..Self::default() }
    }

    /// Makes every add/remove of `name` fail.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing = Some(name.to_owned());
        self
    }

    pub fn failing_posts(mut self) -> Self {
        self.failing_posts = true;
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn posts(&self) -> Vec<MessageTemplate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChatCall::Post { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChatCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn outcome(&self, method: &'static str, name: &str) -> Result<(), ChatError> {
        if self.failing.as_deref() == Some(name) {
            return Err(ChatError::Api { method, error: "invalid_name".to_owned() });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn add_reaction(&self, _message: &MessageRef, name: &str) -> Result<(), ChatError> {
        self.record(ChatCall::add(name));
        self.outcome("reactions.add", name)
    }

    async fn remove_reaction(&self, _message: &MessageRef, name: &str) -> Result<(), ChatError> {
        self.record(ChatCall::remove(name));
        self.outcome("reactions.remove", name)
    }

    async fn get_reactions(&self, message: &MessageRef) -> Result<Vec<String>, ChatError> {
        self.record(ChatCall::GetReactions { timestamp: message.timestamp.clone() });
        Ok(self.reactions.clone())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), ChatError> {
        self.record(ChatCall::Post {
            channel_id: channel_id.to_owned(),
            thread_ts: thread_ts.map(str::to_owned),
            message: message.clone(),
        });
        if self.failing_posts {
            return Err(ChatError::Api {
                method: "chat.postMessage",
                error: "channel_not_found".to_owned(),
            });
        }
        Ok(())
    }
}

/// Returns queued results in order, then `PullRequestState::default()`.
#[derive(Default)]
pub struct ScriptedFetcher {
    results: Mutex<VecDeque<Result<PullRequestState, FetchError>>>,
    fetched: Mutex<Vec<PullRequestRef>>,
}

impl ScriptedFetcher {
    pub fn returning(result: Result<PullRequestState, FetchError>) -> Self {
        Self { results: Mutex::new(VecDeque::from([result])), fetched: Mutex::default() }
    }

    pub fn fetched(&self) -> Vec<PullRequestRef> {
        self.fetched.lock().expect("fetched lock").clone()
    }
}

#[async_trait]
impl PullRequestFetcher for ScriptedFetcher {
    async fn fetch(&self, pull_request: &PullRequestRef) -> Result<PullRequestState, FetchError> {
        self.fetched.lock().expect("fetched lock").push(pull_request.clone());
        let mut results = self.results.lock().expect("results lock");
        results.pop_front().unwrap_or(Ok(PullRequestState::default()))
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new("scripted pull request", "test fetcher")]
    }
}

/// Matches any message containing `needle` and counts executions.
pub struct StaticCommand {
    name: String,
    needle: String,
    executions: AtomicUsize,
}

impl StaticCommand {
    pub fn new(name: &str, needle: &str) -> Self {
        Self { name: name.to_owned(), needle: needle.to_owned(), executions: AtomicUsize::new(0) }
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Command for StaticCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, event: &MessageEvent) -> bool {
        event.text.contains(&self.needle)
    }

    async fn execute(
        &self,
        _event: &MessageEvent,
        _ctx: &EventContext,
    ) -> Result<(), CommandError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new(self.name.clone(), format!("runs on `{}`", self.needle))]
    }
}
