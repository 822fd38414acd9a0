use std::sync::Arc;

use async_trait::async_trait;
use prwatch_core::HelpEntry;
use thiserror::Error;

use crate::blocks;
use crate::client::{ChatClient, ChatError};
use crate::events::{EventContext, MessageEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// A bot command. `matches` must be cheap and side-effect free; the dispatcher
/// calls it for every message.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn matches(&self, event: &MessageEvent) -> bool;
    async fn execute(&self, event: &MessageEvent, ctx: &EventContext) -> Result<(), CommandError>;
    fn help(&self) -> Vec<HelpEntry>;
}

/// Replies to a bare `help` with the help entries of the other commands.
pub struct HelpCommand {
    chat: Arc<dyn ChatClient>,
    entries: Vec<HelpEntry>,
}

impl HelpCommand {
    pub fn new(chat: Arc<dyn ChatClient>, commands: &[Arc<dyn Command>]) -> Self {
        let entries = commands.iter().flat_map(|command| command.help()).collect();
        Self { chat, entries }
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn matches(&self, event: &MessageEvent) -> bool {
        event.text.trim().eq_ignore_ascii_case("help")
    }

    async fn execute(&self, event: &MessageEvent, _ctx: &EventContext) -> Result<(), CommandError> {
        let mut entries = self.entries.clone();
        entries.extend(self.help());
        let message = blocks::help_message(&entries);
        self.chat.post_message(&event.channel_id, event.thread_ts.as_deref(), &message).await?;
        Ok(())
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new("help", "List the commands this bot understands.").example("help")]
    }
}
