use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::client::{ChatClient, MessageRef};
use crate::commands::{Command, CommandError, HelpCommand};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    Unsupported,
}

/// A plain channel message. `thread_ts` is set when the message is a thread reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub user_id: String,
    pub text: String,
}

impl MessageEvent {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.channel_id.clone(), self.ts.clone())
    }

    /// Thread to reply in: the existing thread, or a new one under this message.
    pub fn reply_thread(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("command `{command}` failed: {source}")]
    Command {
        command: String,
        #[source]
        source: CommandError,
    },
}

/// Routes message events to the first command whose pattern matches.
///
/// The command list is fixed at construction; order decides precedence.
#[derive(Default)]
pub struct CommandDispatcher {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandDispatcher {
    pub fn new(commands: Vec<Arc<dyn Command>>) -> Self {
        Self { commands }
    }

    /// Like [`CommandDispatcher::new`], plus a `help` command listing the others.
    /// With no commands the dispatcher stays empty.
    pub fn with_help(mut commands: Vec<Arc<dyn Command>>, chat: Arc<dyn ChatClient>) -> Self {
        if !commands.is_empty() {
            let help = HelpCommand::new(chat, &commands);
            commands.push(Arc::new(help));
        }
        Self { commands }
    }

    /// Returns `Ok(true)` when a command handled the event.
    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<bool, DispatchError> {
        let SlackEvent::Message(message) = &envelope.event else {
            return Ok(false);
        };

        let Some(command) = self.commands.iter().find(|command| command.matches(message)) else {
            return Ok(false);
        };

        debug!(
            event_name = "command.dispatch.matched",
            command = command.name(),
            channel_id = %message.channel_id,
            correlation_id = %ctx.correlation_id,
            "message matched command"
        );

        command.execute(message, ctx).await.map_err(|source| DispatchError::Command {
            command: command.name().to_owned(),
            source,
        })?;
        Ok(true)
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|command| command.name()).collect()
    }
}
