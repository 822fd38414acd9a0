use prwatch_core::{HelpEntry, TriggeredCommand};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

/// A message ready for `chat.postMessage`: `fallback_text` becomes `text`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Error reply. The fallback text is `summary` unchanged so it reads the same
/// in notifications as in the channel.
pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("prwatch.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("prwatch.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message(entries: &[HelpEntry]) -> MessageTemplate {
    let mut builder = MessageBuilder::new("prwatch help");
    if entries.is_empty() {
        return builder
            .section("prwatch.help.empty.v1", |section| {
                section.plain("No commands are configured.");
            })
            .build();
    }

    for (index, entry) in entries.iter().enumerate() {
        builder = builder.section(format!("prwatch.help.entry.{index}.v1"), |section| {
            let mut text = format!("*{}*\n{}", entry.command, entry.description);
            for example in &entry.examples {
                text.push_str(&format!("\n• `{example}`"));
            }
            section.mrkdwn(text);
        });
    }
    builder.build()
}

/// Posted when a calendar trigger's command text is not handled by any command.
pub fn calendar_notice_message(trigger: &TriggeredCommand) -> MessageTemplate {
    MessageBuilder::new(trigger.command.clone())
        .section("prwatch.calendar.command.v1", |section| {
            section.mrkdwn(trigger.command.clone());
        })
        .context("prwatch.calendar.context.v1", |context| {
            context.mrkdwn(format!(
                ":calendar: {} (`{}`, {})",
                trigger.summary,
                trigger.calendar,
                trigger.starts_at.format("%Y-%m-%d %H:%M UTC")
            ));
        })
        .build()
}
