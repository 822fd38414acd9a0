pub mod ics;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ics::{parse_events, IcsError, IcsEvent, Recurrence};

/// A calendar the bot watches. `path` is a local file or an `http(s)://` URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub events: Vec<CalendarEventConfig>,
}

impl CalendarConfig {
    pub fn is_remote(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }
}

/// Commands to run in `channel` when an event whose summary matches `pattern` starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventConfig {
    pub name: String,
    pub pattern: String,
    pub channel: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TriggeredCommand {
    pub calendar: String,
    pub event_name: String,
    pub summary: String,
    pub channel: String,
    pub command: String,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar `{calendar}` event `{event}` has an invalid pattern: {message}")]
    InvalidPattern { calendar: String, event: String, message: String },
}

struct CompiledEvent {
    config: CalendarEventConfig,
    pattern: Regex,
}

pub struct CalendarWatcher {
    name: String,
    events: Vec<CompiledEvent>,
}

impl CalendarWatcher {
    pub fn new(config: &CalendarConfig) -> Result<Self, CalendarError> {
        let events = config
            .events
            .iter()
            .map(|event| {
                let pattern =
                    Regex::new(&event.pattern).map_err(|error| CalendarError::InvalidPattern {
                        calendar: config.name.clone(),
                        event: event.name.clone(),
                        message: error.to_string(),
                    })?;
                Ok(CompiledEvent { config: event.clone(), pattern })
            })
            .collect::<Result<Vec<_>, CalendarError>>()?;

        Ok(Self { name: config.name.clone(), events })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured event entries whose pattern matches `summary`, in config order.
    pub fn matching<'a>(
        &'a self,
        summary: &'a str,
    ) -> impl Iterator<Item = &'a CalendarEventConfig> + 'a {
        self.events
            .iter()
            .filter(move |event| event.pattern.is_match(summary))
            .map(|event| &event.config)
    }

    /// Commands for event occurrences starting in `(since, until]`, ordered by
    /// start time. Recurring events fire once per occurrence in the window.
    pub fn due(
        &self,
        events: &[IcsEvent],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Vec<TriggeredCommand> {
        let mut starting: Vec<(DateTime<Utc>, &IcsEvent)> = events
            .iter()
            .flat_map(|event| {
                event.occurrences(since, until).into_iter().map(move |start| (start, event))
            })
            .collect();
        starting.sort_by_key(|(start, _)| *start);

        starting
            .into_iter()
            .flat_map(move |(start, event)| {
                self.matching(&event.summary).flat_map(move |config| {
                    config.commands.iter().map(move |command| TriggeredCommand {
                        calendar: self.name.clone(),
                        event_name: config.name.clone(),
                        summary: event.summary.clone(),
                        channel: config.channel.clone(),
                        command: command.clone(),
                        starts_at: start,
                    })
                })
            })
            .collect()
    }
}
