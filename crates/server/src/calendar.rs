//! Calendar poller: loads each configured calendar every poll interval and
//! runs the commands of events that started since the previous poll.
//!
//! Command texts go through the same dispatcher as chat messages, posted as
//! a synthetic message in the event's channel. Texts no command handles are
//! posted to the channel as a notice instead.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use prwatch_core::calendar::{parse_events, CalendarError, IcsError, IcsEvent};
use prwatch_core::{CalendarConfig, CalendarWatcher, TriggeredCommand};
use prwatch_slack::blocks::calendar_notice_message;
use prwatch_slack::client::ChatClient;
use prwatch_slack::events::{
    CommandDispatcher, EventContext, MessageEvent, SlackEnvelope, SlackEvent,
};
use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CALENDAR_USER_ID: &str = "prwatch-calendar";

#[derive(Debug, Error)]
pub enum CalendarLoadError {
    #[error("could not read calendar file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not fetch calendar `{url}`: {message}")]
    Fetch { url: String, message: String },
    #[error("calendar `{calendar}` is not valid ICS: {source}")]
    Parse {
        calendar: String,
        #[source]
        source: IcsError,
    },
}

pub async fn load_events(
    http: &Client,
    config: &CalendarConfig,
) -> Result<Vec<IcsEvent>, CalendarLoadError> {
    let raw = if config.is_remote() {
        let fetch_error =
            |message: String| CalendarLoadError::Fetch { url: config.path.clone(), message };
        let response =
            http.get(&config.path).send().await.map_err(|error| fetch_error(error.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("http status {}", response.status())));
        }
        response.text().await.map_err(|error| fetch_error(error.to_string()))?
    } else {
        tokio::fs::read_to_string(&config.path).await.map_err(|source| CalendarLoadError::Read {
            path: PathBuf::from(&config.path),
            source,
        })?
    };

    parse_events(&raw)
        .map_err(|source| CalendarLoadError::Parse { calendar: config.name.clone(), source })
}

struct CalendarSource {
    config: CalendarConfig,
    watcher: CalendarWatcher,
}

pub struct CalendarPoller {
    sources: Vec<CalendarSource>,
    http: Client,
    dispatcher: Arc<CommandDispatcher>,
    chat: Arc<dyn ChatClient>,
    interval: Duration,
}

impl CalendarPoller {
    pub fn new(
        calendars: &[CalendarConfig],
        http: Client,
        dispatcher: Arc<CommandDispatcher>,
        chat: Arc<dyn ChatClient>,
        interval: Duration,
    ) -> Result<Self, CalendarError> {
        let sources = calendars
            .iter()
            .map(|config| {
                let watcher = CalendarWatcher::new(config)?;
                Ok(CalendarSource { config: config.clone(), watcher })
            })
            .collect::<Result<Vec<_>, CalendarError>>()?;

        Ok(Self { sources, http, dispatcher, chat, interval })
    }

    /// Loads every calendar and fires the commands of events starting in
    /// `(since, until]`. A calendar that fails to load is skipped.
    pub async fn poll(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<TriggeredCommand> {
        let mut fired = Vec::new();

        for source in &self.sources {
            let events = match load_events(&self.http, &source.config).await {
                Ok(events) => events,
                Err(error) => {
                    warn!(
                        event_name = "calendar.load_failed",
                        calendar = source.watcher.name(),
                        error = %error,
                        "calendar could not be loaded; skipping"
                    );
                    continue;
                }
            };

            debug!(
                event_name = "calendar.loaded",
                calendar = source.watcher.name(),
                events = events.len(),
                "calendar loaded"
            );

            for trigger in source.watcher.due(&events, since, until) {
                self.fire(&trigger).await;
                fired.push(trigger);
            }
        }

        fired
    }

    async fn fire(&self, trigger: &TriggeredCommand) {
        let correlation_id = format!(
            "calendar-{}-{}-{}",
            trigger.calendar,
            trigger.event_name,
            trigger.starts_at.timestamp()
        );
        info!(
            event_name = "calendar.trigger.fired",
            calendar = %trigger.calendar,
            event = %trigger.event_name,
            summary = %trigger.summary,
            channel_id = %trigger.channel,
            command = %trigger.command,
            correlation_id = %correlation_id,
            "calendar event started"
        );

        let envelope = SlackEnvelope {
            envelope_id: correlation_id.clone(),
            event: SlackEvent::Message(MessageEvent {
                channel_id: trigger.channel.clone(),
                ts: format!("{}.000000", trigger.starts_at.timestamp()),
                thread_ts: None,
                user_id: CALENDAR_USER_ID.to_owned(),
                text: trigger.command.clone(),
            }),
        };
        let context = EventContext { correlation_id: correlation_id.clone() };

        match self.dispatcher.dispatch(&envelope, &context).await {
            Ok(true) => {}
            Ok(false) => {
                let notice = calendar_notice_message(trigger);
                if let Err(error) = self.chat.post_message(&trigger.channel, None, &notice).await {
                    warn!(
                        event_name = "calendar.notice_failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "calendar notice could not be posted"
                    );
                }
            }
            Err(error) => warn!(
                event_name = "calendar.command_failed",
                correlation_id = %correlation_id,
                error = %error,
                "calendar command failed"
            ),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut since = Utc::now();

            loop {
                ticker.tick().await;
                let until = Utc::now();
                self.poll(since, until).await;
                since = until;
            }
        })
    }
}
