use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{CommandDispatcher, EventContext, MessageEvent, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not open socket mode connection: {0}")]
    Connect(String),
    #[error("could not read from socket mode connection: {0}")]
    Receive(String),
    #[error("could not acknowledge envelope: {0}")]
    Acknowledge(String),
    #[error("could not close socket mode connection: {0}")]
    Disconnect(String),
    #[error("socket mode frame could not be decoded: {0}")]
    Decode(String),
}

/// How often and how patiently the runner reopens a failed connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Connection attempts in total, including the first one.
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Doubles per failed attempt, capped at `max_delay`.
    fn delay_after(&self, failures: u32) -> Duration {
        let factor = 2_u32.saturating_pow(failures.saturating_sub(1).min(16));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn open(&self) -> Result<(), TransportError>;
    /// `Ok(None)` means the server closed the stream.
    async fn receive(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn ack(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn close(&self) -> Result<(), TransportError>;
}

#[derive(Deserialize)]
struct SocketFrame {
    #[serde(default)]
    envelope_id: String,
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    payload: Option<EventsApiPayload>,
}

#[derive(Deserialize)]
struct EventsApiPayload {
    event: RawEvent,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
}

/// Decodes one Socket Mode frame. Only plain user messages become
/// [`SlackEvent::Message`]; edits, bot posts and everything else are
/// `Unsupported` so the bot never reacts to its own output.
pub fn parse_envelope(frame: &str) -> Result<SlackEnvelope, TransportError> {
    let frame: SocketFrame =
        serde_json::from_str(frame).map_err(|error| TransportError::Decode(error.to_string()))?;

    let event = match (frame.frame_type.as_str(), frame.payload) {
        ("events_api", Some(EventsApiPayload { event })) => match event {
            RawEvent { subtype: Some(subtype), event_type, .. } => {
                SlackEvent::Unsupported { event_type: format!("{event_type}.{subtype}") }
            }
            RawEvent { bot_id: Some(_), event_type, .. } => SlackEvent::Unsupported { event_type },
            RawEvent { event_type, channel, ts, thread_ts, user, text, .. }
                if event_type == "message" =>
            {
                SlackEvent::Message(MessageEvent {
                    channel_id: channel,
                    ts,
                    thread_ts,
                    user_id: user,
                    text,
                })
            }
            RawEvent { event_type, .. } => SlackEvent::Unsupported { event_type },
        },
        (frame_type, _) => SlackEvent::Unsupported { event_type: frame_type.to_owned() },
    };

    Ok(SlackEnvelope { envelope_id: frame.envelope_id, event })
}

/// Feeds Socket Mode envelopes into the [`CommandDispatcher`].
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<CommandDispatcher>,
    policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: Arc<CommandDispatcher>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, policy }
    }

    /// Runs sessions until one ends with the transport reporting the end of
    /// the stream. A session that delivered envelopes before failing resets
    /// the failure count. When every attempt has failed the runner gives up
    /// and returns `Ok`, leaving the health endpoint and calendar poller
    /// running.
    pub async fn start(&self) -> Result<()> {
        let mut failures = 0;

        while failures < self.policy.attempts {
            let mut handled = 0;
            match self.session(&mut handled).await {
                Ok(()) => {
                    info!(
                        event_name = "slack.socket.closed",
                        envelopes = handled,
                        "socket mode stream closed by server"
                    );
                    return Ok(());
                }
                Err(error) => {
                    if handled > 0 {
                        failures = 0;
                    }
                    failures += 1;
                    warn!(
                        event_name = "slack.socket.session_failed",
                        failures,
                        envelopes = handled,
                        attempts = self.policy.attempts,
                        error = %error,
                        "socket mode session failed"
                    );
                }
            }

            if failures < self.policy.attempts {
                let delay = self.policy.delay_after(failures);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!(
            event_name = "slack.socket.gave_up",
            attempts = self.policy.attempts,
            "socket mode unavailable; serving without slack events"
        );
        Ok(())
    }

    /// One connection lifetime, counting handled envelopes into `handled`.
    async fn session(&self, handled: &mut usize) -> Result<(), TransportError> {
        self.transport.open().await?;
        debug!(event_name = "slack.socket.opened", "socket mode connection open");

        while let Some(envelope) = self.transport.receive().await? {
            self.handle(&envelope).await;
            *handled += 1;
        }

        self.transport.close().await
    }

    async fn handle(&self, envelope: &SlackEnvelope) {
        let correlation_id = envelope.envelope_id.as_str();
        let (channel_id, thread_ts) = correlation_fields(envelope);
        info!(
            event_name = "slack.socket.envelope",
            correlation_id,
            event_type = ?envelope.event.event_type(),
            channel_id = channel_id.unwrap_or("-"),
            thread_ts = thread_ts.unwrap_or("-"),
            "envelope received"
        );

        // Slack redelivers envelopes that are not acked within 3 seconds.
        if let Err(error) = self.transport.ack(correlation_id).await {
            warn!(
                event_name = "slack.socket.ack_failed",
                correlation_id,
                error = %error,
                "envelope not acknowledged"
            );
        }

        let context = EventContext { correlation_id: correlation_id.to_owned() };
        match self.dispatcher.dispatch(envelope, &context).await {
            Ok(handled) => debug!(
                event_name = "slack.socket.dispatched",
                correlation_id,
                handled,
                "envelope dispatched"
            ),
            Err(error) => warn!(
                event_name = "slack.socket.dispatch_failed",
                correlation_id,
                error = %error,
                "command failed; waiting for the next envelope"
            ),
        }
    }
}

fn correlation_fields(envelope: &SlackEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        SlackEvent::Message(message) => {
            (Some(message.channel_id.as_str()), Some(message.reply_thread()))
        }
        SlackEvent::Unsupported { .. } => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{
        parse_envelope, ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError,
    };
    use crate::commands::Command;
    use crate::events::{CommandDispatcher, SlackEnvelope, SlackEvent};
    use crate::testing::{message_envelope, StaticCommand};

    /// Fails the first `refused` opens, then replays `frames` once.
    struct FlakyTransport {
        refused: AtomicUsize,
        opens: AtomicUsize,
        frames: Mutex<VecDeque<SlackEnvelope>>,
        acked: Mutex<Vec<String>>,
    }

    impl FlakyTransport {
        fn new(refused: usize, frames: Vec<SlackEnvelope>) -> Self {
            Self {
                refused: AtomicUsize::new(refused),
                opens: AtomicUsize::new(0),
                frames: Mutex::new(frames.into()),
                acked: Mutex::new(Vec::new()),
            }
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        fn acked(&self) -> Vec<String> {
            self.acked.lock().expect("acked lock").clone()
        }
    }

    #[async_trait]
    impl SocketTransport for FlakyTransport {
        async fn open(&self) -> Result<(), TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let remaining = self.refused.load(Ordering::SeqCst);
            if remaining > 0 {
                self.refused.store(remaining - 1, Ordering::SeqCst);
                return Err(TransportError::Connect("connection refused".to_owned()));
            }
            Ok(())
        }

        async fn receive(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            Ok(self.frames.lock().expect("frames lock").pop_front())
        }

        async fn ack(&self, envelope_id: &str) -> Result<(), TransportError> {
            self.acked.lock().expect("acked lock").push(envelope_id.to_owned());
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn immediate(attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy { attempts, initial_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    #[tokio::test]
    async fn reopens_after_refused_connection_and_dispatches() {
        let transport = Arc::new(FlakyTransport::new(1, vec![message_envelope("deploy please")]));
        let command = Arc::new(StaticCommand::new("deploy", "deploy"));
        let dispatcher =
            Arc::new(CommandDispatcher::new(vec![command.clone() as Arc<dyn Command>]));

        SocketModeRunner::new(transport.clone(), dispatcher, immediate(3))
            .start()
            .await
            .expect("runner returns after the stream closes");

        assert_eq!(transport.opens(), 2);
        assert_eq!(transport.acked(), vec!["env-1".to_owned()]);
        assert_eq!(command.executions(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_the_last_attempt() {
        let transport = Arc::new(FlakyTransport::new(10, Vec::new()));
        let dispatcher = Arc::new(CommandDispatcher::default());

        SocketModeRunner::new(transport.clone(), dispatcher, immediate(3))
            .start()
            .await
            .expect("giving up is not an error");

        assert_eq!(transport.opens(), 3);
    }

    /// Delivers one envelope per session and drops the connection, `drops` times.
    struct DroppingTransport {
        drops: usize,
        opens: AtomicUsize,
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl SocketTransport for DroppingTransport {
        async fn open(&self) -> Result<(), TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn receive(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            let session = self.opens.load(Ordering::SeqCst);
            if self.delivered.load(Ordering::SeqCst) < session {
                self.delivered.fetch_add(1, Ordering::SeqCst);
                return Ok(Some(message_envelope("deploy now")));
            }
            if session <= self.drops {
                return Err(TransportError::Receive("connection reset".to_owned()));
            }
            Ok(None)
        }

        async fn ack(&self, _envelope_id: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn healthy_sessions_do_not_use_up_attempts() {
        let transport = Arc::new(DroppingTransport {
            drops: 4,
            opens: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
        });
        let command = Arc::new(StaticCommand::new("deploy", "deploy"));
        let dispatcher =
            Arc::new(CommandDispatcher::new(vec![command.clone() as Arc<dyn Command>]));

        SocketModeRunner::new(transport.clone(), dispatcher, immediate(2))
            .start()
            .await
            .expect("runner");

        assert_eq!(transport.opens.load(Ordering::SeqCst), 5);
        assert_eq!(command.executions(), 5);
    }

    #[tokio::test]
    async fn unhandled_envelopes_are_still_acknowledged() {
        let transport = Arc::new(FlakyTransport::new(
            0,
            vec![message_envelope("nothing to see"), message_envelope("still nothing")],
        ));
        let dispatcher = Arc::new(CommandDispatcher::default());

        SocketModeRunner::new(transport.clone(), dispatcher, immediate(1))
            .start()
            .await
            .expect("runner");

        assert_eq!(transport.acked().len(), 2);
    }

    #[test]
    fn reconnect_delay_doubles_up_to_the_cap() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(3), Duration::from_secs(1));
        assert_eq!(policy.delay_after(12), Duration::from_secs(5));
    }

    #[test]
    fn parses_user_message_frame() {
        let envelope = parse_envelope(
            r#"{
                "envelope_id": "57d6a792",
                "type": "events_api",
                "payload": {
                    "event": {
                        "type": "message",
                        "channel": "C1",
                        "user": "U1",
                        "ts": "1730000000.2000",
                        "thread_ts": "1730000000.1000",
                        "text": "vcd.example.com/projects/foo/repos/bar/pull-requests/1337"
                    }
                }
            }"#,
        )
        .expect("frame");

        assert_eq!(envelope.envelope_id, "57d6a792");
        let SlackEvent::Message(message) = envelope.event else {
            panic!("expected a message event");
        };
        assert_eq!(message.channel_id, "C1");
        assert_eq!(message.thread_ts.as_deref(), Some("1730000000.1000"));
        assert!(message.text.ends_with("pull-requests/1337"));
    }

    #[test]
    fn bot_and_edited_messages_are_unsupported() {
        let bot = parse_envelope(
            r#"{"envelope_id":"a","type":"events_api",
                "payload":{"event":{"type":"message","bot_id":"B1","text":"hi"}}}"#,
        )
        .expect("bot frame");
        let edited = parse_envelope(
            r#"{"envelope_id":"b","type":"events_api",
                "payload":{"event":{"type":"message","subtype":"message_changed"}}}"#,
        )
        .expect("edit frame");
        let hello = parse_envelope(r#"{"envelope_id":"c","type":"hello"}"#).expect("hello frame");

        assert_eq!(bot.event, SlackEvent::Unsupported { event_type: "message".to_owned() });
        assert_eq!(
            edited.event,
            SlackEvent::Unsupported { event_type: "message.message_changed".to_owned() }
        );
        assert_eq!(hello.event, SlackEvent::Unsupported { event_type: "hello".to_owned() });
    }

    #[test]
    fn malformed_frame_is_a_decode_error() {
        assert!(matches!(parse_envelope("{not json"), Err(TransportError::Decode(_))));
    }
}
