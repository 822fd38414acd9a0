//! Socket Mode over a websocket.
//!
//! `apps.connections.open` (authenticated with the app-level `xapp-` token)
//! hands out a single-use `wss://` URL. Frames read from it go through
//! [`parse_envelope`]; every envelope is acknowledged by echoing its
//! `envelope_id`. A `disconnect` frame makes the transport fetch a fresh URL
//! and carry on without surfacing the refresh to the runner.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::events::{SlackEnvelope, SlackEvent};
use crate::socket::{parse_envelope, SocketTransport, TransportError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECTIONS_OPEN: &str = "apps.connections.open";

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackSocketTransport {
    client: Client,
    base_url: String,
    app_token: SecretString,
    socket: Mutex<Option<Socket>>,
}

impl SlackSocketTransport {
    pub fn new(client: Client, base_url: impl Into<String>, app_token: SecretString) -> Self {
        Self { client, base_url: base_url.into(), app_token, socket: Mutex::new(None) }
    }

    /// Asks Slack for a websocket URL.
    pub async fn connection_url(&self) -> Result<String, TransportError> {
        let url = format!("{}/{CONNECTIONS_OPEN}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Connect(format!(
                "{CONNECTIONS_OPEN} returned http status {status}"
            )));
        }

        let body = response
            .json::<ConnectionsOpenResponse>()
            .await
            .map_err(|error| TransportError::Decode(error.to_string()))?;
        match body {
            ConnectionsOpenResponse { ok: true, url: Some(url), .. } => Ok(url),
            ConnectionsOpenResponse { error, .. } => Err(TransportError::Connect(format!(
                "{CONNECTIONS_OPEN} returned `{}`",
                error.as_deref().unwrap_or("missing_url")
            ))),
        }
    }

    async fn connect(&self) -> Result<Socket, TransportError> {
        let url = self.connection_url().await?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        debug!(event_name = "slack.socket.connected", "websocket handshake complete");
        Ok(socket)
    }
}

#[async_trait]
impl SocketTransport for SlackSocketTransport {
    async fn open(&self) -> Result<(), TransportError> {
        let socket = self.connect().await?;
        *self.socket.lock().await = Some(socket);
        Ok(())
    }

    /// Never reports a finished stream: a websocket closed by the server is a
    /// receive error, so the runner reconnects.
    async fn receive(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.socket.lock().await;

        loop {
            let Some(socket) = guard.as_mut() else {
                return Err(TransportError::Receive("connection is not open".to_owned()));
            };
            let Some(frame) = socket.next().await else {
                return Err(TransportError::Receive("connection closed by server".to_owned()));
            };

            match frame.map_err(|error| TransportError::Receive(error.to_string()))? {
                Message::Text(text) => {
                    let envelope = parse_envelope(&text)?;
                    if let SlackEvent::Unsupported { event_type } = &envelope.event {
                        if event_type == "disconnect" {
                            info!(
                                event_name = "slack.socket.refresh",
                                "server asked for a fresh connection"
                            );
                            *guard = Some(self.connect().await?);
                            continue;
                        }
                        if envelope.envelope_id.is_empty() {
                            debug!(
                                event_name = "slack.socket.control",
                                event_type,
                                "control frame"
                            );
                            continue;
                        }
                    }
                    return Ok(Some(envelope));
                }
                Message::Close(frame) => {
                    return Err(TransportError::Receive(format!(
                        "connection closed by server: {frame:?}"
                    )));
                }
                _ => {}
            }
        }
    }

    async fn ack(&self, envelope_id: &str) -> Result<(), TransportError> {
        let payload = json!({ "envelope_id": envelope_id }).to_string();
        let mut guard = self.socket.lock().await;
        let socket = guard
            .as_mut()
            .ok_or_else(|| TransportError::Acknowledge("connection is not open".to_owned()))?;

        socket
            .send(Message::text(payload))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        let Some(mut socket) = self.socket.lock().await.take() else {
            return Ok(());
        };
        socket.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use reqwest::Client;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::SlackSocketTransport;
    use crate::events::SlackEvent;
    use crate::socket::{SocketTransport, TransportError};

    const MESSAGE_FRAME: &str = r#"{
        "envelope_id": "57d6a792",
        "type": "events_api",
        "payload": {
            "event": {
                "type": "message",
                "channel": "C1",
                "user": "U1",
                "ts": "1730000000.1000",
                "text": "please review"
            }
        }
    }"#;

    fn transport(server: &MockServer) -> SlackSocketTransport {
        SlackSocketTransport::new(Client::new(), server.uri(), "xapp-test".to_owned().into())
    }

    async fn mount_connections_open(server: &MockServer, body: Value) {
        Mock::given(method("POST"))
            .and(path("/apps.connections.open"))
            .and(header("authorization", "Bearer xapp-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connection_url_comes_from_apps_connections_open() {
        let server = MockServer::start().await;
        mount_connections_open(
            &server,
            json!({ "ok": true, "url": "wss://wss-primary.slack.com/link/?ticket=1" }),
        )
        .await;

        let url = transport(&server).connection_url().await.expect("url");

        assert_eq!(url, "wss://wss-primary.slack.com/link/?ticket=1");
    }

    #[tokio::test]
    async fn rejected_app_token_fails_to_open() {
        let server = MockServer::start().await;
        mount_connections_open(&server, json!({ "ok": false, "error": "invalid_auth" })).await;

        let error = transport(&server).open().await.err().expect("open should fail");

        assert!(matches!(
            error,
            TransportError::Connect(ref message) if message.contains("invalid_auth")
        ));
    }

    #[tokio::test]
    async fn delivers_envelopes_and_echoes_their_ids() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        let peer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut socket = tokio_tungstenite::accept_async(stream).await.expect("handshake");
            socket.send(Message::text(r#"{"type":"hello"}"#)).await.expect("hello");
            socket.send(Message::text(MESSAGE_FRAME)).await.expect("message");
            let ack = socket.next().await.expect("ack frame").expect("readable ack");
            ack.to_text().expect("text ack").to_owned()
        });

        let server = MockServer::start().await;
        mount_connections_open(&server, json!({ "ok": true, "url": format!("ws://{address}") }))
            .await;
        let transport = transport(&server);

        transport.open().await.expect("open");
        let envelope = transport.receive().await.expect("receive").expect("envelope");
        transport.ack(&envelope.envelope_id).await.expect("ack");

        assert_eq!(envelope.envelope_id, "57d6a792");
        assert!(matches!(
            envelope.event,
            SlackEvent::Message(ref message) if message.text == "please review"
        ));
        let ack: Value = serde_json::from_str(&peer.await.expect("peer task")).expect("json ack");
        assert_eq!(ack, json!({ "envelope_id": "57d6a792" }));
    }

    #[tokio::test]
    async fn ack_without_connection_is_an_error() {
        let server = MockServer::start().await;

        let error = transport(&server).ack("57d6a792").await.err().expect("ack should fail");

        assert!(matches!(error, TransportError::Acknowledge(_)));
    }
}
