//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! This module provides [`WebSocketTransport`], a [`Transport`]
//! implementation that speaks the broker's JSON frame protocol over a
//! WebSocket connection. Both `ws://` and `wss://` URLs are supported —
//! TLS is handled transparently via
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Frame protocol
//!
//! Client frames carry a `command` tag:
//!
//! ```text
//! {"command":"SEND","destination":"/app/makeGuess","body":{...}}
//! {"command":"SUBSCRIBE","topic":"/topic/room.R1"}
//! {"command":"UNSUBSCRIBE","topic":"/topic/room.R1"}
//! ```
//!
//! Broker frames pair the topic of delivery with the pushed envelope:
//!
//! ```text
//! {"topic":"/topic/room.R1","body":{"type":"GUESS_MADE",...}}
//! ```
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature
//! is enabled (it is enabled by default).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::SecretNumberError;
use crate::transport::{Inbound, Transport};

/// Type alias for the underlying WebSocket stream.
///
/// Made public so that callers can construct a [`WebSocketTransport`] from an
/// existing stream via [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Frames sent from the client to the broker.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "UPPERCASE")]
enum ClientFrame<'a> {
    Send {
        destination: &'a str,
        body: serde_json::Value,
    },
    Subscribe {
        topic: &'a str,
    },
    Unsubscribe {
        topic: &'a str,
    },
}

/// Frames pushed from the broker to the client.
#[derive(Debug, Deserialize)]
struct BrokerFrame {
    topic: String,
    body: serde_json::Value,
}

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// Wraps a `tokio-tungstenite` [`WebSocketStream`](tokio_tungstenite::WebSocketStream)
/// and translates between the pub-sub [`Transport`] operations and the
/// broker's JSON text frames.
///
/// # Construction
///
/// Use [`WebSocketTransport::connect`] to establish a new connection:
///
/// ```rust,no_run
/// # async fn example() -> Result<(), secret_number_client::SecretNumberError> {
/// use secret_number_client::WebSocketTransport;
///
/// let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
/// # Ok(())
/// # }
/// ```
///
/// For advanced use-cases (custom TLS, proxy, headers) construct the stream
/// yourself and use [`WebSocketTransport::from_stream`].
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any
/// messages, making it safe to use inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// Supports both `ws://` and `wss://` schemes. TLS is handled automatically
    /// by `tokio-tungstenite` via [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::Io`] if the URL is invalid or the
    /// connection cannot be established. When the underlying error is an I/O
    /// error its [`ErrorKind`](std::io::ErrorKind) is preserved; all other
    /// errors are mapped to [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, SecretNumberError> {
        tracing::debug!(url = %url, "connecting to game broker");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            SecretNumberError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "WebSocket connection established");

        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Create a [`WebSocketTransport`] from an already-established WebSocket stream.
    ///
    /// This is useful when you need custom TLS configuration, proxy headers, or
    /// any other connection setup that [`connect`](Self::connect) does not expose.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// Establish a new WebSocket connection with a timeout.
    ///
    /// Behaves identically to [`connect`](Self::connect) but fails with
    /// [`SecretNumberError::Timeout`] if the connection is not established
    /// within the given duration.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::Timeout`] if the deadline elapses, or any
    /// error that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, SecretNumberError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| SecretNumberError::Timeout)?
    }

    async fn send_frame(&mut self, frame: ClientFrame<'_>) -> Result<(), SecretNumberError> {
        if self.closed {
            return Err(SecretNumberError::TransportClosed);
        }
        let json = serde_json::to_string(&frame)?;
        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SecretNumberError::TransportSend(e.to_string()))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, destination: &str, body: String) -> Result<(), SecretNumberError> {
        let body: serde_json::Value = serde_json::from_str(&body)?;
        self.send_frame(ClientFrame::Send { destination, body }).await
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), SecretNumberError> {
        self.send_frame(ClientFrame::Subscribe { topic }).await
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), SecretNumberError> {
        self.send_frame(ClientFrame::Unsubscribe { topic }).await
    }

    async fn recv(&mut self) -> Option<Result<Inbound, SecretNumberError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(SecretNumberError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => match serde_json::from_str::<BrokerFrame>(text.as_str()) {
                    Ok(frame) => {
                        return Some(Ok(Inbound {
                            topic: frame.topic,
                            body: frame.body.to_string(),
                        }));
                    }
                    Err(e) => {
                        // Unframed text is skipped rather than fatal so a newer
                        // broker cannot wedge the session.
                        tracing::warn!("failed to parse broker frame: {e} — raw: {text}");
                    }
                },
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Ping(_) => {
                    tracing::debug!("received WebSocket ping (auto-pong handled by tungstenite)");
                    // tungstenite auto-queues a Pong reply; no manual response needed.
                }
                Message::Pong(_) => {
                    tracing::debug!("received WebSocket pong (ignored)");
                    // Continue the loop.
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                    // Continue the loop.
                }
                Message::Frame(_) => {
                    // This variant is never produced by the read half of the stream;
                    // it exists only for exhaustiveness against future `Message`
                    // variants. We keep the arm to satisfy exhaustiveness checks.
                    tracing::debug!("received raw WebSocket frame, skipping");
                    // Continue the loop.
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), SecretNumberError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| SecretNumberError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let result = WebSocketTransport::connect("not-a-valid-url").await;
        let err = result.unwrap_err();
        assert!(matches!(err, SecretNumberError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let result = WebSocketTransport::connect("ws://127.0.0.1:1").await;
        let err = result.unwrap_err();
        assert!(matches!(err, SecretNumberError::Io(_)));
    }

    // ── Mock-broker helpers ──────────────────────────────────────────────

    use tokio::net::TcpListener;

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_broker<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    // ── Mock-broker tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_unwraps_broker_frames() {
        let url = start_mock_broker(|mut ws| async move {
            ws.send(Message::Text(
                r#"{"topic":"/topic/room.R1","body":{"type":"ERROR","message":"nope"}}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        let inbound = transport.recv().await.unwrap().unwrap();
        assert_eq!(inbound.topic, "/topic/room.R1");
        let body: serde_json::Value = serde_json::from_str(&inbound.body).unwrap();
        assert_eq!(body["type"], "ERROR");
    }

    #[tokio::test]
    async fn recv_skips_unframed_text() {
        let url = start_mock_broker(|mut ws| async move {
            ws.send(Message::Text("not a frame".into())).await.unwrap();
            ws.send(Message::Text(
                r#"{"topic":"/topic/gameResponse","body":{"type":"UNKNOWN_THING"}}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        // The unframed text should be silently skipped.
        let inbound = transport.recv().await.unwrap().unwrap();
        assert_eq!(inbound.topic, "/topic/gameResponse");
    }

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let url = start_mock_broker(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let result = transport.recv().await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_broker(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(
                r#"{"topic":"/user/queue/gameUpdate","body":{"type":"X"}}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        let inbound = transport.recv().await.unwrap().unwrap();
        assert_eq!(inbound.topic, "/user/queue/gameUpdate");
    }

    #[tokio::test]
    async fn send_wraps_payload_in_send_frame() {
        let url = start_mock_broker(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                // Echo the frame back so the client can assert on it.
                ws.send(Message::Text(
                    format!(r#"{{"topic":"/echo","body":{text}}}"#).into(),
                ))
                .await
                .unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send("/app/makeGuess", r#"{"roomId":"R1","guess":42}"#.to_string())
            .await
            .unwrap();

        let inbound = transport.recv().await.unwrap().unwrap();
        let frame: serde_json::Value = serde_json::from_str(&inbound.body).unwrap();
        assert_eq!(frame["command"], "SEND");
        assert_eq!(frame["destination"], "/app/makeGuess");
        assert_eq!(frame["body"]["guess"], 42);
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_emit_command_frames() {
        let url = start_mock_broker(|mut ws| async move {
            let mut frames = Vec::new();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                frames.push(text.to_string());
                if frames.len() == 2 {
                    break;
                }
            }
            ws.send(Message::Text(
                format!(r#"{{"topic":"/echo","body":[{}]}}"#, frames.join(",")).into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.subscribe("/topic/room.R1").await.unwrap();
        transport.unsubscribe("/topic/room.R1").await.unwrap();

        let inbound = transport.recv().await.unwrap().unwrap();
        let frames: serde_json::Value = serde_json::from_str(&inbound.body).unwrap();
        assert_eq!(frames[0]["command"], "SUBSCRIBE");
        assert_eq!(frames[0]["topic"], "/topic/room.R1");
        assert_eq!(frames[1]["command"], "UNSUBSCRIBE");
        assert_eq!(frames[1]["topic"], "/topic/room.R1");
    }

    #[tokio::test]
    async fn send_rejects_invalid_json_body() {
        let url = start_mock_broker(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let err = transport
            .send("/app/makeGuess", "not json".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SecretNumberError::Serialization(_)));
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_mock_broker(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        let err = transport
            .send("/app/quitGame", "{}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SecretNumberError::TransportClosed));
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let url =
            start_mock_broker(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        // Second close should also succeed.
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // Use a non-routable address to guarantee a timeout.
        let result = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            std::time::Duration::from_millis(50),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, SecretNumberError::Timeout));
    }

    #[tokio::test]
    async fn from_stream_constructor_works() {
        let url = start_mock_broker(|mut ws| async move {
            ws.send(Message::Text(
                r#"{"topic":"/topic/gameResponse","body":{"type":"X"}}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        // Connect the raw stream ourselves, then wrap it.
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut transport = WebSocketTransport::from_stream(ws_stream);

        let inbound = transport.recv().await.unwrap().unwrap();
        assert_eq!(inbound.topic, "/topic/gameResponse");
    }
}
