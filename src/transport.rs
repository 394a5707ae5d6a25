//! Transport abstraction for the Secret Number publish-subscribe protocol.
//!
//! The [`Transport`] trait models the broker the game server sits behind:
//! the client sends JSON request payloads to named destinations, manages
//! topic subscriptions, and receives pushed messages tagged with the
//! topic they arrived on. Every implementation must handle its own
//! framing (WebSocket frames, length-prefixed TCP, …).
//!
//! # Connection Setup
//!
//! Connection setup is intentionally NOT part of this trait — different
//! transports have fundamentally different connection parameters (URLs
//! for WebSocket, host:port for TCP, broker credentials, etc.).
//! Construct a connected transport externally, then pass it to
//! `SecretNumberClient::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use secret_number_client::error::SecretNumberError;
//! use secret_number_client::transport::{Inbound, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, destination: &str, body: String) -> Result<(), SecretNumberError> {
//!         // Deliver the JSON payload to the destination
//!         todo!()
//!     }
//!
//!     async fn subscribe(&mut self, topic: &str) -> Result<(), SecretNumberError> {
//!         todo!()
//!     }
//!
//!     async fn unsubscribe(&mut self, topic: &str) -> Result<(), SecretNumberError> {
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<Inbound, SecretNumberError>> {
//!         // Return the next pushed message, None on clean close
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SecretNumberError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SecretNumberError;

/// One message pushed to the client, tagged with its topic of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Topic the message was delivered on.
    pub topic: String,
    /// Raw JSON body (a serialized server envelope).
    pub body: String,
}

/// A publish-subscribe message transport for the Secret Number protocol.
///
/// Implementors shuttle serialized JSON between the client and the game
/// broker. Deliveries on the same topic arrive in order; no ordering is
/// guaranteed across topics.
///
/// # Object Safety
///
/// This trait is object-safe, so `Box<dyn Transport>` works for dynamic
/// dispatch. `SecretNumberClient::start` accepts `impl Transport`
/// (monomorphized) for the common case.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because
/// it is used inside `tokio::select!`. If `recv` is cancelled before
/// completion, calling it again must not lose data. Channel-based
/// implementations (e.g., wrapping `mpsc::Receiver`) are naturally
/// cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON request payload to an outbound destination.
    ///
    /// Sends are fire-and-forget: no delivery confirmation is assumed.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::TransportSend`] if the payload could
    /// not be handed to the broker.
    async fn send(&mut self, destination: &str, body: String) -> Result<(), SecretNumberError>;

    /// Start receiving pushes on `topic`.
    ///
    /// Callers guarantee at-most-once subscription per topic (see
    /// `SubscriptionSet`); implementations need not deduplicate.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::TransportSend`] if the subscription
    /// request could not be issued.
    async fn subscribe(&mut self, topic: &str) -> Result<(), SecretNumberError>;

    /// Stop receiving pushes on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::TransportSend`] if the request could
    /// not be issued.
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), SecretNumberError>;

    /// Receive the next pushed message.
    ///
    /// Returns:
    /// - `Some(Ok(inbound))` — a complete message was received
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the connection was closed cleanly
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<Inbound, SecretNumberError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations
    /// should still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), SecretNumberError>;
}
