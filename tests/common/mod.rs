#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Shared test utilities for Secret Number client integration tests.
//!
//! Provides a channel-based [`MockTransport`] plus helpers for building
//! raw server envelope JSON, so the tests pin the wire format rather
//! than round-tripping through the crate's own serializers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use secret_number_client::transport::Inbound;
use secret_number_client::{SecretNumberError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// One scripted delivery: a message, a transport error, or (as `None`)
/// a clean connection close.
pub type Delivery = Option<Result<Inbound, SecretNumberError>>;

/// A channel-based mock transport for integration testing.
///
/// Tests push deliveries through [`MockHandles::push`] while the client
/// runs; everything the client does is recorded in the shared handles.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Delivery>,
    sent: Arc<StdMutex<Vec<(String, String)>>>,
    subscribed: Arc<StdMutex<Vec<String>>>,
    unsubscribed: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

/// Test-side view of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandles {
    /// Push the next delivery to the client.
    pub push: mpsc::UnboundedSender<Delivery>,
    /// `(destination, body)` pairs the client sent, in order.
    pub sent: Arc<StdMutex<Vec<(String, String)>>>,
    /// Topics the client subscribed, in order.
    pub subscribed: Arc<StdMutex<Vec<String>>>,
    /// Topics the client unsubscribed, in order.
    pub unsubscribed: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockHandles {
    /// Deliver a server envelope on `topic`.
    pub fn deliver(&self, topic: &str, body: impl ToString) {
        self.push
            .send(Some(Ok(Inbound {
                topic: topic.to_owned(),
                body: body.to_string(),
            })))
            .unwrap();
    }

    /// Deliver a transport error.
    pub fn fail(&self, message: &str) {
        self.push
            .send(Some(Err(SecretNumberError::TransportReceive(
                message.to_owned(),
            ))))
            .unwrap();
    }

    /// Close the connection cleanly.
    pub fn close(&self) {
        self.push.send(None).unwrap();
    }

    /// All recorded sends to `destination`, parsed as JSON.
    pub fn sent_to(&self, destination: &str) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(dest, _)| dest == destination)
            .map(|(_, body)| serde_json::from_str(body).unwrap())
            .collect()
    }

    /// Whether the client currently holds a subscription to `topic`
    /// (subscribed and not since unsubscribed).
    pub fn is_subscribed(&self, topic: &str) -> bool {
        let subs = self
            .subscribed
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == topic)
            .count();
        let unsubs = self
            .unsubscribed
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == topic)
            .count();
        subs > unsubs
    }
}

/// Create a mock transport plus the handles for driving and inspecting it.
pub fn mock_transport() -> (MockTransport, MockHandles) {
    let (push, incoming) = mpsc::unbounded_channel();
    let sent = Arc::new(StdMutex::new(Vec::new()));
    let subscribed = Arc::new(StdMutex::new(Vec::new()));
    let unsubscribed = Arc::new(StdMutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));

    let transport = MockTransport {
        incoming,
        sent: Arc::clone(&sent),
        subscribed: Arc::clone(&subscribed),
        unsubscribed: Arc::clone(&unsubscribed),
        closed: Arc::clone(&closed),
    };
    let handles = MockHandles {
        push,
        sent,
        subscribed,
        unsubscribed,
        closed,
    };
    (transport, handles)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, destination: &str, body: String) -> Result<(), SecretNumberError> {
        self.sent.lock().unwrap().push((destination.to_owned(), body));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), SecretNumberError> {
        self.subscribed.lock().unwrap().push(topic.to_owned());
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), SecretNumberError> {
        self.unsubscribed.lock().unwrap().push(topic.to_owned());
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Inbound, SecretNumberError>> {
        match self.incoming.recv().await {
            Some(delivery) => delivery,
            // Test handles dropped without closing — hang forever so the
            // session loop stays alive until shutdown is called.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), SecretNumberError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Envelope JSON helpers ───────────────────────────────────────────

/// Raw room JSON as the server sends it.
pub fn room_json(
    room_id: &str,
    host_id: &str,
    players: &[(&str, &str, bool)],
    current_player_index: usize,
    min_range: i32,
    max_range: i32,
    state: &str,
) -> serde_json::Value {
    serde_json::json!({
        "roomId": room_id,
        "hostId": host_id,
        "players": players
            .iter()
            .map(|(id, name, is_host)| {
                serde_json::json!({ "id": id, "name": name, "isHost": is_host })
            })
            .collect::<Vec<_>>(),
        "currentPlayerIndex": current_player_index,
        "minRange": min_range,
        "maxRange": max_range,
        "state": state,
    })
}

/// A one-player lobby room hosted by Alice, as created in scenario A.
pub fn alice_lobby_room(room_id: &str) -> serde_json::Value {
    room_json(
        room_id,
        "P1",
        &[("P1", "Alice", true)],
        0,
        1,
        99,
        "LOBBY",
    )
}

/// A two-player room (Alice hosting, Bob joined).
pub fn two_player_room(room_id: &str, state: &str) -> serde_json::Value {
    room_json(
        room_id,
        "P1",
        &[("P1", "Alice", true), ("P2", "Bob", false)],
        0,
        1,
        99,
        state,
    )
}

/// Envelope carrying only a room snapshot.
pub fn room_envelope(discriminant: &str, game_room: serde_json::Value) -> String {
    serde_json::json!({ "type": discriminant, "gameRoom": game_room }).to_string()
}

/// `GUESS_MADE` envelope with the updated room and the recorded turn.
pub fn guess_made_envelope(
    game_room: serde_json::Value,
    player_name: &str,
    guess: i32,
    result: &str,
) -> String {
    serde_json::json!({
        "type": "GUESS_MADE",
        "gameRoom": game_room,
        "lastTurn": { "playerName": player_name, "guess": guess, "result": result },
    })
    .to_string()
}

/// Envelope carrying only a message string (`PLAYER_KICKED`, `ERROR`).
pub fn message_envelope(discriminant: &str, message: &str) -> String {
    serde_json::json!({ "type": discriminant, "message": message }).to_string()
}
