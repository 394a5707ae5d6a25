//! # Secret Number Client
//!
//! Transport-agnostic Rust client for the Secret Number multiplayer
//! guessing game.
//!
//! This crate provides the client-side synchronization engine for a
//! turn-based, shared-state game: the server owns room membership, turn
//! order, and the shrinking number range; this client keeps a strictly
//! ordered local [`GameState`] consistent with the server's push
//! messages and drives the purely local timed behaviors (pre-game
//! countdown, forced single-candidate guess, join timeout, post-game
//! auto-return).
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any
//!   publish-subscribe backend
//! - **Wire-compatible** — all protocol types match the server's JSON
//!   envelopes exactly
//! - **WebSocket built-in** — default `transport-websocket` feature
//!   provides `WebSocketTransport`
//! - **Snapshot-driven** — observe complete [`GameState`] snapshots via
//!   a watch channel; no partial updates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let (client, mut state) = SecretNumberClient::start(transport, SecretNumberConfig::new());
//!
//! client.join_room("R1", "Alice")?;
//!
//! while state.changed().await.is_ok() {
//!     let snapshot = state.borrow().clone();
//!     // render the snapshot
//! }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod subscriptions;
pub mod timer;
pub mod topics;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{SecretNumberClient, SecretNumberConfig, ROOM_NOT_FOUND_ERROR};
pub use error::SecretNumberError;
pub use protocol::{ClientRequest, Player, Room, RoomState, ServerMessage, Turn};
pub use state::{GamePhase, GameState, Transition};
pub use transport::{Inbound, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
