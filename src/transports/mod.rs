//! Transport implementations for the Secret Number protocol.
//!
//! Concrete [`Transport`](crate::Transport) implementations live behind
//! feature gates. Enable the corresponding Cargo feature to pull in a
//! transport:
//!
//! | Feature                | Transport              |
//! |------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`] |

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;
