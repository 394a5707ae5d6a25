//! Error types for the Secret Number client.

use thiserror::Error;

/// Errors that can occur when using the Secret Number client.
#[derive(Debug, Error)]
pub enum SecretNumberError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// Attempted a room operation but the client is not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// The player name was empty or otherwise unusable.
    #[error("invalid player name")]
    InvalidPlayerName,

    /// The room id was empty or otherwise unusable.
    #[error("invalid room id")]
    InvalidRoomId,

    /// The guess falls outside the room's current range.
    #[error("guess {guess} is outside the current range {min}..={max}")]
    InvalidGuess {
        /// The rejected guess.
        guess: i32,
        /// Lower bound of the room's current range.
        min: i32,
        /// Upper bound of the room's current range.
        max: i32,
    },

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Secret Number client operations.
pub type Result<T> = std::result::Result<T, SecretNumberError>;
