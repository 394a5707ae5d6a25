//! Wire types for the Secret Number game protocol.
//!
//! Every type in this module produces JSON identical to the server's
//! envelopes. Inbound messages share one flat, internally tagged shape —
//! `{ "type": <discriminant>, "gameRoom"?, "lastTurn"?, "message"? }` — with
//! `SCREAMING_SNAKE_CASE` discriminants and camelCase fields. Outbound
//! requests are plain camelCase payloads addressed to per-action
//! destinations (see [`ClientRequest::destination`]).

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for players.
///
/// Opaque and server-assigned; before confirmation the client may use a
/// locally generated `temp-…` placeholder.
pub type PlayerId = String;

/// Unique identifier for rooms. Doubles as the join code shown to players.
pub type RoomId = String;

// ── Enums ───────────────────────────────────────────────────────────

/// The server's own phase label for a room.
///
/// Distinct from the client-side [`GamePhase`](crate::state::GamePhase):
/// this is what the server believes about the room, received wholesale on
/// every room snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    /// Players are gathering; the game has not started.
    #[default]
    Lobby,
    /// A round is in progress.
    Playing,
    /// The round has ended (someone hit the secret number).
    Finished,
}

// ── Structs ─────────────────────────────────────────────────────────

/// Information about a player in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    /// Display name, unique within a room.
    pub name: String,
    pub is_host: bool,
}

/// One recorded guess and its server-classified outcome.
///
/// Immutable once appended to the history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub player_name: String,
    pub guess: i32,
    /// Outcome label assigned by the server (e.g. `"safe"`, `"lost"`).
    pub result: String,
}

/// Server-owned snapshot of one game instance.
///
/// The client never computes a `Room` — it only stores the latest copy
/// received from the server, replacing the previous one wholesale
/// (last-write-wins by arrival order, never a merge).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    pub host_id: PlayerId,
    /// Roster in turn order.
    pub players: Vec<Player>,
    /// Index into `players`; meaningful while `state` is [`RoomState::Playing`].
    pub current_player_index: usize,
    /// Lower bound of the remaining safe range. `min_range == max_range`
    /// means exactly one candidate remains and the next guesser loses.
    pub min_range: i32,
    /// Upper bound of the remaining safe range.
    pub max_range: i32,
    pub state: RoomState,
    /// Present only on the game-start message; never displayed in play.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_number: Option<i32>,
}

impl Room {
    /// The player whose turn it currently is, if the index is in range.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    /// `true` when exactly one safe number remains.
    pub fn single_candidate_left(&self) -> bool {
        self.min_range == self.max_range
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Push messages sent from server to client.
///
/// All topics (personal queue, general response, room, per-player) carry
/// this same envelope. An unrecognized discriminant deserializes to
/// [`Unknown`](ServerMessage::Unknown) so forward-compatible servers can
/// never crash the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// The room was created with the local player as host.
    #[serde(rename_all = "camelCase")]
    RoomCreated { game_room: Room },
    /// Roster update: a player joined the room (possibly the local player).
    #[serde(rename_all = "camelCase")]
    PlayerJoined { game_room: Room },
    /// Direct confirmation that the local player joined the room.
    #[serde(rename_all = "camelCase")]
    RoomJoined { game_room: Room },
    /// The host started the pre-game countdown.
    #[serde(rename_all = "camelCase")]
    GameStartingCountdown { game_room: Room },
    /// The game began; the room snapshot transiently carries the secret number.
    #[serde(rename_all = "camelCase")]
    GameStarted { game_room: Room },
    /// A guess was made; carries the updated room and the recorded turn.
    #[serde(rename_all = "camelCase")]
    GuessMade { game_room: Room, last_turn: Turn },
    /// A player quit; carries the updated roster.
    #[serde(rename_all = "camelCase")]
    PlayerQuit { game_room: Room },
    /// The host returned the room to the lobby for another round.
    #[serde(rename_all = "camelCase")]
    GameRestarted { game_room: Room },
    /// The local player was removed by the host.
    PlayerKicked { message: String },
    /// Another player was removed by the host; carries the updated roster.
    #[serde(rename_all = "camelCase")]
    PlayerRemoved { game_room: Room },
    /// Server-side error, surfaced verbatim to the player.
    Error { message: String },
    /// Any discriminant this client does not recognize. Ignored.
    #[serde(other)]
    Unknown,
}

/// Requests sent from client to server.
///
/// Each variant serializes to the plain JSON payload the server expects
/// and is addressed to its own destination ([`destination`](Self::destination)).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ClientRequest {
    /// Create a room hosted by `player_name`. The temporary player id keys
    /// the optimistic personal topic subscribed before the server assigns
    /// a real id.
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        player_name: String,
        temp_player_id: PlayerId,
    },
    /// Join an existing room by id.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        player_name: String,
    },
    /// Ask the server to begin the pre-game countdown (host only).
    #[serde(rename_all = "camelCase")]
    StartCountdown { room_id: RoomId },
    /// Submit a guess for the current turn.
    #[serde(rename_all = "camelCase")]
    MakeGuess { room_id: RoomId, guess: i32 },
    /// Leave the room.
    #[serde(rename_all = "camelCase")]
    QuitGame {
        room_id: RoomId,
        player_name: String,
    },
    /// Return the room to the lobby for another round.
    #[serde(rename_all = "camelCase")]
    RestartGame { room_id: RoomId },
    /// Remove another player from the room (host only).
    #[serde(rename_all = "camelCase")]
    RemovePlayer {
        room_id: RoomId,
        player_name: String,
    },
}

impl ClientRequest {
    /// The outbound destination this request must be sent to.
    pub fn destination(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "/app/createRoom",
            Self::JoinRoom { .. } => "/app/joinRoom",
            Self::StartCountdown { .. } => "/app/startGameCountdown",
            Self::MakeGuess { .. } => "/app/makeGuess",
            Self::QuitGame { .. } => "/app/quitGame",
            Self::RestartGame { .. } => "/app/restartGame",
            Self::RemovePlayer { .. } => "/app/removePlayer",
        }
    }
}
