//! Client-side game state and its transition function.
//!
//! [`GameState`] is the single authoritative local snapshot of the game.
//! It is mutated only through [`GameState::apply`], a pure function from
//! (state, [`Transition`]) to the next state — all side effects (timers,
//! subscriptions, sends) live in the session loop that sequences the
//! transitions. The loop publishes a fresh clone after every transition,
//! so readers always observe a complete snapshot, never a partial update.

use crate::protocol::{Room, Turn};

/// Client lifecycle phase.
///
/// Distinct from the room's own [`state`](crate::protocol::RoomState)
/// field: the server can report a room as `PLAYING` while this client is
/// still showing the countdown, and a kicked client drops to `Menu` while
/// the room plays on without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    /// No room; the player is naming themselves or entering a join code.
    #[default]
    Menu,
    /// In a room, waiting for the host to start.
    Lobby,
    /// A round is in progress.
    Playing,
    /// The round ended; the finished screen is up.
    Finished,
}

/// The single local snapshot of room/turn/game state.
///
/// Created once per session with all fields at rest and never destroyed,
/// only reset in place via [`Transition::Reset`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameState {
    /// Whether the transport is believed to be connected.
    pub connected: bool,
    /// Local player's display name. Survives [`Transition::Reset`].
    pub player_name: String,
    /// Latest room snapshot from the server, replaced wholesale.
    pub game_room: Option<Room>,
    /// Append-only record of guesses, cleared only by
    /// [`Transition::ClearHistory`] and [`Transition::Reset`].
    pub game_history: Vec<Turn>,
    /// Always the last element of `game_history`, or `None`.
    pub current_turn: Option<Turn>,
    /// Player-visible error, dismissable via [`Transition::ClearError`].
    pub error: Option<String>,
    pub phase: GamePhase,
    /// Pre-game countdown display value.
    pub countdown: u32,
    pub is_counting_down: bool,
}

/// A state transition tag plus payload.
///
/// The authoritative state machine: every mutation of [`GameState`] is
/// one of these, applied atomically by the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    SetConnected(bool),
    SetPlayerName(String),
    /// Replace the room snapshot wholesale (last-write-wins, never a merge).
    SetGameRoom(Room),
    SetPhase(GamePhase),
    /// Append a turn and make it current.
    AddTurn(Turn),
    SetError(String),
    ClearError,
    StartCountdown(u32),
    /// Guarded: ignored unless a countdown is running.
    UpdateCountdown(u32),
    EndCountdown,
    ClearHistory,
    /// Restore all fields to their initial values except `connected`
    /// and `player_name`.
    Reset,
}

impl GameState {
    /// Apply one transition and return the next state.
    ///
    /// Pure — no side effects, no I/O. The caller owns sequencing.
    #[must_use]
    pub fn apply(mut self, transition: Transition) -> Self {
        match transition {
            Transition::SetConnected(connected) => self.connected = connected,
            Transition::SetPlayerName(name) => self.player_name = name,
            Transition::SetGameRoom(room) => self.game_room = Some(room),
            Transition::SetPhase(phase) => self.phase = phase,
            Transition::AddTurn(turn) => {
                self.current_turn = Some(turn.clone());
                self.game_history.push(turn);
            }
            Transition::SetError(message) => self.error = Some(message),
            Transition::ClearError => self.error = None,
            Transition::StartCountdown(count) => {
                self.countdown = count;
                self.is_counting_down = true;
            }
            Transition::UpdateCountdown(count) => {
                if self.is_counting_down {
                    self.countdown = count;
                }
            }
            Transition::EndCountdown => {
                self.countdown = 0;
                self.is_counting_down = false;
            }
            Transition::ClearHistory => {
                self.game_history.clear();
                self.current_turn = None;
            }
            Transition::Reset => {
                return Self {
                    connected: self.connected,
                    player_name: self.player_name,
                    ..Self::default()
                };
            }
        }
        self
    }
}
