//! Async client for the Secret Number game protocol.
//!
//! [`SecretNumberClient`] is a thin handle that communicates with a
//! background session loop task via an unbounded MPSC channel. The loop
//! owns the [`GameState`] snapshot and publishes a fresh copy on a
//! [`tokio::sync::watch`] channel after every transition, so UI
//! collaborators always observe complete snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let config = SecretNumberConfig::new();
//! let (client, mut state) = SecretNumberClient::start(transport, config);
//!
//! client.create_room("Alice")?;
//!
//! while state.changed().await.is_ok() {
//!     let snapshot = state.borrow().clone();
//!     if snapshot.phase == GamePhase::Lobby { /* render the lobby */ }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{Result, SecretNumberError};
use crate::protocol::{ClientRequest, RoomState, ServerMessage};
use crate::state::{GamePhase, GameState, Transition};
use crate::storage::NameStore;
use crate::subscriptions::SubscriptionSet;
use crate::timer::{TimerEvent, TimerScheduler};
use crate::topics;
use crate::transport::Transport;

/// Error surfaced when a join attempt is not confirmed in time.
///
/// Distinct from server-sent error strings so the UI can offer a retry.
pub const ROOM_NOT_FOUND_ERROR: &str = "Room not found - Please enter an existing Room ID";

/// Default pre-game countdown start value.
const DEFAULT_COUNTDOWN_START: u32 = 5;

/// Default interval between countdown ticks.
const DEFAULT_COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

/// Default delay before the forced single-candidate guess is sent.
const DEFAULT_FORCED_GUESS_DELAY: Duration = Duration::from_secs(3);

/// Default window for the server to confirm a join request.
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time the finished screen lingers before auto-returning.
const DEFAULT_AUTO_RETURN_DELAY: Duration = Duration::from_secs(20);

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`SecretNumberClient`] session.
///
/// All fields have defaults matching the live game pacing; tests shrink
/// the timer durations instead of waiting out real seconds.
///
/// # Example
///
/// ```
/// use secret_number_client::client::SecretNumberConfig;
/// use std::time::Duration;
///
/// let config = SecretNumberConfig::new()
///     .with_join_timeout(Duration::from_secs(10))
///     .with_auto_return_delay(Duration::from_secs(30));
/// assert_eq!(config.join_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct SecretNumberConfig {
    /// Starting value of the pre-game countdown.
    pub countdown_start: u32,
    /// Interval between countdown ticks.
    pub countdown_interval: Duration,
    /// Delay before the forced single-candidate guess is sent.
    pub forced_guess_delay: Duration,
    /// Window for the server to confirm a join request before the
    /// "room not found" error is surfaced.
    pub join_timeout: Duration,
    /// Time the finished screen lingers before the client requests a
    /// return to the lobby.
    pub auto_return_delay: Duration,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`SecretNumberClient::shutdown`] is called, the session loop
    /// is given this much time to close the transport. If the timeout
    /// expires the task is aborted.
    pub shutdown_timeout: Duration,
    /// Where the display name is persisted. `None` disables persistence.
    pub name_store_path: Option<PathBuf>,
}

impl Default for SecretNumberConfig {
    fn default() -> Self {
        Self {
            countdown_start: DEFAULT_COUNTDOWN_START,
            countdown_interval: DEFAULT_COUNTDOWN_INTERVAL,
            forced_guess_delay: DEFAULT_FORCED_GUESS_DELAY,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            auto_return_delay: DEFAULT_AUTO_RETURN_DELAY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            name_store_path: None,
        }
    }
}

impl SecretNumberConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-game countdown start value.
    #[must_use]
    pub fn with_countdown_start(mut self, start: u32) -> Self {
        self.countdown_start = start;
        self
    }

    /// Set the interval between countdown ticks.
    #[must_use]
    pub fn with_countdown_interval(mut self, interval: Duration) -> Self {
        self.countdown_interval = interval;
        self
    }

    /// Set the delay before the forced single-candidate guess is sent.
    #[must_use]
    pub fn with_forced_guess_delay(mut self, delay: Duration) -> Self {
        self.forced_guess_delay = delay;
        self
    }

    /// Set the window for the server to confirm a join request.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Set how long the finished screen lingers before auto-returning.
    #[must_use]
    pub fn with_auto_return_delay(mut self, delay: Duration) -> Self {
        self.auto_return_delay = delay;
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Persist the display name at `path`.
    #[must_use]
    pub fn with_name_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.name_store_path = Some(path.into());
        self
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Player actions queued from the handle to the session loop.
#[derive(Debug)]
enum Command {
    CreateRoom { name: String },
    JoinRoom { room_id: String, name: String },
    StartGame,
    MakeGuess { guess: i32 },
    QuitGame,
    RestartGame,
    RemovePlayer { name: String },
    SetPlayerName { name: String },
    ClearError,
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for the Secret Number game protocol.
///
/// Created via [`SecretNumberClient::start`], which spawns the background
/// session loop and returns this handle together with a state receiver.
///
/// All action methods validate their input against the latest state
/// snapshot and return immediately once the command is queued (no
/// round-trip await). Nothing is sent to the server when validation
/// fails.
pub struct SecretNumberClient {
    /// Sender half of the command channel to the session loop.
    cmd_tx: mpsc::UnboundedSender<Command>,
    /// Latest published state snapshot, for synchronous validation.
    state_rx: watch::Receiver<GameState>,
    /// Handle to the background session loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the session loop to shut down gracefully.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl SecretNumberClient {
    /// Start the session loop and return a handle plus state receiver.
    ///
    /// The loop immediately subscribes the personal queue and the general
    /// response topic, loads any persisted display name, and marks the
    /// state connected.
    ///
    /// # Arguments
    ///
    /// * `transport` — A connected [`Transport`] implementation.
    /// * `config` — Session configuration.
    ///
    /// # Returns
    ///
    /// A tuple of `(client_handle, state_receiver)`. The receiver yields a
    /// fresh [`GameState`] snapshot after every transition until the
    /// session ends.
    #[must_use = "the state receiver must be kept to observe game state"]
    pub fn start(
        transport: impl Transport,
        config: SecretNumberConfig,
    ) -> (Self, watch::Receiver<GameState>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (state_tx, state_rx) = watch::channel(GameState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (timers, timer_rx) = TimerScheduler::new();

        let shutdown_timeout = config.shutdown_timeout;
        let name_store = config.name_store_path.clone().map(NameStore::new);
        let session = Session {
            transport,
            state: GameState::default(),
            state_tx,
            subs: SubscriptionSet::new(),
            timers,
            name_store,
            config,
        };

        let task = tokio::spawn(session_loop(session, cmd_rx, timer_rx, shutdown_rx));

        let client = Self {
            cmd_tx,
            state_rx: state_rx.clone(),
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };

        (client, state_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Create a room hosted by `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::InvalidPlayerName`] for an empty name
    /// and [`SecretNumberError::NotConnected`] if the transport is down.
    pub fn create_room(&self, name: impl Into<String>) -> Result<()> {
        let name = non_empty(name.into()).ok_or(SecretNumberError::InvalidPlayerName)?;
        self.require_connected()?;
        self.queue(Command::CreateRoom { name })
    }

    /// Join the room identified by `room_id` as `name`.
    ///
    /// If the server does not confirm the join within the configured
    /// window, [`ROOM_NOT_FOUND_ERROR`] is surfaced on the state.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::InvalidRoomId`] or
    /// [`SecretNumberError::InvalidPlayerName`] for empty input, and
    /// [`SecretNumberError::NotConnected`] if the transport is down.
    pub fn join_room(&self, room_id: impl Into<String>, name: impl Into<String>) -> Result<()> {
        let room_id = non_empty(room_id.into()).ok_or(SecretNumberError::InvalidRoomId)?;
        let name = non_empty(name.into()).ok_or(SecretNumberError::InvalidPlayerName)?;
        self.require_connected()?;
        self.queue(Command::JoinRoom { room_id, name })
    }

    /// Ask the server to begin the pre-game countdown (host only).
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::NotInRoom`] if no room is known.
    pub fn start_game(&self) -> Result<()> {
        self.require_room()?;
        self.queue(Command::StartGame)
    }

    /// Submit a guess for the current turn.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::NotInRoom`] if no room is known, or
    /// [`SecretNumberError::InvalidGuess`] if `guess` falls outside the
    /// room's current range.
    pub fn make_guess(&self, guess: i32) -> Result<()> {
        let snapshot = self.state_rx.borrow();
        let room = snapshot
            .game_room
            .as_ref()
            .ok_or(SecretNumberError::NotInRoom)?;
        if guess < room.min_range || guess > room.max_range {
            return Err(SecretNumberError::InvalidGuess {
                guess,
                min: room.min_range,
                max: room.max_range,
            });
        }
        drop(snapshot);
        self.queue(Command::MakeGuess { guess })
    }

    /// Leave the current room and reset to the menu.
    ///
    /// Resets local state even when no room is known.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::NotConnected`] if the session loop
    /// has exited.
    pub fn quit_game(&self) -> Result<()> {
        self.queue(Command::QuitGame)
    }

    /// Return the room to the lobby for another round.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::NotInRoom`] if no room is known.
    pub fn restart_game(&self) -> Result<()> {
        self.require_room()?;
        self.queue(Command::RestartGame)
    }

    /// Remove another player from the room (host only).
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::InvalidPlayerName`] for an empty name
    /// and [`SecretNumberError::NotInRoom`] if no room is known.
    pub fn remove_player(&self, name: impl Into<String>) -> Result<()> {
        let name = non_empty(name.into()).ok_or(SecretNumberError::InvalidPlayerName)?;
        self.require_room()?;
        self.queue(Command::RemovePlayer { name })
    }

    /// Set (and persist) the player's display name.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::InvalidPlayerName`] for an empty name.
    pub fn set_player_name(&self, name: impl Into<String>) -> Result<()> {
        let name = non_empty(name.into()).ok_or(SecretNumberError::InvalidPlayerName)?;
        self.queue(Command::SetPlayerName { name })
    }

    /// Dismiss the current error, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SecretNumberError::NotConnected`] if the session loop
    /// has exited.
    pub fn clear_error(&self) -> Result<()> {
        self.queue(Command::ClearError)
    }

    /// Shut down the client, closing the transport and stopping the
    /// background task.
    pub async fn shutdown(&mut self) {
        debug!("SecretNumberClient: shutdown requested");

        // Signal the session loop to shut down gracefully.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the session loop with a timeout. If it doesn't exit in time,
        // abort it so the task cannot detach and run indefinitely.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The latest complete state snapshot.
    pub fn snapshot(&self) -> GameState {
        self.state_rx.borrow().clone()
    }

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().connected
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn require_connected(&self) -> Result<()> {
        if self.state_rx.borrow().connected {
            Ok(())
        } else {
            Err(SecretNumberError::NotConnected)
        }
    }

    fn require_room(&self) -> Result<()> {
        if self.state_rx.borrow().game_room.is_some() {
            Ok(())
        } else {
            Err(SecretNumberError::NotInRoom)
        }
    }

    /// Queue a command to the session loop.
    fn queue(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| SecretNumberError::NotConnected)
    }
}

/// Reject empty / whitespace-only input, trimming the survivors.
fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

impl std::fmt::Debug for SecretNumberClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretNumberClient")
            .field("connected", &self.is_connected())
            .field("phase", &self.state_rx.borrow().phase)
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SecretNumberClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // The only safe action is to abort the spawned task, which causes
        // the session loop future to be dropped immediately. The
        // `shutdown_tx` oneshot is intentionally *not* sent here: sending
        // it would trigger a graceful path that calls async `transport.close()`,
        // but there is no executor context to drive it inside `Drop`.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Everything the session loop owns: the transport, the state snapshot,
/// active subscriptions, and the timer slots.
struct Session<T: Transport> {
    transport: T,
    state: GameState,
    state_tx: watch::Sender<GameState>,
    subs: SubscriptionSet,
    timers: TimerScheduler,
    name_store: Option<NameStore>,
    config: SecretNumberConfig,
}

/// Background task that serializes every transition — inbound messages,
/// player commands, and timer firings — through one logical actor.
///
/// Exits when:
/// - The command channel closes (client handle dropped or shutdown called)
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
async fn session_loop<T: Transport>(
    mut session: Session<T>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("session loop started");

    session.apply(Transition::SetConnected(true));
    if let Some(name) = session.name_store.as_ref().and_then(NameStore::load) {
        session.apply(Transition::SetPlayerName(name));
    }

    // The session-wide topics: personal queue plus the general response
    // topic. Without these nothing else can ever arrive.
    if let Err(e) = session.subscribe_session_topics().await {
        error!("failed to subscribe session topics: {e}");
        session.disconnect(Some(format!("transport send error: {e}")));
        return;
    }

    loop {
        tokio::select! {
            // Branch 1: player action from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        debug!(?cmd, "handling player command");
                        if let Err(e) = session.handle_command(cmd).await {
                            error!("transport send error: {e}");
                            session.disconnect(Some(format!("transport send error: {e}")));
                            break;
                        }
                    }
                    // Command channel closed — client handle dropped.
                    None => {
                        debug!("command channel closed, shutting down session loop");
                        let _ = session.transport.close().await;
                        session.disconnect(None);
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = session.transport.close().await;
                session.disconnect(None);
                break;
            }

            // Branch 3: timer firing
            Some(event) = timer_rx.recv() => {
                if session.timers.is_live(&event) {
                    if let Err(e) = session.handle_timer(event).await {
                        error!("transport send error: {e}");
                        session.disconnect(Some(format!("transport send error: {e}")));
                        break;
                    }
                } else {
                    debug!(?event, "dropping stale timer event");
                }
            }

            // Branch 4: incoming push from the server
            incoming = session.transport.recv() => {
                match incoming {
                    Some(Ok(inbound)) => {
                        match serde_json::from_str::<ServerMessage>(&inbound.body) {
                            Ok(msg) => {
                                if let Err(e) = session.handle_server_message(msg).await {
                                    error!("transport send error: {e}");
                                    session.disconnect(Some(format!("transport send error: {e}")));
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(
                                    topic = %inbound.topic,
                                    "failed to deserialize server message: {e} — raw: {}",
                                    inbound.body
                                );
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        session.disconnect(Some(format!("transport receive error: {e}")));
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        session.disconnect(Some("Connection to server lost".into()));
                        break;
                    }
                }
            }
        }
    }

    debug!("session loop exited");
}

impl<T: Transport> Session<T> {
    /// Apply one transition and publish the resulting snapshot.
    fn apply(&mut self, transition: Transition) {
        self.state = std::mem::take(&mut self.state).apply(transition);
        self.state_tx.send_replace(self.state.clone());
    }

    /// Mark the session disconnected, surfacing `reason` when the cause
    /// was an error rather than a requested shutdown.
    fn disconnect(&mut self, reason: Option<String>) {
        self.timers.cancel_all();
        self.apply(Transition::SetConnected(false));
        if let Some(reason) = reason {
            self.apply(Transition::SetError(reason));
        }
    }

    async fn subscribe_session_topics(&mut self) -> Result<()> {
        self.ensure_subscribed(topics::PERSONAL_QUEUE).await?;
        self.ensure_subscribed(topics::GAME_RESPONSE).await
    }

    /// Subscribe `topic` unless it is already active (no duplicate
    /// delivery).
    async fn ensure_subscribed(&mut self, topic: &str) -> Result<()> {
        if self.subs.insert(topic) {
            debug!(topic, "subscribing");
            self.transport.subscribe(topic).await?;
        }
        Ok(())
    }

    /// Unsubscribe `topic` if it is active. Best-effort: teardown
    /// failures are logged, not fatal, because the state reset that
    /// follows already guards against stale deliveries.
    async fn drop_subscription(&mut self, topic: &str) {
        if self.subs.remove(topic) {
            debug!(topic, "unsubscribing");
            if let Err(e) = self.transport.unsubscribe(topic).await {
                warn!(topic, "failed to unsubscribe: {e}");
            }
        }
    }

    async fn send_request(&mut self, request: ClientRequest) -> Result<()> {
        debug!(destination = request.destination(), "sending request");
        let body = serde_json::to_string(&request)?;
        self.transport.send(request.destination(), body).await
    }

    /// The personal topic of the local player, if the roster knows them.
    fn local_player_topic(&self) -> Option<String> {
        let room = self.state.game_room.as_ref()?;
        room.players
            .iter()
            .find(|p| p.name == self.state.player_name)
            .map(|p| topics::player_topic(&p.id))
    }

    fn persist_name(&self, name: &str) {
        if let Some(store) = &self.name_store {
            store.save(name);
        }
    }

    // ── Player commands ─────────────────────────────────────────────

    async fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::CreateRoom { name } => {
                self.persist_name(&name);
                self.apply(Transition::SetPlayerName(name.clone()));
                // Optimistic personal topic: subscribed before the server
                // assigns the real player id, so the creation response
                // cannot be missed. The real topic is added on ROOM_CREATED.
                let temp_player_id = format!("temp-{}", Uuid::new_v4());
                self.ensure_subscribed(&topics::player_topic(&temp_player_id))
                    .await?;
                self.send_request(ClientRequest::CreateRoom {
                    player_name: name,
                    temp_player_id,
                })
                .await
            }
            Command::JoinRoom { room_id, name } => {
                self.persist_name(&name);
                self.apply(Transition::SetPlayerName(name.clone()));
                // Room topic first, then the join request: no room
                // broadcast can slip between the two.
                self.ensure_subscribed(&topics::room_topic(&room_id)).await?;
                self.send_request(ClientRequest::JoinRoom {
                    room_id,
                    player_name: name,
                })
                .await?;
                self.timers.start_join_timeout(self.config.join_timeout);
                Ok(())
            }
            Command::StartGame => {
                if let Some(room_id) = self.state.game_room.as_ref().map(|r| r.room_id.clone()) {
                    self.send_request(ClientRequest::StartCountdown { room_id })
                        .await?;
                }
                Ok(())
            }
            Command::MakeGuess { guess } => {
                if let Some(room_id) = self.state.game_room.as_ref().map(|r| r.room_id.clone()) {
                    self.send_request(ClientRequest::MakeGuess { room_id, guess })
                        .await?;
                }
                Ok(())
            }
            Command::QuitGame => {
                if let Some(room_id) = self.state.game_room.as_ref().map(|r| r.room_id.clone()) {
                    self.send_request(ClientRequest::QuitGame {
                        room_id: room_id.clone(),
                        player_name: self.state.player_name.clone(),
                    })
                    .await?;
                    // Tear down room subscriptions before the reset so no
                    // further messages are processed against a stale room.
                    if let Some(topic) = self.local_player_topic() {
                        self.drop_subscription(&topic).await;
                    }
                    self.drop_subscription(&topics::room_topic(&room_id)).await;
                }
                self.timers.cancel_all();
                self.apply(Transition::Reset);
                Ok(())
            }
            Command::RestartGame => {
                // A manual restart supersedes the finished screen's
                // auto-return immediately.
                self.timers.cancel_auto_return();
                if let Some(room_id) = self.state.game_room.as_ref().map(|r| r.room_id.clone()) {
                    self.send_request(ClientRequest::RestartGame { room_id })
                        .await?;
                }
                Ok(())
            }
            Command::RemovePlayer { name } => {
                if let Some(room_id) = self.state.game_room.as_ref().map(|r| r.room_id.clone()) {
                    self.send_request(ClientRequest::RemovePlayer {
                        room_id,
                        player_name: name,
                    })
                    .await?;
                }
                Ok(())
            }
            Command::SetPlayerName { name } => {
                self.persist_name(&name);
                self.apply(Transition::SetPlayerName(name));
                Ok(())
            }
            Command::ClearError => {
                self.apply(Transition::ClearError);
                Ok(())
            }
        }
    }

    // ── Message router ──────────────────────────────────────────────

    /// Map one inbound message to its transition sequence and
    /// subscription side effects (the protocol state machine).
    async fn handle_server_message(&mut self, msg: ServerMessage) -> Result<()> {
        let prev_phase = self.state.phase;

        match msg {
            ServerMessage::RoomCreated { game_room } => {
                debug!(room = %game_room.room_id, "room created");
                self.ensure_subscribed(&topics::room_topic(&game_room.room_id))
                    .await?;
                self.ensure_subscribed(&topics::player_topic(&game_room.host_id))
                    .await?;
                self.apply(Transition::SetGameRoom(game_room));
                self.apply(Transition::SetPhase(GamePhase::Lobby));
            }
            ServerMessage::PlayerJoined { game_room } => {
                self.timers.cancel_join_timeout();
                // Guard: a roster update must only bounce THIS client into
                // the lobby on its own first confirmation. A player already
                // mid-game keeps their phase when someone else joins.
                let first_confirmation =
                    self.state.phase == GamePhase::Menu || self.state.game_room.is_none();
                if first_confirmation {
                    if let Some(player) = game_room
                        .players
                        .iter()
                        .find(|p| p.name == self.state.player_name)
                    {
                        self.ensure_subscribed(&topics::player_topic(&player.id))
                            .await?;
                    }
                }
                self.apply(Transition::SetGameRoom(game_room));
                if first_confirmation {
                    self.apply(Transition::SetPhase(GamePhase::Lobby));
                }
            }
            ServerMessage::RoomJoined { game_room } => {
                self.timers.cancel_join_timeout();
                if let Some(player) = game_room
                    .players
                    .iter()
                    .find(|p| p.name == self.state.player_name)
                {
                    self.ensure_subscribed(&topics::player_topic(&player.id))
                        .await?;
                }
                self.apply(Transition::SetGameRoom(game_room));
                self.apply(Transition::SetPhase(GamePhase::Lobby));
            }
            ServerMessage::GameStartingCountdown { game_room } => {
                debug!(room = %game_room.room_id, "pre-game countdown starting");
                self.apply(Transition::SetGameRoom(game_room));
                self.apply(Transition::StartCountdown(self.config.countdown_start));
                self.timers
                    .start_countdown(self.config.countdown_start, self.config.countdown_interval);
            }
            ServerMessage::GameStarted { game_room } => {
                if let Some(secret) = game_room.secret_number {
                    debug!(secret, "game started");
                }
                // GAME_STARTED supersedes a countdown still in flight;
                // EndCountdown is idempotent when none was running.
                self.timers.cancel_countdown();
                self.timers.cancel_forced_guess();
                self.apply(Transition::EndCountdown);
                self.apply(Transition::ClearHistory);
                self.apply(Transition::SetGameRoom(game_room));
                self.apply(Transition::SetPhase(GamePhase::Playing));
            }
            ServerMessage::GuessMade {
                game_room,
                last_turn,
            } => {
                // Any newer guess supersedes a pending forced guess.
                self.timers.cancel_forced_guess();
                let finished = game_room.state == RoomState::Finished;
                let single_candidate = game_room.single_candidate_left();
                self.apply(Transition::SetGameRoom(game_room));
                self.apply(Transition::AddTurn(last_turn));
                if finished {
                    self.apply(Transition::SetPhase(GamePhase::Finished));
                } else if single_candidate {
                    // The player now on turn is guaranteed to lose; the
                    // client paces the forced move, not the server.
                    self.timers
                        .start_forced_guess(self.config.forced_guess_delay);
                }
            }
            ServerMessage::PlayerQuit { game_room }
            | ServerMessage::PlayerRemoved { game_room } => {
                self.apply(Transition::SetGameRoom(game_room));
            }
            ServerMessage::GameRestarted { game_room } => {
                debug!(room = %game_room.room_id, "game restarted, returning to lobby");
                self.apply(Transition::ClearHistory);
                self.apply(Transition::SetGameRoom(game_room));
                self.apply(Transition::SetPhase(GamePhase::Lobby));
            }
            ServerMessage::PlayerKicked { message } => {
                warn!("removed from the game by the host");
                // Teardown precedes the reset so nothing further is
                // processed against the stale room.
                if let Some(topic) = self.local_player_topic() {
                    self.drop_subscription(&topic).await;
                }
                if let Some(room_id) = self.state.game_room.as_ref().map(|r| r.room_id.clone()) {
                    self.drop_subscription(&topics::room_topic(&room_id)).await;
                }
                self.timers.cancel_all();
                self.apply(Transition::SetError(message));
                self.apply(Transition::Reset);
            }
            ServerMessage::Error { message } => {
                debug!("server error: {message}");
                self.apply(Transition::SetError(message));
            }
            ServerMessage::Unknown => {
                debug!("ignoring unrecognized server message");
            }
        }

        self.handle_phase_edge(prev_phase);
        Ok(())
    }

    /// The auto-return timer is owned by the finished phase: entering it
    /// arms the timer, leaving it for any reason disarms it.
    fn handle_phase_edge(&mut self, prev_phase: GamePhase) {
        let phase = self.state.phase;
        if prev_phase != GamePhase::Finished && phase == GamePhase::Finished {
            self.timers.start_auto_return(self.config.auto_return_delay);
        } else if prev_phase == GamePhase::Finished && phase != GamePhase::Finished {
            self.timers.cancel_auto_return();
        }
    }

    // ── Timer firings ───────────────────────────────────────────────

    /// Act on a live timer event. Every arm re-checks the current state
    /// before acting: a firing that raced a cancellation degrades to a
    /// no-op.
    async fn handle_timer(&mut self, event: TimerEvent) -> Result<()> {
        match event {
            TimerEvent::CountdownTick { remaining, .. } => {
                self.apply(Transition::UpdateCountdown(remaining));
            }
            TimerEvent::CountdownFinished { .. } => {
                self.apply(Transition::EndCountdown);
            }
            TimerEvent::ForcedGuessDue { .. } => {
                let request = match self.state.game_room.as_ref() {
                    Some(room)
                        if self.state.phase == GamePhase::Playing
                            && room.state != RoomState::Finished
                            && room.single_candidate_left() =>
                    {
                        Some(ClientRequest::MakeGuess {
                            room_id: room.room_id.clone(),
                            guess: room.min_range,
                        })
                    }
                    _ => None,
                };
                if let Some(request) = request {
                    self.send_request(request).await?;
                }
            }
            TimerEvent::JoinTimeoutExpired { .. } => {
                if self.state.phase == GamePhase::Menu && self.state.game_room.is_none() {
                    self.apply(Transition::SetError(ROOM_NOT_FOUND_ERROR.to_owned()));
                }
            }
            TimerEvent::AutoReturnDue { .. } => {
                let request = self
                    .state
                    .game_room
                    .as_ref()
                    .filter(|_| self.state.phase == GamePhase::Finished)
                    .map(|room| ClientRequest::RestartGame {
                        room_id: room.room_id.clone(),
                    });
                if let Some(request) = request {
                    self.send_request(request).await?;
                }
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::transport::Inbound;
    use async_trait::async_trait;

    /// Transport that accepts everything and never delivers.
    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(&mut self, _destination: &str, _body: String) -> Result<()> {
            Ok(())
        }

        async fn subscribe(&mut self, _topic: &str) -> Result<()> {
            Ok(())
        }

        async fn unsubscribe(&mut self, _topic: &str) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<Inbound>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    async fn started_client() -> (SecretNumberClient, watch::Receiver<GameState>) {
        let (client, mut state) = SecretNumberClient::start(
            NullTransport,
            SecretNumberConfig::new(),
        );
        // Wait for the loop to mark the session connected.
        while !state.borrow().connected {
            state.changed().await.unwrap();
        }
        (client, state)
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = SecretNumberConfig::new();
        assert_eq!(config.countdown_start, 5);
        assert_eq!(config.countdown_interval, Duration::from_secs(1));
        assert_eq!(config.forced_guess_delay, Duration::from_secs(3));
        assert_eq!(config.join_timeout, Duration::from_secs(5));
        assert_eq!(config.auto_return_delay, Duration::from_secs(20));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert!(config.name_store_path.is_none());
    }

    #[tokio::test]
    async fn config_builder_methods() {
        let config = SecretNumberConfig::new()
            .with_countdown_start(3)
            .with_countdown_interval(Duration::from_millis(10))
            .with_forced_guess_delay(Duration::from_millis(30))
            .with_join_timeout(Duration::from_millis(50))
            .with_auto_return_delay(Duration::from_millis(200))
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_name_store_path("/tmp/name");
        assert_eq!(config.countdown_start, 3);
        assert_eq!(config.countdown_interval, Duration::from_millis(10));
        assert_eq!(config.forced_guess_delay, Duration::from_millis(30));
        assert_eq!(config.join_timeout, Duration::from_millis(50));
        assert_eq!(config.auto_return_delay, Duration::from_millis(200));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert!(config.name_store_path.is_some());
    }

    #[tokio::test]
    async fn create_room_rejects_empty_name() {
        let (mut client, _state) = started_client().await;
        let result = client.create_room("   ");
        assert!(matches!(result, Err(SecretNumberError::InvalidPlayerName)));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn join_room_rejects_empty_room_id() {
        let (mut client, _state) = started_client().await;
        let result = client.join_room("", "Alice");
        assert!(matches!(result, Err(SecretNumberError::InvalidRoomId)));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn room_actions_require_a_room() {
        let (mut client, _state) = started_client().await;
        assert!(matches!(
            client.start_game(),
            Err(SecretNumberError::NotInRoom)
        ));
        assert!(matches!(
            client.make_guess(10),
            Err(SecretNumberError::NotInRoom)
        ));
        assert!(matches!(
            client.restart_game(),
            Err(SecretNumberError::NotInRoom)
        ));
        assert!(matches!(
            client.remove_player("Bob"),
            Err(SecretNumberError::NotInRoom)
        ));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn create_room_requires_connection() {
        // No started loop: the watch still holds the initial state with
        // `connected == false`.
        let (client, _state) = SecretNumberClient::start(
            NullTransport,
            SecretNumberConfig::new(),
        );
        // Connection may establish quickly; only assert when still down.
        if !client.is_connected() {
            assert!(matches!(
                client.create_room("Alice"),
                Err(SecretNumberError::NotConnected)
            ));
        }
    }

    #[tokio::test]
    async fn snapshot_starts_in_menu() {
        let (mut client, _state) = started_client().await;
        let snapshot = client.snapshot();
        assert_eq!(snapshot.phase, GamePhase::Menu);
        assert!(snapshot.game_room.is_none());
        assert!(snapshot.game_history.is_empty());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn actions_fail_after_shutdown() {
        let (mut client, _state) = started_client().await;
        client.shutdown().await;
        let result = client.quit_game();
        assert!(matches!(result, Err(SecretNumberError::NotConnected)));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (mut client, _state) = started_client().await;
        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (mut client, _state) = started_client().await;
        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("SecretNumberClient"));
        assert!(debug_str.contains("connected"));
        client.shutdown().await;
    }
}
