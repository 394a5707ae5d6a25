//! Topic naming for the Secret Number publish-subscribe channels.
//!
//! Four topic families deliver the same [`ServerMessage`](crate::protocol::ServerMessage)
//! envelope: the per-session personal queue, the general response topic,
//! one topic per room, and one topic per player.

/// Personal per-session queue, subscribed for the whole session.
pub const PERSONAL_QUEUE: &str = "/user/queue/gameUpdate";

/// General response topic, subscribed for the whole session.
pub const GAME_RESPONSE: &str = "/topic/gameResponse";

/// Topic carrying broadcasts for one room.
pub fn room_topic(room_id: &str) -> String {
    format!("/topic/room.{room_id}")
}

/// Topic carrying messages addressed to one player.
pub fn player_topic(player_id: &str) -> String {
    format!("/topic/user.{player_id}")
}
