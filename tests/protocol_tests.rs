#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Protocol serialization tests for the Secret Number client.
//!
//! Verifies round-trip serialization of every protocol type, the exact
//! camelCase / SCREAMING_SNAKE_CASE wire casing, the destination mapping
//! of every outbound request, and JSON fixtures matching real server
//! envelopes — including forward compatibility with unknown
//! discriminants.

use secret_number_client::protocol::{
    ClientRequest, Player, Room, RoomState, ServerMessage, Turn,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

/// Serialize `val` to JSON, then deserialize back to `T` and return it.
fn round_trip<T: serde::Serialize + serde::de::DeserializeOwned>(val: &T) -> T {
    let json = serde_json::to_string(val).expect("serialize");
    serde_json::from_str(&json).expect("deserialize")
}

fn sample_room() -> Room {
    Room {
        room_id: "R1".into(),
        host_id: "P1".into(),
        players: vec![
            Player {
                id: "P1".into(),
                name: "Alice".into(),
                is_host: true,
            },
            Player {
                id: "P2".into(),
                name: "Bob".into(),
                is_host: false,
            },
        ],
        current_player_index: 1,
        min_range: 10,
        max_range: 42,
        state: RoomState::Playing,
        secret_number: None,
    }
}

// ════════════════════════════════════════════════════════════════════
// Value types
// ════════════════════════════════════════════════════════════════════

#[test]
fn room_round_trip() {
    let room = sample_room();
    assert_eq!(round_trip(&room), room);
}

#[test]
fn room_serializes_camel_case_fields() {
    let json = serde_json::to_value(sample_room()).unwrap();
    assert_eq!(json["roomId"], "R1");
    assert_eq!(json["hostId"], "P1");
    assert_eq!(json["currentPlayerIndex"], 1);
    assert_eq!(json["minRange"], 10);
    assert_eq!(json["maxRange"], 42);
    assert_eq!(json["state"], "PLAYING");
    assert_eq!(json["players"][0]["isHost"], true);
    // Absent secret number must not appear on the wire.
    assert!(json.get("secretNumber").is_none());
}

#[test]
fn room_deserializes_transient_secret_number() {
    let json = r#"{
        "roomId": "R1", "hostId": "P1",
        "players": [{"id": "P1", "name": "Alice", "isHost": true}],
        "currentPlayerIndex": 0, "minRange": 1, "maxRange": 99,
        "state": "PLAYING", "secretNumber": 57
    }"#;
    let room: Room = serde_json::from_str(json).unwrap();
    assert_eq!(room.secret_number, Some(57));
}

#[test]
fn room_state_uses_screaming_snake_case() {
    assert_eq!(
        serde_json::to_string(&RoomState::Lobby).unwrap(),
        r#""LOBBY""#
    );
    assert_eq!(
        serde_json::to_string(&RoomState::Playing).unwrap(),
        r#""PLAYING""#
    );
    assert_eq!(
        serde_json::to_string(&RoomState::Finished).unwrap(),
        r#""FINISHED""#
    );
}

#[test]
fn turn_round_trip() {
    let turn = Turn {
        player_name: "Bob".into(),
        guess: 42,
        result: "lost".into(),
    };
    assert_eq!(round_trip(&turn), turn);

    let json = serde_json::to_value(&turn).unwrap();
    assert_eq!(json["playerName"], "Bob");
    assert_eq!(json["guess"], 42);
    assert_eq!(json["result"], "lost");
}

#[test]
fn current_player_accessor_handles_out_of_range_index() {
    let mut room = sample_room();
    assert_eq!(room.current_player().map(|p| p.name.as_str()), Some("Bob"));

    room.current_player_index = 99;
    assert!(room.current_player().is_none());
}

#[test]
fn single_candidate_detection() {
    let mut room = sample_room();
    assert!(!room.single_candidate_left());
    room.min_range = 42;
    room.max_range = 42;
    assert!(room.single_candidate_left());
}

// ════════════════════════════════════════════════════════════════════
// ServerMessage envelope fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn room_created_envelope_deserializes() {
    let json = r#"{
        "type": "ROOM_CREATED",
        "gameRoom": {
            "roomId": "R1", "hostId": "P1",
            "players": [{"id": "P1", "name": "Alice", "isHost": true}],
            "currentPlayerIndex": 0, "minRange": 1, "maxRange": 99,
            "state": "LOBBY"
        }
    }"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    if let ServerMessage::RoomCreated { game_room } = msg {
        assert_eq!(game_room.room_id, "R1");
        assert_eq!(game_room.host_id, "P1");
        assert_eq!(game_room.state, RoomState::Lobby);
    } else {
        panic!("expected RoomCreated variant");
    }
}

#[test]
fn guess_made_envelope_deserializes() {
    let json = r#"{
        "type": "GUESS_MADE",
        "gameRoom": {
            "roomId": "R1", "hostId": "P1",
            "players": [{"id": "P1", "name": "Alice", "isHost": true}],
            "currentPlayerIndex": 0, "minRange": 42, "maxRange": 42,
            "state": "PLAYING"
        },
        "lastTurn": {"playerName": "Alice", "guess": 41, "result": "safe"}
    }"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    if let ServerMessage::GuessMade {
        game_room,
        last_turn,
    } = msg
    {
        assert!(game_room.single_candidate_left());
        assert_eq!(last_turn.player_name, "Alice");
        assert_eq!(last_turn.guess, 41);
        assert_eq!(last_turn.result, "safe");
    } else {
        panic!("expected GuessMade variant");
    }
}

#[test]
fn player_kicked_envelope_deserializes() {
    let json = r#"{"type": "PLAYER_KICKED", "message": "You have been removed by the host"}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    if let ServerMessage::PlayerKicked { message } = msg {
        assert_eq!(message, "You have been removed by the host");
    } else {
        panic!("expected PlayerKicked variant");
    }
}

#[test]
fn error_envelope_deserializes() {
    let json = r#"{"type": "ERROR", "message": "Room is full"}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    if let ServerMessage::Error { message } = msg {
        assert_eq!(message, "Room is full");
    } else {
        panic!("expected Error variant");
    }
}

#[test]
fn every_room_bearing_discriminant_deserializes() {
    let room = r#"{
        "roomId": "R1", "hostId": "P1",
        "players": [{"id": "P1", "name": "Alice", "isHost": true}],
        "currentPlayerIndex": 0, "minRange": 1, "maxRange": 99,
        "state": "LOBBY"
    }"#;
    for discriminant in [
        "ROOM_CREATED",
        "PLAYER_JOINED",
        "ROOM_JOINED",
        "GAME_STARTING_COUNTDOWN",
        "GAME_STARTED",
        "PLAYER_QUIT",
        "GAME_RESTARTED",
        "PLAYER_REMOVED",
    ] {
        let json = format!(r#"{{"type": "{discriminant}", "gameRoom": {room}}}"#);
        let msg: ServerMessage = serde_json::from_str(&json)
            .unwrap_or_else(|e| panic!("{discriminant} failed to deserialize: {e}"));
        assert!(
            !matches!(msg, ServerMessage::Unknown),
            "{discriminant} fell through to Unknown"
        );
    }
}

#[test]
fn unknown_discriminant_is_representable_not_an_error() {
    let json = r#"{"type": "SPECTATOR_WAVE", "gameRoom": null, "extra": 1}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(msg, ServerMessage::Unknown));
}

#[test]
fn game_started_envelope_carries_secret_number() {
    let json = r#"{
        "type": "GAME_STARTED",
        "gameRoom": {
            "roomId": "R1", "hostId": "P1",
            "players": [{"id": "P1", "name": "Alice", "isHost": true}],
            "currentPlayerIndex": 0, "minRange": 1, "maxRange": 99,
            "state": "PLAYING", "secretNumber": 57
        }
    }"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    if let ServerMessage::GameStarted { game_room } = msg {
        assert_eq!(game_room.secret_number, Some(57));
    } else {
        panic!("expected GameStarted variant");
    }
}

// ════════════════════════════════════════════════════════════════════
// ClientRequest serialization
// ════════════════════════════════════════════════════════════════════

#[test]
fn create_room_request() {
    let req = ClientRequest::CreateRoom {
        player_name: "Alice".into(),
        temp_player_id: "temp-123".into(),
    };
    assert_eq!(req.destination(), "/app/createRoom");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "playerName": "Alice", "tempPlayerId": "temp-123" })
    );
}

#[test]
fn join_room_request() {
    let req = ClientRequest::JoinRoom {
        room_id: "R1".into(),
        player_name: "Bob".into(),
    };
    assert_eq!(req.destination(), "/app/joinRoom");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "roomId": "R1", "playerName": "Bob" })
    );
}

#[test]
fn start_countdown_request() {
    let req = ClientRequest::StartCountdown {
        room_id: "R1".into(),
    };
    assert_eq!(req.destination(), "/app/startGameCountdown");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json, serde_json::json!({ "roomId": "R1" }));
}

#[test]
fn make_guess_request() {
    let req = ClientRequest::MakeGuess {
        room_id: "R1".into(),
        guess: 42,
    };
    assert_eq!(req.destination(), "/app/makeGuess");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json, serde_json::json!({ "roomId": "R1", "guess": 42 }));
}

#[test]
fn quit_game_request() {
    let req = ClientRequest::QuitGame {
        room_id: "R1".into(),
        player_name: "Alice".into(),
    };
    assert_eq!(req.destination(), "/app/quitGame");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "roomId": "R1", "playerName": "Alice" })
    );
}

#[test]
fn restart_game_request() {
    let req = ClientRequest::RestartGame {
        room_id: "R1".into(),
    };
    assert_eq!(req.destination(), "/app/restartGame");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json, serde_json::json!({ "roomId": "R1" }));
}

#[test]
fn remove_player_request() {
    let req = ClientRequest::RemovePlayer {
        room_id: "R1".into(),
        player_name: "Bob".into(),
    };
    assert_eq!(req.destination(), "/app/removePlayer");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "roomId": "R1", "playerName": "Bob" })
    );
}
