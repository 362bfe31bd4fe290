use serde::{Deserialize, Serialize};

use crate::player::{Player, UserId};
use crate::room::{RoomId, RoomSnapshot};

/// One opaque canvas event, relayed verbatim from the drawer to everyone
/// else. Coordinates are normalized to a 0–100 percentage scale so clients
/// are resolution-independent; the server never interprets stroke content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawingEvent {
    Stroke {
        color: String,
        width: f32,
        points: Vec<StrokePoint>,
    },
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
}

/// A player's standing, as sent in round-end and game-end summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub user_id: UserId,
    pub username: String,
    pub score: i64,
}

/// Messages a client sends over its live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Must be the first frame on every connection; binds the connection to
    /// a session minted by the REST join/create endpoints.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        session_token: String,
    },
    PlayerReady {
        ready: bool,
    },
    #[serde(rename_all = "camelCase")]
    StartGame {
        #[serde(default)]
        force_start: bool,
    },
    SelectWord {
        word: String,
    },
    DrawingEvent {
        event: DrawingEvent,
    },
    Guess {
        text: String,
    },
    /// Waiting-room chat. During a round, guesses double as chat.
    ChatMessage {
        text: String,
    },
    LeaveRoom,
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    RoomUpdate {
        room: RoomSnapshot,
    },
    PlayerJoined {
        player: Player,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    RoundStart {
        round_number: u32,
        total_rounds: u32,
        drawer_user_id: UserId,
    },
    /// The drawer receives the actual word choices; everyone else gets an
    /// empty list.
    #[serde(rename_all = "camelCase")]
    WordSelectionStart {
        words: Vec<String>,
        time_limit: u64,
        timer_ends_at: u64,
        round_number: u32,
        total_rounds: u32,
    },
    /// The drawer receives the word; everyone else only its length.
    #[serde(rename_all = "camelCase")]
    WordSelected {
        #[serde(skip_serializing_if = "Option::is_none")]
        word: Option<String>,
        word_length: usize,
        drawer_user_id: UserId,
        time_limit: u64,
        timer_ends_at: u64,
    },
    WordSelectionTimeout,
    DrawingEvent {
        event: DrawingEvent,
    },
    #[serde(rename_all = "camelCase")]
    CorrectGuess {
        user_id: UserId,
        username: String,
        points_awarded: i64,
        position: usize,
        total_players: usize,
        drawer_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        user_id: UserId,
        username: String,
        text: String,
        timestamp: u64,
    },
    RoundEnd {
        word: String,
        scores: Vec<ScoreEntry>,
    },
    DrawingTimeout {
        word: String,
    },
    #[serde(rename_all = "camelCase")]
    GameEnd {
        final_scores: Vec<ScoreEntry>,
    },
    Error {
        message: String,
    },
}
