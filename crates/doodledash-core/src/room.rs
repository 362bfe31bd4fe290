use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::{Player, UserId};

/// Globally-unique room identifier.
pub type RoomId = Uuid;

/// Length of the human-facing display code.
pub const DISPLAY_CODE_LEN: usize = 4;

/// How many times to re-roll a display code on collision before accepting
/// the residual collision probability.
pub const DISPLAY_CODE_MAX_ATTEMPTS: usize = 20;

/// Where a room sits in its lifecycle.
///
/// Game end is not a resting phase: final standings are broadcast and the
/// room returns straight to `Waiting`, ready for a new game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomPhase {
    Waiting,
    WordSelection,
    Drawing,
    RoundEnd,
}

/// Per-room game settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    /// Drawing-phase duration in seconds.
    pub round_time_seconds: u64,
}

/// Latitude/longitude pair used for proximity filtering of room listings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One drawer's turn. Replaced wholesale at every turn transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// 1-indexed across the whole game.
    pub round_number: u32,
    pub drawer_user_id: UserId,
    /// None until the drawer picks (or the selection window auto-picks).
    pub word: Option<String>,
    /// The words offered to the drawer; selection is validated against these.
    pub word_choices: Vec<String>,
    /// Unix ms deadline of the current phase timer.
    pub timer_ends_at: u64,
    /// Unix ms when the drawing phase began; scoring baseline.
    pub drawing_start_time: u64,
    /// Set while the round is frozen because the drawer dropped; holds the
    /// unexpired part of the phase window for resumption.
    pub paused_remaining_ms: Option<u64>,
}

impl Round {
    pub fn new(round_number: u32, drawer_user_id: UserId, word_choices: Vec<String>) -> Self {
        Self {
            round_number,
            drawer_user_id,
            word: None,
            word_choices,
            timer_ends_at: 0,
            drawing_start_time: 0,
            paused_remaining_ms: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining_ms.is_some()
    }
}

/// One game instance: players, category, turn state.
///
/// The room exclusively owns its players and its current round. It is
/// deliberately not `Serialize` — clients only ever see a [`RoomSnapshot`],
/// which never carries the secret word.
#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: RoomId,
    pub display_code: String,
    pub category: String,
    pub creator_user_id: UserId,
    pub location: GeoPoint,
    pub phase: RoomPhase,
    pub created_at: u64,
    /// Order matters: it determines drawer rotation.
    pub players: Vec<Player>,
    pub current_round: Option<Round>,
    pub max_players: usize,
    pub settings: RoomSettings,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        display_code: String,
        category: String,
        creator: Player,
        location: GeoPoint,
        max_players: usize,
        settings: RoomSettings,
    ) -> Self {
        Self {
            room_id,
            display_code,
            category,
            creator_user_id: creator.user_id,
            location,
            phase: RoomPhase::Waiting,
            created_at: crate::time::now_ms(),
            players: vec![creator],
            current_round: None,
            max_players,
            settings,
        }
    }

    /// A room is "active" (discoverable, joinable for a fresh game) while in
    /// the waiting phase.
    pub fn is_waiting(&self) -> bool {
        self.phase == RoomPhase::Waiting
    }

    pub fn player(&self, user_id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn player_mut(&mut self, user_id: UserId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Currently-connected players, in rotation order.
    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.connected)
    }

    /// Every non-admin player has toggled ready.
    pub fn all_guests_ready(&self) -> bool {
        self.players.iter().filter(|p| !p.is_admin).all(|p| p.ready)
    }

    /// The drawer of the current round, if a round is running and the
    /// player is still in the room.
    pub fn drawer(&self) -> Option<&Player> {
        let round = self.current_round.as_ref()?;
        self.player(round.drawer_user_id)
    }

    /// Client-safe view of this room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id,
            display_code: self.display_code.clone(),
            category: self.category.clone(),
            creator_user_id: self.creator_user_id,
            location: self.location,
            active: self.is_waiting(),
            phase: self.phase,
            created_at: self.created_at,
            players: self.players.clone(),
            current_round: self.current_round.as_ref().map(|r| RoundSnapshot {
                round_number: r.round_number,
                drawer_user_id: r.drawer_user_id,
                word_length: r.word.as_ref().map(|w| w.chars().count()),
                timer_ends_at: r.timer_ends_at,
                paused: r.is_paused(),
            }),
            max_players: self.max_players,
            settings: self.settings,
        }
    }
}

/// What clients see of a room. The current word is reduced to its length so
/// guessers can render blanks without the answer ever crossing the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub display_code: String,
    pub category: String,
    pub creator_user_id: UserId,
    pub location: GeoPoint,
    pub active: bool,
    pub phase: RoomPhase,
    pub created_at: u64,
    pub players: Vec<Player>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<RoundSnapshot>,
    pub max_players: usize,
    pub settings: RoomSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub round_number: u32,
    pub drawer_user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_length: Option<usize>,
    pub timer_ends_at: u64,
    pub paused: bool,
}

/// Generate a display code: 4 uppercase letters, drawn independently and
/// uniformly. `is_taken` reports collisions with live rooms; after
/// [`DISPLAY_CODE_MAX_ATTEMPTS`] re-rolls the last candidate is accepted
/// rather than failing room creation.
pub fn generate_display_code(is_taken: impl Fn(&str) -> bool) -> String {
    let mut code = random_code();
    let mut attempts = 0;
    while is_taken(&code) && attempts < DISPLAY_CODE_MAX_ATTEMPTS {
        code = random_code();
        attempts += 1;
    }
    code
}

fn random_code() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..DISPLAY_CODE_LEN)
        .map(|_| rng.random_range(b'A'..=b'Z') as char)
        .collect()
}

/// A code is exactly 4 uppercase ASCII letters.
pub fn is_valid_display_code(code: &str) -> bool {
    code.len() == DISPLAY_CODE_LEN && code.bytes().all(|b| b.is_ascii_uppercase())
}
