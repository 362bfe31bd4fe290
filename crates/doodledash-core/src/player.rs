use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistent player identity, stable across reconnects.
pub type UserId = Uuid;

/// Identifies one live WebSocket connection. Reassigned on every reconnect;
/// never exposed to clients.
pub type ConnectionId = Uuid;

/// A participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    /// Exactly one player per room carries this flag: the creator.
    pub is_admin: bool,
    /// Meaningful only for non-admin players while the room is waiting.
    pub ready: bool,
    pub score: i64,
    pub connected: bool,
    /// Whether this player has guessed correctly in the current round.
    #[serde(default)]
    pub has_guessed: bool,
    /// When the correct guess landed (Unix ms), for scoring position/speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guess_timestamp: Option<u64>,
    /// Live connection currently representing this player. Server-internal.
    #[serde(skip)]
    pub connection_id: Option<ConnectionId>,
}

impl Player {
    /// Create the room creator. Admins have no ready flag to toggle.
    pub fn admin(user_id: UserId, username: impl Into<String>) -> Self {
        Self::new(user_id, username, true, false)
    }

    /// Create a joining guest. Guests default to ready: joining a room
    /// implies willingness to play.
    pub fn guest(user_id: UserId, username: impl Into<String>) -> Self {
        Self::new(user_id, username, false, true)
    }

    fn new(user_id: UserId, username: impl Into<String>, is_admin: bool, ready: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin,
            ready,
            score: 0,
            connected: false,
            has_guessed: false,
            guess_timestamp: None,
            connection_id: None,
        }
    }

    /// Clear per-round transient state at the start of a drawing phase.
    pub fn reset_round_state(&mut self) {
        self.has_guessed = false;
        self.guess_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_starts_unready_guest_starts_ready() {
        let a = Player::admin(Uuid::new_v4(), "Alice");
        assert!(a.is_admin);
        assert!(!a.ready);

        let b = Player::guest(Uuid::new_v4(), "Bob");
        assert!(!b.is_admin);
        assert!(b.ready);
    }

    #[test]
    fn reset_clears_guess_state() {
        let mut p = Player::guest(Uuid::new_v4(), "Bob");
        p.has_guessed = true;
        p.guess_timestamp = Some(12345);
        p.reset_round_state();
        assert!(!p.has_guessed);
        assert!(p.guess_timestamp.is_none());
    }

    #[test]
    fn connection_id_not_serialized() {
        let mut p = Player::guest(Uuid::new_v4(), "Bob");
        p.connection_id = Some(Uuid::new_v4());
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("connectionId"));
        assert!(json.contains("userId"));
    }
}
