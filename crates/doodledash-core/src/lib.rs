pub mod geo;
pub mod net;
pub mod player;
pub mod room;
pub mod scoring;
pub mod time;
pub mod words;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use uuid::Uuid;

    use crate::player::Player;
    use crate::room::{GeoPoint, Room, RoomSettings};

    /// Create `n` connected test players; the first is the admin.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| {
                let mut p = if i == 0 {
                    Player::admin(Uuid::new_v4(), format!("Player{}", i + 1))
                } else {
                    Player::guest(Uuid::new_v4(), format!("Player{}", i + 1))
                };
                p.connected = true;
                p
            })
            .collect()
    }

    /// Create a waiting room populated with `n` connected players.
    pub fn make_room(n: usize) -> Room {
        let mut players = make_players(n);
        let admin = players.remove(0);
        let mut room = Room::new(
            Uuid::new_v4(),
            "TEST".to_string(),
            "Objects".to_string(),
            admin,
            GeoPoint {
                lat: 11.2488,
                lon: 75.7839,
            },
            10,
            RoomSettings {
                round_time_seconds: 80,
            },
        );
        room.players.extend(players);
        room
    }
}
