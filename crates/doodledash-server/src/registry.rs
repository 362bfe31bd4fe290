use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use doodledash_core::player::{ConnectionId, UserId};
use doodledash_core::room::{Room, RoomId};

/// Per-connection sender for outbound WebSocket text frames.
/// Bounded to prevent memory exhaustion from slow clients; `Utf8Bytes` gives
/// zero-copy cloning when broadcasting to multiple players.
pub type PlayerSender = mpsc::Sender<Utf8Bytes>;

/// Maps a session token to the identity it was minted for. Sessions are
/// created by the REST create/join endpoints and never expire within this
/// process's lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub username: String,
    pub room_id: RoomId,
    /// The live connection currently bound to this session, if any.
    pub connection_id: Option<ConnectionId>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn mint_token() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut Session> {
        self.sessions.get_mut(token)
    }

    pub fn insert(&mut self, token: String, session: Session) {
        self.sessions.insert(token, session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

/// Maps a live-connection id to its transport handle. Used only for message
/// delivery; game logic never inspects it.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, PlayerSender>,
}

impl ConnectionRegistry {
    pub fn get(&self, id: ConnectionId) -> Option<&PlayerSender> {
        self.connections.get(&id)
    }

    pub fn insert(&mut self, id: ConnectionId, sender: PlayerSender) {
        self.connections.insert(id, sender);
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<PlayerSender> {
        self.connections.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }
}

/// Keyed store of room aggregates. The unit of concurrency: all game logic
/// for a room is scoped to the entry held here.
#[derive(Default)]
pub struct RoomStore {
    rooms: HashMap<RoomId, Room>,
}

impl RoomStore {
    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn insert(&mut self, room: Room) {
        self.rooms.insert(room.room_id, room);
    }

    pub fn remove(&mut self, id: RoomId) -> Option<Room> {
        self.rooms.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }

    /// Whether any live room already uses this display code.
    pub fn display_code_taken(&self, code: &str) -> bool {
        self.rooms.values().any(|r| r.display_code == code)
    }
}
