use std::collections::HashMap;

use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use doodledash_core::geo::haversine_km;
use doodledash_core::net::messages::ServerMessage;
use doodledash_core::net::protocol::encode_server_message;
use doodledash_core::player::{ConnectionId, Player, UserId};
use doodledash_core::room::{
    GeoPoint, Room, RoomId, RoomSettings, RoomSnapshot, generate_display_code,
};

use crate::config::GameConfig;
use crate::registry::{ConnectionRegistry, RoomStore, Session, SessionRegistry};

/// At most one timer of each kind may be outstanding per room. Every slot is
/// aborted before a new handle is armed, and all are aborted on room
/// destruction, so a stale deadline can never fire into a newer round.
#[derive(Default)]
pub struct RoomTimers {
    pub word_selection: Option<JoinHandle<()>>,
    pub drawing: Option<JoinHandle<()>>,
    pub round_end: Option<JoinHandle<()>>,
    /// Armed while a round is paused waiting for a dropped drawer.
    pub reconnect: Option<JoinHandle<()>>,
}

impl RoomTimers {
    pub fn cancel_word_selection(&mut self) {
        abort_slot(&mut self.word_selection);
    }

    pub fn cancel_drawing(&mut self) {
        abort_slot(&mut self.drawing);
    }

    pub fn cancel_round_end(&mut self) {
        abort_slot(&mut self.round_end);
    }

    pub fn cancel_reconnect(&mut self) {
        abort_slot(&mut self.reconnect);
    }

    pub fn cancel_all(&mut self) {
        self.cancel_word_selection();
        self.cancel_drawing();
        self.cancel_round_end();
        self.cancel_reconnect();
    }
}

fn abort_slot(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}

/// Why a join request was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    RoomNotFound,
    RoomFull,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::RoomFull => write!(f, "Room is full"),
        }
    }
}

/// One row of the proximity-filtered room listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub room_id: RoomId,
    pub display_code: String,
    pub category: String,
    pub distance_km: f64,
    pub player_count: usize,
}

/// Owns all mutable server state: the room store, the session and connection
/// registries, and the per-room timer slots. Everything here is mutated
/// under one write lock, which serializes room transitions.
#[derive(Default)]
pub struct RoomManager {
    pub rooms: RoomStore,
    pub sessions: SessionRegistry,
    pub connections: ConnectionRegistry,
    timers: HashMap<RoomId, RoomTimers>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with its admin player. Returns
    /// (room id, session token, snapshot).
    pub fn create_room(
        &mut self,
        username: String,
        category: String,
        location: GeoPoint,
        client_user_id: Option<UserId>,
        game: &GameConfig,
    ) -> (RoomId, String, RoomSnapshot) {
        let room_id = Uuid::new_v4();
        let display_code = generate_display_code(|c| self.rooms.display_code_taken(c));
        let user_id = client_user_id.unwrap_or_else(Uuid::new_v4);
        let token = SessionRegistry::mint_token();

        let room = Room::new(
            room_id,
            display_code,
            category,
            Player::admin(user_id, username.clone()),
            location,
            game.max_players,
            RoomSettings {
                round_time_seconds: game.round_time_secs,
            },
        );
        let snapshot = room.snapshot();
        self.rooms.insert(room);
        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                username,
                room_id,
                connection_id: None,
            },
        );

        (room_id, token, snapshot)
    }

    /// Join an existing room. A previously-seen persistent user id updates
    /// that player's record in place instead of duplicating it.
    pub fn join_room(
        &mut self,
        room_id: RoomId,
        username: String,
        client_user_id: Option<UserId>,
    ) -> Result<(String, RoomSnapshot), JoinError> {
        let user_id = client_user_id.unwrap_or_else(Uuid::new_v4);

        let room = self.rooms.get_mut(room_id).ok_or(JoinError::RoomNotFound)?;
        match room.player_mut(user_id) {
            Some(existing) => {
                existing.username = username.clone();
                existing.connected = false;
                tracing::info!(room = %room_id, user = %user_id, "Player re-joining");
            },
            None => {
                if room.is_full() {
                    return Err(JoinError::RoomFull);
                }
                room.players.push(Player::guest(user_id, username.clone()));
                tracing::info!(room = %room_id, user = %user_id, "Player joined");
            },
        }
        let snapshot = room.snapshot();

        let token = SessionRegistry::mint_token();
        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                username,
                room_id,
                connection_id: None,
            },
        );

        Ok((token, snapshot))
    }

    pub fn snapshot(&self, room_id: RoomId) -> Option<RoomSnapshot> {
        self.rooms.get(room_id).map(Room::snapshot)
    }

    /// Rooms in the waiting phase whose creator is currently connected,
    /// within `radius_km` of the given point, nearest first.
    pub fn list_nearby(&self, lat: f64, lon: f64, radius_km: f64) -> Vec<RoomListing> {
        let mut listings: Vec<RoomListing> = self
            .rooms
            .iter()
            .filter(|room| {
                room.is_waiting()
                    && room
                        .player(room.creator_user_id)
                        .is_some_and(|p| p.connected)
            })
            .map(|room| RoomListing {
                room_id: room.room_id,
                display_code: room.display_code.clone(),
                category: room.category.clone(),
                distance_km: haversine_km(lat, lon, room.location.lat, room.location.lon),
                player_count: room.players.len(),
            })
            .filter(|l| l.distance_km <= radius_km)
            .collect();
        listings.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        listings
    }

    /// Remove a player outright. Destroys the room (and its timers) when it
    /// empties; returns true in that case.
    pub fn remove_player(&mut self, room_id: RoomId, user_id: UserId) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if let Some(player) = room.player(user_id)
            && let Some(conn_id) = player.connection_id
        {
            self.connections.remove(conn_id);
        }
        room.players.retain(|p| p.user_id != user_id);

        if room.players.is_empty() {
            self.rooms.remove(room_id);
            self.clear_timers(room_id);
            tracing::info!(room = %room_id, "Room deleted (empty)");
            return true;
        }
        false
    }

    /// Wipe all in-memory state. Administrative/test utility.
    pub fn clear_all(&mut self) {
        for (_, mut timers) in self.timers.drain() {
            timers.cancel_all();
        }
        self.rooms.clear();
        self.sessions.clear();
        self.connections.clear();
        tracing::info!("All rooms cleared");
    }

    /// Timer slots for a room, created on first use.
    pub fn timers_mut(&mut self, room_id: RoomId) -> &mut RoomTimers {
        self.timers.entry(room_id).or_default()
    }

    /// Abort and drop every timer of a room.
    pub fn clear_timers(&mut self, room_id: RoomId) {
        if let Some(mut timers) = self.timers.remove(&room_id) {
            timers.cancel_all();
        }
    }

    /// (rooms, players, live connections) for the health endpoint.
    pub fn stats(&self) -> (usize, usize, usize) {
        let players = self.rooms.iter().map(|r| r.players.len()).sum();
        (self.rooms.len(), players, self.connections.len())
    }

    // ---- delivery ----

    /// Deliver a message to every connected player in a room except the
    /// excluded connection. Fire-and-forget: slow or closed clients are
    /// skipped without affecting other recipients.
    pub fn broadcast(
        &self,
        room_id: RoomId,
        msg: &ServerMessage,
        exclude: Option<ConnectionId>,
    ) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let text = match encode_server_message(msg) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(room = %room_id, error = %e, "Failed to encode broadcast");
                return;
            },
        };
        let frame = axum::extract::ws::Utf8Bytes::from(text);
        for player in room.players.iter().filter(|p| p.connected) {
            let Some(conn_id) = player.connection_id else {
                continue;
            };
            if Some(conn_id) == exclude {
                continue;
            }
            if let Some(sender) = self.connections.get(conn_id)
                && sender.try_send(frame.clone()).is_err()
            {
                tracing::debug!(
                    room = %room_id, user = %player.user_id,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }

    /// Send a message to one live connection.
    pub fn send_to_connection(&self, conn_id: ConnectionId, msg: &ServerMessage) {
        let text = match encode_server_message(msg) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode message");
                return;
            },
        };
        if let Some(sender) = self.connections.get(conn_id)
            && sender.try_send(text.into()).is_err()
        {
            tracing::debug!(conn = %conn_id, "Failed to send to connection");
        }
    }

    /// Send a message to one player's current live connection, if any.
    pub fn send_to_player(&self, room_id: RoomId, user_id: UserId, msg: &ServerMessage) {
        if let Some(conn_id) = self
            .rooms
            .get(room_id)
            .and_then(|r| r.player(user_id))
            .and_then(|p| p.connection_id)
        {
            self.send_to_connection(conn_id, msg);
        }
    }

    /// Broadcast the current room snapshot to everyone in the room.
    pub fn broadcast_room_update(&self, room_id: RoomId) {
        if let Some(snapshot) = self.snapshot(room_id) {
            self.broadcast(room_id, &ServerMessage::RoomUpdate { room: snapshot }, None);
        }
    }
}
