use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use doodledash_core::player::UserId;
use doodledash_core::room::{GeoPoint, RoomId, RoomSnapshot};

use crate::error::AppError;
use crate::room_manager::RoomListing;
use crate::state::AppState;

/// Request body for `POST /create-room`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomBody {
    pub username: String,
    pub category: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub client_user_id: Option<UserId>,
}

/// Request body for `POST /join-room`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomBody {
    pub username: String,
    pub room_id: RoomId,
    pub client_user_id: Option<UserId>,
}

/// Response for both create and join.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub room_id: RoomId,
    pub session_token: String,
    pub room: RoomSnapshot,
}

/// Validate a display name: trimmed, non-empty, bounded, printable.
fn validate_username(raw: &str) -> Result<String, AppError> {
    let name = raw.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("username required".to_string()));
    }
    if name.len() > 32 {
        return Err(AppError::BadRequest("username exceeds 32 chars".to_string()));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::BadRequest(
            "username contains control characters".to_string(),
        ));
    }
    Ok(name)
}

/// POST /create-room — create a room and mint the admin's session.
pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomBody>,
) -> Result<(StatusCode, Json<JoinResponse>), AppError> {
    let username = validate_username(&body.username)?;
    if !state.word_bank.contains_category(&body.category) {
        return Err(AppError::BadRequest(format!(
            "Unknown category: {}",
            body.category
        )));
    }

    // Missing or non-finite coordinates fall back to the configured default
    let listing = &state.config.listing;
    let lat = body.lat.filter(|v| v.is_finite()).unwrap_or(listing.default_lat);
    let lon = body.lon.filter(|v| v.is_finite()).unwrap_or(listing.default_lon);

    let mut mgr = state.rooms.write().await;
    let (room_id, session_token, room) = mgr.create_room(
        username,
        body.category,
        GeoPoint { lat, lon },
        body.client_user_id,
        &state.config.game,
    );
    tracing::info!(room = %room_id, code = %room.display_code, "Room created");

    Ok((
        StatusCode::OK,
        Json(JoinResponse {
            room_id,
            session_token,
            room,
        }),
    ))
}

/// POST /join-room — join an existing room and mint a session.
pub async fn join_room(
    State(state): State<AppState>,
    Json(body): Json<JoinRoomBody>,
) -> Result<Json<JoinResponse>, AppError> {
    let username = validate_username(&body.username)?;

    let mut mgr = state.rooms.write().await;
    let (session_token, room) = mgr.join_room(body.room_id, username, body.client_user_id)?;

    Ok(Json(JoinResponse {
        room_id: body.room_id,
        session_token,
        room,
    }))
}

/// Query for `GET /room`.
#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "roomId")]
    pub room_id: Option<RoomId>,
}

/// GET /room?roomId=… — one room snapshot.
pub async fn get_room(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let room_id = query
        .room_id
        .ok_or_else(|| AppError::BadRequest("roomId required".to_string()))?;

    let mgr = state.rooms.read().await;
    let snapshot = mgr
        .snapshot(room_id)
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;
    Ok(Json(snapshot))
}

/// Query for `GET /rooms`.
#[derive(Debug, Deserialize)]
pub struct RoomsQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: Option<f64>,
}

/// GET /rooms?lat&lon&radius — nearby discoverable rooms, nearest first.
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<RoomsQuery>,
) -> Json<Vec<RoomListing>> {
    let listing = &state.config.listing;
    let lat = query.lat.unwrap_or(listing.default_lat);
    let lon = query.lon.unwrap_or(listing.default_lon);
    let radius = query.radius.unwrap_or(listing.default_radius_km);

    let mgr = state.rooms.read().await;
    Json(mgr.list_nearby(lat, lon, radius))
}

/// POST /clear-rooms — wipe all in-memory state. Administrative/test
/// utility.
pub async fn clear_rooms(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut mgr = state.rooms.write().await;
    mgr.clear_all();
    Json(serde_json::json!({ "ok": true }))
}
