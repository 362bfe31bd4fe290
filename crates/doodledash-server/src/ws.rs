use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use doodledash_core::net::messages::{ClientMessage, ServerMessage};
use doodledash_core::net::protocol::{
    MAX_MESSAGE_SIZE, MAX_TEXT_LEN, decode_client_message, encode_server_message,
};
use doodledash_core::player::{ConnectionId, UserId};
use doodledash_core::room::RoomId;

use crate::game;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Wait for the first frame: must be a joinRoom bound to a session minted
    // by the REST create/join endpoints.
    let first_text = loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => continue,
        }
    };

    let join = match decode_client_message(first_text.as_str()) {
        Ok(ClientMessage::JoinRoom {
            room_id,
            session_token,
        }) => (room_id, session_token),
        Ok(_) => {
            send_error(&mut ws_sender, "Expected joinRoom").await;
            return;
        },
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable first frame");
            send_error(&mut ws_sender, "Malformed message").await;
            return;
        },
    };
    let (room_id, session_token) = join;

    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    let conn_id: ConnectionId = Uuid::new_v4();

    let user_id = match game::attach_connection(&state, room_id, &session_token, conn_id, tx).await
    {
        Ok(user_id) => user_id,
        Err(e) => {
            send_error(&mut ws_sender, &e).await;
            return;
        },
    };

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, room_id, user_id, conn_id).await;

    // Transport closed: mark the player disconnected, keep their slot
    game::handle_disconnect(&state, room_id, user_id, conn_id).await;
    tracing::info!(room = %room_id, user = %user_id, "Connection closed");
}

async fn send_error(
    ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &str,
) {
    if let Ok(text) = encode_server_message(&ServerMessage::Error {
        message: message.to_string(),
    }) && let Err(e) = ws_sender.send(Message::Text(text.into())).await
    {
        tracing::warn!(error = %e, "Failed to send error frame");
    }
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
) {
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Reject text that is oversized or carries control characters.
fn text_ok(text: &str) -> bool {
    text.len() <= MAX_TEXT_LEN && !text.chars().any(|c| c.is_control() && c != '\n')
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    room_id: RoomId,
    user_id: UserId,
    conn_id: ConnectionId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        // Drop messages that exceed per-connection rate
        if !rate_limiter.allow() {
            tracing::warn!(room = %room_id, user = %user_id, "Rate limited");
            continue;
        }

        if text.len() > MAX_MESSAGE_SIZE || text.is_empty() {
            continue;
        }

        let client_msg = match decode_client_message(text.as_str()) {
            Ok(m) => m,
            Err(e) => {
                // Malformed input: answer with a generic error, keep the
                // connection open
                tracing::debug!(room = %room_id, user = %user_id, error = %e, "Bad frame");
                let mgr = state.rooms.read().await;
                mgr.send_to_connection(
                    conn_id,
                    &ServerMessage::Error {
                        message: "Malformed message".to_string(),
                    },
                );
                continue;
            },
        };

        match client_msg {
            ClientMessage::JoinRoom { .. } => {
                // This connection is already bound to a session
                let mgr = state.rooms.read().await;
                mgr.send_to_connection(
                    conn_id,
                    &ServerMessage::Error {
                        message: "Already joined".to_string(),
                    },
                );
            },
            ClientMessage::PlayerReady { ready } => {
                game::player_ready(state, room_id, user_id, ready).await;
            },
            ClientMessage::StartGame { force_start } => {
                game::start_game(state, room_id, user_id, conn_id, force_start).await;
            },
            ClientMessage::SelectWord { word } => {
                game::select_word(state, room_id, user_id, conn_id, word).await;
            },
            ClientMessage::DrawingEvent { event } => {
                game::drawing_event(state, room_id, user_id, event).await;
            },
            ClientMessage::Guess { text } => {
                if text_ok(&text) {
                    game::guess(state, room_id, user_id, text).await;
                }
            },
            ClientMessage::ChatMessage { text } => {
                if text_ok(&text) {
                    game::chat_message(state, room_id, user_id, text).await;
                }
            },
            ClientMessage::LeaveRoom => {
                game::leave_room(state, room_id, user_id).await;
                break;
            },
        }
    }
}
