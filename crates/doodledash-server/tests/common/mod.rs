use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use doodledash_core::net::messages::{ClientMessage, ServerMessage};
use doodledash_core::net::protocol::decode_server_message;

use doodledash_server::build_app;
use doodledash_server::config::{GameConfig, ServerConfig};

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with the default configuration.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server with short game windows so a whole game fits in
    /// a test run. Rounds are ended by guessing, so only the score-display
    /// delay is actually waited out.
    pub async fn with_fast_game() -> Self {
        let config = ServerConfig {
            game: GameConfig {
                word_selection_secs: 5,
                round_time_secs: 5,
                round_end_delay_secs: 1,
                turns_per_player: 1,
                drawer_reconnect_grace_secs: 2,
                ..GameConfig::default()
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// POST /create-room and return (roomId, sessionToken).
pub async fn http_create_room(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> (Uuid, String) {
    let resp = client
        .post(format!("{base_url}/create-room"))
        .json(&serde_json::json!({ "username": username, "category": "Objects" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success(), "create-room failed: {resp:?}");
    let body: serde_json::Value = resp.json().await.unwrap();
    let room_id = body["roomId"].as_str().unwrap().parse().unwrap();
    let token = body["sessionToken"].as_str().unwrap().to_string();
    (room_id, token)
}

/// POST /join-room and return the session token.
pub async fn http_join_room(
    client: &reqwest::Client,
    base_url: &str,
    room_id: Uuid,
    username: &str,
) -> String {
    let resp = client
        .post(format!("{base_url}/join-room"))
        .json(&serde_json::json!({ "username": username, "roomId": room_id }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success(), "join-room failed: {resp:?}");
    let body: serde_json::Value = resp.json().await.unwrap();
    body["sessionToken"].as_str().unwrap().to_string()
}

/// Send a ClientMessage as a JSON text frame.
pub async fn ws_send(stream: &mut WsStream, msg: &ClientMessage) {
    let text = serde_json::to_string(msg).unwrap();
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Bind this connection to a session. The server answers with a roomUpdate,
/// which is returned.
pub async fn ws_join(stream: &mut WsStream, room_id: Uuid, token: &str) -> ServerMessage {
    ws_send(
        stream,
        &ClientMessage::JoinRoom {
            room_id,
            session_token: token.to_string(),
        },
    )
    .await;
    let first = ws_read(stream).await;
    assert!(
        matches!(first, ServerMessage::RoomUpdate { .. } | ServerMessage::Error { .. }),
        "unexpected first frame: {first:?}"
    );
    first
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read(stream: &mut WsStream) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return decode_server_message(text.as_str()).unwrap();
                },
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next ServerMessage, returning None on timeout.
pub async fn ws_try_read(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return decode_server_message(text.as_str()).unwrap();
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Keep reading until a message matches `pred` (10s budget), returning it.
/// Non-matching messages are skipped.
pub async fn ws_read_until(
    stream: &mut WsStream,
    mut pred: impl FnMut(&ServerMessage) -> bool,
) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let msg = ws_read(stream).await;
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .expect("Timed out waiting for matching message")
}
