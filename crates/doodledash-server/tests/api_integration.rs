mod common;

use common::*;
use uuid::Uuid;

use doodledash_server::config::{GameConfig, ServerConfig};

#[tokio::test]
async fn create_join_get_room_flow() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, alice_token) = http_create_room(&client, &base, "Alice").await;
    assert!(!alice_token.is_empty());

    let bob_token = http_join_room(&client, &base, room_id, "Bob").await;
    assert_ne!(alice_token, bob_token, "every join mints a fresh token");

    let resp = client
        .get(format!("{base}/room"))
        .query(&[("roomId", room_id.to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["players"].as_array().unwrap().len(), 2);
    assert_eq!(body["active"], true);
    assert_eq!(body["displayCode"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn get_room_errors() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    // Missing roomId param
    let resp = client.get(format!("{base}/room")).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown room
    let resp = client
        .get(format!("{base}/room"))
        .query(&[("roomId", Uuid::new_v4().to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn join_unknown_room_is_404() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/join-room", server.base_url()))
        .json(&serde_json::json!({ "username": "Bob", "roomId": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn join_full_room_is_400() {
    let config = ServerConfig {
        game: GameConfig {
            max_players: 2,
            ..GameConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, _) = http_create_room(&client, &base, "Alice").await;
    http_join_room(&client, &base, room_id, "Bob").await;

    let resp = client
        .post(format!("{base}/join-room"))
        .json(&serde_json::json!({ "username": "Carol", "roomId": room_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("full"));
}

#[tokio::test]
async fn create_room_with_unknown_category_is_400() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/create-room", server.base_url()))
        .json(&serde_json::json!({ "username": "Alice", "category": "Astrophysics" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn listing_shows_room_once_creator_connects() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, token) = http_create_room(&client, &base, "Alice").await;

    let rooms: serde_json::Value = client
        .get(format!("{base}/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(rooms.as_array().unwrap().is_empty(), "creator not connected");

    let mut ws = ws_connect(&server.ws_url()).await;
    ws_join(&mut ws, room_id, &token).await;

    let rooms: serde_json::Value = client
        .get(format!("{base}/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rooms = rooms.as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["roomId"].as_str().unwrap(), room_id.to_string());
    assert!(rooms[0]["distanceKm"].as_f64().unwrap() < 1.0);
    assert_eq!(rooms[0]["playerCount"], 1);
}

#[tokio::test]
async fn clear_rooms_wipes_state() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, _) = http_create_room(&client, &base, "Alice").await;

    let resp = client
        .post(format!("{base}/clear-rooms"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let resp = client
        .get(format!("{base}/room"))
        .query(&[("roomId", room_id.to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn health_reports_rooms_and_players() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, _) = http_create_room(&client, &base, "Alice").await;
    http_join_room(&client, &base, room_id, "Bob").await;

    let body: serde_json::Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["rooms"]["active"], 1);
    assert_eq!(body["rooms"]["players"], 2);

    let ready = client
        .get(format!("{base}/ready"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(ready, "ready");
}

#[tokio::test]
async fn room_snapshot_never_contains_connection_ids() {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, token) = http_create_room(&client, &base, "Alice").await;
    let mut ws = ws_connect(&server.ws_url()).await;
    ws_join(&mut ws, room_id, &token).await;

    let text = client
        .get(format!("{base}/room"))
        .query(&[("roomId", room_id.to_string())])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!text.contains("connectionId"), "transport ids leaked: {text}");
}
