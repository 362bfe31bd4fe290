mod common;

use common::*;

use doodledash_core::net::messages::{ClientMessage, DrawingEvent, ServerMessage, StrokePoint};
use doodledash_server::config::{GameConfig, ServerConfig};

/// Read frames until `wordSelectionStart` arrives, returning the offered
/// words (empty for non-drawers).
async fn read_selection_start(stream: &mut WsStream) -> Vec<String> {
    let msg = ws_read_until(stream, |m| {
        matches!(m, ServerMessage::WordSelectionStart { .. })
    })
    .await;
    match msg {
        ServerMessage::WordSelectionStart { words, .. } => words,
        _ => unreachable!(),
    }
}

/// Play one round to completion: the drawer picks the first offered word and
/// the guesser guesses it. Returns (drawer_index, word) over the two streams.
async fn play_round(streams: &mut [WsStream; 2]) -> (usize, String) {
    let words_0 = read_selection_start(&mut streams[0]).await;
    let words_1 = read_selection_start(&mut streams[1]).await;

    let (drawer_idx, words) = if !words_0.is_empty() {
        assert!(words_1.is_empty(), "both sockets saw word choices");
        (0, words_0)
    } else {
        assert!(!words_1.is_empty(), "neither socket saw word choices");
        (1, words_1)
    };
    let guesser_idx = 1 - drawer_idx;
    let word = words[0].clone();

    ws_send(
        &mut streams[drawer_idx],
        &ClientMessage::SelectWord { word: word.clone() },
    )
    .await;

    // Drawer sees the word; the guesser only its length
    let drawer_sees = ws_read_until(&mut streams[drawer_idx], |m| {
        matches!(m, ServerMessage::WordSelected { .. })
    })
    .await;
    match drawer_sees {
        ServerMessage::WordSelected { word: w, .. } => assert_eq!(w.as_deref(), Some(word.as_str())),
        _ => unreachable!(),
    }
    let guesser_sees = ws_read_until(&mut streams[guesser_idx], |m| {
        matches!(m, ServerMessage::WordSelected { .. })
    })
    .await;
    match guesser_sees {
        ServerMessage::WordSelected {
            word: w,
            word_length,
            ..
        } => {
            assert!(w.is_none(), "word leaked to guesser");
            assert_eq!(word_length, word.chars().count());
        },
        _ => unreachable!(),
    }

    ws_send(
        &mut streams[guesser_idx],
        &ClientMessage::Guess { text: word.clone() },
    )
    .await;

    let correct = ws_read_until(&mut streams[guesser_idx], |m| {
        matches!(m, ServerMessage::CorrectGuess { .. })
    })
    .await;
    match correct {
        ServerMessage::CorrectGuess {
            points_awarded,
            position,
            total_players,
            ..
        } => {
            assert!(points_awarded > 0);
            assert_eq!(position, 1);
            assert_eq!(total_players, 1);
        },
        _ => unreachable!(),
    }

    // Everyone guessed: the round ends without waiting out the deadline
    for stream in streams.iter_mut() {
        let end = ws_read_until(stream, |m| matches!(m, ServerMessage::RoundEnd { .. })).await;
        match end {
            ServerMessage::RoundEnd { word: revealed, .. } => assert_eq!(revealed, word),
            _ => unreachable!(),
        }
    }

    (drawer_idx, word)
}

#[tokio::test]
async fn full_game_rotates_drawers_and_ends_with_standings() {
    let server = TestServer::with_fast_game().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, alice_token) = http_create_room(&client, &base, "Alice").await;
    let bob_token = http_join_room(&client, &base, room_id, "Bob").await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, room_id, &alice_token).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut bob, room_id, &bob_token).await;

    // Bob joined ready, so a plain start succeeds
    ws_send(&mut alice, &ClientMessage::StartGame { force_start: false }).await;

    let mut streams = [alice, bob];
    for stream in streams.iter_mut() {
        let start = ws_read_until(stream, |m| matches!(m, ServerMessage::RoundStart { .. })).await;
        match start {
            ServerMessage::RoundStart {
                round_number,
                total_rounds,
                ..
            } => {
                assert_eq!(round_number, 1);
                // 2 players x 1 turn each with the fast config
                assert_eq!(total_rounds, 2);
            },
            _ => unreachable!(),
        }
    }

    // One turn per player: two rounds, alternating drawers
    let (first_drawer, _) = play_round(&mut streams).await;
    let (second_drawer, _) = play_round(&mut streams).await;
    assert_ne!(first_drawer, second_drawer, "both players must draw once");

    // After the last round the game ends with sorted standings
    let end = ws_read_until(&mut streams[0], |m| matches!(m, ServerMessage::GameEnd { .. })).await;
    match end {
        ServerMessage::GameEnd { final_scores } => {
            assert_eq!(final_scores.len(), 2);
            assert!(final_scores[0].score >= final_scores[1].score);
            assert!(final_scores[0].score > 0);
        },
        _ => unreachable!(),
    }

    // The room is back in the waiting phase, ready for another game
    let body: serde_json::Value = client
        .get(format!("{base}/room"))
        .query(&[("roomId", room_id.to_string())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["active"], true);
    assert!(body.get("currentRound").is_none());
}

#[tokio::test]
async fn word_selection_deadline_auto_picks_a_word() {
    let config = ServerConfig {
        game: GameConfig {
            word_selection_secs: 1,
            round_time_secs: 5,
            round_end_delay_secs: 1,
            turns_per_player: 1,
            ..GameConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, alice_token) = http_create_room(&client, &base, "Alice").await;
    let bob_token = http_join_room(&client, &base, room_id, "Bob").await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, room_id, &alice_token).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut bob, room_id, &bob_token).await;

    ws_send(&mut alice, &ClientMessage::StartGame { force_start: false }).await;

    let mut streams = [alice, bob];
    let words_0 = read_selection_start(&mut streams[0]).await;
    let words_1 = read_selection_start(&mut streams[1]).await;
    let (drawer_idx, choices) = if words_0.is_empty() {
        (1, words_1)
    } else {
        (0, words_0)
    };

    // Nobody selects: the deadline is a normal forward-progress path
    for stream in streams.iter_mut() {
        ws_read_until(stream, |m| {
            matches!(m, ServerMessage::WordSelectionTimeout)
        })
        .await;
    }

    // The server auto-picked and moved straight to drawing
    let drawer_sees = ws_read_until(&mut streams[drawer_idx], |m| {
        matches!(m, ServerMessage::WordSelected { .. })
    })
    .await;
    match drawer_sees {
        ServerMessage::WordSelected { word, .. } => {
            let word = word.expect("drawer must learn the auto-picked word");
            assert!(choices.contains(&word), "auto-pick outside offered words");
        },
        _ => unreachable!(),
    }
    let guesser_sees = ws_read_until(&mut streams[1 - drawer_idx], |m| {
        matches!(m, ServerMessage::WordSelected { .. })
    })
    .await;
    match guesser_sees {
        ServerMessage::WordSelected {
            word, word_length, ..
        } => {
            assert!(word.is_none());
            assert!(word_length > 0);
        },
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn strokes_relay_to_guessers_but_never_echo() {
    let server = TestServer::with_fast_game().await;
    let client = reqwest::Client::new();
    let base = server.base_url();

    let (room_id, alice_token) = http_create_room(&client, &base, "Alice").await;
    let bob_token = http_join_room(&client, &base, room_id, "Bob").await;

    let mut alice = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, room_id, &alice_token).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut bob, room_id, &bob_token).await;

    ws_send(&mut alice, &ClientMessage::StartGame { force_start: false }).await;

    let mut streams = [alice, bob];
    let words_0 = read_selection_start(&mut streams[0]).await;
    let words_1 = read_selection_start(&mut streams[1]).await;
    let (drawer_idx, words) = if words_0.is_empty() {
        (1, words_1)
    } else {
        (0, words_0)
    };
    let guesser_idx = 1 - drawer_idx;

    ws_send(
        &mut streams[drawer_idx],
        &ClientMessage::SelectWord {
            word: words[0].clone(),
        },
    )
    .await;
    ws_read_until(&mut streams[guesser_idx], |m| {
        matches!(m, ServerMessage::WordSelected { .. })
    })
    .await;

    let event = DrawingEvent::Stroke {
        color: "#5398ff".to_string(),
        width: 2.0,
        points: vec![
            StrokePoint { x: 12.5, y: 40.0 },
            StrokePoint { x: 13.0, y: 41.5 },
            StrokePoint { x: 14.2, y: 43.0 },
        ],
    };
    ws_send(
        &mut streams[drawer_idx],
        &ClientMessage::DrawingEvent {
            event: event.clone(),
        },
    )
    .await;

    // Delivered unmodified to the guesser
    let relayed = ws_read_until(&mut streams[guesser_idx], |m| {
        matches!(m, ServerMessage::DrawingEvent { .. })
    })
    .await;
    match relayed {
        ServerMessage::DrawingEvent { event: received } => assert_eq!(received, event),
        _ => unreachable!(),
    }

    // And never echoed back to the drawer
    while let Some(msg) = ws_try_read(&mut streams[drawer_idx], 300).await {
        assert!(
            !matches!(msg, ServerMessage::DrawingEvent { .. }),
            "stroke echoed to its sender"
        );
    }
}
