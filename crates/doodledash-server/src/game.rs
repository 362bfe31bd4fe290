//! Room lifecycle and turn engine.
//!
//! Drives a room through `Waiting → WordSelection → Drawing → RoundEnd` and
//! back, one write-lock hold per transition so timer cancellation and
//! rescheduling are atomic with the state change that triggers them. Phase
//! deadlines are spawned sleep tasks that re-fetch the room by id on firing
//! and check the round number they were armed for, so a stale deadline can
//! never drive a newer round.

use std::time::Duration;

use rand::seq::{IndexedRandom, SliceRandom};

use doodledash_core::net::messages::{DrawingEvent, ScoreEntry, ServerMessage};
use doodledash_core::player::{ConnectionId, Player, UserId};
use doodledash_core::room::{RoomId, RoomPhase, Round};
use doodledash_core::scoring::{artist_score, guesser_score};
use doodledash_core::time::now_ms;

use crate::registry::PlayerSender;
use crate::room_manager::RoomManager;
use crate::state::AppState;

/// How a round came to an end. Drawer-initiated endings skip the artist
/// award; a deadline ending additionally announces the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundEndReason {
    AllGuessed,
    Timeout,
    DrawerLeft,
    DrawerTimeout,
}

// ---------------------------------------------------------------------------
// Connection binding
// ---------------------------------------------------------------------------

/// Bind a live connection to a session. Sends the current room snapshot to
/// the joiner, announces the join to everyone else, and — if the joiner is a
/// drawer the room was paused for — resumes the round with its remaining
/// window.
pub async fn attach_connection(
    state: &AppState,
    room_id: RoomId,
    token: &str,
    conn_id: ConnectionId,
    sender: PlayerSender,
) -> Result<UserId, String> {
    let mut mgr = state.rooms.write().await;

    let session = mgr
        .sessions
        .get(token)
        .cloned()
        .filter(|s| s.room_id == room_id)
        .ok_or_else(|| "Invalid session".to_string())?;
    let user_id = session.user_id;

    struct Resume {
        phase: RoomPhase,
        round_number: u32,
        remaining_ms: u64,
        timer_ends_at: u64,
        word: Option<String>,
        word_choices: Vec<String>,
    }

    let resume = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return Err("Room not found".to_string());
        };
        let phase = room.phase;
        let Some(player) = room.player_mut(user_id) else {
            return Err("Player is no longer in this room".to_string());
        };
        player.connected = true;
        player.connection_id = Some(conn_id);

        match room.current_round.as_mut() {
            Some(round)
                if round.drawer_user_id == user_id
                    && round.is_paused()
                    && matches!(phase, RoomPhase::WordSelection | RoomPhase::Drawing) =>
            {
                let remaining_ms = round.paused_remaining_ms.take().unwrap_or(0);
                round.timer_ends_at = now_ms() + remaining_ms;
                Some(Resume {
                    phase,
                    round_number: round.round_number,
                    remaining_ms,
                    timer_ends_at: round.timer_ends_at,
                    word: round.word.clone(),
                    word_choices: round.word_choices.clone(),
                })
            },
            _ => None,
        }
    };

    mgr.connections.insert(conn_id, sender);
    if let Some(s) = mgr.sessions.get_mut(token) {
        s.connection_id = Some(conn_id);
    }
    tracing::info!(room = %room_id, user = %user_id, conn = %conn_id, "Connection attached");

    if let Some(resume) = resume {
        let cfg = &state.config.game;
        mgr.timers_mut(room_id).cancel_reconnect();
        match resume.phase {
            RoomPhase::WordSelection => {
                arm_word_selection(&mut mgr, state, room_id, resume.round_number, resume.remaining_ms);
                // Re-offer the word choices the drawer lost with the old socket
                mgr.send_to_connection(
                    conn_id,
                    &ServerMessage::WordSelectionStart {
                        words: resume.word_choices,
                        time_limit: cfg.word_selection_secs,
                        timer_ends_at: resume.timer_ends_at,
                        round_number: resume.round_number,
                        total_rounds: total_rounds(&mgr, room_id, cfg.turns_per_player),
                    },
                );
            },
            RoomPhase::Drawing => {
                arm_drawing(&mut mgr, state, room_id, resume.round_number, resume.remaining_ms);
                if let Some(word) = resume.word {
                    let word_length = word.chars().count();
                    mgr.send_to_connection(
                        conn_id,
                        &ServerMessage::WordSelected {
                            word: Some(word),
                            word_length,
                            drawer_user_id: user_id,
                            time_limit: cfg.round_time_secs,
                            timer_ends_at: resume.timer_ends_at,
                        },
                    );
                }
            },
            _ => {},
        }
        tracing::info!(room = %room_id, user = %user_id, "Drawer reconnected, round resumed");
    }

    if let Some(snapshot) = mgr.snapshot(room_id) {
        let player = snapshot.players.iter().find(|p| p.user_id == user_id).cloned();
        mgr.send_to_connection(conn_id, &ServerMessage::RoomUpdate { room: snapshot });
        if let Some(player) = player {
            mgr.broadcast(room_id, &ServerMessage::PlayerJoined { player }, Some(conn_id));
        }
    }

    Ok(user_id)
}

/// Transport-level disconnect: keep the player, drop the connection. A
/// disconnecting drawer freezes the round until reconnect or grace expiry.
pub async fn handle_disconnect(
    state: &AppState,
    room_id: RoomId,
    user_id: UserId,
    conn_id: ConnectionId,
) {
    let mut mgr = state.rooms.write().await;
    mgr.connections.remove(conn_id);

    enum After {
        Nothing,
        Pause { round_number: u32, phase: RoomPhase },
        CheckEarlyEnd,
    }

    let after = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        let phase = room.phase;
        let Some(player) = room.player_mut(user_id) else {
            return;
        };
        if player.connection_id != Some(conn_id) {
            // A newer socket already took over this player; stale close.
            return;
        }
        player.connected = false;
        player.connection_id = None;
        tracing::info!(room = %room_id, user = %user_id, "Player disconnected");

        match room.current_round.as_mut() {
            Some(round)
                if round.drawer_user_id == user_id
                    && matches!(phase, RoomPhase::WordSelection | RoomPhase::Drawing) =>
            {
                if round.is_paused() {
                    After::Nothing
                } else {
                    let remaining = round.timer_ends_at.saturating_sub(now_ms());
                    round.paused_remaining_ms = Some(remaining);
                    After::Pause {
                        round_number: round.round_number,
                        phase,
                    }
                }
            },
            _ if phase == RoomPhase::Drawing => After::CheckEarlyEnd,
            _ => After::Nothing,
        }
    };

    match after {
        After::Pause { round_number, phase } => {
            tracing::info!(room = %room_id, "Drawer disconnected, pausing round");
            {
                let timers = mgr.timers_mut(room_id);
                match phase {
                    RoomPhase::WordSelection => timers.cancel_word_selection(),
                    RoomPhase::Drawing => timers.cancel_drawing(),
                    _ => {},
                }
            }
            let grace_ms = state.config.game.drawer_reconnect_grace_secs * 1000;
            arm_reconnect(&mut mgr, state, room_id, round_number, grace_ms);
        },
        After::CheckEarlyEnd => {
            maybe_end_round_if_all_guessed(&mut mgr, state, room_id);
        },
        After::Nothing => {},
    }

    mgr.broadcast_room_update(room_id);
}

// ---------------------------------------------------------------------------
// Waiting-room operations
// ---------------------------------------------------------------------------

/// Toggle a guest's ready flag. Admins have nothing to toggle; out-of-phase
/// or unknown callers are ignored.
pub async fn player_ready(state: &AppState, room_id: RoomId, user_id: UserId, ready: bool) {
    let mut mgr = state.rooms.write().await;
    let changed = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        if !room.is_waiting() {
            return;
        }
        match room.player_mut(user_id) {
            Some(p) if !p.is_admin => {
                p.ready = ready;
                true
            },
            _ => false,
        }
    };
    if changed {
        mgr.broadcast_room_update(room_id);
    }
}

/// Waiting-room chat. During a round, guesses double as chat instead.
pub async fn chat_message(state: &AppState, room_id: RoomId, user_id: UserId, text: String) {
    let mgr = state.rooms.read().await;
    let Some(room) = mgr.rooms.get(room_id) else {
        return;
    };
    if !room.is_waiting() {
        return;
    }
    let Some(player) = room.player(user_id) else {
        return;
    };
    let username = player.username.clone();
    mgr.broadcast(
        room_id,
        &ServerMessage::ChatMessage {
            user_id,
            username,
            text,
            timestamp: now_ms(),
        },
        None,
    );
}

/// Admin-only game start. Refused with a scoped error while any guest is
/// unready, unless forced. On success the player list is replaced by a
/// random permutation of the connected players, scores are zeroed, and
/// round 1 begins.
pub async fn start_game(
    state: &AppState,
    room_id: RoomId,
    user_id: UserId,
    conn_id: ConnectionId,
    force_start: bool,
) {
    let mut mgr = state.rooms.write().await;

    enum Decision {
        Ignore,
        NotReady,
        Proceed,
    }

    let decision = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        if !room.is_waiting() {
            Decision::Ignore
        } else if !room.player(user_id).is_some_and(|p| p.is_admin) {
            tracing::warn!(room = %room_id, user = %user_id, "Non-admin attempted to start game");
            Decision::Ignore
        } else if !room.all_guests_ready() && !force_start {
            Decision::NotReady
        } else {
            let mut players: Vec<Player> =
                room.players.iter().filter(|p| p.connected).cloned().collect();
            players.shuffle(&mut rand::rng());
            for p in &mut players {
                p.score = 0;
                p.reset_round_state();
            }
            room.players = players;
            room.current_round = None;
            Decision::Proceed
        }
    };

    match decision {
        Decision::NotReady => {
            mgr.send_to_connection(
                conn_id,
                &ServerMessage::Error {
                    message: "Not all players are ready".to_string(),
                },
            );
        },
        Decision::Proceed => {
            tracing::info!(room = %room_id, "Game starting");
            start_new_round_locked(&mut mgr, state, room_id);
        },
        Decision::Ignore => {},
    }
}

/// Explicit leave: the player is removed outright. An empty room is
/// destroyed; a departing drawer forces an early round end.
pub async fn leave_room(state: &AppState, room_id: RoomId, user_id: UserId) {
    let mut mgr = state.rooms.write().await;

    let (was_active_drawer, phase) = {
        let Some(room) = mgr.rooms.get(room_id) else {
            return;
        };
        let is_drawer = room
            .current_round
            .as_ref()
            .is_some_and(|r| r.drawer_user_id == user_id);
        (
            is_drawer && matches!(room.phase, RoomPhase::WordSelection | RoomPhase::Drawing),
            room.phase,
        )
    };

    let destroyed = mgr.remove_player(room_id, user_id);
    if destroyed {
        return;
    }
    mgr.broadcast(room_id, &ServerMessage::PlayerLeft { user_id }, None);

    if was_active_drawer {
        tracing::info!(room = %room_id, user = %user_id, "Drawer left, ending round early");
        end_round_locked(&mut mgr, state, room_id, RoundEndReason::DrawerLeft);
    } else if phase == RoomPhase::Drawing {
        maybe_end_round_if_all_guessed(&mut mgr, state, room_id);
    }
    mgr.broadcast_room_update(room_id);
}

// ---------------------------------------------------------------------------
// Round lifecycle
// ---------------------------------------------------------------------------

/// Start the next round, or end the game once every connected player has
/// drawn their share of turns. Cancels all leftover timers first.
fn start_new_round_locked(mgr: &mut RoomManager, state: &AppState, room_id: RoomId) {
    mgr.clear_timers(room_id);
    let cfg = &state.config.game;

    struct NewRound {
        round_number: u32,
        total_rounds: u32,
        drawer_id: UserId,
        drawer_conn: Option<ConnectionId>,
        words: Vec<String>,
        timer_ends_at: u64,
    }

    enum Next {
        Abort,
        GameOver,
        Round(NewRound),
    }

    let next = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        for p in &mut room.players {
            p.reset_round_state();
        }

        let active: Vec<UserId> = room.connected_players().map(|p| p.user_id).collect();
        if active.is_empty() {
            tracing::debug!(room = %room_id, "No connected players, aborting round start");
            Next::Abort
        } else {
            let round_number = room.current_round.as_ref().map_or(0, |r| r.round_number) + 1;
            let total_rounds = active.len() as u32 * cfg.turns_per_player;
            if round_number > total_rounds {
                Next::GameOver
            } else {
                let words = state.word_bank.pick(&room.category, cfg.word_choices);
                if words.len() < 2 {
                    tracing::warn!(
                        room = %room_id, category = %room.category,
                        "Word bank cannot offer choices, returning room to waiting"
                    );
                    room.phase = RoomPhase::Waiting;
                    room.current_round = None;
                    Next::Abort
                } else {
                    let drawer_idx =
                        (((round_number - 1) / cfg.turns_per_player) as usize) % active.len();
                    let drawer_id = active[drawer_idx];

                    let mut round = Round::new(round_number, drawer_id, words.clone());
                    let timer_ends_at = now_ms() + cfg.word_selection_secs * 1000;
                    round.timer_ends_at = timer_ends_at;
                    room.current_round = Some(round);
                    room.phase = RoomPhase::WordSelection;

                    let drawer_conn = room.player(drawer_id).and_then(|p| p.connection_id);
                    Next::Round(NewRound {
                        round_number,
                        total_rounds,
                        drawer_id,
                        drawer_conn,
                        words,
                        timer_ends_at,
                    })
                }
            }
        }
    };

    let round = match next {
        Next::Abort => return,
        Next::GameOver => {
            end_game_locked(mgr, room_id);
            return;
        },
        Next::Round(r) => r,
    };

    tracing::info!(
        room = %room_id,
        round = round.round_number,
        total = round.total_rounds,
        drawer = %round.drawer_id,
        "Round started"
    );

    mgr.broadcast(
        room_id,
        &ServerMessage::RoundStart {
            round_number: round.round_number,
            total_rounds: round.total_rounds,
            drawer_user_id: round.drawer_id,
        },
        None,
    );

    // The drawer alone sees the candidate words
    mgr.send_to_player(
        room_id,
        round.drawer_id,
        &ServerMessage::WordSelectionStart {
            words: round.words,
            time_limit: cfg.word_selection_secs,
            timer_ends_at: round.timer_ends_at,
            round_number: round.round_number,
            total_rounds: round.total_rounds,
        },
    );
    mgr.broadcast(
        room_id,
        &ServerMessage::WordSelectionStart {
            words: Vec::new(),
            time_limit: cfg.word_selection_secs,
            timer_ends_at: round.timer_ends_at,
            round_number: round.round_number,
            total_rounds: round.total_rounds,
        },
        round.drawer_conn,
    );

    arm_word_selection(
        mgr,
        state,
        room_id,
        round.round_number,
        cfg.word_selection_secs * 1000,
    );
}

/// Drawer picks a word. Strictly validated against the offered choices;
/// anything else is answered with a scoped error and no state change.
pub async fn select_word(
    state: &AppState,
    room_id: RoomId,
    user_id: UserId,
    conn_id: ConnectionId,
    word: String,
) {
    let mut mgr = state.rooms.write().await;

    enum Outcome {
        Ignore,
        Invalid,
        Proceed,
    }

    let outcome = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        if room.phase != RoomPhase::WordSelection {
            Outcome::Ignore
        } else {
            match room.current_round.as_mut() {
                Some(round) if round.drawer_user_id == user_id => {
                    if round.is_paused() || round.word.is_some() {
                        Outcome::Ignore
                    } else if !round.word_choices.iter().any(|w| w == &word) {
                        Outcome::Invalid
                    } else {
                        round.word = Some(word);
                        Outcome::Proceed
                    }
                },
                Some(_) => {
                    tracing::warn!(
                        room = %room_id, user = %user_id,
                        "Non-drawer attempted to select a word"
                    );
                    Outcome::Ignore
                },
                None => Outcome::Ignore,
            }
        }
    };

    match outcome {
        Outcome::Invalid => {
            mgr.send_to_connection(
                conn_id,
                &ServerMessage::Error {
                    message: "Word is not one of the offered choices".to_string(),
                },
            );
        },
        Outcome::Proceed => {
            mgr.timers_mut(room_id).cancel_word_selection();
            start_drawing_phase_locked(&mut mgr, state, room_id);
        },
        Outcome::Ignore => {},
    }
}

/// Enter the drawing phase: stamp the scoring baseline, tell the drawer the
/// word and everyone else its length, arm the drawing deadline.
fn start_drawing_phase_locked(mgr: &mut RoomManager, state: &AppState, room_id: RoomId) {
    let info = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        let round_time = room.settings.round_time_seconds;
        for p in &mut room.players {
            p.reset_round_state();
        }
        let Some(round) = room.current_round.as_mut() else {
            return;
        };
        let Some(word) = round.word.clone() else {
            return;
        };
        let now = now_ms();
        round.timer_ends_at = now + round_time * 1000;
        round.drawing_start_time = now;
        let round_number = round.round_number;
        let drawer_id = round.drawer_user_id;
        let timer_ends_at = round.timer_ends_at;

        room.phase = RoomPhase::Drawing;
        let drawer_conn = room.player(drawer_id).and_then(|p| p.connection_id);
        (word, round_number, drawer_id, drawer_conn, timer_ends_at, round_time)
    };
    let (word, round_number, drawer_id, drawer_conn, timer_ends_at, round_time) = info;
    let word_length = word.chars().count();

    tracing::info!(room = %room_id, round = round_number, "Drawing phase started");

    mgr.send_to_player(
        room_id,
        drawer_id,
        &ServerMessage::WordSelected {
            word: Some(word),
            word_length,
            drawer_user_id: drawer_id,
            time_limit: round_time,
            timer_ends_at,
        },
    );
    mgr.broadcast(
        room_id,
        &ServerMessage::WordSelected {
            word: None,
            word_length,
            drawer_user_id: drawer_id,
            time_limit: round_time,
            timer_ends_at,
        },
        drawer_conn,
    );

    arm_drawing(mgr, state, room_id, round_number, round_time * 1000);
}

/// Relay one canvas event from the drawer to everyone else, verbatim.
pub async fn drawing_event(state: &AppState, room_id: RoomId, user_id: UserId, event: DrawingEvent) {
    let mgr = state.rooms.read().await;
    let Some(room) = mgr.rooms.get(room_id) else {
        return;
    };
    if room.phase != RoomPhase::Drawing {
        return;
    }
    let Some(round) = room.current_round.as_ref() else {
        return;
    };
    if round.drawer_user_id != user_id || round.is_paused() {
        return;
    }
    let exclude = room.player(user_id).and_then(|p| p.connection_id);
    mgr.broadcast(room_id, &ServerMessage::DrawingEvent { event }, exclude);
}

/// Handle a guess: exact match (trimmed, case-insensitive) scores and may
/// end the round early; anything else is re-broadcast as chat.
pub async fn guess(state: &AppState, room_id: RoomId, user_id: UserId, text: String) {
    let mut mgr = state.rooms.write().await;

    enum Outcome {
        Ignore,
        Chat {
            username: String,
        },
        Correct {
            username: String,
            points: i64,
            position: usize,
            total_players: usize,
            drawer_id: UserId,
        },
    }

    let outcome = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        if room.phase != RoomPhase::Drawing {
            return;
        }
        let round_time = room.settings.round_time_seconds;
        let Some(round) = room.current_round.as_ref() else {
            return;
        };
        let Some(word) = round.word.clone() else {
            return;
        };
        let drawer_id = round.drawer_user_id;
        let drawing_start = round.drawing_start_time;
        let paused = round.is_paused();

        if user_id == drawer_id {
            Outcome::Ignore
        } else {
            let Some(player) = room.player(user_id) else {
                return;
            };
            let username = player.username.clone();
            if player.has_guessed {
                // Already scored this round; repeat guesses are ignored
                Outcome::Ignore
            } else if paused || text.trim().to_lowercase() != word.to_lowercase() {
                Outcome::Chat { username }
            } else {
                let ts = now_ms();
                let position = room
                    .players
                    .iter()
                    .filter(|p| p.user_id != drawer_id && p.has_guessed)
                    .count()
                    + 1;
                let total_players = room
                    .players
                    .iter()
                    .filter(|p| p.user_id != drawer_id && p.connected)
                    .count();
                let points = guesser_score(ts, drawing_start, round_time, position, total_players);

                let Some(p) = room.player_mut(user_id) else {
                    return;
                };
                p.score += points;
                p.has_guessed = true;
                p.guess_timestamp = Some(ts);

                Outcome::Correct {
                    username,
                    points,
                    position,
                    total_players,
                    drawer_id,
                }
            }
        }
    };

    match outcome {
        Outcome::Chat { username } => {
            mgr.broadcast(
                room_id,
                &ServerMessage::ChatMessage {
                    user_id,
                    username,
                    text,
                    timestamp: now_ms(),
                },
                None,
            );
        },
        Outcome::Correct {
            username,
            points,
            position,
            total_players,
            drawer_id,
        } => {
            tracing::info!(
                room = %room_id, user = %user_id, points, position, total_players,
                "Correct guess"
            );
            // The word itself stays hidden until the round ends
            mgr.broadcast(
                room_id,
                &ServerMessage::CorrectGuess {
                    user_id,
                    username,
                    points_awarded: points,
                    position,
                    total_players,
                    drawer_user_id: drawer_id,
                },
                None,
            );
            mgr.broadcast_room_update(room_id);
            maybe_end_round_if_all_guessed(&mut mgr, state, room_id);
        },
        Outcome::Ignore => {},
    }
}

/// End the round early once every connected non-drawer has guessed.
/// Returns true when the round was ended.
fn maybe_end_round_if_all_guessed(mgr: &mut RoomManager, state: &AppState, room_id: RoomId) -> bool {
    let all_guessed = {
        let Some(room) = mgr.rooms.get(room_id) else {
            return false;
        };
        if room.phase != RoomPhase::Drawing {
            return false;
        }
        let Some(round) = room.current_round.as_ref() else {
            return false;
        };
        if round.is_paused() || round.word.is_none() {
            return false;
        }
        let drawer_id = round.drawer_user_id;
        let mut eligible = room
            .players
            .iter()
            .filter(|p| p.user_id != drawer_id && p.connected)
            .peekable();
        eligible.peek().is_some() && eligible.all(|p| p.has_guessed)
    };

    if all_guessed {
        tracing::info!(room = %room_id, "All players guessed correctly, ending round early");
        end_round_locked(mgr, state, room_id, RoundEndReason::AllGuessed);
    }
    all_guessed
}

/// Close out the current round: cancel phase timers, award the artist,
/// reveal the word, and schedule the next turn after the score display.
fn end_round_locked(
    mgr: &mut RoomManager,
    state: &AppState,
    room_id: RoomId,
    reason: RoundEndReason,
) {
    {
        let timers = mgr.timers_mut(room_id);
        timers.cancel_word_selection();
        timers.cancel_drawing();
        timers.cancel_reconnect();
    }

    let info = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        let round_time = room.settings.round_time_seconds;
        let Some(round) = room.current_round.as_ref() else {
            return;
        };
        let word = round.word.clone().unwrap_or_default();
        let drawer_id = round.drawer_user_id;
        let drawing_start = round.drawing_start_time;
        let round_number = round.round_number;

        // The artist is only rewarded for a round they saw through
        if matches!(reason, RoundEndReason::AllGuessed | RoundEndReason::Timeout) {
            let correct = room
                .players
                .iter()
                .filter(|p| p.user_id != drawer_id && p.has_guessed)
                .count();
            let first_guess = room.players.iter().filter_map(|p| p.guess_timestamp).min();
            let points = artist_score(correct, drawing_start, first_guess, round_time);
            if let Some(artist) = room.player_mut(drawer_id) {
                artist.score += points;
                tracing::info!(
                    room = %room_id, artist = %artist.user_id, points, correct,
                    "Artist scored"
                );
            }
        }

        room.phase = RoomPhase::RoundEnd;
        let scores: Vec<ScoreEntry> = room
            .players
            .iter()
            .map(|p| ScoreEntry {
                user_id: p.user_id,
                username: p.username.clone(),
                score: p.score,
            })
            .collect();
        (word, scores, round_number)
    };
    let (word, scores, round_number) = info;

    if reason == RoundEndReason::Timeout {
        mgr.broadcast(
            room_id,
            &ServerMessage::DrawingTimeout { word: word.clone() },
            None,
        );
    }
    mgr.broadcast(room_id, &ServerMessage::RoundEnd { word, scores }, None);

    arm_round_end(
        mgr,
        state,
        room_id,
        round_number,
        state.config.game.round_end_delay_secs * 1000,
    );
}

/// Final standings, then back to the waiting room; the room survives for a
/// fresh game.
fn end_game_locked(mgr: &mut RoomManager, room_id: RoomId) {
    mgr.clear_timers(room_id);

    let final_scores = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        room.phase = RoomPhase::Waiting;
        room.current_round = None;
        let mut scores: Vec<ScoreEntry> = room
            .players
            .iter()
            .map(|p| ScoreEntry {
                user_id: p.user_id,
                username: p.username.clone(),
                score: p.score,
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores
    };

    tracing::info!(room = %room_id, "Game ended");
    mgr.broadcast(room_id, &ServerMessage::GameEnd { final_scores }, None);
    mgr.broadcast_room_update(room_id);
}

fn total_rounds(mgr: &RoomManager, room_id: RoomId, turns_per_player: u32) -> u32 {
    mgr.rooms
        .get(room_id)
        .map(|r| r.connected_players().count() as u32 * turns_per_player)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------
//
// Each slot holds at most one task; arming aborts the previous handle. The
// callbacks re-check room, phase, round number, and pause state so that a
// handle that escaped cancellation is still harmless.

fn arm_word_selection(
    mgr: &mut RoomManager,
    state: &AppState,
    room_id: RoomId,
    round_number: u32,
    delay_ms: u64,
) {
    let st = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        on_word_selection_timeout(&st, room_id, round_number).await;
    });
    let timers = mgr.timers_mut(room_id);
    timers.cancel_word_selection();
    timers.word_selection = Some(handle);
}

fn arm_drawing(
    mgr: &mut RoomManager,
    state: &AppState,
    room_id: RoomId,
    round_number: u32,
    delay_ms: u64,
) {
    let st = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        on_drawing_timeout(&st, room_id, round_number).await;
    });
    let timers = mgr.timers_mut(room_id);
    timers.cancel_drawing();
    timers.drawing = Some(handle);
}

fn arm_round_end(
    mgr: &mut RoomManager,
    state: &AppState,
    room_id: RoomId,
    round_number: u32,
    delay_ms: u64,
) {
    let st = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        on_round_end_delay(&st, room_id, round_number).await;
    });
    let timers = mgr.timers_mut(room_id);
    timers.cancel_round_end();
    timers.round_end = Some(handle);
}

fn arm_reconnect(
    mgr: &mut RoomManager,
    state: &AppState,
    room_id: RoomId,
    round_number: u32,
    delay_ms: u64,
) {
    let st = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        on_reconnect_grace_expired(&st, room_id, round_number).await;
    });
    let timers = mgr.timers_mut(room_id);
    timers.cancel_reconnect();
    timers.reconnect = Some(handle);
}

/// Word-selection deadline: auto-pick one of the offered words and move on.
/// A normal forward-progress path, not an error.
async fn on_word_selection_timeout(state: &AppState, room_id: RoomId, round_number: u32) {
    let mut mgr = state.rooms.write().await;

    let picked = {
        let Some(room) = mgr.rooms.get_mut(room_id) else {
            return;
        };
        if room.phase != RoomPhase::WordSelection {
            return;
        }
        if room.connected_players().next().is_none() {
            // Nobody left to play for; abort silently
            return;
        }
        let Some(round) = room.current_round.as_mut() else {
            return;
        };
        if round.round_number != round_number || round.is_paused() || round.word.is_some() {
            return;
        }
        let Some(word) = round.word_choices.choose(&mut rand::rng()).cloned() else {
            return;
        };
        round.word = Some(word.clone());
        word
    };

    tracing::info!(room = %room_id, word = %picked, "Word selection timed out, auto-picked");
    mgr.broadcast(room_id, &ServerMessage::WordSelectionTimeout, None);
    start_drawing_phase_locked(&mut mgr, state, room_id);
}

/// Drawing deadline: the round ends with whatever guesses landed.
async fn on_drawing_timeout(state: &AppState, room_id: RoomId, round_number: u32) {
    let mut mgr = state.rooms.write().await;
    {
        let Some(room) = mgr.rooms.get(room_id) else {
            return;
        };
        if room.phase != RoomPhase::Drawing {
            return;
        }
        let Some(round) = room.current_round.as_ref() else {
            return;
        };
        if round.round_number != round_number || round.is_paused() {
            return;
        }
    }
    end_round_locked(&mut mgr, state, room_id, RoundEndReason::Timeout);
}

/// Score-display delay elapsed: move to the next turn.
async fn on_round_end_delay(state: &AppState, room_id: RoomId, round_number: u32) {
    let mut mgr = state.rooms.write().await;
    {
        let Some(room) = mgr.rooms.get(room_id) else {
            return;
        };
        if room.phase != RoomPhase::RoundEnd {
            return;
        }
        let Some(round) = room.current_round.as_ref() else {
            return;
        };
        if round.round_number != round_number {
            return;
        }
    }
    start_new_round_locked(&mut mgr, state, room_id);
}

/// The paused drawer never came back: force the round to end.
async fn on_reconnect_grace_expired(state: &AppState, room_id: RoomId, round_number: u32) {
    let mut mgr = state.rooms.write().await;
    {
        let Some(room) = mgr.rooms.get(room_id) else {
            return;
        };
        if !matches!(room.phase, RoomPhase::WordSelection | RoomPhase::Drawing) {
            return;
        }
        let Some(round) = room.current_round.as_ref() else {
            return;
        };
        if round.round_number != round_number || !round.is_paused() {
            return;
        }
    }
    tracing::info!(room = %room_id, "Drawer did not reconnect in time, ending round");
    end_round_locked(&mut mgr, state, room_id, RoundEndReason::DrawerTimeout);
}
