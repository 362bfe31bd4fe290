//! Point awards for guessers and drawers.
//!
//! Pure functions of timestamps and guess order; the turn engine feeds them
//! and is tested separately. Policy: weighted time/position scoring (base +
//! time bonus + position bonus for guessers, base + per-guess bonus + speed
//! bonus for the artist).

const GUESSER_BASE: i64 = 100;
const GUESSER_TIME_BONUS_MAX: f64 = 100.0;
const POSITION_BONUS_STEP: i64 = 10;

const ARTIST_BASE: i64 = 50;
const ARTIST_PER_GUESS: i64 = 25;
const ARTIST_SPEED_BONUS: i64 = 50;

/// Points for a correct guess.
///
/// `position` is 1 for the first correct guesser; `total_eligible` counts
/// the connected non-drawer players this round. The time bonus decays
/// linearly from 100 to 0 across the drawing window.
pub fn guesser_score(
    guess_timestamp_ms: u64,
    drawing_start_ms: u64,
    max_time_secs: u64,
    position: usize,
    total_eligible: usize,
) -> i64 {
    let elapsed_secs = guess_timestamp_ms.saturating_sub(drawing_start_ms) as f64 / 1000.0;
    let time_bonus = (GUESSER_TIME_BONUS_MAX
        - (elapsed_secs / max_time_secs.max(1) as f64) * GUESSER_TIME_BONUS_MAX)
        .round()
        .max(0.0) as i64;
    let position_bonus = (total_eligible as i64 - position as i64 + 1) * POSITION_BONUS_STEP;

    GUESSER_BASE + time_bonus + position_bonus
}

/// Points for the drawer at round end.
///
/// The speed bonus applies when the first correct guess landed within the
/// first half of the drawing window.
pub fn artist_score(
    correct_guess_count: usize,
    drawing_start_ms: u64,
    first_guess_timestamp_ms: Option<u64>,
    max_time_secs: u64,
) -> i64 {
    let guess_bonus = correct_guess_count as i64 * ARTIST_PER_GUESS;

    let speed_bonus = match first_guess_timestamp_ms {
        Some(first) => {
            let elapsed_secs = first.saturating_sub(drawing_start_ms) as f64 / 1000.0;
            if elapsed_secs < max_time_secs as f64 / 2.0 {
                ARTIST_SPEED_BONUS
            } else {
                0
            }
        },
        None => 0,
    };

    ARTIST_BASE + guess_bonus + speed_bonus
}
