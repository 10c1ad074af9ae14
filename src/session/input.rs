use serde::{Deserialize, Serialize};

use crate::engine::scoring;
use crate::session::state::SessionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeEvent {
    pub character: char,
    pub expected: char,
    pub timestamp_ms: u64,
    pub correct: bool,
}

/// Applies one keystroke to the session. Returns `None` when there is no
/// character left to compare against.
///
/// A mismatch never advances the cursor: the same position has to be typed
/// correctly before the session moves on.
pub fn process_char(
    state: &mut SessionState,
    ch: char,
    timestamp_ms: u64,
    base_points: u64,
) -> Option<KeystrokeEvent> {
    let expected = state.expected()?;

    if state.start_timestamp.is_none() {
        state.start_timestamp = Some(timestamp_ms);
    }

    let correct = ch == expected;
    if correct {
        state.cursor += 1;
        state.combo_count += 1;
        state.max_combo = state.max_combo.max(state.combo_count);
        state.score = state
            .score
            .saturating_add(scoring::keystroke_points(base_points, state.combo_count));
    } else {
        state.error_positions.insert(state.cursor);
        state.combo_count = 0;
        state.total_errors += 1;
    }
    state.total_typed_chars += 1;

    let event = KeystrokeEvent {
        character: ch,
        expected,
        timestamp_ms,
        correct,
    };
    state.keystroke_log.push(event);
    Some(event)
}
