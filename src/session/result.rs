use serde::{Deserialize, Serialize};

use crate::session::state::SessionState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub wpm: f64,
    /// Percentage, 0 to 100.
    pub accuracy: f64,
    /// Unclamped wall time between the first and the last keystroke.
    pub duration_secs: f64,
    pub max_combo: u32,
    pub score: u64,
    #[serde(default)]
    pub chars: usize,
    #[serde(default)]
    pub total_typed_chars: usize,
    #[serde(default)]
    pub total_errors: usize,
}

impl PerformanceRecord {
    pub fn from_session(state: &SessionState, now_ms: u64) -> Self {
        Self {
            wpm: state.wpm(now_ms),
            accuracy: state.accuracy(),
            duration_secs: state.elapsed_secs(now_ms),
            max_combo: state.max_combo,
            score: state.score,
            chars: state.text.len(),
            total_typed_chars: state.total_typed_chars,
            total_errors: state.total_errors,
        }
    }
}
