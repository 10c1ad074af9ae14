use std::collections::HashSet;

use crate::session::input::KeystrokeEvent;

const CHARS_PER_WORD: f64 = 5.0;
const MIN_ELAPSED_SECS: f64 = 1.0;

pub struct SessionState {
    pub text: Vec<char>,
    pub cursor: usize,
    /// Positions mistyped at least once before being typed correctly.
    pub error_positions: HashSet<usize>,
    pub start_timestamp: Option<u64>,
    pub keystroke_log: Vec<KeystrokeEvent>,
    pub combo_count: u32,
    pub max_combo: u32,
    pub total_typed_chars: usize,
    pub total_errors: usize,
    pub score: u64,
}

impl SessionState {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            cursor: 0,
            error_positions: HashSet::new(),
            start_timestamp: None,
            keystroke_log: Vec::new(),
            combo_count: 0,
            max_combo: 0,
            total_typed_chars: 0,
            total_errors: 0,
            score: 0,
        }
    }

    pub fn expected(&self) -> Option<char> {
        self.text.get(self.cursor).copied()
    }

    pub fn is_complete(&self) -> bool {
        !self.text.is_empty() && self.cursor >= self.text.len()
    }

    /// Wall time since the first keystroke. Zero before the session starts
    /// or when `now_ms` precedes the start.
    pub fn elapsed_secs(&self, now_ms: u64) -> f64 {
        match self.start_timestamp {
            Some(start) => now_ms.saturating_sub(start) as f64 / 1000.0,
            None => 0.0,
        }
    }

    pub fn wpm(&self, now_ms: u64) -> f64 {
        if self.start_timestamp.is_none() {
            return 0.0;
        }
        let elapsed = self.elapsed_secs(now_ms).max(MIN_ELAPSED_SECS);
        (self.cursor as f64 / CHARS_PER_WORD) / (elapsed / 60.0)
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_typed_chars == 0 {
            return 100.0;
        }
        let correct = self.total_typed_chars - self.total_errors;
        100.0 * correct as f64 / self.total_typed_chars as f64
    }

    pub fn progress(&self) -> f64 {
        if self.text.is_empty() {
            return 0.0;
        }
        self.cursor as f64 / self.text.len() as f64
    }
}
