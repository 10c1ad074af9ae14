use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::key_stats::{KeyObservation, ObservationSink};
use crate::engine::scoring::{self, COMBO_TIERS, DEFAULT_BASE_POINTS};
use crate::error::SessionError;
use crate::session::input::{self, KeystrokeEvent};
use crate::session::result::PerformanceRecord;
use crate::session::state::SessionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
    Complete,
    Abandoned,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    ComboMilestone { level: u8, combo: u32, multiplier: u32 },
    ComboBroken { lost: u32 },
    SessionComplete(PerformanceRecord),
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeystrokeOutcome {
    pub cursor: usize,
    pub correct: bool,
    pub combo: u32,
    pub combo_level: u8,
    pub multiplier: u32,
    /// Ordered: milestones come before completion.
    pub events: Vec<SessionEvent>,
    pub record: Option<PerformanceRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbandonReport {
    pub cursor: usize,
    pub total_typed_chars: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LiveMetrics {
    pub cursor: usize,
    pub progress: f64,
    pub wpm: f64,
    pub accuracy: f64,
    pub combo: u32,
    pub combo_level: u8,
    pub multiplier: u32,
    pub score: u64,
}

/// Recorded input for deterministic replays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedKeystroke {
    pub character: char,
    pub timestamp_ms: u64,
}

/// Drives a single exercise from the first keystroke to completion.
///
/// Timestamps are supplied by the caller, so feeding the same keystroke log
/// always produces the same outcomes and the same record.
pub struct SessionEngine {
    state: SessionState,
    phase: SessionPhase,
    base_points: u64,
}

impl SessionEngine {
    pub fn new(text: &str) -> Result<Self, SessionError> {
        Self::with_base_points(text, DEFAULT_BASE_POINTS)
    }

    /// Empty text is rejected: a session must have at least one character
    /// to reach completion.
    pub fn with_base_points(text: &str, base_points: u64) -> Result<Self, SessionError> {
        if text.is_empty() {
            return Err(SessionError::EmptyText);
        }
        Ok(Self {
            state: SessionState::new(text),
            phase: SessionPhase::Idle,
            base_points,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn keystroke_log(&self) -> &[KeystrokeEvent] {
        &self.state.keystroke_log
    }

    pub fn submit_keystroke<S: ObservationSink + ?Sized>(
        &mut self,
        ch: char,
        timestamp_ms: u64,
        sink: &mut S,
    ) -> Result<KeystrokeOutcome, SessionError> {
        match self.phase {
            SessionPhase::Complete => {
                warn!(?ch, "keystroke submitted to a completed session");
                return Err(SessionError::AlreadyComplete);
            }
            SessionPhase::Abandoned => {
                warn!(?ch, "keystroke submitted to an abandoned session");
                return Err(SessionError::Abandoned);
            }
            SessionPhase::Idle | SessionPhase::Active => {}
        }

        let combo_before = self.state.combo_count;
        let Some(event) =
            input::process_char(&mut self.state, ch, timestamp_ms, self.base_points)
        else {
            return Err(SessionError::EmptyText);
        };

        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Active;
            debug!(timestamp_ms, "session started");
        }

        // Misses are charged to the key that should have been pressed.
        sink.record(KeyObservation {
            key: event.expected,
            correct: event.correct,
            timestamp_ms,
        });

        let mut events = Vec::new();
        if event.correct {
            if let Some((level, tier)) = scoring::tier_crossed(self.state.combo_count) {
                debug!(level, combo = tier.threshold, "combo milestone");
                events.push(SessionEvent::ComboMilestone {
                    level,
                    combo: tier.threshold,
                    multiplier: tier.multiplier,
                });
            }
        } else if combo_before >= COMBO_TIERS[0].threshold {
            events.push(SessionEvent::ComboBroken { lost: combo_before });
        }

        let mut record = None;
        if self.state.is_complete() {
            self.phase = SessionPhase::Complete;
            let completed = PerformanceRecord::from_session(&self.state, timestamp_ms);
            info!(
                wpm = completed.wpm,
                accuracy = completed.accuracy,
                score = completed.score,
                max_combo = completed.max_combo,
                "session complete"
            );
            events.push(SessionEvent::SessionComplete(completed.clone()));
            record = Some(completed);
        }

        Ok(self.outcome(event.correct, events, record))
    }

    /// Discards the current session without a record and starts over idle.
    /// Empty text is rejected and leaves the current session untouched.
    pub fn reset_session(&mut self, text: &str) -> Result<(), SessionError> {
        if text.is_empty() {
            warn!("reset with empty text rejected");
            return Err(SessionError::EmptyText);
        }
        if self.phase == SessionPhase::Active {
            debug!(cursor = self.state.cursor, "active session discarded by reset");
        }
        self.state = SessionState::new(text);
        self.phase = SessionPhase::Idle;
        Ok(())
    }

    /// Marks an unfinished session abandoned. No record is produced.
    pub fn abandon(&mut self) -> Option<AbandonReport> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Active => {
                self.phase = SessionPhase::Abandoned;
                info!(cursor = self.state.cursor, "session abandoned");
                Some(AbandonReport {
                    cursor: self.state.cursor,
                    total_typed_chars: self.state.total_typed_chars,
                })
            }
            SessionPhase::Complete | SessionPhase::Abandoned => None,
        }
    }

    pub fn live_metrics(&self, now_ms: u64) -> LiveMetrics {
        let combo = self.state.combo_count;
        LiveMetrics {
            cursor: self.state.cursor,
            progress: self.state.progress(),
            wpm: self.state.wpm(now_ms),
            accuracy: self.state.accuracy(),
            combo,
            combo_level: scoring::combo_level(combo),
            multiplier: scoring::multiplier_for_combo(combo),
            score: self.state.score,
        }
    }

    /// Feeds a recorded keystroke log through a fresh engine. Keystrokes after
    /// completion are ignored. Returns the record if the log finishes the text.
    pub fn replay<S: ObservationSink + ?Sized>(
        text: &str,
        keystrokes: &[RecordedKeystroke],
        base_points: u64,
        sink: &mut S,
    ) -> Result<(Self, Option<PerformanceRecord>), SessionError> {
        let mut engine = Self::with_base_points(text, base_points)?;
        let mut record = None;
        for ks in keystrokes {
            match engine.submit_keystroke(ks.character, ks.timestamp_ms, sink) {
                Ok(outcome) => {
                    if outcome.record.is_some() {
                        record = outcome.record;
                    }
                }
                Err(_) => break,
            }
        }
        Ok((engine, record))
    }

    fn outcome(
        &self,
        correct: bool,
        events: Vec<SessionEvent>,
        record: Option<PerformanceRecord>,
    ) -> KeystrokeOutcome {
        let combo = self.state.combo_count;
        KeystrokeOutcome {
            cursor: self.state.cursor,
            correct,
            combo,
            combo_level: scoring::combo_level(combo),
            multiplier: scoring::multiplier_for_combo(combo),
            events,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::key_stats::KeyStatsStore;

    fn type_all(engine: &mut SessionEngine, sink: &mut Vec<KeyObservation>, chars: &str, t0: u64) {
        for (i, ch) in chars.chars().enumerate() {
            engine
                .submit_keystroke(ch, t0 + i as u64 * 100, sink)
                .unwrap();
        }
    }

    #[test]
    fn test_phase_transitions() {
        let mut engine = SessionEngine::new("hi").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        assert_eq!(engine.phase(), SessionPhase::Idle);

        engine.submit_keystroke('h', 1_000, &mut sink).unwrap();
        assert_eq!(engine.phase(), SessionPhase::Active);
        assert_eq!(engine.state().start_timestamp, Some(1_000));

        let outcome = engine.submit_keystroke('i', 1_100, &mut sink).unwrap();
        assert_eq!(engine.phase(), SessionPhase::Complete);
        assert!(outcome.record.is_some());
        assert!(matches!(
            outcome.events.last(),
            Some(SessionEvent::SessionComplete(_))
        ));
    }

    #[test]
    fn test_cat_with_one_typo() {
        let mut engine = SessionEngine::new("cat").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        let mut record = None;
        for (i, ch) in ['c', 'a', 'x', 't'].into_iter().enumerate() {
            let outcome = engine.submit_keystroke(ch, i as u64 * 250, &mut sink).unwrap();
            if outcome.record.is_some() {
                record = outcome.record;
            }
        }
        let state = engine.state();
        assert_eq!(state.cursor, 3);
        assert_eq!(state.total_errors, 1);
        assert_eq!(state.total_typed_chars, 4);
        assert_eq!(record.unwrap().accuracy, 75.0);
    }

    #[test]
    fn test_miss_is_charged_to_expected_key() {
        let mut engine = SessionEngine::new("ab").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        engine.submit_keystroke('a', 0, &mut sink).unwrap();
        engine.submit_keystroke('z', 10, &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].key, 'b');
        assert!(!sink[1].correct);
        assert_eq!(sink[1].timestamp_ms, 10);
    }

    #[test]
    fn test_submit_after_complete_fails_loudly() {
        let mut engine = SessionEngine::new("a").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        engine.submit_keystroke('a', 0, &mut sink).unwrap();
        assert_eq!(
            engine.submit_keystroke('a', 10, &mut sink),
            Err(SessionError::AlreadyComplete)
        );
        assert_eq!(engine.state().total_typed_chars, 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_completion_fires_exactly_once() {
        let mut engine = SessionEngine::new("ok").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        let mut completions = 0;
        for (i, ch) in ['o', 'x', 'k', 'k'].into_iter().enumerate() {
            if let Ok(outcome) = engine.submit_keystroke(ch, i as u64, &mut sink) {
                completions += outcome
                    .events
                    .iter()
                    .filter(|e| matches!(e, SessionEvent::SessionComplete(_)))
                    .count();
            }
        }
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_milestone_fires_once_per_crossing() {
        let text = "a".repeat(30);
        let mut engine = SessionEngine::new(&text).unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        let mut milestones = Vec::new();
        for i in 0..12u64 {
            let outcome = engine.submit_keystroke('a', i, &mut sink).unwrap();
            for ev in outcome.events {
                if let SessionEvent::ComboMilestone { level, combo, .. } = ev {
                    milestones.push((level, combo));
                }
            }
        }
        assert_eq!(milestones, vec![(1, 10)]);

        // Break the combo, then cross the first tier again.
        let outcome = engine.submit_keystroke('x', 20, &mut sink).unwrap();
        assert_eq!(outcome.events, vec![SessionEvent::ComboBroken { lost: 12 }]);
        assert_eq!(outcome.multiplier, 1);
        for i in 0..10u64 {
            let outcome = engine.submit_keystroke('a', 30 + i, &mut sink).unwrap();
            for ev in outcome.events {
                if let SessionEvent::ComboMilestone { level, combo, .. } = ev {
                    milestones.push((level, combo));
                }
            }
        }
        assert_eq!(milestones, vec![(1, 10), (1, 10)]);
    }

    #[test]
    fn test_small_combo_break_is_silent() {
        let mut engine = SessionEngine::new("abc").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        engine.submit_keystroke('a', 0, &mut sink).unwrap();
        let outcome = engine.submit_keystroke('q', 1, &mut sink).unwrap();
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.combo, 0);
    }

    #[test]
    fn test_reset_discards_state() {
        let mut engine = SessionEngine::new("abc").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        type_all(&mut engine, &mut sink, "ab", 0);
        engine.reset_session("xyz").unwrap();

        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert_eq!(engine.state().cursor, 0);
        assert_eq!(engine.state().total_typed_chars, 0);
        assert!(engine.state().start_timestamp.is_none());
        assert_eq!(engine.state().expected(), Some('x'));
    }

    #[test]
    fn test_abandon_reports_and_blocks_input() {
        let mut engine = SessionEngine::new("abc").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        type_all(&mut engine, &mut sink, "a", 0);

        let report = engine.abandon().unwrap();
        assert_eq!(report.cursor, 1);
        assert_eq!(engine.phase(), SessionPhase::Abandoned);
        assert_eq!(
            engine.submit_keystroke('b', 500, &mut sink),
            Err(SessionError::Abandoned)
        );
        assert!(engine.abandon().is_none());

        engine.reset_session("abc").unwrap();
        assert!(engine.submit_keystroke('a', 600, &mut sink).is_ok());
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert_eq!(SessionEngine::new("").err(), Some(SessionError::EmptyText));
        assert_eq!(
            SessionEngine::replay("", &[], 10, &mut Vec::<KeyObservation>::new()).err(),
            Some(SessionError::EmptyText)
        );
    }

    #[test]
    fn test_reset_to_empty_text_keeps_session() {
        let mut engine = SessionEngine::new("abc").unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        type_all(&mut engine, &mut sink, "a", 0);

        assert_eq!(engine.reset_session(""), Err(SessionError::EmptyText));
        assert_eq!(engine.phase(), SessionPhase::Active);
        assert_eq!(engine.state().cursor, 1);
        assert_eq!(engine.state().expected(), Some('b'));
    }

    #[test]
    fn test_full_combo_ladder_to_hundred() {
        let text = "a".repeat(100);
        let mut engine = SessionEngine::new(&text).unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        let mut events = Vec::new();
        for i in 0..100u64 {
            let outcome = engine.submit_keystroke('a', i * 100, &mut sink).unwrap();
            events.extend(outcome.events);
        }

        let milestones: Vec<(u8, u32, u32)> = events
            .iter()
            .filter_map(|ev| match ev {
                SessionEvent::ComboMilestone { level, combo, multiplier } => {
                    Some((*level, *combo, *multiplier))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            milestones,
            vec![(1, 10, 2), (2, 25, 3), (3, 50, 4), (4, 100, 5)]
        );
        // The last keystroke crosses the top tier and completes the text.
        assert_eq!(events.len(), 5);
        assert!(matches!(
            events[3],
            SessionEvent::ComboMilestone { combo: 100, .. }
        ));
        let Some(SessionEvent::SessionComplete(record)) = events.last() else {
            panic!("expected a completion event last, got {events:?}");
        };

        // 9 at 1x, 15 at 2x, 25 at 3x, 50 at 4x, the 100th at 5x.
        let expected = 9 * 10 + 15 * 20 + 25 * 30 + 50 * 40 + 50;
        assert_eq!(engine.state().score, expected);
        assert_eq!(record.score, expected);
        assert_eq!(record.max_combo, 100);
        assert_eq!(engine.phase(), SessionPhase::Complete);
    }

    #[test]
    fn test_live_metrics() {
        let mut engine = SessionEngine::new(&"a".repeat(20)).unwrap();
        let mut sink: Vec<KeyObservation> = Vec::new();
        for i in 0..10u64 {
            engine.submit_keystroke('a', i * 600, &mut sink).unwrap();
        }
        let live = engine.live_metrics(6_000);
        assert_eq!(live.cursor, 10);
        assert!((live.progress - 0.5).abs() < 1e-9);
        // (10 / 5) / (6 / 60) = 20
        assert!((live.wpm - 20.0).abs() < 1e-9);
        assert_eq!(live.combo_level, 1);
        assert_eq!(live.multiplier, 2);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let keystrokes: Vec<RecordedKeystroke> = "thw the"
            .chars()
            .enumerate()
            .map(|(i, character)| RecordedKeystroke {
                character,
                timestamp_ms: 5_000 + i as u64 * 180,
            })
            .collect();
        let mut first_store = KeyStatsStore::new();
        let mut second_store = KeyStatsStore::new();

        let (_, first) = SessionEngine::replay("the", &keystrokes, 10, &mut first_store).unwrap();
        let (_, second) =
            SessionEngine::replay("the", &keystrokes, 10, &mut second_store).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(first_store.logs, second_store.logs);
    }
}
