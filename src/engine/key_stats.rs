use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyObservation {
    pub key: char,
    pub correct: bool,
    pub timestamp_ms: u64,
}

/// Anything that accepts per-key outcomes from a running session.
pub trait ObservationSink {
    fn record(&mut self, observation: KeyObservation);
}

impl ObservationSink for Vec<KeyObservation> {
    fn record(&mut self, observation: KeyObservation) {
        self.push(observation);
    }
}

/// Append-only ledger of keystroke outcomes, one ordered log per key.
///
/// Logs are keyed in a `BTreeMap` so every query walks keys in the same
/// order, which keeps weakness snapshots reproducible.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KeyStatsStore {
    pub logs: BTreeMap<char, Vec<KeyObservation>>,
}

impl KeyStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self, key: char) -> &[KeyObservation] {
        self.logs.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.logs.keys().copied()
    }

    pub fn total_observations(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }

    /// Newest timestamp across every key, used as "now" for recency decay.
    pub fn latest_timestamp(&self) -> Option<u64> {
        self.logs
            .values()
            .filter_map(|log| log.iter().map(|o| o.timestamp_ms).max())
            .max()
    }

    /// Drops observations strictly older than `cutoff_ms`. Keys left with an
    /// empty log are removed so they read as never observed.
    pub fn prune_before(&mut self, cutoff_ms: u64) -> usize {
        let mut removed = 0;
        self.logs.retain(|_, log| {
            let before = log.len();
            log.retain(|o| o.timestamp_ms >= cutoff_ms);
            removed += before - log.len();
            !log.is_empty()
        });
        removed
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }
}

impl ObservationSink for KeyStatsStore {
    fn record(&mut self, observation: KeyObservation) {
        self.logs.entry(observation.key).or_default().push(observation);
    }
}
