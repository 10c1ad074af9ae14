use serde::{Deserialize, Serialize};

use crate::engine::key_stats::{KeyObservation, KeyStatsStore};

pub const DEFAULT_PRIOR_MEAN: f64 = 0.9;
pub const DEFAULT_PRIOR_WEIGHT: f64 = 5.0;
pub const DEFAULT_WEAKNESS_THRESHOLD: f64 = 0.85;
pub const DEFAULT_MIN_CONFIDENCE_TO_FLAG: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorParams {
    /// Accuracy assumed for a key before any evidence.
    pub prior_mean: f64,
    /// How many virtual observations the prior is worth.
    pub prior_weight: f64,
    pub weakness_threshold: f64,
    pub min_confidence_to_flag: f64,
    /// Observations lose half their weight every `half_life_secs`, measured
    /// from the newest observation in the store. `None` weighs all history
    /// equally.
    pub half_life_secs: Option<u64>,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            prior_mean: DEFAULT_PRIOR_MEAN,
            prior_weight: DEFAULT_PRIOR_WEIGHT,
            weakness_threshold: DEFAULT_WEAKNESS_THRESHOLD,
            min_confidence_to_flag: DEFAULT_MIN_CONFIDENCE_TO_FLAG,
            half_life_secs: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaknessResult {
    pub key: char,
    pub accuracy_estimate: f64,
    pub confidence: f64,
    pub is_weak: bool,
    /// Effective observation count after recency weighting.
    pub samples: f64,
}

#[derive(Clone, Debug, Default)]
pub struct WeaknessEstimator {
    pub params: EstimatorParams,
}

impl WeaknessEstimator {
    pub fn new(params: EstimatorParams) -> Self {
        Self { params }
    }

    /// One result per observed key, in ascending key order.
    pub fn analyze_all_keys(&self, store: &KeyStatsStore) -> Vec<WeaknessResult> {
        let now_ms = store.latest_timestamp().unwrap_or(0);
        store
            .logs
            .iter()
            .filter(|(_, log)| !log.is_empty())
            .map(|(&key, log)| self.estimate(key, log, now_ms))
            .collect()
    }

    pub fn analyze_key(&self, store: &KeyStatsStore, key: char) -> Option<WeaknessResult> {
        let log = store.observations(key);
        if log.is_empty() {
            return None;
        }
        let now_ms = store.latest_timestamp().unwrap_or(0);
        Some(self.estimate(key, log, now_ms))
    }

    /// Weak keys only, weakest first.
    pub fn weakest_keys(&self, store: &KeyStatsStore, limit: usize) -> Vec<WeaknessResult> {
        let mut weak: Vec<WeaknessResult> = self
            .analyze_all_keys(store)
            .into_iter()
            .filter(|r| r.is_weak)
            .collect();
        weak.sort_by(|a, b| {
            a.accuracy_estimate
                .total_cmp(&b.accuracy_estimate)
                .then(a.key.cmp(&b.key))
        });
        weak.truncate(limit);
        weak
    }

    fn decay_weight(&self, age_ms: u64) -> f64 {
        match self.params.half_life_secs.filter(|&h| h > 0) {
            Some(half_life) => 0.5f64.powf(age_ms as f64 / (half_life as f64 * 1000.0)),
            None => 1.0,
        }
    }

    fn estimate(&self, key: char, log: &[KeyObservation], now_ms: u64) -> WeaknessResult {
        let (n, correct) = log.iter().fold((0.0, 0.0), |(n, correct), o| {
            let w = self.decay_weight(now_ms.saturating_sub(o.timestamp_ms));
            (n + w, if o.correct { correct + w } else { correct })
        });

        // Fully decayed logs leave n at 0; a zero prior would then divide 0 by 0.
        let prior_weight = self.params.prior_weight.max(f64::EPSILON);
        let accuracy_estimate =
            (correct + prior_weight * self.params.prior_mean) / (n + prior_weight);
        let confidence = n / (n + prior_weight);
        let is_weak = accuracy_estimate < self.params.weakness_threshold
            && confidence >= self.params.min_confidence_to_flag;

        WeaknessResult {
            key,
            accuracy_estimate,
            confidence,
            is_weak,
            samples: n,
        }
    }
}
