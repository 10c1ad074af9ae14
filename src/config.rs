use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::scoring::DEFAULT_BASE_POINTS;
use crate::engine::weakness::{
    DEFAULT_MIN_CONFIDENCE_TO_FLAG, DEFAULT_PRIOR_MEAN, DEFAULT_PRIOR_WEIGHT,
    DEFAULT_WEAKNESS_THRESHOLD, EstimatorParams,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_points")]
    pub base_points: u64,
    #[serde(default = "default_prior_mean")]
    pub prior_mean: f64,
    #[serde(default = "default_prior_weight")]
    pub prior_weight: f64,
    #[serde(default = "default_weakness_threshold")]
    pub weakness_threshold: f64,
    #[serde(default = "default_min_confidence_to_flag")]
    pub min_confidence_to_flag: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_life_secs: Option<u64>,
    #[serde(default = "default_markov_order")]
    pub markov_order: usize,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_base_points() -> u64 {
    DEFAULT_BASE_POINTS
}
fn default_prior_mean() -> f64 {
    DEFAULT_PRIOR_MEAN
}
fn default_prior_weight() -> f64 {
    DEFAULT_PRIOR_WEIGHT
}
fn default_weakness_threshold() -> f64 {
    DEFAULT_WEAKNESS_THRESHOLD
}
fn default_min_confidence_to_flag() -> f64 {
    DEFAULT_MIN_CONFIDENCE_TO_FLAG
}
fn default_markov_order() -> usize {
    2
}
fn default_min_length() -> usize {
    12
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_points: default_base_points(),
            prior_mean: default_prior_mean(),
            prior_weight: default_prior_weight(),
            weakness_threshold: default_weakness_threshold(),
            min_confidence_to_flag: default_min_confidence_to_flag(),
            half_life_secs: None,
            markov_order: default_markov_order(),
            min_length: default_min_length(),
            seed: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Missing files yield defaults; unreadable or malformed ones are errors.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typequest")
            .join("config.toml")
    }

    /// Resets out-of-range values to their defaults.
    pub fn normalize(&mut self) {
        if !(0.0..=1.0).contains(&self.prior_mean) {
            self.prior_mean = default_prior_mean();
        }
        if !(self.prior_weight > 0.0 && self.prior_weight.is_finite()) {
            self.prior_weight = default_prior_weight();
        }
        if !(0.0..=1.0).contains(&self.weakness_threshold) {
            self.weakness_threshold = default_weakness_threshold();
        }
        if !(0.0..=1.0).contains(&self.min_confidence_to_flag) {
            self.min_confidence_to_flag = default_min_confidence_to_flag();
        }
        if self.half_life_secs == Some(0) {
            self.half_life_secs = None;
        }
        if self.markov_order == 0 {
            self.markov_order = default_markov_order();
        }
        if self.min_length == 0 {
            self.min_length = default_min_length();
        }
    }

    pub fn estimator_params(&self) -> EstimatorParams {
        EstimatorParams {
            prior_mean: self.prior_mean,
            prior_weight: self.prior_weight,
            weakness_threshold: self.weakness_threshold,
            min_confidence_to_flag: self.min_confidence_to_flag,
            half_life_secs: self.half_life_secs,
        }
    }
}
