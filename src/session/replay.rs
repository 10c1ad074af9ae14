use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::key_stats::ObservationSink;
use crate::session::engine::{RecordedKeystroke, SessionEngine};
use crate::session::result::PerformanceRecord;

/// A recorded exercise: the target text and every keystroke with its
/// wall-clock timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub text: String,
    pub keystrokes: Vec<RecordedKeystroke>,
}

impl ReplayLog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading replay log {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing replay log {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replays the log into `sink`. `None` when the log stops before the end
    /// of the text; an error when the log has no text to type.
    pub fn run<S: ObservationSink + ?Sized>(
        &self,
        base_points: u64,
        sink: &mut S,
    ) -> Result<Option<PerformanceRecord>> {
        let (_, record) = SessionEngine::replay(&self.text, &self.keystrokes, base_points, sink)
            .context("replaying log")?;
        Ok(record)
    }
}
