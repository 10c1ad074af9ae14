pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod session;

pub use engine::key_stats::{KeyObservation, KeyStatsStore, ObservationSink};
pub use engine::weakness::{EstimatorParams, WeaknessEstimator, WeaknessResult};
pub use error::{GeneratorError, SessionError};
pub use generator::TextGenerator;
pub use generator::markov::{MarkovGenerator, MarkovModel};
pub use session::engine::{KeystrokeOutcome, SessionEngine, SessionEvent, SessionPhase};
pub use session::result::PerformanceRecord;
