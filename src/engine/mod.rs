pub mod key_stats;
pub mod scoring;
pub mod weakness;
