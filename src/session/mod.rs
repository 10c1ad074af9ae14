pub mod engine;
pub mod input;
pub mod replay;
pub mod result;
pub mod state;
