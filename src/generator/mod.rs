pub mod corpus;
pub mod markov;

/// Source of exercise text, so a caller can swap a trained chain for a
/// static lesson list.
pub trait TextGenerator {
    fn generate(&mut self, min_length: usize) -> String;
}
