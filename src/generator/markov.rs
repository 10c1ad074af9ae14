use std::collections::{HashMap, HashSet};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::GeneratorError;
use crate::generator::TextGenerator;
use crate::generator::corpus;

pub const FALLBACK_SENTENCE: &str = "The quick brown fox jumps over the lazy dog.";
const LENGTH_CAP_FACTOR: usize = 3;
const FOCUS_CANDIDATES: usize = 4;

type TokenId = u32;

/// Splits text into words and standalone punctuation marks. Apostrophes stay
/// inside a word when letters follow them ("don't"), otherwise they are
/// punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut word = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        let inner_apostrophe = ch == '\''
            && !word.is_empty()
            && chars.get(i + 1).is_some_and(|c| c.is_alphanumeric());
        if ch.is_alphanumeric() || inner_apostrophe {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if !ch.is_whitespace() {
            tokens.push(ch.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn is_punctuation(token: &str) -> bool {
    token.chars().next().is_some_and(|c| !c.is_alphanumeric())
}

fn ends_sentence(token: &str) -> bool {
    token.ends_with(['.', '!', '?'])
}

/// Joins tokens with single spaces, binding punctuation to the word before it.
pub fn join_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for token in tokens {
        if !out.is_empty() && !is_punctuation(token) {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

/// Word-level Markov chain. Every successor occurrence is stored, so frequent
/// continuations are proportionally more likely to be drawn.
#[derive(Clone, Debug)]
pub struct MarkovModel {
    order: usize,
    vocab: Vec<String>,
    ids: HashMap<String, TokenId>,
    transitions: HashMap<Vec<TokenId>, Vec<TokenId>>,
    start_states: Vec<Vec<TokenId>>,
}

impl MarkovModel {
    pub fn new(order: usize) -> Result<Self, GeneratorError> {
        if order == 0 {
            return Err(GeneratorError::InvalidOrder(order));
        }
        Ok(Self {
            order,
            vocab: Vec::new(),
            ids: HashMap::new(),
            transitions: HashMap::new(),
            start_states: Vec::new(),
        })
    }

    /// A model trained on the corpus bundled with the crate.
    pub fn with_default_corpus(order: usize) -> Result<Self, GeneratorError> {
        let mut model = Self::new(order)?;
        model.train(&corpus::default_corpus());
        Ok(model)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_trained(&self) -> bool {
        !self.start_states.is_empty()
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn start_state_count(&self) -> usize {
        self.start_states.len()
    }

    /// Rebuilds the chain from scratch. Previous training is discarded.
    pub fn train(&mut self, corpus_text: &str) {
        self.vocab.clear();
        self.ids.clear();
        self.transitions.clear();
        self.start_states.clear();

        let tokens: Vec<TokenId> = tokenize(corpus_text)
            .into_iter()
            .map(|t| self.intern(t))
            .collect();
        if tokens.len() < self.order {
            warn!(
                tokens = tokens.len(),
                order = self.order,
                "corpus too short to train"
            );
            return;
        }

        let mut seen_starts = HashSet::new();
        for (pos, window) in tokens.windows(self.order).enumerate() {
            if let Some(&next) = tokens.get(pos + self.order) {
                self.transitions
                    .entry(window.to_vec())
                    .or_default()
                    .push(next);
            }
            let opens_sentence = pos == 0
                || self.vocab[window[0] as usize]
                    .chars()
                    .next()
                    .is_some_and(char::is_uppercase);
            if opens_sentence && seen_starts.insert(window.to_vec()) {
                self.start_states.push(window.to_vec());
            }
        }

        info!(
            tokens = tokens.len(),
            vocab = self.vocab.len(),
            states = self.transitions.len(),
            starts = self.start_states.len(),
            "markov model trained"
        );
    }

    /// Produces a sentence of at least `min_length` tokens when the chain
    /// allows it. Stops at the first sentence end past `min_length`, at
    /// `3 * min_length` tokens, or at a state with no successors.
    pub fn generate<R: Rng + ?Sized>(&self, min_length: usize, rng: &mut R) -> String {
        let Some(start) = self.start_states.choose(rng) else {
            warn!("markov model is untrained, using fallback sentence");
            return FALLBACK_SENTENCE.to_string();
        };

        let min_length = min_length.max(1);
        let cap = min_length * LENGTH_CAP_FACTOR;
        let mut output: Vec<TokenId> = start.clone();

        loop {
            let last = output.last().map(|&id| self.vocab[id as usize].as_str());
            if output.len() >= min_length && last.is_some_and(ends_sentence) {
                break;
            }
            if output.len() >= cap {
                break;
            }
            let window = &output[output.len() - self.order..];
            let Some(&next) = self
                .transitions
                .get(window)
                .and_then(|successors| successors.choose(rng))
            else {
                debug!(len = output.len(), "markov dead end");
                break;
            };
            output.push(next);
        }

        output.truncate(cap);
        join_tokens(output.iter().map(|&id| self.vocab[id as usize].as_str()))
    }

    fn intern(&mut self, token: String) -> TokenId {
        if let Some(&id) = self.ids.get(&token) {
            return id;
        }
        let id = self.vocab.len() as TokenId;
        self.vocab.push(token.clone());
        self.ids.insert(token, id);
        id
    }
}

/// A trained model paired with its own seedable random source.
pub struct MarkovGenerator {
    model: MarkovModel,
    rng: SmallRng,
}

impl MarkovGenerator {
    pub fn new(model: MarkovModel, rng: SmallRng) -> Self {
        Self { model, rng }
    }

    pub fn seeded(model: MarkovModel, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self::new(model, rng)
    }

    pub fn model(&self) -> &MarkovModel {
        &self.model
    }

    /// Draws a few candidates and keeps the one that exercises `focus_keys`
    /// most often. The first candidate wins ties.
    pub fn generate_focused(&mut self, min_length: usize, focus_keys: &[char]) -> String {
        if focus_keys.is_empty() {
            return self.model.generate(min_length, &mut self.rng);
        }

        let mut best = String::new();
        let mut best_hits = 0;
        for i in 0..FOCUS_CANDIDATES {
            let candidate = self.model.generate(min_length, &mut self.rng);
            let hits = candidate
                .chars()
                .filter(|c| focus_keys.contains(c))
                .count();
            if i == 0 || hits > best_hits {
                best = candidate;
                best_hits = hits;
            }
        }
        debug!(hits = best_hits, ?focus_keys, "focused text selected");
        best
    }
}

impl TextGenerator for MarkovGenerator {
    fn generate(&mut self, min_length: usize) -> String {
        self.model.generate(min_length, &mut self.rng)
    }
}
