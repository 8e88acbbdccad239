//! The counting model and the probability capability shared by every predictor.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::corpus::{Sentence, Token, SENTENCE_START};
use crate::error::{NgramError, Result};
use crate::evaluate;

/// Capability implemented by everything that assigns a probability to a
/// `(context, word)` pair: the raw counting model and all smoothing strategies.
///
/// `prob` must be pure; implementations never mutate the underlying counts.
/// Backoff scores are not normalised distributions but are used through the
/// same interface by convention.
pub trait LanguageModel {
    /// Window size this model conditions on (context length plus one).
    fn order(&self) -> usize;

    /// Probability (or backoff score) of `word` following `context`.
    ///
    /// `context` may be longer than the model requires; implementations use
    /// the trailing tokens they need.
    fn prob(&self, context: &[Token], word: &str) -> f64;
}

/// Frequency tables for a single fixed order `n`.
///
/// # Invariants
/// - `n >= 1`, fixed at construction.
/// - For every context `c`, `context_counts[c]` equals the sum of
///   `counts[c]` values.
/// - `vocab` holds every token observed as a next token during training.
///
/// The model is populated by one [`NgramModel::train`] pass and is read-only
/// afterwards; smoothing strategies, the evaluator, and the sampler all borrow
/// it immutably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgramModel {
    n: usize,
    counts: FxHashMap<Vec<Token>, FxHashMap<Token, u64>>,
    context_counts: FxHashMap<Vec<Token>, u64>,
    vocab: FxHashSet<Token>,
}

impl NgramModel {
    /// Creates an empty model of order `n`.
    ///
    /// # Errors
    /// Returns [`NgramError::InvalidConfig`] if `n` is zero.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(NgramError::InvalidConfig(
                "model order must be at least 1".into(),
            ));
        }
        Ok(Self {
            n,
            counts: FxHashMap::default(),
            context_counts: FxHashMap::default(),
            vocab: FxHashSet::default(),
        })
    }

    /// Accumulates counts from a tokenized corpus.
    ///
    /// Every sentence is left-padded with `n - 1` start markers and a window of
    /// size `n` slides across it, incrementing the `(context, word)` count, the
    /// cached context total, and the vocabulary.
    ///
    /// Calling `train` twice double-counts; train exactly once per instance.
    pub fn train(&mut self, data: &[Sentence]) {
        for sentence in data {
            let padded = pad_sentence(sentence, self.n);
            for window in padded.windows(self.n) {
                let (context, word) = window.split_at(self.n - 1);
                let word = &word[0];
                *self
                    .counts
                    .entry(context.to_vec())
                    .or_default()
                    .entry(word.clone())
                    .or_insert(0) += 1;
                *self.context_counts.entry(context.to_vec()).or_insert(0) += 1;
                if !self.vocab.contains(word) {
                    self.vocab.insert(word.clone());
                }
            }
        }
    }

    /// Maximum-likelihood probability of `word` following `context`.
    ///
    /// Returns `0.0` when the context was never observed or has a zero total.
    #[must_use]
    pub fn prob(&self, context: &[Token], word: &str) -> f64 {
        let total = self.context_total(context);
        if total == 0 {
            return 0.0;
        }
        self.count(context, word) as f64 / total as f64
    }

    /// Perplexity of this model on `data`; identical to scoring it through
    /// [`evaluate::perplexity`].
    #[must_use]
    pub fn perplexity(&self, data: &[Sentence]) -> f64 {
        evaluate::perplexity(self, data)
    }

    /// The order `n` fixed at construction.
    #[must_use]
    pub fn order(&self) -> usize {
        self.n
    }

    /// Raw count for a `(context, word)` pair; zero when unseen.
    #[must_use]
    pub fn count(&self, context: &[Token], word: &str) -> u64 {
        self.counts
            .get(context)
            .and_then(|next| next.get(word))
            .copied()
            .unwrap_or(0)
    }

    /// Cached total count for a context; zero when unseen.
    #[must_use]
    pub fn context_total(&self, context: &[Token]) -> u64 {
        self.context_counts.get(context).copied().unwrap_or(0)
    }

    /// Next-token counts under `context`, if the context was observed.
    #[must_use]
    pub fn context_candidates(&self, context: &[Token]) -> Option<&FxHashMap<Token, u64>> {
        self.counts.get(context)
    }

    /// Iterates over every observed context.
    pub fn contexts(&self) -> impl Iterator<Item = &[Token]> {
        self.counts.keys().map(Vec::as_slice)
    }

    /// Set of tokens observed as next tokens during training.
    #[must_use]
    pub fn vocab(&self) -> &FxHashSet<Token> {
        &self.vocab
    }

    /// Number of distinct tokens in the vocabulary.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Vocabulary as a sorted list, suitable for deterministic sampling.
    #[must_use]
    pub fn sorted_vocab(&self) -> Vec<Token> {
        let mut vocab: Vec<Token> = self.vocab.iter().cloned().collect();
        vocab.sort_unstable();
        vocab
    }
}

impl LanguageModel for NgramModel {
    fn order(&self) -> usize {
        self.n
    }

    fn prob(&self, context: &[Token], word: &str) -> f64 {
        NgramModel::prob(self, context, word)
    }
}

/// Left-pads a sentence with `n - 1` start markers.
pub(crate) fn pad_sentence(sentence: &[Token], n: usize) -> Vec<Token> {
    let mut padded = Vec::with_capacity(n - 1 + sentence.len());
    padded.resize(n - 1, SENTENCE_START.to_owned());
    padded.extend_from_slice(sentence);
    padded
}
