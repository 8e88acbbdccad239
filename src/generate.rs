//! Autoregressive text generation from any probability-producing model.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::config::GenerateConfig;
use crate::corpus::{Token, SENTENCE_END, SENTENCE_START};
use crate::error::{NgramError, Result};
use crate::model::{LanguageModel, NgramModel};

/// Floor applied to smoothed probabilities so no candidate weight is zero.
const PROB_FLOOR: f64 = 1e-12;

/// Where the sampler finds its next-token candidates.
///
/// An explicit descriptor instead of runtime probing: a raw counting model
/// exposes its next-token count tables directly, while smoothed strategies are
/// scored against a caller-supplied vocabulary.
#[derive(Debug, Clone, Copy)]
pub enum Candidates<'a> {
    /// Draw from the raw next-token counts of a counting model; generation
    /// stops when the current context was never observed.
    RawCounts(&'a NgramModel),
    /// Score every vocabulary word through the model's `prob`, floored at
    /// `1e-12`. The slice should be sorted for reproducible draws.
    Vocabulary(&'a [Token]),
}

/// Generates one token sequence from `model`.
///
/// The sequence is seeded with `order - 1` start markers; each step conditions
/// on the trailing `order - 1` tokens, applies the temperature transform
/// `w^(1 / temperature)` to the candidate weights, and draws one token from the
/// resulting categorical distribution. Generation stops after `max_len` steps,
/// on the end marker, when a raw-counts context is unknown, or when the
/// transformed weights collapse to zero. The returned sequence excludes the
/// leading padding.
///
/// # Errors
/// Returns [`NgramError::InvalidConfig`] for an invalid configuration or an
/// empty candidate vocabulary, since generation is impossible without a
/// candidate set.
pub fn generate(
    model: &dyn LanguageModel,
    candidates: Candidates<'_>,
    cfg: &GenerateConfig,
    rng: &mut StdRng,
) -> Result<Vec<Token>> {
    cfg.validate()?;
    if let Candidates::Vocabulary(vocab) = candidates {
        if vocab.is_empty() {
            return Err(NgramError::InvalidConfig(
                "generation requires a non-empty vocabulary".into(),
            ));
        }
    }

    let context_len = model.order().saturating_sub(1);
    let mut sequence: Vec<Token> = vec![SENTENCE_START.to_owned(); context_len];
    let exponent = 1.0 / cfg.temperature;

    for _ in 0..cfg.max_len {
        let context = &sequence[sequence.len() - context_len..];
        let step: Vec<(&str, f64)> = match candidates {
            Candidates::RawCounts(counts) => {
                let Some(next_tokens) = counts.context_candidates(context) else {
                    break;
                };
                let mut step: Vec<(&str, f64)> = next_tokens
                    .iter()
                    .map(|(word, &count)| (word.as_str(), count as f64))
                    .collect();
                // Stable order so a fixed seed yields a fixed sequence.
                step.sort_unstable_by(|a, b| a.0.cmp(b.0));
                step
            }
            Candidates::Vocabulary(vocab) => vocab
                .iter()
                .map(|word| (word.as_str(), model.prob(context, word).max(PROB_FLOOR)))
                .collect(),
        };

        let weights: Vec<f64> = step.iter().map(|(_, weight)| weight.powf(exponent)).collect();
        let Ok(distribution) = WeightedIndex::new(&weights) else {
            // All weights collapsed to zero under the temperature transform.
            break;
        };
        let next = step[distribution.sample(rng)].0.to_owned();
        let finished = next == SENTENCE_END;
        sequence.push(next);
        if finished {
            break;
        }
    }

    Ok(sequence.split_off(context_len))
}
