//! Smoothing strategies layered over trained counting models.
//!
//! All three strategies are read-only views: they borrow their
//! [`NgramModel`]s and never mutate them.

use log::warn;

use crate::corpus::Token;
use crate::error::{NgramError, Result};
use crate::model::{LanguageModel, NgramModel};

/// Tolerance used when warning about interpolation weights that do not sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Keeps the trailing `keep` tokens of a context; empty for unigram models.
fn truncate(context: &[Token], keep: usize) -> &[Token] {
    &context[context.len().saturating_sub(keep)..]
}

/// Add-one (Laplace) smoothing over a single counting model.
///
/// Every `(context, word)` pair receives strictly positive probability as long
/// as the wrapped model's vocabulary is non-empty, which removes the
/// zero-probability perplexity blowups of the raw counts.
#[derive(Debug, Clone, Copy)]
pub struct Laplace<'a> {
    model: &'a NgramModel,
}

impl<'a> Laplace<'a> {
    /// Wraps a trained counting model.
    #[must_use]
    pub fn new(model: &'a NgramModel) -> Self {
        Self { model }
    }
}

impl LanguageModel for Laplace<'_> {
    fn order(&self) -> usize {
        self.model.order()
    }

    fn prob(&self, context: &[Token], word: &str) -> f64 {
        let count = self.model.count(context, word) as f64;
        let total = self.model.context_total(context) as f64;
        let vocab = self.model.vocab_size() as f64;
        (count + 1.0) / (total + vocab)
    }
}

/// Linear interpolation of several counting models with per-model weights.
///
/// The probability is `sum_i lambda_i * p_i(word | trailing context)`, where each
/// member model sees only the trailing tokens its order requires. Weights are a
/// caller contract: they are expected to sum to 1 but the constructor does not
/// normalise or reject them, so misweighted inputs silently produce scores
/// outside [0, 1]. A warning is logged when the sum is clearly off.
#[derive(Debug, Clone)]
pub struct Interpolation<'a> {
    models: &'a [NgramModel],
    lambdas: Vec<f64>,
    order: usize,
}

impl<'a> Interpolation<'a> {
    /// Combines `models` with one weight per model.
    ///
    /// # Errors
    /// Returns [`NgramError::InvalidConfig`] when `models` is empty or the
    /// weight list length does not match the model list length.
    pub fn new(models: &'a [NgramModel], lambdas: Vec<f64>) -> Result<Self> {
        if models.is_empty() {
            return Err(NgramError::InvalidConfig(
                "interpolation requires at least one model".into(),
            ));
        }
        if models.len() != lambdas.len() {
            return Err(NgramError::InvalidConfig(format!(
                "interpolation weight count ({}) does not match model count ({})",
                lambdas.len(),
                models.len()
            )));
        }
        let sum: f64 = lambdas.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!("interpolation weights sum to {sum}, not 1; scores will not be a convex combination");
        }
        let order = models.iter().map(NgramModel::order).max().unwrap_or(1);
        Ok(Self {
            models,
            lambdas,
            order,
        })
    }

    /// The per-model weights supplied at construction.
    #[must_use]
    pub fn lambdas(&self) -> &[f64] {
        &self.lambdas
    }
}

impl LanguageModel for Interpolation<'_> {
    fn order(&self) -> usize {
        self.order
    }

    fn prob(&self, context: &[Token], word: &str) -> f64 {
        self.models
            .iter()
            .zip(&self.lambdas)
            .map(|(model, lambda)| {
                let sub_context = truncate(context, model.order() - 1);
                lambda * model.prob(sub_context, word)
            })
            .sum()
    }
}

/// Stupid backoff over a cascade of counting models.
///
/// Not a true probability distribution: scores do not sum to 1 and are used for
/// ranking and perplexity by convention. The cascade walks the models from
/// highest to lowest order, multiplying the running score by `alpha` on every
/// backoff step and returning on the first `(context, word)` hit; a uniform
/// `1 / |vocab|` fallback over the highest-order model's vocabulary applies when
/// every model misses.
#[derive(Debug, Clone)]
pub struct StupidBackoff<'a> {
    models: &'a [NgramModel],
    alpha: f64,
}

impl<'a> StupidBackoff<'a> {
    /// Builds the cascade from models ordered highest to lowest.
    ///
    /// # Errors
    /// Returns [`NgramError::InvalidConfig`] when the model list is empty or
    /// not strictly decreasing in order, when `alpha` lies outside `(0, 1)`,
    /// or when the highest-order model has an empty vocabulary (the uniform
    /// fallback would be undefined).
    pub fn new(models: &'a [NgramModel], alpha: f64) -> Result<Self> {
        if models.is_empty() {
            return Err(NgramError::InvalidConfig(
                "backoff requires at least one model".into(),
            ));
        }
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(NgramError::InvalidConfig(format!(
                "backoff alpha ({alpha}) must lie in (0, 1)"
            )));
        }
        if models
            .windows(2)
            .any(|pair| pair[0].order() <= pair[1].order())
        {
            return Err(NgramError::InvalidConfig(
                "backoff models must be ordered from highest to lowest order".into(),
            ));
        }
        if models[0].vocab_size() == 0 {
            return Err(NgramError::InvalidConfig(
                "backoff fallback requires a trained highest-order model".into(),
            ));
        }
        Ok(Self { models, alpha })
    }

    /// The decay constant applied on every backoff step.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl LanguageModel for StupidBackoff<'_> {
    fn order(&self) -> usize {
        self.models[0].order()
    }

    fn prob(&self, context: &[Token], word: &str) -> f64 {
        let mut score = 1.0;
        for model in self.models {
            let sub_context = truncate(context, model.order() - 1);
            let total = model.context_total(sub_context);
            if total > 0 {
                let count = model.count(sub_context, word);
                if count > 0 {
                    return score * count as f64 / total as f64;
                }
            }
            score *= self.alpha;
        }
        score / self.models[0].vocab_size() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Sentence;

    fn sentences(raw: &[&[&str]]) -> Vec<Sentence> {
        raw.iter()
            .map(|s| s.iter().map(|t| (*t).to_owned()).collect())
            .collect()
    }

    fn trained(n: usize, data: &[Sentence]) -> NgramModel {
        let mut model = NgramModel::new(n).expect("valid order");
        model.train(data);
        model
    }

    fn ensemble() -> Vec<NgramModel> {
        let data = sentences(&[
            &["<s>", "a", "b", "</s>"],
            &["<s>", "a", "c", "</s>"],
        ]);
        (1..=4).map(|n| trained(n, &data)).collect()
    }

    #[test]
    fn laplace_is_strictly_positive_everywhere() {
        let data = sentences(&[&["<s>", "a", "b", "</s>"]]);
        let model = trained(2, &data);
        let laplace = Laplace::new(&model);
        assert!(laplace.prob(&["a".to_owned()], "zzz") > 0.0);
        assert!(laplace.prob(&["unseen".to_owned()], "zzz") > 0.0);
    }

    #[test]
    fn laplace_matches_add_one_formula() {
        // Vocabulary {<s>, a, b, c, </s>, <unk>} has size 6; context "a" has total 2.
        let data = sentences(&[
            &["<s>", "a", "b", "</s>"],
            &["<s>", "a", "c", "</s>"],
            &["<s>", "<unk>", "</s>"],
        ]);
        let model = trained(2, &data);
        assert_eq!(model.vocab_size(), 6);
        let laplace = Laplace::new(&model);
        let context = vec!["a".to_owned()];
        assert_eq!(laplace.prob(&context, "d"), 0.125);
        assert_eq!(laplace.prob(&context, "b"), 0.25);
    }

    #[test]
    fn interpolation_rejects_mismatched_weights() {
        let models = ensemble();
        let err = Interpolation::new(&models, vec![0.5, 0.5]).expect_err("length mismatch");
        assert!(matches!(err, NgramError::InvalidConfig(_)));
    }

    #[test]
    fn degenerate_weights_reduce_to_a_single_model() {
        let models = ensemble();
        let interp =
            Interpolation::new(&models, vec![1.0, 0.0, 0.0, 0.0]).expect("valid composition");
        let context: Vec<Token> = vec!["<s>".to_owned(), "<s>".to_owned(), "a".to_owned()];
        for word in ["a", "b", "c", "</s>", "zzz"] {
            assert_eq!(interp.prob(&context, word), models[0].prob(&[], word));
        }
    }

    #[test]
    fn interpolation_order_is_the_maximum_member_order() {
        let models = ensemble();
        let interp =
            Interpolation::new(&models, vec![0.25, 0.25, 0.25, 0.25]).expect("valid composition");
        assert_eq!(interp.order(), 4);
    }

    #[test]
    fn interpolation_mixes_member_probabilities() {
        let models = ensemble();
        let interp = Interpolation::new(&models, vec![0.5, 0.5, 0.0, 0.0]).expect("valid");
        let context = vec!["a".to_owned()];
        let expected = 0.5 * models[0].prob(&[], "b") + 0.5 * models[1].prob(&context, "b");
        assert!((interp.prob(&context, "b") - expected).abs() < 1e-12);
    }

    #[test]
    fn backoff_rejects_misordered_models() {
        let mut models = ensemble();
        models.sort_by_key(NgramModel::order);
        let err = StupidBackoff::new(&models, 0.4).expect_err("ascending orders");
        assert!(matches!(err, NgramError::InvalidConfig(_)));
    }

    #[test]
    fn backoff_rejects_alpha_outside_unit_interval() {
        let mut models = ensemble();
        models.reverse();
        assert!(StupidBackoff::new(&models, 0.0).is_err());
        assert!(StupidBackoff::new(&models, 1.0).is_err());
    }

    #[test]
    fn backoff_returns_first_hit_scaled_by_decay() {
        let mut models = ensemble();
        models.reverse();
        let backoff = StupidBackoff::new(&models, 0.4).expect("valid cascade");
        // Context unseen at orders 4..2, word seen at order 1: three decay steps.
        let context: Vec<Token> = vec!["x".to_owned(), "y".to_owned(), "z".to_owned()];
        let unigram = models[3].prob(&[], "b");
        let expected = 0.4 * 0.4 * 0.4 * unigram;
        assert!((backoff.prob(&context, "b") - expected).abs() < 1e-12);
    }

    #[test]
    fn backoff_score_shrinks_with_each_step() {
        let mut models = ensemble();
        models.reverse();
        let backoff = StupidBackoff::new(&models, 0.4).expect("valid cascade");
        let seen_high: Vec<Token> = vec!["<s>".to_owned(), "<s>".to_owned(), "a".to_owned()];
        let unseen: Vec<Token> = vec!["x".to_owned(), "y".to_owned(), "z".to_owned()];
        // A direct 4-gram hit takes zero backoff steps, a unigram hit takes three.
        assert!(backoff.prob(&seen_high, "b") > backoff.prob(&unseen, "b"));
    }

    #[test]
    fn backoff_uniform_fallback_when_every_model_misses() {
        let mut models = ensemble();
        models.reverse();
        let backoff = StupidBackoff::new(&models, 0.5);
        let backoff = backoff.expect("valid cascade");
        let context: Vec<Token> = vec!["x".to_owned(), "y".to_owned(), "z".to_owned()];
        let vocab_size = models[0].vocab_size() as f64;
        let expected = 0.5_f64.powi(4) / vocab_size;
        assert!((backoff.prob(&context, "never-seen") - expected).abs() < 1e-12);
    }
}
