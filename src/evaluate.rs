//! Perplexity evaluation over any probability-producing model.

use crate::corpus::Sentence;
use crate::model::{pad_sentence, LanguageModel};

/// Perplexity of `model` on a tokenized corpus.
///
/// Each sentence is left-padded with `order - 1` start markers and every
/// window of size `order` contributes `log2(prob)`. A single `prob` of zero
/// (or below) makes the corpus infinitely surprising and short-circuits to
/// `+inf`; an empty corpus also evaluates to `+inf` rather than dividing by
/// zero. Otherwise the result is `2^(-log_prob / tokens)`.
#[must_use]
pub fn perplexity<M: LanguageModel + ?Sized>(model: &M, data: &[Sentence]) -> f64 {
    let n = model.order().max(1);
    let mut log_prob = 0.0_f64;
    let mut scored = 0_u64;
    for sentence in data {
        let padded = pad_sentence(sentence, n);
        if padded.len() < n {
            continue;
        }
        for i in (n - 1)..padded.len() {
            let p = model.prob(&padded[i + 1 - n..i], &padded[i]);
            if p <= 0.0 {
                return f64::INFINITY;
            }
            log_prob += p.log2();
            scored += 1;
        }
    }
    if scored == 0 {
        return f64::INFINITY;
    }
    (-log_prob / scored as f64).exp2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NgramModel;
    use crate::smoothing::Laplace;

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

    #[test]
    fn empty_corpus_is_infinitely_surprising() {
        let model = trained(2, &sentences(&[&["<s>", "a", "</s>"]]));
        assert!(perplexity(&model, &[]).is_infinite());
    }

    #[test]
    fn zero_probability_event_short_circuits_to_infinity() {
        let train = sentences(&[&["<s>", "a", "b", "</s>"]]);
        let test = sentences(&[&["<s>", "a", "zzz", "</s>"]]);
        let model = trained(2, &train);
        assert!(perplexity(&model, &test).is_infinite());
    }

    #[test]
    fn perfectly_predictable_corpus_has_perplexity_one() {
        // Every context has exactly one continuation, so every window scores 1.
        let data = sentences(&[&["a", "b"]]);
        let model = trained(2, &data);
        assert!((perplexity(&model, &data) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn evaluator_matches_the_models_own_perplexity() {
        let train = sentences(&[
            &["<s>", "a", "b", "</s>"],
            &["<s>", "b", "a", "</s>"],
        ]);
        let model = trained(2, &train);
        let direct = model.perplexity(&train);
        let shared = perplexity(&model, &train);
        assert_eq!(direct.to_bits(), shared.to_bits());
    }

    #[test]
    fn perplexity_is_invariant_to_sentence_order() {
        let train = sentences(&[
            &["<s>", "a", "b", "</s>"],
            &["<s>", "b", "b", "</s>"],
            &["<s>", "b", "a", "</s>"],
        ]);
        let model = trained(2, &train);
        let laplace = Laplace::new(&model);

        let forward = sentences(&[
            &["<s>", "a", "b", "</s>"],
            &["<s>", "b", "a", "</s>"],
        ]);
        let mut reversed = forward.clone();
        reversed.reverse();
        let a = perplexity(&laplace, &forward);
        let b = perplexity(&laplace, &reversed);
        assert!((a - b).abs() < 1e-9);
    }
}
