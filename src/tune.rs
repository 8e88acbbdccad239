//! Hyperparameter search for the smoothing strategies.
//!
//! Two independent procedures: a randomized search with local refinement over
//! the interpolation weight simplex, and a grid search over the backoff decay
//! constant. Candidate evaluations within a round are mutually independent and
//! fan out over the rayon pool; rounds are separated by a synchronous barrier
//! (the sampling phase fully precedes refinement). A failing candidate is
//! recorded and skipped without aborting its siblings.

pub mod log;

use std::time::Instant;

use ::log::{info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::TuneConfig;
use crate::corpus::Sentence;
use crate::error::{NgramError, Result};
use crate::evaluate::perplexity;
use crate::metrics::{RoundMetrics, SearchMetrics};
use crate::model::NgramModel;
use crate::smoothing::{Interpolation, StupidBackoff};
use crate::tune::log::{EvalLog, EvalRow};

/// Outcome of the interpolation-weight search.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaSearch {
    /// Best weight vector found, parallel to the model list.
    pub lambdas: Vec<f64>,
    /// Held-out perplexity achieved by the best weights.
    pub perplexity: f64,
    /// Per-round search metrics.
    pub metrics: SearchMetrics,
}

/// Outcome of the backoff decay grid search.
#[must_use]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlphaSearch {
    /// Grid point with the lowest held-out perplexity.
    pub alpha: f64,
    /// Held-out perplexity achieved by the best decay.
    pub perplexity: f64,
}

/// Randomized + refinement search for interpolation weights.
///
/// The sampling phase draws `cfg.num_samples` weight vectors by normalizing
/// independent uniform values (a projection onto the simplex, biased towards
/// its centre — not uniform over the simplex). Each refinement round perturbs
/// every coordinate of the running best by a uniform offset in
/// `[-delta, delta]`, clamps to `[0, 1]`, renormalizes, and re-evaluates.
/// Every evaluation is appended to `eval_log` as it completes.
///
/// # Errors
/// Returns [`NgramError::InvalidConfig`] for an invalid configuration or an
/// empty model list, and [`NgramError::Internal`] when no candidate at all
/// could be evaluated.
pub fn tune_lambdas(
    models: &[NgramModel],
    dev: &[Sentence],
    cfg: &TuneConfig,
    eval_log: &EvalLog,
    rng: &mut StdRng,
) -> Result<LambdaSearch> {
    cfg.validate()?;
    if models.is_empty() {
        return Err(NgramError::InvalidConfig(
            "weight search requires at least one model".into(),
        ));
    }

    let search_start = Instant::now();
    let mut metrics = SearchMetrics::new(cfg.refine_rounds + 1);
    let mut best: Option<(Vec<f64>, f64)> = None;

    for round in 1..=cfg.refine_rounds + 1 {
        let round_start = Instant::now();
        let candidates = match (round, &best) {
            (1, _) => sample_lambdas(models.len(), cfg.num_samples, rng),
            (_, Some((lambdas, _))) => {
                perturb_lambdas(lambdas, cfg.delta, cfg.refine_samples, rng)
            }
            // Nothing to refine around; the sampling phase found no candidate.
            (_, None) => break,
        };
        let evaluations = candidates.len();
        let (results, failures) = evaluate_candidates(models, dev, candidates, round, eval_log);
        for (lambdas, pp) in results {
            if best.as_ref().map_or(true, |(_, best_pp)| pp < *best_pp) {
                best = Some((lambdas, pp));
            }
        }
        if let Some((lambdas, pp)) = &best {
            if cfg.show_progress {
                info!(
                    "round {round}: {evaluations} candidates, best lambdas {lambdas:?} -> dev perplexity {pp:.2}"
                );
            }
            metrics.rounds.push(RoundMetrics {
                round,
                evaluations,
                failures,
                best_perplexity: *pp,
                elapsed: round_start.elapsed(),
            });
        }
    }
    metrics.total_duration = search_start.elapsed();

    let (lambdas, pp) = best.ok_or_else(|| {
        NgramError::Internal("no interpolation candidate could be evaluated".into())
    })?;
    Ok(LambdaSearch {
        lambdas,
        perplexity: pp,
        metrics,
    })
}

/// Grid search for the stupid backoff decay constant.
///
/// Evaluates every `alpha` in parallel and returns the first grid point (in
/// grid order) achieving the lowest held-out perplexity. `models` must be
/// ordered highest to lowest, as required by [`StupidBackoff::new`].
///
/// # Errors
/// Returns [`NgramError::InvalidConfig`] for an empty or out-of-range grid or
/// a model list [`StupidBackoff::new`] rejects, and [`NgramError::Internal`]
/// when no grid point could be evaluated.
pub fn tune_alpha(
    models: &[NgramModel],
    dev: &[Sentence],
    alphas: &[f64],
    eval_log: &EvalLog,
) -> Result<AlphaSearch> {
    if alphas.is_empty() {
        return Err(NgramError::InvalidConfig(
            "decay search requires at least one alpha".into(),
        ));
    }
    for &alpha in alphas {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(NgramError::InvalidConfig(format!(
                "alpha ({alpha}) must lie in (0, 1)"
            )));
        }
    }
    // Surface composition errors before spinning up the pool.
    StupidBackoff::new(models, alphas[0])?;

    let results: Vec<Result<(f64, f64)>> = alphas
        .par_iter()
        .map_with(eval_log.clone(), |eval_log, &alpha| {
            let backoff = StupidBackoff::new(models, alpha)?;
            let pp = perplexity(&backoff, dev);
            eval_log.record(EvalRow {
                round: 1,
                params: vec![alpha],
                perplexity: pp,
            });
            Ok((alpha, pp))
        })
        .collect();

    let mut best: Option<(f64, f64)> = None;
    for result in results {
        match result {
            Ok((alpha, pp)) => {
                info!("alpha {alpha:.2} -> dev perplexity {pp:.2}");
                if best.map_or(true, |(_, best_pp)| pp < best_pp) {
                    best = Some((alpha, pp));
                }
            }
            Err(err) => warn!("alpha evaluation failed: {err}"),
        }
    }
    let (alpha, pp) =
        best.ok_or_else(|| NgramError::Internal("no alpha could be evaluated".into()))?;
    Ok(AlphaSearch {
        alpha,
        perplexity: pp,
    })
}

/// Evaluates one round of weight candidates on the rayon pool.
///
/// Returns the successful `(weights, perplexity)` pairs in candidate order and
/// the number of failures. Failures are logged and never abort the batch.
fn evaluate_candidates(
    models: &[NgramModel],
    dev: &[Sentence],
    candidates: Vec<Vec<f64>>,
    round: usize,
    eval_log: &EvalLog,
) -> (Vec<(Vec<f64>, f64)>, usize) {
    let results: Vec<Result<(Vec<f64>, f64)>> = candidates
        .into_par_iter()
        .map_with(eval_log.clone(), |eval_log, lambdas| {
            let interp = Interpolation::new(models, lambdas.clone())?;
            let pp = perplexity(&interp, dev);
            eval_log.record(EvalRow {
                round,
                params: lambdas.clone(),
                perplexity: pp,
            });
            Ok((lambdas, pp))
        })
        .collect();

    let mut succeeded = Vec::with_capacity(results.len());
    let mut failures = 0;
    for result in results {
        match result {
            Ok(pair) => succeeded.push(pair),
            Err(err) => {
                failures += 1;
                warn!("candidate evaluation failed: {err}");
            }
        }
    }
    (succeeded, failures)
}

/// Draws `count` weight vectors of dimension `k`, each normalized to sum to 1.
fn sample_lambdas(k: usize, count: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    (0..count)
        .map(|_| {
            let mut weights: Vec<f64> = (0..k).map(|_| rng.gen::<f64>()).collect();
            normalize(&mut weights);
            weights
        })
        .collect()
}

/// Perturbs each coordinate of `best` by a uniform offset in `[-delta, delta]`,
/// clamping to `[0, 1]` before renormalizing.
fn perturb_lambdas(best: &[f64], delta: f64, count: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    (0..count)
        .map(|_| {
            let mut weights: Vec<f64> = best
                .iter()
                .map(|&lambda| (lambda + rng.gen_range(-delta..=delta)).clamp(0.0, 1.0))
                .collect();
            normalize(&mut weights);
            weights
        })
        .collect()
}

/// Rescales weights to sum to 1; an all-zero vector becomes uniform.
fn normalize(weights: &mut [f64]) {
    if weights.is_empty() {
        return;
    }
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        for weight in weights.iter_mut() {
            *weight /= sum;
        }
    } else {
        let uniform = 1.0 / weights.len() as f64;
        for weight in weights.iter_mut() {
            *weight = uniform;
        }
    }
}
