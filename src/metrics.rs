//! Metrics describing the progress of a hyperparameter search.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metrics captured for one search round (sampling or refinement).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundMetrics {
    /// Sequential round number (1-indexed; round 1 is the sampling phase).
    pub round: usize,
    /// Number of candidates evaluated in the round.
    pub evaluations: usize,
    /// Number of candidate evaluations that failed and were skipped.
    pub failures: usize,
    /// Best (lowest) perplexity seen so far after the round.
    pub best_perplexity: f64,
    /// Execution time for the round.
    pub elapsed: Duration,
}

/// Aggregate metrics produced by a search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMetrics {
    /// Per-round snapshots accrued during the search.
    pub rounds: Vec<RoundMetrics>,
    /// Total duration of the search.
    pub total_duration: Duration,
}

impl SearchMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rounds: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
        }
    }

    /// Total number of evaluations across all rounds.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.rounds.iter().map(|round| round.evaluations).sum()
    }
}
