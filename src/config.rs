//! Configuration builders controlling corpus ingestion, search, and generation.

use crate::error::{NgramError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the randomized interpolation-weight search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TuneConfig {
    /// Number of candidate weight vectors drawn during the sampling phase.
    pub num_samples: usize,
    /// Number of perturbed candidates evaluated per refinement round.
    pub refine_samples: usize,
    /// Number of refinement rounds run after the sampling phase.
    pub refine_rounds: usize,
    /// Half-width of the uniform perturbation applied to each weight during refinement.
    pub delta: f64,
    /// Enables per-round logging through the `log` facade.
    pub show_progress: bool,
}

impl TuneConfig {
    /// Returns a builder initialised with [`TuneConfig::default`].
    #[must_use]
    pub fn builder() -> TuneBuilder {
        TuneBuilder::default()
    }

    /// Validates the invariants required for the weight search.
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(NgramError::InvalidConfig(
                "num_samples must be greater than zero".into(),
            ));
        }
        if self.refine_rounds > 0 && self.refine_samples == 0 {
            return Err(NgramError::InvalidConfig(
                "refine_samples must be greater than zero when refinement is enabled".into(),
            ));
        }
        if !(self.delta > 0.0 && self.delta <= 1.0) {
            return Err(NgramError::InvalidConfig(format!(
                "delta ({}) must lie in (0, 1]",
                self.delta
            )));
        }
        Ok(())
    }
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            num_samples: 800,
            refine_samples: 200,
            refine_rounds: 2,
            delta: 0.05,
            show_progress: true,
        }
    }
}

/// Builder for [`TuneConfig`].
#[derive(Debug, Default, Clone)]
pub struct TuneBuilder {
    cfg: TuneConfig,
}

impl TuneBuilder {
    /// Creates a builder with [`TuneConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of sampling-phase candidates.
    #[must_use]
    pub fn num_samples(mut self, value: usize) -> Self {
        self.cfg.num_samples = value;
        self
    }

    /// Sets the number of candidates per refinement round.
    #[must_use]
    pub fn refine_samples(mut self, value: usize) -> Self {
        self.cfg.refine_samples = value;
        self
    }

    /// Sets the number of refinement rounds.
    #[must_use]
    pub fn refine_rounds(mut self, value: usize) -> Self {
        self.cfg.refine_rounds = value;
        self
    }

    /// Sets the refinement perturbation half-width.
    #[must_use]
    pub fn delta(mut self, value: f64) -> Self {
        self.cfg.delta = value;
        self
    }

    /// Enables or disables per-round logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`TuneConfig`].
    pub fn build(self) -> Result<TuneConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Default decay grid evaluated by the backoff search when no grid is supplied.
#[must_use]
pub fn default_alpha_grid() -> Vec<f64> {
    vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]
}

/// Configuration for autoregressive text generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateConfig {
    /// Maximum number of tokens sampled before generation stops.
    pub max_len: usize,
    /// Sampling temperature; weights are raised to `1 / temperature`.
    pub temperature: f64,
}

impl GenerateConfig {
    /// Returns a builder initialised with [`GenerateConfig::default`].
    #[must_use]
    pub fn builder() -> GenerateBuilder {
        GenerateBuilder::default()
    }

    /// Validates the invariants required for sampling.
    pub fn validate(&self) -> Result<()> {
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(NgramError::InvalidConfig(format!(
                "temperature ({}) must be a positive finite value",
                self.temperature
            )));
        }
        Ok(())
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            max_len: 20,
            temperature: 1.0,
        }
    }
}

/// Builder for [`GenerateConfig`].
#[derive(Debug, Default, Clone)]
pub struct GenerateBuilder {
    cfg: GenerateConfig,
}

impl GenerateBuilder {
    /// Creates a builder with [`GenerateConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum generated sequence length.
    #[must_use]
    pub fn max_len(mut self, value: usize) -> Self {
        self.cfg.max_len = value;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, value: f64) -> Self {
        self.cfg.temperature = value;
        self
    }

    /// Finalises the builder, returning a validated [`GenerateConfig`].
    pub fn build(self) -> Result<GenerateConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how text corpora are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
    /// Minimum token frequency; rarer tokens are rewritten to the unknown marker.
    pub min_frequency: u64,
}

impl CorpusConfig {
    /// Returns a builder initialised with [`CorpusConfig::default`].
    #[must_use]
    pub fn builder() -> CorpusBuilder {
        CorpusBuilder::default()
    }

    /// Validates the invariants required for ingestion.
    pub fn validate(&self) -> Result<()> {
        if self.min_frequency == 0 {
            return Err(NgramError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            min_frequency: 1,
        }
    }
}

/// Builder for [`CorpusConfig`].
#[derive(Debug, Default, Clone)]
pub struct CorpusBuilder {
    cfg: CorpusConfig,
}

impl CorpusBuilder {
    /// Creates a new builder with [`CorpusConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Sets the vocabulary frequency threshold.
    #[must_use]
    pub fn min_frequency(mut self, value: u64) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Finalises the builder, returning a validated [`CorpusConfig`].
    pub fn build(self) -> Result<CorpusConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tune_builder_overrides_defaults() {
        let cfg = TuneConfig::builder()
            .num_samples(50)
            .refine_rounds(1)
            .refine_samples(10)
            .delta(0.1)
            .show_progress(false)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.num_samples, 50);
        assert_eq!(cfg.refine_samples, 10);
        assert!(!cfg.show_progress);
    }

    #[test]
    fn validate_rejects_zero_samples() {
        let cfg = TuneConfig {
            num_samples: 0,
            ..TuneConfig::default()
        };
        let err = cfg.validate().expect_err("validation should fail");
        assert!(matches!(
            err,
            NgramError::InvalidConfig(message) if message.contains("num_samples")
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_delta() {
        let cfg = TuneConfig {
            delta: 1.5,
            ..TuneConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn generate_rejects_non_positive_temperature() {
        let err = GenerateConfig::builder()
            .temperature(0.0)
            .build()
            .expect_err("temperature 0 is invalid");
        assert!(matches!(err, NgramError::InvalidConfig(_)));
    }

    #[test]
    fn corpus_builder_overrides_defaults() {
        let cfg = CorpusConfig::builder()
            .recursive(false)
            .follow_symlinks(true)
            .min_frequency(2)
            .build()
            .expect("config should be valid");
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
        assert_eq!(cfg.min_frequency, 2);
    }

    #[test]
    fn alpha_grid_stays_inside_unit_interval() {
        let grid = default_alpha_grid();
        assert_eq!(grid.len(), 8);
        assert!(grid.iter().all(|alpha| *alpha > 0.0 && *alpha < 1.0));
    }
}
