//! Word-level n-gram language modeling library and CLI.
//!
//! The crate trains counting models over tokenized corpora, layers smoothing
//! strategies on top of them (add-one, linear interpolation, stupid backoff),
//! scores held-out text with perplexity, searches the smoothing
//! hyperparameters in parallel, and generates text autoregressively.  Typical
//! usage trains one model per order, tunes interpolation weights on a
//! development set, and scores the winner on test data:
//!
//! ```no_run
//! use ngramlm::{
//!     build_vocab, load_corpus, perplexity, tune_lambdas, CorpusConfig, EvalLog,
//!     Interpolation, NgramModel, TuneConfig,
//! };
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> ngramlm::Result<()> {
//! let cfg = CorpusConfig::default();
//! let (train, _vocab) = build_vocab(&load_corpus(&["data/train.txt"], &cfg)?, 1);
//! let (dev, _) = build_vocab(&load_corpus(&["data/valid.txt"], &cfg)?, 1);
//!
//! let mut models = Vec::new();
//! for n in 1..=4 {
//!     let mut model = NgramModel::new(n)?;
//!     model.train(&train);
//!     models.push(model);
//! }
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let tune_cfg = TuneConfig::default();
//! let outcome = tune_lambdas(&models, &dev, &tune_cfg, &EvalLog::disabled(), &mut rng)?;
//! let best = Interpolation::new(&models, outcome.lambdas)?;
//! let _test_pp = perplexity(&best, &dev);
//! # Ok(())
//! # }
//! ```
//!
//! The `ngramlm` binary exposes the same pipeline as subcommands (`train`,
//! `evaluate`, `tune-lambdas`, `tune-alpha`, `generate`).

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod metrics;
pub mod model;
pub mod serialization;
pub mod smoothing;
pub mod tune;

pub use config::{default_alpha_grid, CorpusConfig, GenerateConfig, TuneConfig};
pub use corpus::{
    build_vocab, collect_corpus_paths, load_corpus, Sentence, Token, SENTENCE_END, SENTENCE_START,
    UNKNOWN,
};
pub use error::{NgramError, Result};
pub use evaluate::perplexity;
pub use generate::{generate, Candidates};
pub use metrics::{RoundMetrics, SearchMetrics};
pub use model::{LanguageModel, NgramModel};
pub use serialization::{load_models, save_models};
pub use smoothing::{Interpolation, Laplace, StupidBackoff};
pub use tune::log::{EvalLog, EvalLogWriter, EvalRow};
pub use tune::{tune_alpha, tune_lambdas, AlphaSearch, LambdaSearch};
