use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use ngramlm::{
    build_vocab, default_alpha_grid, generate, load_corpus, load_models, perplexity, save_models,
    tune_alpha, tune_lambdas, Candidates, CorpusConfig, EvalLog, GenerateConfig, Interpolation,
    Laplace, NgramModel, Sentence, StupidBackoff, Token, TuneConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::ThreadPoolBuilder;

const DEFAULT_OUTPUT: &str = "models.bin";
const DEFAULT_ORDERS: [usize; 4] = [1, 2, 3, 4];

#[derive(Parser, Debug)]
#[command(author, version, about = "Word-level n-gram language model toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    /// Limit Rayon worker threads
    #[arg(long, global = true, value_name = "N")]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train counting models over a text corpus
    Train(TrainArgs),
    /// Score a corpus with a trained model bundle
    Evaluate(EvaluateArgs),
    /// Search interpolation weights on a development set
    TuneLambdas(TuneLambdasArgs),
    /// Search the backoff decay constant on a development set
    TuneAlpha(TuneAlphaArgs),
    /// Generate text from a trained model bundle
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,

    /// Minimum token frequency; rarer tokens become <unk>
    #[arg(long, value_name = "COUNT")]
    min_frequency: Option<u64>,
}

impl CorpusArgs {
    fn config(&self) -> Result<CorpusConfig> {
        let defaults = CorpusConfig::default();
        let cfg = CorpusConfig::builder()
            .recursive(!self.no_recursive)
            .follow_symlinks(self.follow_symlinks)
            .min_frequency(self.min_frequency.unwrap_or(defaults.min_frequency))
            .build()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the model bundle
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Model orders to train (repeat flag; defaults to 1 through 4)
    #[arg(long = "order", value_name = "N")]
    orders: Vec<usize>,

    #[command(flatten)]
    corpus: CorpusArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EvalStrategy {
    /// Raw maximum-likelihood counts, one result per order
    Mle,
    /// Add-one smoothing, one result per order
    Laplace,
    /// Linear interpolation with --lambda weights
    Interpolation,
    /// Stupid backoff with an --alpha decay
    Backoff,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Model bundle to load
    #[arg(short = 'm', long, value_name = "PATH")]
    models: PathBuf,

    /// Files or directories with the evaluation corpus
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Scoring strategy
    #[arg(long, value_enum, default_value_t = EvalStrategy::Mle)]
    smoothing: EvalStrategy,

    /// Interpolation weight, one per model in bundle order (repeat flag)
    #[arg(long = "lambda", value_name = "WEIGHT")]
    lambdas: Vec<f64>,

    /// Backoff decay constant
    #[arg(long, value_name = "ALPHA")]
    alpha: Option<f64>,

    /// Append results to this CSV summary
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    #[command(flatten)]
    corpus: CorpusArgs,
}

#[derive(Args, Debug)]
struct TuneLambdasArgs {
    /// Model bundle to load
    #[arg(short = 'm', long, value_name = "PATH")]
    models: PathBuf,

    /// Files or directories with the development corpus
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of sampled weight vectors
    #[arg(long, value_name = "COUNT")]
    num_samples: Option<usize>,

    /// Number of refinement rounds
    #[arg(long, value_name = "COUNT")]
    refine_rounds: Option<usize>,

    /// Candidates per refinement round
    #[arg(long, value_name = "COUNT")]
    refine_samples: Option<usize>,

    /// Half-width of the refinement perturbation
    #[arg(long, value_name = "DELTA")]
    delta: Option<f64>,

    /// RNG seed for candidate generation
    #[arg(long, value_name = "SEED", default_value_t = 42)]
    seed: u64,

    /// Append every evaluation to this CSV log
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Write the search outcome (including metrics) as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Disable per-round logging
    #[arg(long)]
    no_progress: bool,

    #[command(flatten)]
    corpus: CorpusArgs,
}

#[derive(Args, Debug)]
struct TuneAlphaArgs {
    /// Model bundle to load
    #[arg(short = 'm', long, value_name = "PATH")]
    models: PathBuf,

    /// Files or directories with the development corpus
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Decay candidate (repeat flag; defaults to the 8-point grid 0.1..0.8)
    #[arg(long = "alpha", value_name = "ALPHA")]
    alphas: Vec<f64>,

    /// Append every evaluation to this CSV log
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    #[command(flatten)]
    corpus: CorpusArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GenStrategy {
    /// Sample from raw next-token counts of one model
    Counts,
    /// Sample through add-one smoothing of one model
    Laplace,
    /// Sample through linear interpolation with --lambda weights
    Interpolation,
    /// Sample through stupid backoff with an --alpha decay
    Backoff,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Model bundle to load
    #[arg(short = 'm', long, value_name = "PATH")]
    models: PathBuf,

    /// Candidate strategy to sample from
    #[arg(long, value_enum, default_value_t = GenStrategy::Counts)]
    smoothing: GenStrategy,

    /// Model order for counts/laplace sampling (default: highest in bundle)
    #[arg(long, value_name = "N")]
    order: Option<usize>,

    /// Interpolation weight, one per model in bundle order (repeat flag)
    #[arg(long = "lambda", value_name = "WEIGHT")]
    lambdas: Vec<f64>,

    /// Backoff decay constant
    #[arg(long, value_name = "ALPHA")]
    alpha: Option<f64>,

    /// Number of sequences to generate
    #[arg(long, value_name = "COUNT", default_value_t = 15)]
    count: usize,

    /// Maximum tokens per sequence
    #[arg(long, value_name = "COUNT", default_value_t = 20)]
    max_len: usize,

    /// Sampling temperature
    #[arg(long, value_name = "TEMP", default_value_t = 1.0)]
    temperature: f64,

    /// RNG seed
    #[arg(long, value_name = "SEED", default_value_t = 42)]
    seed: u64,

    /// Also write generated sequences to this file, one per line
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Some(threads) = cli.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::TuneLambdas(args) => run_tune_lambdas(args),
        Commands::TuneAlpha(args) => run_tune_alpha(args),
        Commands::Generate(args) => run_generate(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = match (quiet, verbose) {
        (q, _) if q >= 2 => LevelFilter::Error,
        (1, _) => LevelFilter::Warn,
        (0, 0) => LevelFilter::Info,
        (0, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn load_normalized(inputs: &[PathBuf], corpus: &CorpusArgs) -> Result<(Vec<Sentence>, Vec<Token>)> {
    let cfg = corpus.config()?;
    let sentences = load_corpus(inputs, &cfg)?;
    Ok(build_vocab(&sentences, cfg.min_frequency))
}

fn run_train(args: TrainArgs) -> Result<()> {
    let (train, vocab) = load_normalized(&args.inputs, &args.corpus)?;
    info!(
        "loaded {} sentences with a vocabulary of {} tokens",
        train.len(),
        vocab.len()
    );

    let mut orders = if args.orders.is_empty() {
        DEFAULT_ORDERS.to_vec()
    } else {
        args.orders.clone()
    };
    orders.sort_unstable();
    orders.dedup();

    let mut models = Vec::with_capacity(orders.len());
    for n in orders {
        let mut model = NgramModel::new(n)?;
        model.train(&train);
        info!(
            "trained order {} over {} contexts ({} vocab tokens)",
            n,
            model.contexts().count(),
            model.vocab_size()
        );
        models.push(model);
    }

    save_models(&models, &args.output)?;
    println!(
        "saved {} models to {}",
        models.len(),
        args.output.display()
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let models = load_models(&args.models)?;
    let (test, _) = load_normalized(&args.inputs, &args.corpus)?;
    let mut summary_rows: Vec<(String, String, f64)> = Vec::new();

    match args.smoothing {
        EvalStrategy::Mle => {
            for model in &models {
                let pp = model.perplexity(&test);
                println!("{}-gram MLE perplexity: {pp:.2}", model.order());
                summary_rows.push((format!("{}-gram", model.order()), "mle".into(), pp));
            }
        }
        EvalStrategy::Laplace => {
            for model in &models {
                let pp = perplexity(&Laplace::new(model), &test);
                println!("{}-gram add-one perplexity: {pp:.2}", model.order());
                summary_rows.push((format!("{}-gram", model.order()), "add-one".into(), pp));
            }
        }
        EvalStrategy::Interpolation => {
            if args.lambdas.is_empty() {
                bail!("--smoothing interpolation requires one --lambda per model");
            }
            let interp = Interpolation::new(&models, args.lambdas.clone())?;
            let pp = perplexity(&interp, &test);
            println!("interpolation perplexity: {pp:.2}");
            let setting = args
                .lambdas
                .iter()
                .map(|lambda| format!("{lambda:.3}"))
                .collect::<Vec<_>>()
                .join(" ");
            summary_rows.push(("interpolation".into(), format!("lambdas {setting}"), pp));
        }
        EvalStrategy::Backoff => {
            let alpha = args
                .alpha
                .ok_or_else(|| anyhow!("--smoothing backoff requires --alpha"))?;
            let ordered = descending(&models);
            let backoff = StupidBackoff::new(&ordered, alpha)?;
            let pp = perplexity(&backoff, &test);
            println!("stupid backoff perplexity: {pp:.2}");
            summary_rows.push(("stupid-backoff".into(), format!("alpha {alpha}"), pp));
        }
    }

    if let Some(path) = &args.summary {
        append_summary(path, &summary_rows)?;
        info!("appended {} rows to {}", summary_rows.len(), path.display());
    }
    Ok(())
}

fn run_tune_lambdas(args: TuneLambdasArgs) -> Result<()> {
    let models = load_models(&args.models)?;
    let (dev, _) = load_normalized(&args.inputs, &args.corpus)?;

    let defaults = TuneConfig::default();
    let cfg = TuneConfig::builder()
        .num_samples(args.num_samples.unwrap_or(defaults.num_samples))
        .refine_rounds(args.refine_rounds.unwrap_or(defaults.refine_rounds))
        .refine_samples(args.refine_samples.unwrap_or(defaults.refine_samples))
        .delta(args.delta.unwrap_or(defaults.delta))
        .show_progress(!args.no_progress)
        .build()?;

    let (eval_log, writer) = match &args.log {
        Some(path) => {
            let mut header = vec!["round".to_owned()];
            header.extend((1..=models.len()).map(|i| format!("lambda{i}")));
            header.push("dev_perplexity".to_owned());
            let header: Vec<&str> = header.iter().map(String::as_str).collect();
            let (eval_log, writer) = EvalLog::create(path, &header)?;
            (eval_log, Some(writer))
        }
        None => (EvalLog::disabled(), None),
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let outcome = tune_lambdas(&models, &dev, &cfg, &eval_log, &mut rng)?;
    drop(eval_log);
    if let Some(writer) = writer {
        writer.finish()?;
    }

    println!(
        "best lambdas {:?} -> dev perplexity {:.2} ({} evaluations)",
        outcome.lambdas,
        outcome.perplexity,
        outcome.metrics.evaluations()
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&outcome)?;
        fs::write(path, json).with_context(|| format!("unable to write {}", path.display()))?;
        info!("wrote search report to {}", path.display());
    }
    Ok(())
}

fn run_tune_alpha(args: TuneAlphaArgs) -> Result<()> {
    let models = load_models(&args.models)?;
    let (dev, _) = load_normalized(&args.inputs, &args.corpus)?;
    let ordered = descending(&models);

    let alphas = if args.alphas.is_empty() {
        default_alpha_grid()
    } else {
        args.alphas.clone()
    };

    let (eval_log, writer) = match &args.log {
        Some(path) => {
            let (eval_log, writer) = EvalLog::create(path, &["round", "alpha", "dev_perplexity"])?;
            (eval_log, Some(writer))
        }
        None => (EvalLog::disabled(), None),
    };

    let outcome = tune_alpha(&ordered, &dev, &alphas, &eval_log)?;
    drop(eval_log);
    if let Some(writer) = writer {
        writer.finish()?;
    }

    println!(
        "best alpha {:.2} -> dev perplexity {:.2}",
        outcome.alpha, outcome.perplexity
    );
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let models = load_models(&args.models)?;
    let cfg = GenerateConfig::builder()
        .max_len(args.max_len)
        .temperature(args.temperature)
        .build()?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut sequences = Vec::with_capacity(args.count);
    match args.smoothing {
        GenStrategy::Counts => {
            let model = pick_model(&models, args.order)?;
            for _ in 0..args.count {
                sequences.push(generate(model, Candidates::RawCounts(model), &cfg, &mut rng)?);
            }
        }
        GenStrategy::Laplace => {
            let model = pick_model(&models, args.order)?;
            let laplace = Laplace::new(model);
            let vocab = model.sorted_vocab();
            for _ in 0..args.count {
                sequences.push(generate(
                    &laplace,
                    Candidates::Vocabulary(&vocab),
                    &cfg,
                    &mut rng,
                )?);
            }
        }
        GenStrategy::Interpolation => {
            if args.lambdas.is_empty() {
                bail!("--smoothing interpolation requires one --lambda per model");
            }
            let interp = Interpolation::new(&models, args.lambdas.clone())?;
            let vocab = pick_model(&models, None)?.sorted_vocab();
            for _ in 0..args.count {
                sequences.push(generate(
                    &interp,
                    Candidates::Vocabulary(&vocab),
                    &cfg,
                    &mut rng,
                )?);
            }
        }
        GenStrategy::Backoff => {
            let alpha = args
                .alpha
                .ok_or_else(|| anyhow!("--smoothing backoff requires --alpha"))?;
            let ordered = descending(&models);
            let backoff = StupidBackoff::new(&ordered, alpha)?;
            let vocab = ordered[0].sorted_vocab();
            for _ in 0..args.count {
                sequences.push(generate(
                    &backoff,
                    Candidates::Vocabulary(&vocab),
                    &cfg,
                    &mut rng,
                )?);
            }
        }
    }

    let mut out_file = match &args.output {
        Some(path) => Some(
            fs::File::create(path)
                .with_context(|| format!("unable to create {}", path.display()))?,
        ),
        None => None,
    };
    for (index, sequence) in sequences.iter().enumerate() {
        let text = sequence.join(" ");
        println!("{:>2}. {text}", index + 1);
        if let Some(file) = out_file.as_mut() {
            writeln!(file, "{text}")?;
        }
    }
    Ok(())
}

/// Selects the model with the requested order, or the highest order available.
fn pick_model(models: &[NgramModel], order: Option<usize>) -> Result<&NgramModel> {
    match order {
        Some(n) => models
            .iter()
            .find(|model| model.order() == n)
            .ok_or_else(|| anyhow!("bundle has no model of order {n}")),
        None => models
            .iter()
            .max_by_key(|model| model.order())
            .ok_or_else(|| anyhow!("model bundle is empty")),
    }
}

/// Clones the bundle sorted from highest to lowest order, as backoff requires.
fn descending(models: &[NgramModel]) -> Vec<NgramModel> {
    let mut ordered = models.to_vec();
    ordered.sort_by(|a, b| b.order().cmp(&a.order()));
    ordered
}

/// Appends `(model, setting, perplexity)` rows to a CSV summary, writing the
/// header only when the file is created fresh.
fn append_summary(path: &std::path::Path, rows: &[(String, String, f64)]) -> Result<()> {
    let fresh = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("unable to open {}", path.display()))?;
    if fresh {
        writeln!(file, "model,setting,test_perplexity")?;
    }
    for (model, setting, pp) in rows {
        writeln!(file, "{model},{setting},{pp:.4}")?;
    }
    Ok(())
}
