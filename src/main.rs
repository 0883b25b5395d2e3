mod cbf;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use proxima_distance::{MeasureConfig, ParamSpace};
use proxima_forest::{
    AnyOf, ClassMetrics, CrossValidation, Dataset, Evaluator, MinSize, OobMode, OutOfBag,
    Protocol, ProximityForestConfig, ProximityTreeConfig, Pure, PureSplit, Search,
    SplitCriterion, StoppingPolicy, Tuner,
};

#[derive(Parser)]
#[command(name = "proxima")]
#[command(about = "Proximity forest classification on synthetic Cylinder-Bell-Funnel data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for data generation and training
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shape of the generated dataset.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Series generated per class (three classes)
    #[arg(long, default_value_t = 30)]
    n_per_class: usize,

    /// Length of every series
    #[arg(long, default_value_t = 128)]
    length: usize,

    /// Amplitude of the uniform noise added to every point
    #[arg(long, default_value_t = 1.0)]
    noise: f64,
}

/// Forest hyperparameters shared by the training commands.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Candidate splits drawn per node
    #[arg(long, default_value_t = 5)]
    candidates: usize,

    /// Stopping policy: "pure", "pure-split", or "min-size=N"
    #[arg(long, default_value = "pure")]
    stopping: String,

    /// Split criterion: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Wall-clock budget for the whole forest in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Wall-clock budget per prediction in milliseconds
    #[arg(long)]
    test_time_limit_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest on a generated train set and score a generated test set
    Train {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Train each tree on a bootstrap sample and report OOB accuracy
        #[arg(long, default_value_t = false)]
        oob: bool,
    },

    /// Estimate forest accuracy with cross-validation or out-of-bag
    Evaluate {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Evaluation protocol: "cv" or "oob"
        #[arg(long, default_value = "cv")]
        protocol: String,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 10)]
        folds: usize,
    },

    /// Select a 1-NN distance configuration by cross-validation
    Tune {
        #[command(flatten)]
        data: DataArgs,

        /// Search strategy: "grid" or "random"
        #[arg(long, default_value = "random")]
        search: String,

        /// Points per continuous dimension for grid search
        #[arg(long, default_value_t = 3)]
        granularity: usize,

        /// Number of draws for random search
        #[arg(long, default_value_t = 20)]
        n_samples: usize,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        folds: usize,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    n_train: usize,
    n_test: usize,
    length: usize,
    n_trees_requested: usize,
    n_trees_built: usize,
    n_trees_skipped: usize,
    n_incomplete_trees: usize,
    mean_nodes_per_tree: f64,
    test_accuracy: f64,
    oob_accuracy: Option<f64>,
    training_time_ms: u128,
}

#[derive(Serialize)]
struct EvaluateOutput {
    protocol: String,
    n_instances: usize,
    n_evaluated: usize,
    accuracy: f64,
    std_accuracy: f64,
    fold_accuracies: Vec<f64>,
    class_metrics: Vec<ClassMetrics>,
}

#[derive(Serialize)]
struct TuneOutput {
    n_instances: usize,
    n_candidates: usize,
    best_measure: MeasureConfig,
    best_accuracy: f64,
}

fn parse_stopping(s: &str) -> Result<Arc<dyn StoppingPolicy>> {
    match s {
        "pure" => Ok(Arc::new(Pure)),
        "pure-split" => Ok(Arc::new(AnyOf::default().with(Pure).with(PureSplit))),
        other => match other.strip_prefix("min-size=") {
            Some(n) => {
                let n: usize = n
                    .parse()
                    .with_context(|| format!("invalid minimum size in {other}"))?;
                Ok(Arc::new(AnyOf::default().with(Pure).with(MinSize(n))))
            }
            None => anyhow::bail!(
                "unknown stopping policy: {other} (expected pure, pure-split, or min-size=N)"
            ),
        },
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown split criterion: {other} (expected gini or entropy)"),
    }
}

fn build_forest_config(args: &ForestArgs, seed: u64) -> Result<ProximityForestConfig> {
    let tree = ProximityTreeConfig::new()
        .with_n_candidates(args.candidates)
        .with_shared_stopping(parse_stopping(&args.stopping)?)
        .with_criterion(parse_criterion(&args.criterion)?)
        .with_max_depth(args.max_depth);
    Ok(ProximityForestConfig::new(args.n_trees)?
        .with_tree(tree)
        .with_seed(seed)
        .with_time_limit(args.time_limit_ms.map(Duration::from_millis))
        .with_test_time_limit(args.test_time_limit_ms.map(Duration::from_millis)))
}

fn generate(args: &DataArgs, rng: &mut ChaCha8Rng) -> Result<Dataset> {
    let data = cbf::generate(args.n_per_class, args.length, args.noise, rng)
        .context("failed to generate dataset")?;
    info!(n = data.len(), length = args.length, "dataset generated");
    Ok(data)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let mut data_rng = ChaCha8Rng::seed_from_u64(cli.seed);

    match cli.command {
        Command::Train { data, forest, oob } => {
            let train = generate(&data, &mut data_rng)?;
            let test = generate(&data, &mut data_rng)?;

            let oob_mode = if oob { OobMode::Enabled } else { OobMode::Disabled };
            let config = build_forest_config(&forest, cli.seed)?.with_oob_mode(oob_mode);
            let result = config.fit(&train).context("forest training failed")?;
            let oob_accuracy = result.oob_score().map(|s| s.accuracy);
            info!(oob_accuracy = ?oob_accuracy, "forest trained");

            let predictions = result
                .forest()
                .predict_batch(test.series())
                .context("prediction failed")?;
            let correct = predictions
                .iter()
                .zip(test.labels())
                .filter(|&(p, l)| p == l)
                .count();
            let test_accuracy = correct as f64 / test.len() as f64;
            info!(test_accuracy, "test set scored");

            let trees = result.forest().trees();
            let mean_nodes_per_tree = if trees.is_empty() {
                0.0
            } else {
                trees.iter().map(|t| t.n_nodes()).sum::<usize>() as f64 / trees.len() as f64
            };
            let metadata = result.metadata();

            let output = TrainOutput {
                n_train: train.len(),
                n_test: test.len(),
                length: data.length,
                n_trees_requested: metadata.n_trees_requested,
                n_trees_built: metadata.n_trees_built,
                n_trees_skipped: metadata.n_trees_skipped,
                n_incomplete_trees: metadata.n_incomplete_trees,
                mean_nodes_per_tree,
                test_accuracy,
                oob_accuracy,
                training_time_ms: metadata.training_time.as_millis(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            data,
            forest,
            protocol,
            folds,
        } => {
            let dataset = generate(&data, &mut data_rng)?;
            let config = build_forest_config(&forest, cli.seed)?;

            let chosen: Protocol = match protocol.as_str() {
                "cv" => CrossValidation::new(folds)?.with_seed(cli.seed).into(),
                "oob" => OutOfBag::new().with_seed(cli.seed).into(),
                other => anyhow::bail!("unknown protocol: {other} (expected cv or oob)"),
            };
            let evaluation = chosen
                .evaluate(&config, &dataset)
                .context("evaluation failed")?;

            let output = EvaluateOutput {
                protocol,
                n_instances: dataset.len(),
                n_evaluated: evaluation.n_evaluated,
                accuracy: evaluation.accuracy,
                std_accuracy: evaluation.std_accuracy(),
                class_metrics: evaluation.confusion_matrix.class_metrics(),
                fold_accuracies: evaluation.fold_accuracies,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Tune {
            data,
            search,
            granularity,
            n_samples,
            folds,
        } => {
            let dataset = generate(&data, &mut data_rng)?;
            let search = match search.as_str() {
                "grid" => Search::Grid { granularity },
                "random" => Search::Random { n_samples },
                other => anyhow::bail!("unknown search: {other} (expected grid or random)"),
            };

            let space = ParamSpace::proximity_forest(&dataset.stats());
            let tuned = Tuner::new(CrossValidation::new(folds)?.with_seed(cli.seed))
                .with_search(search)
                .with_seed(cli.seed)
                .tune(&space, &dataset)
                .context("tuning failed")?;

            let output = TuneOutput {
                n_instances: dataset.len(),
                n_candidates: tuned.scores.len(),
                best_measure: tuned.measure,
                best_accuracy: tuned.accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
