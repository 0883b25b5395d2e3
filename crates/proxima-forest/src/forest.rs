//! Proximity forest training with parallel tree construction.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use proxima_distance::{ParamSpace, TransformCache};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::{OobMode, ProximityForestConfig};
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::oob::compute_oob;
use crate::result::{ProximityForestResult, TrainingMetadata};
use crate::tree::ProximityTree;

/// A fitted proximity forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProximityForest {
    pub(crate) trees: Vec<ProximityTree>,
    pub(crate) n_classes: usize,
    #[serde(default)]
    pub(crate) test_time_limit: Option<Duration>,
}

impl ProximityForest {
    /// Borrow the trees in seed order.
    #[must_use]
    pub fn trees(&self) -> &[ProximityTree] {
        &self.trees
    }

    /// Return the per-prediction time budget, if any.
    #[must_use]
    pub fn test_time_limit(&self) -> Option<Duration> {
        self.test_time_limit
    }
}

/// Generate a bootstrap sample and the out-of-bag indices.
pub(crate) fn bootstrap_sample(
    n_samples: usize,
    draw_count: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(draw_count);
    for _ in 0..draw_count {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// What happened to one tree slot.
enum TreeOutcome {
    Built(ProximityTree, Vec<usize>),
    Skipped,
    Failed,
}

/// Train the proximity forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = dataset.len()))]
pub(crate) fn train(
    config: &ProximityForestConfig,
    dataset: &Dataset,
) -> Result<ProximityForestResult, ForestError> {
    // --- Validate config ---
    config.tree.validate()?;

    let started = Instant::now();
    let deadline = config.time_limit.map(|limit| started + limit);
    let n_samples = dataset.len();
    let n_classes = dataset.n_classes();

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_classes,
        n_candidates = config.tree.n_candidates,
        oob = config.oob_mode == OobMode::Enabled,
        "training proximity forest"
    );

    // Generate per-tree seeds from master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    // One space and one transform cache for the whole ensemble.
    let space = match &config.tree.space {
        Some(space) => space.clone(),
        None => ParamSpace::proximity_forest(&dataset.stats()),
    };
    let tree_config = config.tree.clone().with_space(space);
    let cache = Arc::new(TransformCache::new());
    let oob_mode = config.oob_mode;

    // Parallel tree training, collected in seed order.
    let outcomes: Vec<TreeOutcome> = tree_seeds
        .into_par_iter()
        .enumerate()
        .map(|(tree_index, seed)| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return TreeOutcome::Skipped;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (train_set, oob_indices) = match oob_mode {
                OobMode::Enabled => {
                    let (bootstrap, oob) = bootstrap_sample(n_samples, n_samples, &mut rng);
                    match dataset.subset(&bootstrap) {
                        Ok(subset) => (Cow::Owned(subset), oob),
                        Err(error) => {
                            warn!(tree_index, %error, "bootstrap failed, dropping tree");
                            return TreeOutcome::Failed;
                        }
                    }
                }
                OobMode::Disabled => (Cow::Borrowed(dataset), Vec::new()),
            };

            let fitted = tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit_with(&train_set, Arc::clone(&cache), deadline);
            match fitted {
                Ok(tree) => TreeOutcome::Built(tree, oob_indices),
                Err(error) => {
                    warn!(tree_index, %error, "tree construction failed, dropping tree");
                    TreeOutcome::Failed
                }
            }
        })
        .collect();

    let mut trees = Vec::with_capacity(config.n_trees);
    let mut oob_indices_per_tree = Vec::with_capacity(config.n_trees);
    let (mut n_trees_skipped, mut n_trees_failed) = (0usize, 0usize);
    for outcome in outcomes {
        match outcome {
            TreeOutcome::Built(tree, oob) => {
                trees.push(tree);
                oob_indices_per_tree.push(oob);
            }
            TreeOutcome::Skipped => n_trees_skipped += 1,
            TreeOutcome::Failed => n_trees_failed += 1,
        }
    }
    let n_incomplete_trees = trees.iter().filter(|t| !t.is_complete()).count();

    debug!(
        n_trees_built = trees.len(),
        n_trees_skipped,
        n_trees_failed,
        n_incomplete_trees,
        "tree training complete"
    );
    if n_trees_skipped > 0 {
        warn!(n_trees_skipped, "time contract exhausted before every tree started");
    }

    // OOB evaluation.
    let oob_score = match oob_mode {
        OobMode::Enabled if trees.is_empty() => {
            warn!("no trees built, skipping OOB evaluation");
            None
        }
        OobMode::Enabled => Some(compute_oob(&trees, dataset, &oob_indices_per_tree)?),
        OobMode::Disabled => None,
    };

    let metadata = TrainingMetadata {
        n_trees_requested: config.n_trees,
        n_trees_built: trees.len(),
        n_trees_skipped,
        n_trees_failed,
        n_incomplete_trees,
        n_classes,
        n_samples,
        training_time: started.elapsed(),
    };

    let forest = ProximityForest {
        trees,
        n_classes,
        test_time_limit: config.test_time_limit,
    };

    info!(
        n_trees = forest.n_trees(),
        oob_accuracy = oob_score.as_ref().map(|s| s.accuracy),
        elapsed_ms = metadata.training_time.as_millis() as u64,
        "proximity forest training complete"
    );

    Ok(ProximityForestResult::new(
        forest,
        oob_score,
        oob_indices_per_tree,
        metadata,
    ))
}
