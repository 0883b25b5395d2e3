//! Configuration builder for proximity forest training.

use std::time::Duration;

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::result::ProximityForestResult;
use crate::tree::ProximityTreeConfig;

/// Whether trees train on bootstrap samples and report out-of-bag accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OobMode {
    /// Bootstrap each tree and compute OOB accuracy and confusion matrix.
    Enabled,
    /// Train every tree on the full dataset.
    Disabled,
}

/// Configuration for proximity forest training.
///
/// Construct via [`ProximityForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter    | Default                          |
/// |--------------|----------------------------------|
/// | `tree`       | [`ProximityTreeConfig::new`]     |
/// | `seed`       | 42                               |
/// | `oob_mode`   | `Disabled`                       |
/// | `time_limit` | `None`                           |
/// | `test_time_limit` | `None`                      |
///
/// The tree config's own seed is ignored; every tree gets a seed derived
/// from the forest seed.
#[derive(Debug, Clone)]
pub struct ProximityForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) tree: ProximityTreeConfig,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
    pub(crate) time_limit: Option<Duration>,
    pub(crate) test_time_limit: Option<Duration>,
}

impl ProximityForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            tree: ProximityTreeConfig::new(),
            seed: 42,
            oob_mode: OobMode::Disabled,
            time_limit: None,
            test_time_limit: None,
        })
    }

    // --- Setters ---

    /// Set the configuration shared by every tree.
    #[must_use]
    pub fn with_tree(mut self, tree: ProximityTreeConfig) -> Self {
        self.tree = tree;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the wall-clock contract for the whole forest.
    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Bound the wall-clock time of each forest prediction.
    ///
    /// Trees are consulted in order until the budget runs out; only the trees
    /// reached contribute to the vote.
    #[must_use]
    pub fn with_test_time_limit(mut self, test_time_limit: Option<Duration>) -> Self {
        self.test_time_limit = test_time_limit;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the per-tree configuration.
    #[must_use]
    pub fn tree(&self) -> &ProximityTreeConfig {
        &self.tree
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the wall-clock contract, if any.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Return the per-prediction time budget, if any.
    #[must_use]
    pub fn test_time_limit(&self) -> Option<Duration> {
        self.test_time_limit
    }

    /// Train a proximity forest on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                           |
    /// |----------------------------------------|------------------------------------------------|
    /// | [`ForestError::InvalidCandidateCount`] | the tree config has `n_candidates` zero        |
    /// | [`ForestError::InvalidMaxDepth`]       | the tree config has `max_depth` `Some(0)`      |
    /// | [`ForestError::Space`]                 | the tree config's space is empty               |
    /// | [`ForestError::OobEvaluationFailed`]   | OOB enabled but no sample has any OOB tree     |
    /// | [`ForestError::Distance`]              | a distance fails while scoring OOB samples     |
    ///
    /// A tree whose own construction fails is dropped from the ensemble and
    /// counted in the metadata instead of failing the whole forest.
    pub fn fit(&self, dataset: &Dataset) -> Result<ProximityForestResult, ForestError> {
        crate::forest::train(self, dataset)
    }
}
