//! Training result types for the proximity forest.

use std::time::Duration;

use crate::forest::ProximityForest;
use crate::oob::OobScore;

/// Metadata about the training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingMetadata {
    /// Number of trees the config asked for.
    pub n_trees_requested: usize,
    /// Number of trees in the fitted forest.
    pub n_trees_built: usize,
    /// Trees not started because the time contract ran out.
    pub n_trees_skipped: usize,
    /// Trees dropped because their construction failed.
    pub n_trees_failed: usize,
    /// Built trees whose growth a contract cut short.
    pub n_incomplete_trees: usize,
    /// Number of classes.
    pub n_classes: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Wall-clock time spent training.
    pub training_time: Duration,
}

/// Result of proximity forest training.
///
/// Contains the fitted forest, optional OOB score, per-tree OOB indices,
/// and training metadata.
#[derive(Debug)]
pub struct ProximityForestResult {
    forest: ProximityForest,
    oob_score: Option<OobScore>,
    oob_indices_per_tree: Vec<Vec<usize>>,
    metadata: TrainingMetadata,
}

impl ProximityForestResult {
    /// Create a new training result.
    pub(crate) fn new(
        forest: ProximityForest,
        oob_score: Option<OobScore>,
        oob_indices_per_tree: Vec<Vec<usize>>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            oob_score,
            oob_indices_per_tree,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &ProximityForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> ProximityForest {
        self.forest
    }

    /// Return the OOB score, if computed.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return the per-tree OOB sample indices, aligned with the forest's trees.
    ///
    /// Empty for every tree when OOB mode is disabled.
    #[must_use]
    pub fn oob_indices_per_tree(&self) -> &[Vec<usize>] {
        &self.oob_indices_per_tree
    }
}
