use proxima_distance::{DistanceError, SpaceError};

/// Errors from proximity tree, forest, and evaluation operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when the number of candidate splits per node is zero.
    #[error("n_candidates must be at least 1, got {n_candidates}")]
    InvalidCandidateCount {
        /// The invalid n_candidates value provided.
        n_candidates: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when a dataset or subset has zero instances.
    #[error("dataset has zero instances")]
    EmptyDataset,

    /// Returned when a dataset declares zero classes.
    #[error("n_classes must be at least 1, got {n_classes}")]
    InvalidClassCount {
        /// The invalid n_classes value provided.
        n_classes: usize,
    },

    /// Returned when the number of labels differs from the number of series.
    #[error("got {labels} labels for {series} series")]
    LabelCountMismatch {
        /// Number of series provided.
        series: usize,
        /// Number of labels provided.
        labels: usize,
    },

    /// Returned when a label is not in `0..n_classes`.
    #[error("instance {index} has label {label}, but n_classes is {n_classes}")]
    LabelOutOfRange {
        /// The zero-based index of the offending instance.
        index: usize,
        /// The offending label.
        label: usize,
        /// The declared number of classes.
        n_classes: usize,
    },

    /// Returned when the dataset is smaller than the requested fold count.
    #[error("{n_samples} instances cannot fill {n_folds} folds")]
    TooFewSamplesForFolds {
        /// Number of instances in the dataset.
        n_samples: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when out-of-bag evaluation cannot be computed.
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Description of why OOB evaluation failed.
        reason: String,
    },

    /// A distance computation failed.
    #[error(transparent)]
    Distance(#[from] DistanceError),

    /// A parameter space or measure configuration was invalid.
    #[error(transparent)]
    Space(#[from] SpaceError),
}
