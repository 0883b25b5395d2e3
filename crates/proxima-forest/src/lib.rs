//! Proximity forest classification of time series: train, evaluate, predict.
//!
//! Provides proximity trees whose splits route each series to the nearest of
//! one exemplar per class under a randomly parameterized elastic measure,
//! forests of such trees trained in parallel via rayon, pluggable stopping
//! policies, wall-clock and node-count contracts, cross-validation and
//! out-of-bag evaluation, and 1-NN parameter tuning.

mod config;
mod confusion;
mod dataset;
mod error;
mod eval;
mod forest;
mod nearest;
mod node;
mod oob;
mod predict;
mod result;
mod split;
mod stopping;
mod tree;
mod tune;

pub use config::{OobMode, ProximityForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use dataset::Dataset;
pub use error::ForestError;
pub use eval::{Classifier, CrossValidation, Evaluation, Evaluator, Learner, OutOfBag, Protocol};
pub use forest::ProximityForest;
pub use nearest::{NearestNeighbour, NearestNeighbourConfig};
pub use node::{Impurity, Node, NodeIndex};
pub use oob::OobScore;
pub use predict::ClassDistribution;
pub use result::{ProximityForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use stopping::{AnyOf, MaxDepth, MinSize, Pure, PureSplit, StopContext, StoppingPolicy};
pub use tree::{ProximityTree, ProximityTreeConfig};
pub use tune::{Search, TunedConfig, Tuner};
