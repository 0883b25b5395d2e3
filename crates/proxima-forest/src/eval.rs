//! Accuracy estimation: stratified k-fold cross-validation and out-of-bag.
//!
//! Both protocols implement [`Evaluator`] over any [`Learner`], so the same
//! call estimates the accuracy of a forest, a single tree, or a 1-NN
//! classifier under one distance configuration.

use proxima_distance::TimeSeries;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::ProximityForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::forest::{ProximityForest, bootstrap_sample};
use crate::predict::ClassDistribution;
use crate::tree::{ProximityTree, ProximityTreeConfig};

/// A fitted model that classifies single series.
pub trait Classifier: Send + Sync {
    /// Return the class probability distribution for `series`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] when a distance computation fails.
    fn predict_proba(&self, series: &TimeSeries) -> Result<ClassDistribution, ForestError>;

    /// Return the most probable class, lowest index on ties.
    ///
    /// # Errors
    ///
    /// Same as [`Classifier::predict_proba`].
    fn predict(&self, series: &TimeSeries) -> Result<usize, ForestError> {
        Ok(self.predict_proba(series)?.predicted_class())
    }
}

/// A configuration that can be trained into a [`Classifier`].
pub trait Learner: Sync {
    /// The fitted model.
    type Model: Classifier;

    /// Train on `dataset`, drawing all randomness from `seed`.
    ///
    /// # Errors
    ///
    /// Returns whatever configuration or distance error training raises.
    fn fit_seeded(&self, dataset: &Dataset, seed: u64) -> Result<Self::Model, ForestError>;
}

/// An accuracy estimation protocol.
pub trait Evaluator {
    /// Estimate the accuracy of `learner` on `dataset`.
    ///
    /// # Errors
    ///
    /// Returns protocol errors (fold counts, empty OOB sets) or errors from
    /// training and prediction.
    fn evaluate<L: Learner>(
        &self,
        learner: &L,
        dataset: &Dataset,
    ) -> Result<Evaluation, ForestError>;
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Evaluation {
    /// Mean accuracy across folds (a single value for out-of-bag).
    pub accuracy: f64,
    /// Number of held-out predictions made.
    pub n_evaluated: usize,
    /// Accuracy of each fold, in fold order.
    pub fold_accuracies: Vec<f64>,
    /// Confusion matrix pooled over every held-out prediction.
    pub confusion_matrix: ConfusionMatrix,
    /// Dataset indices that were predicted, in prediction order.
    pub evaluated_indices: Vec<usize>,
}

impl Evaluation {
    /// Error rate, `1 - accuracy`.
    #[must_use]
    pub fn error(&self) -> f64 {
        1.0 - self.accuracy
    }

    /// Population standard deviation of the fold accuracies.
    #[must_use]
    pub fn std_accuracy(&self) -> f64 {
        if self.fold_accuracies.is_empty() {
            return 0.0;
        }
        let n = self.fold_accuracies.len() as f64;
        let mean = self.fold_accuracies.iter().sum::<f64>() / n;
        let variance = self
            .fold_accuracies
            .iter()
            .map(|&a| (a - mean).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }
}

/// Train on `train`, predict `held_out` in parallel, and score the predictions.
fn score_held_out<L: Learner>(
    learner: &L,
    dataset: &Dataset,
    train: &[usize],
    held_out: &[usize],
    seed: u64,
) -> Result<ConfusionMatrix, ForestError> {
    let model = learner.fit_seeded(&dataset.subset(train)?, seed)?;
    let predicted: Vec<usize> = held_out
        .par_iter()
        .map(|&i| model.predict(dataset.series_at(i)))
        .collect::<Result<_, _>>()?;
    let truth: Vec<usize> = held_out.iter().map(|&i| dataset.label(i)).collect();
    ConfusionMatrix::from_labels(&truth, &predicted, dataset.n_classes())
}

/// Stratified k-fold cross-validation.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
/// The default is 10 folds with seed 42.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, ForestError> {
        if n_folds < 2 {
            return Err(ForestError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling and per-fold training.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Assign every instance of `dataset` to exactly one fold.
    ///
    /// Instances are shuffled within their class, then dealt round-robin
    /// with one cursor shared by all classes, so fold sizes differ by at
    /// most one and each class is spread as evenly as its size allows.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::TooFewSamplesForFolds`] when the dataset has
    /// fewer instances than folds.
    pub fn folds(&self, dataset: &Dataset) -> Result<Vec<Vec<usize>>, ForestError> {
        if dataset.len() < self.n_folds {
            return Err(ForestError::TooFewSamplesForFolds {
                n_samples: dataset.len(),
                n_folds: self.n_folds,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut folds = vec![Vec::new(); self.n_folds];
        let mut cursor = 0usize;
        for mut members in dataset.indices_by_class(&dataset.all_indices()) {
            members.shuffle(&mut rng);
            for idx in members {
                folds[cursor % self.n_folds].push(idx);
                cursor += 1;
            }
        }
        Ok(folds)
    }
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            n_folds: 10,
            seed: 42,
        }
    }
}

impl Evaluator for CrossValidation {
    /// Train on all folds but one and predict the held-out fold, once per fold.
    ///
    /// Fold `k` trains with seed `seed + k`. The reported accuracy is the
    /// mean of the fold accuracies.
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = dataset.len()))]
    fn evaluate<L: Learner>(
        &self,
        learner: &L,
        dataset: &Dataset,
    ) -> Result<Evaluation, ForestError> {
        let folds = self.folds(dataset)?;

        let mut fold_of = vec![0usize; dataset.len()];
        for (k, fold) in folds.iter().enumerate() {
            for &i in fold {
                fold_of[i] = k;
            }
        }

        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut confusion_matrix = ConfusionMatrix::new(dataset.n_classes());
        let mut evaluated_indices = Vec::with_capacity(dataset.len());

        for (k, held_out) in folds.iter().enumerate() {
            let train: Vec<usize> = (0..dataset.len()).filter(|&i| fold_of[i] != k).collect();
            let fold_cm = score_held_out(
                learner,
                dataset,
                &train,
                held_out,
                self.seed.wrapping_add(k as u64),
            )?;
            let fold_accuracy = fold_cm.accuracy();
            debug!(fold = k, n_test = held_out.len(), accuracy = fold_accuracy, "fold completed");

            fold_accuracies.push(fold_accuracy);
            confusion_matrix.merge(&fold_cm);
            evaluated_indices.extend_from_slice(held_out);
        }

        let accuracy = fold_accuracies.iter().sum::<f64>() / self.n_folds as f64;
        info!(accuracy, "cross-validation complete");

        Ok(Evaluation {
            accuracy,
            n_evaluated: evaluated_indices.len(),
            fold_accuracies,
            confusion_matrix,
            evaluated_indices,
        })
    }
}

/// Out-of-bag estimation from one bootstrap resample.
///
/// Trains on `n` draws with replacement and scores the instances that were
/// never drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutOfBag {
    seed: u64,
}

impl OutOfBag {
    /// Create an out-of-bag evaluator with seed 42.
    #[must_use]
    pub fn new() -> Self {
        Self { seed: 42 }
    }

    /// Set the random seed for the resample and training.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for OutOfBag {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for OutOfBag {
    #[instrument(skip_all, fields(n_samples = dataset.len()))]
    fn evaluate<L: Learner>(
        &self,
        learner: &L,
        dataset: &Dataset,
    ) -> Result<Evaluation, ForestError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let (bootstrap, oob) = bootstrap_sample(dataset.len(), dataset.len(), &mut rng);
        if oob.is_empty() {
            return Err(ForestError::OobEvaluationFailed {
                reason: "every instance was drawn into the bootstrap".to_string(),
            });
        }

        let confusion_matrix = score_held_out(learner, dataset, &bootstrap, &oob, rng.r#gen())?;
        let accuracy = confusion_matrix.accuracy();
        info!(accuracy, n_oob = oob.len(), "out-of-bag evaluation complete");

        Ok(Evaluation {
            accuracy,
            n_evaluated: oob.len(),
            fold_accuracies: vec![accuracy],
            confusion_matrix,
            evaluated_indices: oob,
        })
    }
}

/// A choice of evaluation protocol, swappable at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Protocol {
    /// Stratified k-fold cross-validation.
    CrossValidation(CrossValidation),
    /// Single-resample out-of-bag estimation.
    OutOfBag(OutOfBag),
}

impl Evaluator for Protocol {
    fn evaluate<L: Learner>(
        &self,
        learner: &L,
        dataset: &Dataset,
    ) -> Result<Evaluation, ForestError> {
        match self {
            Protocol::CrossValidation(cv) => cv.evaluate(learner, dataset),
            Protocol::OutOfBag(oob) => oob.evaluate(learner, dataset),
        }
    }
}

impl From<CrossValidation> for Protocol {
    fn from(cv: CrossValidation) -> Self {
        Protocol::CrossValidation(cv)
    }
}

impl From<OutOfBag> for Protocol {
    fn from(oob: OutOfBag) -> Self {
        Protocol::OutOfBag(oob)
    }
}

// --- Learner and Classifier implementations ---

impl Classifier for ProximityTree {
    fn predict_proba(&self, series: &TimeSeries) -> Result<ClassDistribution, ForestError> {
        ProximityTree::predict_proba(self, series)
    }
}

impl Learner for ProximityTreeConfig {
    type Model = ProximityTree;

    fn fit_seeded(&self, dataset: &Dataset, seed: u64) -> Result<ProximityTree, ForestError> {
        self.clone().with_seed(seed).fit(dataset)
    }
}

impl Classifier for ProximityForest {
    fn predict_proba(&self, series: &TimeSeries) -> Result<ClassDistribution, ForestError> {
        ProximityForest::predict_proba(self, series)
    }
}

impl Learner for ProximityForestConfig {
    type Model = ProximityForest;

    fn fit_seeded(&self, dataset: &Dataset, seed: u64) -> Result<ProximityForest, ForestError> {
        Ok(self.clone().with_seed(seed).fit(dataset)?.into_forest())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    /// `n_per_class` series per class; each class has its own level and swing.
    fn make_levels(n_per_class: usize, n_classes: usize) -> Dataset {
        let mut series = Vec::new();
        let mut labels = Vec::new();
        for class in 0..n_classes {
            for i in 0..n_per_class {
                let level = class as f64 * 10.0 + i as f64 * 0.01;
                let swing = 0.5 * (class + 1) as f64;
                series.push(ts(&[level, level + swing, level, level - swing]));
                labels.push(class);
            }
        }
        Dataset::new(series, labels, n_classes).unwrap()
    }

    /// Predicts a fixed class regardless of input.
    struct Constant(usize, usize);

    impl Classifier for Constant {
        fn predict_proba(&self, _: &TimeSeries) -> Result<ClassDistribution, ForestError> {
            Ok(ClassDistribution::certain(self.0, self.1))
        }
    }

    struct ConstantLearner(usize);

    impl Learner for ConstantLearner {
        type Model = Constant;

        fn fit_seeded(&self, dataset: &Dataset, _: u64) -> Result<Constant, ForestError> {
            Ok(Constant(self.0, dataset.n_classes()))
        }
    }

    // --- Folds ---

    #[test]
    fn invalid_fold_count() {
        assert!(CrossValidation::new(0).is_err());
        assert!(CrossValidation::new(1).is_err());
        assert_eq!(CrossValidation::default().n_folds(), 10);
    }

    #[test]
    fn four_folds_of_five_on_balanced_twenty() {
        let ds = make_levels(10, 2);
        let folds = CrossValidation::new(4).unwrap().folds(&ds).unwrap();
        assert_eq!(folds.len(), 4);
        for fold in &folds {
            assert_eq!(fold.len(), 5);
            assert_eq!(ds.distinct_classes(fold), 2);
        }
    }

    #[test]
    fn folds_partition_the_dataset() {
        let ds = make_levels(7, 3);
        let folds = CrossValidation::new(5).unwrap().folds(&ds).unwrap();
        let all: Vec<usize> = folds.iter().flatten().copied().collect();
        assert_eq!(all.len(), ds.len());
        let unique: BTreeSet<usize> = all.into_iter().collect();
        assert_eq!(unique.len(), ds.len());

        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        assert!(max - min <= 1, "sizes = {sizes:?}");
    }

    #[test]
    fn too_few_samples_for_folds() {
        let ds = make_levels(2, 1);
        let err = CrossValidation::new(3).unwrap().folds(&ds).unwrap_err();
        assert!(matches!(
            err,
            ForestError::TooFewSamplesForFolds {
                n_samples: 2,
                n_folds: 3
            }
        ));
    }

    // --- Protocols ---

    #[test]
    fn cross_validation_of_constant_learner() {
        let ds = make_levels(10, 2);
        let eval = CrossValidation::new(5)
            .unwrap()
            .evaluate(&ConstantLearner(0), &ds)
            .unwrap();
        assert_eq!(eval.fold_accuracies.len(), 5);
        assert_eq!(eval.n_evaluated, 20);
        assert!((eval.accuracy - 0.5).abs() < 1e-12);
        assert!((eval.error() - 0.5).abs() < 1e-12);
        assert_eq!(eval.confusion_matrix.as_rows(), &[vec![10, 0], vec![10, 0]]);
    }

    #[test]
    fn cross_validation_of_forest() {
        let ds = make_levels(8, 3);
        let learner = ProximityForestConfig::new(5).unwrap();
        let eval = CrossValidation::new(4)
            .unwrap()
            .evaluate(&learner, &ds)
            .unwrap();
        assert!(eval.accuracy > 0.9, "accuracy = {}", eval.accuracy);
        assert_eq!(eval.confusion_matrix.n_classes(), 3);
        assert_eq!(eval.confusion_matrix.total(), ds.len());
    }

    #[test]
    fn out_of_bag_scores_never_drawn_instances() {
        let ds = make_levels(10, 2);
        let eval = OutOfBag::new()
            .with_seed(3)
            .evaluate(&ProximityTreeConfig::new(), &ds)
            .unwrap();
        assert!(eval.n_evaluated > 0);
        assert!(eval.n_evaluated < ds.len());
        assert_eq!(eval.evaluated_indices.len(), eval.n_evaluated);
        assert_eq!(eval.fold_accuracies.len(), 1);
    }

    #[test]
    fn out_of_bag_single_instance_fails() {
        let ds = make_levels(1, 1);
        let err = OutOfBag::new()
            .evaluate(&ConstantLearner(0), &ds)
            .unwrap_err();
        assert!(matches!(err, ForestError::OobEvaluationFailed { .. }));
    }

    #[test]
    fn protocol_dispatches() {
        let ds = make_levels(6, 2);
        let learner = ConstantLearner(1);
        let cv: Protocol = CrossValidation::new(3).unwrap().into();
        let oob: Protocol = OutOfBag::new().into();
        let direct = CrossValidation::new(3).unwrap().evaluate(&learner, &ds).unwrap();
        let via = cv.evaluate(&learner, &ds).unwrap();
        assert_eq!(direct.evaluated_indices, via.evaluated_indices);
        assert!(oob.evaluate(&learner, &ds).is_ok());
    }
}
