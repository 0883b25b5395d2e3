//! Prediction methods for the proximity forest ensemble.

use std::time::Instant;

use proxima_distance::TimeSeries;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::error::ForestError;
use crate::forest::ProximityForest;

/// Class probability distribution from a prediction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Create a new class distribution.
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Equal probability for each of `n_classes` classes.
    #[must_use]
    pub fn uniform(n_classes: usize) -> Self {
        let n = n_classes.max(1);
        Self::new(vec![1.0 / n as f64; n])
    }

    /// One-hot distribution on `class`.
    pub(crate) fn certain(class: usize, n_classes: usize) -> Self {
        let mut probs = vec![0.0; n_classes];
        probs[class] = 1.0;
        Self::new(probs)
    }

    /// Return the predicted class (argmax of probabilities, lowest index on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        argmax(&self.probs)
    }

    /// Return the top-k classes sorted by descending probability.
    ///
    /// Equal probabilities keep ascending class order.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.probs.len()
    }
}

/// Index of the largest value, lowest index on ties. Zero for an empty slice.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl ProximityForest {
    /// Predict the class label for a single series.
    ///
    /// Returns the argmax of the summed tree distributions.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] when a distance computation fails.
    pub fn predict(&self, series: &TimeSeries) -> Result<usize, ForestError> {
        Ok(self.predict_proba(series)?.predicted_class())
    }

    /// Return the class probability distribution for a single series.
    ///
    /// Sums the leaf distributions of all trees without weighting and
    /// normalizes the result. A forest with no trees returns the uniform
    /// distribution.
    ///
    /// With a test time limit, trees are consulted in order until the budget
    /// runs out and only the trees reached are summed; if none is reached the
    /// result is uniform. The budget also cuts short the descent of the last
    /// tree consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] when a distance computation fails.
    pub fn predict_proba(&self, series: &TimeSeries) -> Result<ClassDistribution, ForestError> {
        let deadline = self.test_time_limit.map(|limit| Instant::now() + limit);
        let mut sum = vec![0.0f64; self.n_classes];
        let mut reached = 0usize;
        for tree in &self.trees {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let proba = tree.predict_proba_until(series, deadline)?;
            for (s, p) in sum.iter_mut().zip(proba.as_slice()) {
                *s += p;
            }
            reached += 1;
        }
        if reached < self.trees.len() {
            debug!(reached, n_trees = self.trees.len(), "test time limit cut the vote short");
        }
        if reached == 0 {
            return Ok(ClassDistribution::uniform(self.n_classes));
        }
        let total: f64 = sum.iter().sum();
        if total > 0.0 {
            sum.iter_mut().for_each(|v| *v /= total);
        }

        Ok(ClassDistribution::new(sum))
    }

    /// Predict class labels for a batch of series in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first [`ForestError`] raised by any series.
    pub fn predict_batch(&self, series: &[TimeSeries]) -> Result<Vec<usize>, ForestError> {
        series
            .into_par_iter()
            .map(|s| self.predict(s))
            .collect()
    }

    /// Return probability distributions for a batch of series in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first [`ForestError`] raised by any series.
    pub fn predict_proba_batch(
        &self,
        series: &[TimeSeries],
    ) -> Result<Vec<ClassDistribution>, ForestError> {
        series
            .into_par_iter()
            .map(|s| self.predict_proba(s))
            .collect()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
