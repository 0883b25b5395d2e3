//! One-nearest-neighbour classification under a single distance configuration.

use std::sync::Arc;

use proxima_distance::{MeasureConfig, TimeSeries, TransformCache};
use tracing::instrument;

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::eval::{Classifier, Learner};
use crate::predict::ClassDistribution;
use crate::split::route_query;

/// Configuration of a 1-NN classifier: just the measure.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NearestNeighbourConfig {
    measure: MeasureConfig,
}

impl NearestNeighbourConfig {
    /// Create a 1-NN config using `measure`.
    #[must_use]
    pub fn new(measure: MeasureConfig) -> Self {
        Self { measure }
    }

    /// Return the distance configuration.
    #[must_use]
    pub fn measure(&self) -> MeasureConfig {
        self.measure
    }

    /// Store `dataset` as the reference set.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Space`] when the measure's parameters are out of range.
    #[instrument(skip_all, fields(measure = %self.measure, n_samples = dataset.len()))]
    pub fn fit(&self, dataset: &Dataset) -> Result<NearestNeighbour, ForestError> {
        self.measure.validate()?;
        Ok(NearestNeighbour {
            measure: self.measure,
            reference: dataset.clone(),
            cache: Arc::new(TransformCache::new()),
        })
    }
}

/// A fitted 1-NN classifier.
#[derive(Debug, Clone)]
pub struct NearestNeighbour {
    measure: MeasureConfig,
    reference: Dataset,
    cache: Arc<TransformCache>,
}

impl NearestNeighbour {
    /// Index into the reference set of the instance nearest to `series`,
    /// lowest index on ties.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] when a distance computation fails.
    pub fn nearest(&self, series: &TimeSeries) -> Result<usize, ForestError> {
        route_query(&self.measure, &self.cache, series, self.reference.series())
    }

    /// Return the distance configuration.
    #[must_use]
    pub fn measure(&self) -> MeasureConfig {
        self.measure
    }
}

impl Classifier for NearestNeighbour {
    fn predict_proba(&self, series: &TimeSeries) -> Result<ClassDistribution, ForestError> {
        let label = self.reference.label(self.nearest(series)?);
        Ok(ClassDistribution::certain(label, self.reference.n_classes()))
    }
}

impl Learner for NearestNeighbourConfig {
    type Model = NearestNeighbour;

    /// 1-NN has no randomness; the seed is ignored.
    fn fit_seeded(&self, dataset: &Dataset, _seed: u64) -> Result<NearestNeighbour, ForestError> {
        self.fit(dataset)
    }
}
