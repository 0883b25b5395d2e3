//! Distance-parameter selection by scoring 1-NN classifiers.
//!
//! Each candidate [`ParamSet`] is resolved into a [`MeasureConfig`], wrapped
//! in a [`NearestNeighbourConfig`], and scored with the tuner's [`Protocol`].

use proxima_distance::{MeasureConfig, Param, ParamSet, ParamSpace, SpaceError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::eval::{CrossValidation, Evaluator, Protocol};
use crate::nearest::NearestNeighbourConfig;

/// How candidate parameter sets are drawn from the space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Search {
    /// Every combination of `granularity` evenly spaced values per dimension.
    Grid {
        /// Values per continuous dimension (at least 1).
        granularity: usize,
    },
    /// `n_samples` independent draws from the space.
    Random {
        /// Number of draws (at least 1).
        n_samples: usize,
    },
}

/// Parameter tuner.
///
/// # Defaults
///
/// | Field | Default |
/// |---|---|
/// | `protocol` | 10-fold cross-validation, seed 42 |
/// | `search` | `Random { n_samples: 100 }` |
/// | `seed` | 42 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tuner {
    protocol: Protocol,
    search: Search,
    seed: u64,
}

/// The winning configuration and the score of every candidate.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TunedConfig {
    /// The best-scoring measure.
    pub measure: MeasureConfig,
    /// Its estimated accuracy.
    pub accuracy: f64,
    /// Every evaluated measure with its accuracy, in evaluation order.
    pub scores: Vec<(MeasureConfig, f64)>,
}

impl Tuner {
    /// Create a tuner that scores candidates with `protocol`.
    #[must_use]
    pub fn new(protocol: impl Into<Protocol>) -> Self {
        Self {
            protocol: protocol.into(),
            search: Search::Random { n_samples: 100 },
            seed: 42,
        }
    }

    /// Set the search strategy.
    #[must_use]
    pub fn with_search(mut self, search: Search) -> Self {
        self.search = search;
        self
    }

    /// Set the random seed used by [`Search::Random`].
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the evaluation protocol.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Return the search strategy.
    #[must_use]
    pub fn search(&self) -> Search {
        self.search
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Score every candidate drawn from `space` and return the best.
    ///
    /// Ties in accuracy go to the candidate evaluated first.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::Space`] | The space has no dimensions, the search asks for zero candidates, or a candidate resolves to an invalid measure |
    /// | any | Errors raised by the evaluation protocol |
    #[instrument(skip_all, fields(n_samples = dataset.len(), search = ?self.search))]
    pub fn tune(&self, space: &ParamSpace, dataset: &Dataset) -> Result<TunedConfig, ForestError> {
        let candidates = self.candidates(space)?;

        let mut scores = Vec::with_capacity(candidates.len());
        for params in &candidates {
            let measure = MeasureConfig::from_params(params)?;
            let evaluation = self
                .protocol
                .evaluate(&NearestNeighbourConfig::new(measure), dataset)?;
            debug!(%measure, accuracy = evaluation.accuracy, "candidate scored");
            scores.push((measure, evaluation.accuracy));
        }

        let mut best = 0;
        for (i, &(_, accuracy)) in scores.iter().enumerate() {
            if accuracy > scores[best].1 {
                best = i;
            }
        }
        let (measure, accuracy) = scores[best];
        info!(%measure, accuracy, n_candidates = scores.len(), "tuning complete");

        Ok(TunedConfig {
            measure,
            accuracy,
            scores,
        })
    }

    fn candidates(&self, space: &ParamSpace) -> Result<Vec<ParamSet>, ForestError> {
        if space.dimensions().is_empty() {
            return Err(SpaceError::EmptyDomain {
                param: Param::Measure,
            }
            .into());
        }
        match self.search {
            Search::Grid { granularity } => Ok(space.enumerate(granularity)?),
            Search::Random { n_samples: 0 } => {
                Err(SpaceError::InvalidGranularity { granularity: 0 }.into())
            }
            Search::Random { n_samples } => {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                Ok((0..n_samples).map(|_| space.sample(&mut rng)).collect())
            }
        }
    }
}

impl Default for Tuner {
    fn default() -> Self {
        Self::new(CrossValidation::default())
    }
}
