use std::borrow::Cow;

use proxima_distance::{MeasureConfig, ParamSpace, TimeSeries, Transform, TransformCache};
use rand::Rng;

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::node::Impurity;

/// Gains within this distance of zero are rounding noise from the weighted sum.
const GAIN_TOLERANCE: f64 = 1e-12;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero (pure node).
    ///
    /// For `Gini`: `1 - Σ(p_i²)` where `p_i = count_i / n_samples`.
    /// For `Entropy`: `-Σ(p_i · ln(p_i))` summed only over classes where `p_i > 0`.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value)
    }

    /// Impurity of `parent` minus the size-weighted impurity of `branches`.
    ///
    /// Snaps to exactly `0.0` inside [`GAIN_TOLERANCE`], so a partition that
    /// keeps the parent's class mix never reports a spurious gain.
    #[must_use]
    pub(crate) fn gain(&self, dataset: &Dataset, parent: &[usize], branches: &[Vec<usize>]) -> f64 {
        let n = parent.len() as f64;
        let before = self.impurity(&dataset.class_counts(parent), parent.len());
        let after: f64 = branches
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| {
                let weight = b.len() as f64 / n;
                weight * self.impurity(&dataset.class_counts(b), b.len()).value()
            })
            .sum();
        let gain = before.value() - after;
        if gain.abs() <= GAIN_TOLERANCE { 0.0 } else { gain }
    }
}

/// Index of the exemplar nearest to `query`, lowest index on ties.
///
/// `query` must already be under `measure`'s transform; only the exemplars go
/// through `cache`. The best distance so far is passed as the cutoff, so
/// measures abandon as soon as an exemplar provably cannot win.
pub(crate) fn nearest_exemplar<'a, I>(
    measure: &MeasureConfig,
    cache: &TransformCache,
    query: &TimeSeries,
    exemplars: I,
) -> Result<usize, ForestError>
where
    I: IntoIterator<Item = &'a TimeSeries>,
{
    let mut best = f64::INFINITY;
    let mut best_index = 0;
    for (j, exemplar) in exemplars.into_iter().enumerate() {
        let d = measure
            .distance_from_transformed(cache, query, exemplar, best)?
            .value();
        if d < best {
            best = d;
            best_index = j;
        }
    }
    Ok(best_index)
}

/// Transform an unseen query for `measure` without storing it anywhere.
pub(crate) fn prepare_query<'a>(
    measure: &MeasureConfig,
    query: &'a TimeSeries,
) -> Cow<'a, TimeSeries> {
    match measure.transform() {
        Transform::Identity => Cow::Borrowed(query),
        transform => Cow::Owned(transform.apply(query)),
    }
}

/// [`nearest_exemplar`] for a query from outside the training set.
pub(crate) fn route_query<'a, I>(
    measure: &MeasureConfig,
    cache: &TransformCache,
    query: &TimeSeries,
    exemplars: I,
) -> Result<usize, ForestError>
where
    I: IntoIterator<Item = &'a TimeSeries>,
{
    nearest_exemplar(measure, cache, &prepare_query(measure, query), exemplars)
}

/// A randomly drawn split: one measure and one exemplar per represented class.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) measure: MeasureConfig,
    /// Dataset indices of the exemplars, in ascending class order.
    pub(crate) exemplars: Vec<usize>,
}

impl Candidate {
    /// Draw a measure from `space` and a uniformly chosen member of every
    /// non-empty class in `by_class`.
    pub(crate) fn draw<R: Rng>(
        space: &ParamSpace,
        by_class: &[Vec<usize>],
        rng: &mut R,
    ) -> Result<Self, ForestError> {
        let measure = MeasureConfig::from_params(&space.sample(rng))?;
        let exemplars = by_class
            .iter()
            .filter(|members| !members.is_empty())
            .map(|members| members[rng.gen_range(0..members.len())])
            .collect();
        Ok(Self { measure, exemplars })
    }

    /// Route every instance of `indices` to its nearest exemplar and score the result.
    pub(crate) fn partition(
        &self,
        dataset: &Dataset,
        indices: &[usize],
        criterion: SplitCriterion,
        cache: &TransformCache,
    ) -> Result<Partition, ForestError> {
        let transform = self.measure.transform();
        let mut branches = vec![Vec::new(); self.exemplars.len()];
        for &i in indices {
            let instance = cache.get(dataset.series_at(i), transform);
            let branch = nearest_exemplar(
                &self.measure,
                cache,
                &instance,
                self.exemplars.iter().map(|&e| dataset.series_at(e)),
            )?;
            branches[branch].push(i);
        }
        let gain = criterion.gain(dataset, indices, &branches);
        Ok(Partition { branches, gain })
    }
}

/// Instance indices per branch of a candidate, with the impurity gain.
#[derive(Debug, Clone)]
pub(crate) struct Partition {
    pub(crate) branches: Vec<Vec<usize>>,
    pub(crate) gain: f64,
}

impl Partition {
    /// True if some exemplar attracted no instance.
    pub(crate) fn has_empty_branch(&self) -> bool {
        self.branches.iter().any(Vec::is_empty)
    }

    /// Number of branches that received at least one instance.
    pub(crate) fn non_empty_branches(&self) -> usize {
        self.branches.iter().filter(|b| !b.is_empty()).count()
    }
}
