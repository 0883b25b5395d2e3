//! Labelled collections of time series.

use proxima_distance::{SeriesStats, TimeSeries};

use crate::error::ForestError;

/// A labelled collection of time series with a closed set of classes.
///
/// Labels are zero-based class indices in `0..n_classes`. The class count is
/// fixed at construction so that subsets (bootstrap samples, folds, node
/// partitions) keep distributions of the same width even when a class is
/// missing from them.
///
/// Derived views take a slice of instance indices, which is how tree nodes
/// refer to their share of the training data without copying series.
#[derive(Debug, Clone)]
pub struct Dataset {
    series: Vec<TimeSeries>,
    labels: Vec<usize>,
    n_classes: usize,
}

impl Dataset {
    /// Build a dataset with an explicit number of classes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidClassCount`] | `n_classes` is zero |
    /// | [`ForestError::EmptyDataset`] | `series` is empty |
    /// | [`ForestError::LabelCountMismatch`] | `series.len() != labels.len()` |
    /// | [`ForestError::LabelOutOfRange`] | Any label is `>= n_classes` |
    pub fn new(
        series: Vec<TimeSeries>,
        labels: Vec<usize>,
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if n_classes == 0 {
            return Err(ForestError::InvalidClassCount { n_classes });
        }
        if series.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if series.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                series: series.len(),
                labels: labels.len(),
            });
        }
        if let Some((index, &label)) = labels.iter().enumerate().find(|(_, l)| **l >= n_classes) {
            return Err(ForestError::LabelOutOfRange {
                index,
                label,
                n_classes,
            });
        }
        Ok(Self {
            series,
            labels,
            n_classes,
        })
    }

    /// Build a dataset whose class count is one more than the largest label.
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::new`].
    pub fn from_labels(series: Vec<TimeSeries>, labels: Vec<usize>) -> Result<Self, ForestError> {
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        if labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        Self::new(series, labels, n_classes)
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Always false; construction rejects empty datasets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// All series, in instance order.
    #[must_use]
    pub fn series(&self) -> &[TimeSeries] {
        &self.series
    }

    /// All labels, in instance order.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// The series of instance `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn series_at(&self, index: usize) -> &TimeSeries {
        &self.series[index]
    }

    /// The label of instance `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    /// Indices `0..len()`.
    #[must_use]
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    /// Per-class instance counts over `indices`.
    #[must_use]
    pub fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Split `indices` by class, preserving their order within each class.
    #[must_use]
    pub fn indices_by_class(&self, indices: &[usize]) -> Vec<Vec<usize>> {
        let mut by_class = vec![Vec::new(); self.n_classes];
        for &i in indices {
            by_class[self.labels[i]].push(i);
        }
        by_class
    }

    /// Gini impurity of the labels at `indices`. Zero for an empty subset.
    #[must_use]
    pub fn gini(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        let n = indices.len() as f64;
        let sum_sq: f64 = self
            .class_counts(indices)
            .iter()
            .map(|&c| {
                let p = c as f64 / n;
                p * p
            })
            .sum();
        1.0 - sum_sq
    }

    /// Normalized class distribution over `indices`.
    ///
    /// An empty subset carries no evidence and yields the uniform distribution.
    #[must_use]
    pub fn distribution(&self, indices: &[usize]) -> Vec<f64> {
        if indices.is_empty() {
            return vec![1.0 / self.n_classes as f64; self.n_classes];
        }
        let n = indices.len() as f64;
        self.class_counts(indices)
            .into_iter()
            .map(|c| c as f64 / n)
            .collect()
    }

    /// Number of classes with at least one instance in `indices`.
    #[must_use]
    pub fn distinct_classes(&self, indices: &[usize]) -> usize {
        self.class_counts(indices).iter().filter(|&&c| c > 0).count()
    }

    /// Build a new dataset from the instances at `indices`.
    ///
    /// Duplicates are allowed (bootstrap samples). Series are shared, not
    /// copied, so cached transforms stay valid for the subset.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::EmptyDataset`] when `indices` is empty.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= len()`.
    pub fn subset(&self, indices: &[usize]) -> Result<Dataset, ForestError> {
        if indices.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        Ok(Self {
            series: indices.iter().map(|&i| self.series[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            n_classes: self.n_classes,
        })
    }

    /// Length and spread statistics used to scale parameter spaces.
    #[must_use]
    pub fn stats(&self) -> SeriesStats {
        SeriesStats::from_series(&self.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    fn make_dataset() -> Dataset {
        Dataset::new(
            vec![
                ts(&[0.0, 1.0]),
                ts(&[0.0, 2.0]),
                ts(&[5.0, 5.0]),
                ts(&[6.0, 5.0]),
                ts(&[7.0, 5.0]),
            ],
            vec![0, 0, 1, 1, 1],
            3,
        )
        .unwrap()
    }

    // --- Validation ---

    #[test]
    fn rejects_zero_classes() {
        let err = Dataset::new(vec![ts(&[1.0])], vec![0], 0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidClassCount { n_classes: 0 }));
    }

    #[test]
    fn rejects_empty() {
        let err = Dataset::new(vec![], vec![], 2).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
        let err = Dataset::from_labels(vec![], vec![]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let err = Dataset::new(vec![ts(&[1.0]), ts(&[2.0])], vec![0], 2).unwrap_err();
        assert!(matches!(
            err,
            ForestError::LabelCountMismatch {
                series: 2,
                labels: 1
            }
        ));
    }

    #[test]
    fn rejects_label_out_of_range() {
        let err = Dataset::new(vec![ts(&[1.0]), ts(&[2.0])], vec![0, 2], 2).unwrap_err();
        assert!(matches!(
            err,
            ForestError::LabelOutOfRange {
                index: 1,
                label: 2,
                n_classes: 2
            }
        ));
    }

    #[test]
    fn from_labels_infers_class_count() {
        let ds = Dataset::from_labels(vec![ts(&[1.0]), ts(&[2.0])], vec![0, 3]).unwrap();
        assert_eq!(ds.n_classes(), 4);
    }

    // --- Views ---

    #[test]
    fn class_counts_keep_full_width() {
        let ds = make_dataset();
        assert_eq!(ds.class_counts(&ds.all_indices()), vec![2, 3, 0]);
        assert_eq!(ds.class_counts(&[2, 3]), vec![0, 2, 0]);
    }

    #[test]
    fn indices_by_class_preserves_order() {
        let ds = make_dataset();
        let by_class = ds.indices_by_class(&[4, 0, 2, 1]);
        assert_eq!(by_class, vec![vec![0, 1], vec![4, 2], vec![]]);
    }

    #[test]
    fn gini_values() {
        let ds = make_dataset();
        assert!(ds.gini(&[0, 1]).abs() < 1e-12);
        assert!((ds.gini(&[0, 2]) - 0.5).abs() < 1e-12);
        assert!(ds.gini(&[]).abs() < 1e-12);
    }

    #[test]
    fn distribution_values() {
        let ds = make_dataset();
        let d = ds.distribution(&[0, 2, 3, 4]);
        assert!((d[0] - 0.25).abs() < 1e-12);
        assert!((d[1] - 0.75).abs() < 1e-12);
        assert!(d[2].abs() < 1e-12);

        let empty = ds.distribution(&[]);
        assert!(empty.iter().all(|&p| (p - 1.0 / 3.0).abs() < 1e-12));
    }

    #[test]
    fn distinct_classes_counts_represented() {
        let ds = make_dataset();
        assert_eq!(ds.distinct_classes(&ds.all_indices()), 2);
        assert_eq!(ds.distinct_classes(&[3]), 1);
        assert_eq!(ds.distinct_classes(&[]), 0);
    }

    #[test]
    fn subset_shares_series_and_allows_duplicates() {
        let ds = make_dataset();
        let sub = ds.subset(&[2, 2, 0]).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.labels(), &[1, 1, 0]);
        assert_eq!(sub.n_classes(), 3);
        assert_eq!(sub.series_at(0).id(), ds.series_at(2).id());
        assert!(matches!(ds.subset(&[]), Err(ForestError::EmptyDataset)));
    }

    #[test]
    fn stats_cover_all_series() {
        let ds = make_dataset();
        let stats = ds.stats();
        assert_eq!(stats.max_length, 2);
        assert!(stats.std > 0.0);
    }
}
