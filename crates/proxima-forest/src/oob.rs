//! Out-of-bag (OOB) evaluation for the proximity forest.

use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::predict::argmax;
use crate::tree::ProximityTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OobScore {
    /// OOB accuracy (fraction of correctly predicted OOB samples).
    pub accuracy: f64,
    /// OOB confusion matrix.
    pub confusion_matrix: ConfusionMatrix,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Compute out-of-bag predictions and accuracy.
///
/// For each sample, only trees where the sample was NOT in the bootstrap
/// contribute, by summing their leaf distributions. Samples with no OOB
/// trees are skipped.
pub(crate) fn compute_oob(
    trees: &[ProximityTree],
    dataset: &Dataset,
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ForestError> {
    let n_samples = dataset.len();
    let n_classes = dataset.n_classes();

    // Per tree, the distributions of its OOB samples.
    let per_tree: Vec<Vec<(usize, Vec<f64>)>> = trees
        .par_iter()
        .zip(oob_indices_per_tree.par_iter())
        .map(|(tree, oob_indices)| {
            oob_indices
                .iter()
                .map(|&i| {
                    let proba = tree.predict_proba_until(dataset.series_at(i), None)?;
                    Ok((i, proba.as_slice().to_vec()))
                })
                .collect::<Result<Vec<_>, ForestError>>()
        })
        .collect::<Result<_, _>>()?;

    let mut oob_sums: Vec<Vec<f64>> = vec![vec![0.0; n_classes]; n_samples];
    let mut has_oob = vec![false; n_samples];
    for (i, proba) in per_tree.into_iter().flatten() {
        for (s, p) in oob_sums[i].iter_mut().zip(&proba) {
            *s += p;
        }
        has_oob[i] = true;
    }

    let mut true_labels = Vec::new();
    let mut predicted = Vec::new();
    for (i, sums) in oob_sums.iter().enumerate() {
        if has_oob[i] {
            true_labels.push(dataset.label(i));
            predicted.push(argmax(sums));
        }
    }

    let n_oob_samples = true_labels.len();
    if n_oob_samples == 0 {
        return Err(ForestError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    let confusion_matrix = ConfusionMatrix::from_labels(&true_labels, &predicted, n_classes)?;

    Ok(OobScore {
        accuracy: confusion_matrix.accuracy(),
        confusion_matrix,
        n_oob_samples,
    })
}

#[cfg(test)]
mod tests {
    use proxima_distance::TimeSeries;

    use super::*;
    use crate::tree::ProximityTreeConfig;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    fn make_dataset() -> Dataset {
        Dataset::new(
            vec![
                ts(&[0.0, 0.0]),
                ts(&[0.1, 0.0]),
                ts(&[3.0, 3.0]),
                ts(&[3.1, 3.0]),
            ],
            vec![0, 0, 1, 1],
            2,
        )
        .unwrap()
    }

    #[test]
    fn no_oob_samples_fails() {
        let ds = make_dataset();
        let tree = ProximityTreeConfig::new().fit(&ds).unwrap();
        let err = compute_oob(&[tree], &ds, &[vec![]]).unwrap_err();
        assert!(matches!(err, ForestError::OobEvaluationFailed { .. }));
    }

    #[test]
    fn only_oob_samples_are_scored() {
        let ds = make_dataset();
        let train = ds.subset(&[0, 2]).unwrap();
        let tree = ProximityTreeConfig::new().fit(&train).unwrap();
        let score = compute_oob(&[tree], &ds, &[vec![1, 3]]).unwrap();
        assert_eq!(score.n_oob_samples, 2);
        assert!((score.accuracy - 1.0).abs() < 1e-12);
        assert_eq!(score.confusion_matrix.as_rows(), &[vec![1, 0], vec![0, 1]]);
    }
}
