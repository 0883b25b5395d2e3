//! Edit distance with real penalty.

use crate::constraint::BandConstraint;
use crate::distance::Distance;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// ERP: an edit distance where an unmatched point costs its squared distance
/// to a constant gap value, and matched points cost their squared difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Erp {
    band_size: usize,
    penalty: f64,
}

impl Erp {
    /// Create an ERP calculator with an absolute band radius and gap value.
    #[must_use]
    pub fn new(band_size: usize, penalty: f64) -> Self {
        Self { band_size, penalty }
    }
}

impl DistanceMeasure for Erp {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        let (n, m) = (a.len(), b.len());
        let band = BandConstraint::from_radius(self.band_size, n, m);
        let gap = |x: f64| (x - self.penalty).powi(2);

        // Row `i` / column `j` of the padded grid stand for prefixes of length i / j.
        let mut prev = vec![f64::INFINITY; m + 1];
        let mut curr = vec![f64::INFINITY; m + 1];
        prev[0] = 0.0;
        for j in 1..=m {
            if band.contains(0, j) {
                prev[j] = prev[j - 1] + gap(b[j - 1]);
            }
        }

        for i in 1..=n {
            curr.fill(f64::INFINITY);
            let mut row_min = f64::INFINITY;

            for j in band.column_range(i, m + 1) {
                let val = if j == 0 {
                    prev[0] + gap(a[i - 1])
                } else {
                    let matched = prev[j - 1] + (a[i - 1] - b[j - 1]).powi(2);
                    let skip_a = prev[j] + gap(a[i - 1]);
                    let skip_b = curr[j - 1] + gap(b[j - 1]);
                    matched.min(skip_a).min(skip_b)
                };
                curr[j] = val;
                row_min = row_min.min(val);
            }

            if i < n && row_min > cutoff {
                return Distance::INFINITY;
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        let total = prev[m];
        if total > cutoff {
            Distance::INFINITY
        } else {
            Distance::new(total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TimeSeries;

    fn dist(erp: Erp, a: &[f64], b: &[f64], cutoff: f64) -> f64 {
        let a = TimeSeries::new(a.to_vec()).unwrap();
        let b = TimeSeries::new(b.to_vec()).unwrap();
        erp.distance(a.as_view(), b.as_view(), cutoff).value()
    }

    #[test]
    fn equal_length_diagonal_is_squared_euclidean() {
        // Zero band on equal lengths only permits matches.
        let d = dist(Erp::new(0, 0.0), &[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0], f64::INFINITY);
        assert!((d - 5.0).abs() < 1e-10);
    }

    #[test]
    fn gap_absorbs_an_extra_point() {
        // Deleting the trailing 0 against a gap of 0 is free.
        let d = dist(Erp::new(1, 0.0), &[1.0, 2.0, 0.0], &[1.0, 2.0], f64::INFINITY);
        assert!(d.abs() < 1e-10);
    }

    #[test]
    fn penalty_changes_gap_cost() {
        let d = dist(Erp::new(1, 1.0), &[1.0, 2.0, 0.0], &[1.0, 2.0], f64::INFINITY);
        assert!((d - 1.0).abs() < 1e-10);
    }

    #[test]
    fn symmetric() {
        let a = [0.5, 1.5, -2.0, 3.0, 0.0];
        let b = [1.0, -1.0, 2.5];
        let erp = Erp::new(2, 0.3);
        assert!((dist(erp, &a, &b, f64::INFINITY) - dist(erp, &b, &a, f64::INFINITY)).abs() < 1e-10);
    }

    #[test]
    fn cutoff_abandons() {
        let d = dist(Erp::new(3, 0.0), &[0.0; 4], &[4.0; 4], 2.0);
        assert!(d.is_infinite());
    }

    #[test]
    fn cutoff_at_distance_is_exact() {
        let exact = dist(Erp::new(2, 0.5), &[1.0, 3.0, 2.0], &[2.0, 1.0, 0.0], f64::INFINITY);
        let cut = dist(Erp::new(2, 0.5), &[1.0, 3.0, 2.0], &[2.0, 1.0, 0.0], exact);
        assert_eq!(exact, cut);
    }
}
