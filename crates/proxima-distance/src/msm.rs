//! Move-split-merge distance.

use crate::distance::Distance;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// MSM: matched points cost their absolute difference; a split or merge costs
/// `cost`, plus the distance to the nearer neighbour when the new point does
/// not lie between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Msm {
    cost: f64,
}

impl Msm {
    /// Create an MSM calculator with the given split/merge cost.
    #[must_use]
    pub fn new(cost: f64) -> Self {
        Self { cost }
    }

    /// Cost of inserting `point` next to `x` while aligned against `y`.
    fn split_merge(&self, point: f64, x: f64, y: f64) -> f64 {
        if (x <= point && point <= y) || (y <= point && point <= x) {
            self.cost
        } else {
            self.cost + (point - x).abs().min((point - y).abs())
        }
    }
}

impl DistanceMeasure for Msm {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        let (n, m) = (a.len(), b.len());

        let mut prev = vec![0.0; m];
        let mut curr = vec![0.0; m];

        prev[0] = (a[0] - b[0]).abs();
        for j in 1..m {
            prev[j] = prev[j - 1] + self.split_merge(b[j], a[0], b[j - 1]);
        }
        if n > 1 && prev.iter().copied().fold(f64::INFINITY, f64::min) > cutoff {
            return Distance::INFINITY;
        }

        for i in 1..n {
            curr[0] = prev[0] + self.split_merge(a[i], a[i - 1], b[0]);
            let mut row_min = curr[0];
            for j in 1..m {
                let moved = prev[j - 1] + (a[i] - b[j]).abs();
                let split_a = prev[j] + self.split_merge(a[i], a[i - 1], b[j]);
                let split_b = curr[j - 1] + self.split_merge(b[j], a[i], b[j - 1]);
                curr[j] = moved.min(split_a).min(split_b);
                row_min = row_min.min(curr[j]);
            }
            if i < n - 1 && row_min > cutoff {
                return Distance::INFINITY;
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        let total = prev[m - 1];
        if total > cutoff {
            Distance::INFINITY
        } else {
            Distance::new(total)
        }
    }
}
