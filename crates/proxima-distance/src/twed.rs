//! Time warp edit distance.

use crate::distance::Distance;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// TWED with stiffness `nu` and deletion penalty `lambda`.
///
/// Points are time-stamped by position (1-based) and both series are padded
/// with a leading zero at time 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twed {
    nu: f64,
    lambda: f64,
}

impl Twed {
    /// Create a TWED calculator.
    #[must_use]
    pub fn new(nu: f64, lambda: f64) -> Self {
        Self { nu, lambda }
    }
}

impl DistanceMeasure for Twed {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        let (n, m) = (a.len(), b.len());
        let at = |i: usize| if i == 0 { 0.0 } else { a[i - 1] };
        let bt = |j: usize| if j == 0 { 0.0 } else { b[j - 1] };
        let delete_cost = self.nu + self.lambda;

        let mut prev = vec![f64::INFINITY; m + 1];
        let mut curr = vec![f64::INFINITY; m + 1];
        prev[0] = 0.0;

        for i in 1..=n {
            curr[0] = f64::INFINITY;
            let mut row_min = f64::INFINITY;
            for j in 1..=m {
                let delete_a = prev[j] + (at(i) - at(i - 1)).abs() + delete_cost;
                let delete_b = curr[j - 1] + (bt(j) - bt(j - 1)).abs() + delete_cost;
                let matched = prev[j - 1]
                    + (at(i) - bt(j)).abs()
                    + (at(i - 1) - bt(j - 1)).abs()
                    + 2.0 * self.nu * i.abs_diff(j) as f64;
                curr[j] = matched.min(delete_a).min(delete_b);
                row_min = row_min.min(curr[j]);
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

    fn dist(twed: Twed, a: &[f64], b: &[f64], cutoff: f64) -> f64 {
        let a = TimeSeries::new(a.to_vec()).unwrap();
        let b = TimeSeries::new(b.to_vec()).unwrap();
        twed.distance(a.as_view(), b.as_view(), cutoff).value()
    }

    #[test]
    fn identical_series_distance_zero() {
        assert_eq!(dist(Twed::new(0.5, 1.0), &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], f64::INFINITY), 0.0);
    }

    #[test]
    fn single_points() {
        // Match cost |3 - 1| + |0 - 0| with equal timestamps.
        assert!((dist(Twed::new(0.1, 0.1), &[3.0], &[1.0], f64::INFINITY) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn deleting_a_repeat_costs_nu_plus_lambda() {
        // [1, 1] vs [1]: the first points match for free, the repeat is deleted.
        let d = dist(Twed::new(0.25, 0.5), &[1.0, 1.0], &[1.0], f64::INFINITY);
        assert!((d - 0.75).abs() < 1e-12);
    }

    #[test]
    fn symmetric() {
        let a = [0.5, 1.5, -2.0, 3.0, 0.0];
        let b = [1.0, -1.0, 2.5];
        let twed = Twed::new(0.001, 0.1);
        let ab = dist(twed, &a, &b, f64::INFINITY);
        let ba = dist(twed, &b, &a, f64::INFINITY);
        assert!((ab - ba).abs() < 1e-10);
    }

    #[test]
    fn cutoff_abandons() {
        assert!(dist(Twed::new(0.001, 0.0), &[0.0; 4], &[5.0; 4], 1.0).is_infinite());
    }
}
