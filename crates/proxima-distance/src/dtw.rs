//! DTW distance computation and the shared banded warping recurrence.

use crate::constraint::BandConstraint;
use crate::distance::Distance;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// Immutable DTW configuration. Thread-safe and copyable.
///
/// The window is a fraction of the longer series; the band radius is resolved
/// per pair with [`BandConstraint::from_window`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dtw {
    window: f64,
}

impl Dtw {
    /// Create an unconstrained DTW calculator.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self { window: 1.0 }
    }

    /// Create a DTW calculator with a window fraction in `[0, 1]`.
    #[must_use]
    pub fn with_window(window: f64) -> Self {
        Self { window }
    }

    /// Return the window fraction.
    #[must_use]
    pub fn window(&self) -> f64 {
        self.window
    }

    /// Return the band used for a pair of series with lengths `n` and `m`.
    #[must_use]
    pub fn constraint(&self, n: usize, m: usize) -> BandConstraint {
        BandConstraint::from_window(self.window, n, m)
    }
}

impl DistanceMeasure for Dtw {
    /// Rolling two-row DTW over squared point differences. Runs in O(n * bw)
    /// time and O(bw) space, where `bw` is the band width.
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        let constraint = self.constraint(a.len(), b.len());
        Distance::new(warping_cost(a.len(), b.len(), constraint, cutoff, |i, j| {
            (a[i] - b[j]).powi(2)
        }))
    }
}

/// Banded DTW recurrence `C[i][j] = cost(i, j) + min(left, above, diagonal)`
/// with early abandoning.
///
/// Each row buffer has `bw + 2` slots. Index 0 is the left sentinel (INF)
/// and index `bw + 1` is the right sentinel (INF). Active columns occupy
/// indices `1..=bw`.
///
/// For column `j` in row `i`:
/// - current local index: `j - col_range.start + 1`
/// - predecessor above `C[i-1][j]`: `j - prev_start + 1` in `prev`
/// - predecessor diagonal `C[i-1][j-1]`: `j - prev_start` in `prev`
/// - predecessor left `C[i][j-1]`: `curr_local - 1`
///
/// Out-of-band accesses read INF from the sentinel slots. Returns
/// `f64::INFINITY` as soon as the minimum accumulated cost of a row exceeds
/// `cutoff`, or when the final cell does.
pub(crate) fn warping_cost<F>(
    n: usize,
    m: usize,
    constraint: BandConstraint,
    cutoff: f64,
    cost: F,
) -> f64
where
    F: Fn(usize, usize) -> f64,
{
    let bw = constraint.band_width(m);
    let buf_width = bw + 2;

    let mut prev = vec![f64::INFINITY; buf_width];
    let mut curr = vec![f64::INFINITY; buf_width];

    let mut prev_start: usize = 0;

    for i in 0..n {
        curr.fill(f64::INFINITY);

        let col_range = constraint.column_range(i, m);
        let curr_start = col_range.start;
        let mut row_min = f64::INFINITY;

        for j in col_range {
            let c = cost(i, j);
            let cj = j - curr_start + 1;

            if i == 0 && j == 0 {
                curr[cj] = c;
                row_min = row_min.min(c);
                continue;
            }

            let left = if j > curr_start {
                curr[cj - 1]
            } else {
                f64::INFINITY
            };

            let above = if i > 0 {
                let pj = j.wrapping_sub(prev_start).wrapping_add(1);
                if pj < buf_width { prev[pj] } else { f64::INFINITY }
            } else {
                f64::INFINITY
            };

            let diag = if i > 0 && j > 0 {
                let pj = j.wrapping_sub(prev_start);
                if pj < buf_width { prev[pj] } else { f64::INFINITY }
            } else {
                f64::INFINITY
            };

            let val = c + left.min(above).min(diag);
            curr[cj] = val;
            row_min = row_min.min(val);
        }

        // Every warping path crosses every row with non-negative costs, so the
        // row minimum bounds the final cost. The last row is checked at the
        // final cell instead.
        if i < n - 1 && row_min > cutoff {
            return f64::INFINITY;
        }

        prev_start = curr_start;
        std::mem::swap(&mut prev, &mut curr);
    }

    // After the final swap, `prev` holds the last completed row.
    let local = (m - 1) - prev_start + 1;
    let total = prev[local];

    if total > cutoff {
        return f64::INFINITY;
    }
    total
}
