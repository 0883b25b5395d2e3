//! Band constraint types for warping-window kernels.

use std::ops::Range;

/// Constraint on the warping window of a dynamic-programming kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BandConstraint {
    /// No constraint, the full cost matrix is computed.
    #[default]
    Unconstrained,

    /// Sakoe-Chiba band: cell (i,j) is valid only if |i - j| <= radius.
    SakoeChibaRadius(usize),
}

impl BandConstraint {
    /// Build a band from a window expressed as a fraction of the longer series.
    ///
    /// The radius is `floor(window * max(n, m))`, widened to at least `|n - m|`
    /// so the final cell `(n-1, m-1)` is always reachable. A window of `1.0`
    /// or more is unconstrained.
    #[must_use]
    pub fn from_window(window: f64, n: usize, m: usize) -> Self {
        if window >= 1.0 {
            return Self::Unconstrained;
        }
        let longest = n.max(m);
        let radius = (window.max(0.0) * longest as f64).floor() as usize;
        Self::from_radius(radius, n, m)
    }

    /// Build a Sakoe-Chiba band from an absolute radius, widened to at least `|n - m|`.
    #[must_use]
    pub fn from_radius(radius: usize, n: usize, m: usize) -> Self {
        Self::SakoeChibaRadius(radius.max(n.abs_diff(m)))
    }

    /// Return the valid column range for a given row in the cost matrix.
    ///
    /// For unconstrained kernels, returns `0..n_cols`.
    /// For Sakoe-Chiba, returns the intersection of `[row - r, row + r]` with `[0, n_cols)`.
    #[must_use]
    pub fn column_range(&self, row: usize, n_cols: usize) -> Range<usize> {
        match self {
            Self::Unconstrained => 0..n_cols,
            Self::SakoeChibaRadius(r) => {
                let start = row.saturating_sub(*r).min(n_cols);
                let end = (row + r + 1).min(n_cols);
                start..end
            }
        }
    }

    /// Return true if cell `(row, col)` lies inside the band.
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::SakoeChibaRadius(r) => row.abs_diff(col) <= *r,
        }
    }

    /// Return the maximum band width for a given matrix size.
    ///
    /// For unconstrained kernels, returns `m` (full width).
    /// For Sakoe-Chiba with radius `r`, returns `min(2*r + 1, m)`.
    #[must_use]
    pub fn band_width(&self, m: usize) -> usize {
        match self {
            Self::Unconstrained => m,
            Self::SakoeChibaRadius(r) => (2 * r + 1).min(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_full_range() {
        let c = BandConstraint::Unconstrained;
        assert_eq!(c.column_range(0, 10), 0..10);
        assert_eq!(c.column_range(5, 10), 0..10);
    }

    #[test]
    fn sakoe_chiba_middle_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(5, 10), 3..8);
    }

    #[test]
    fn sakoe_chiba_first_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(0, 10), 0..3);
    }

    #[test]
    fn sakoe_chiba_last_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(9, 10), 7..10);
    }

    #[test]
    fn sakoe_chiba_radius_exceeds_size() {
        let c = BandConstraint::SakoeChibaRadius(20);
        assert_eq!(c.column_range(3, 5), 0..5);
    }

    #[test]
    fn window_scales_with_longer_series() {
        assert_eq!(
            BandConstraint::from_window(0.1, 50, 40),
            BandConstraint::SakoeChibaRadius(10)
        );
        assert_eq!(
            BandConstraint::from_window(0.25, 20, 20),
            BandConstraint::SakoeChibaRadius(5)
        );
    }

    #[test]
    fn window_widened_to_length_gap() {
        assert_eq!(
            BandConstraint::from_window(0.0, 10, 4),
            BandConstraint::SakoeChibaRadius(6)
        );
    }

    #[test]
    fn full_window_is_unconstrained() {
        assert_eq!(
            BandConstraint::from_window(1.0, 10, 10),
            BandConstraint::Unconstrained
        );
    }

    #[test]
    fn zero_radius_is_diagonal() {
        let c = BandConstraint::from_radius(0, 6, 6);
        assert!(c.contains(3, 3));
        assert!(!c.contains(3, 4));
        assert_eq!(c.band_width(6), 1);
    }

    #[test]
    fn default_is_unconstrained() {
        assert_eq!(BandConstraint::default(), BandConstraint::Unconstrained);
    }
}
