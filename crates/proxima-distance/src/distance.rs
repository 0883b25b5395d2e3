//! Distance newtype wrapper.

use std::cmp::Ordering;
use std::fmt;

/// A non-negative distance value returned by every [`DistanceMeasure`](crate::DistanceMeasure).
///
/// Values are raw accumulated costs. [`Distance::INFINITY`] marks a computation
/// that was abandoned because it could not finish at or below the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    /// Infinite distance, used as a sentinel when early abandoning.
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Zero distance.
    pub const ZERO: Self = Self(0.0);

    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return true if the computation was abandoned or overflowed.
    #[must_use]
    pub fn is_infinite(self) -> bool {
        self.0.is_infinite()
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
