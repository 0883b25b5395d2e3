//! Time series types with validation and identity guarantees.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DistanceError;

static NEXT_SERIES_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a [`TimeSeries`].
///
/// Allocated once at construction and shared by clones. Series are immutable,
/// so the id is a valid cache key for anything derived from the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesId(u64);

impl SeriesId {
    fn fresh() -> Self {
        Self(NEXT_SERIES_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Return the raw id.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owned, validated time series. Guaranteed non-empty with all finite values.
///
/// Values live behind an [`Arc`], so cloning is cheap and keeps the identity.
/// Serialization writes only the values; deserializing validates them again
/// and allocates a fresh [`SeriesId`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct TimeSeries {
    id: SeriesId,
    values: Arc<[f64]>,
}

impl TimeSeries {
    /// Create a new time series, validating that it is non-empty and all values are finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DistanceError::EmptySeries`] | `values` is empty |
    /// | [`DistanceError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(values: Vec<f64>) -> Result<Self, DistanceError> {
        if values.is_empty() {
            return Err(DistanceError::EmptySeries);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(DistanceError::NonFiniteValue { index });
        }
        Ok(Self::new_unchecked(values))
    }

    /// Create a series from values already known to be non-empty and finite.
    pub(crate) fn new_unchecked(values: Vec<f64>) -> Self {
        Self {
            id: SeriesId::fresh(),
            values: values.into(),
        }
    }

    /// Return the identity of this series.
    #[must_use]
    pub fn id(&self) -> SeriesId {
        self.id
    }

    /// Borrow this series as a zero-copy view.
    #[must_use]
    pub fn as_view(&self) -> TimeSeriesView<'_> {
        TimeSeriesView::new_unchecked(&self.values)
    }

    /// Return the number of time steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if the series has no time steps.
    ///
    /// Always `false` for instances built through [`TimeSeries::new`]; provided
    /// to satisfy the `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for TimeSeries {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl AsRef<[f64]> for TimeSeries {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = DistanceError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<TimeSeries> for Vec<f64> {
    fn from(series: TimeSeries) -> Self {
        series.values.to_vec()
    }
}

/// Borrowed, validated view into a time series. Zero-copy reference.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesView<'a>(&'a [f64]);

impl<'a> TimeSeriesView<'a> {
    /// Create a new view, validating that the slice is non-empty and all values are finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DistanceError::EmptySeries`] | `slice` is empty |
    /// | [`DistanceError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(slice: &'a [f64]) -> Result<Self, DistanceError> {
        if slice.is_empty() {
            return Err(DistanceError::EmptySeries);
        }
        if let Some(index) = slice.iter().position(|v| !v.is_finite()) {
            return Err(DistanceError::NonFiniteValue { index });
        }
        Ok(Self(slice))
    }

    /// Create a view without validation. For internal use where data is already validated.
    pub(crate) fn new_unchecked(slice: &'a [f64]) -> Self {
        Self(slice)
    }

    /// Return the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &'a [f64] {
        self.0
    }

    /// Return the number of time steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the view has no time steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<usize> for TimeSeriesView<'_> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AsRef<[f64]> for TimeSeriesView<'_> {
    fn as_ref(&self) -> &[f64] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_vec() {
        let result = TimeSeries::new(vec![]);
        assert!(matches!(result, Err(DistanceError::EmptySeries)));
    }

    #[test]
    fn rejects_nan() {
        let result = TimeSeries::new(vec![1.0, f64::NAN, 3.0]);
        assert!(matches!(result, Err(DistanceError::NonFiniteValue { index: 1 })));
    }

    #[test]
    fn rejects_neg_infinity() {
        let result = TimeSeries::new(vec![f64::NEG_INFINITY, 2.0]);
        assert!(matches!(result, Err(DistanceError::NonFiniteValue { index: 0 })));
    }

    #[test]
    fn clones_share_identity() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0]).unwrap();
        let copy = ts.clone();
        assert_eq!(ts.id(), copy.id());
    }

    #[test]
    fn equal_values_get_distinct_ids() {
        let a = TimeSeries::new(vec![1.0, 2.0]).unwrap();
        let b = TimeSeries::new(vec![1.0, 2.0]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn serde_roundtrip_allocates_fresh_id() {
        let ts = TimeSeries::new(vec![0.5, 1.5, 2.5]).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "[0.5,1.5,2.5]");
        let back: TimeSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert_ne!(back.id(), ts.id());
    }

    #[test]
    fn deserialize_rejects_empty() {
        let result: Result<TimeSeries, _> = serde_json::from_str("[]");
        assert!(result.is_err());
    }

    #[test]
    fn view_indexing() {
        let data = [10.0, 20.0, 30.0];
        let view = TimeSeriesView::new(&data).unwrap();
        assert_eq!(view[0], 10.0);
        assert_eq!(view[2], 30.0);
    }

    #[test]
    fn view_rejects_nan() {
        let data = [1.0, f64::NAN];
        let result = TimeSeriesView::new(&data);
        assert!(matches!(result, Err(DistanceError::NonFiniteValue { index: 1 })));
    }
}
