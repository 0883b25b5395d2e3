//! Per-series memoization of transformed series.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::series::{SeriesId, TimeSeries};
use crate::transform::Transform;

type Slot = Arc<OnceLock<TimeSeries>>;

/// Concurrent memo table from `(series, transform)` to the transformed series.
///
/// The map lock is held only while fetching or inserting a per-key slot. The
/// transform itself runs inside [`OnceLock::get_or_init`], so each key is
/// computed at most once even when many threads ask for it together, and
/// threads working on different keys never wait on each other's transforms.
///
/// [`Transform::Identity`] bypasses the table entirely.
#[derive(Debug, Default)]
pub struct TransformCache {
    slots: RwLock<HashMap<(SeriesId, Transform), Slot>>,
    computations: AtomicUsize,
}

impl TransformCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `series` under `transform`, computing it on first request.
    #[must_use]
    pub fn get<'a>(&self, series: &'a TimeSeries, transform: Transform) -> Cow<'a, TimeSeries> {
        if transform == Transform::Identity {
            return Cow::Borrowed(series);
        }

        let slot = self.slot((series.id(), transform));
        let transformed = slot.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::Relaxed);
            transform.apply(series)
        });
        Cow::Owned(transformed.clone())
    }

    fn slot(&self, key: (SeriesId, Transform)) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }

    /// Number of transforms actually computed since creation or the last [`clear`](Self::clear).
    #[must_use]
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Return true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry and reset the computation counter.
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        debug!(entries = slots.len(), "clearing transform cache");
        slots.clear();
        self.computations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    #[test]
    fn identity_bypasses_table() {
        let cache = TransformCache::new();
        let s = ts(&[1.0, 2.0]);
        let out = cache.get(&s, Transform::Identity);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(cache.is_empty());
        assert_eq!(cache.computations(), 0);
    }

    #[test]
    fn derivative_computed_once() {
        let cache = TransformCache::new();
        let s = ts(&[0.0, 1.0, 4.0, 9.0]);
        let first = cache.get(&s, Transform::Derivative).into_owned();
        let second = cache.get(&s, Transform::Derivative).into_owned();
        assert_eq!(first.id(), second.id());
        assert_eq!(cache.computations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_requests_compute_once() {
        let cache = TransformCache::new();
        let s = ts(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        let results: Vec<TimeSeries> = (0..64)
            .into_par_iter()
            .map(|_| cache.get(&s, Transform::Derivative).into_owned())
            .collect();
        assert_eq!(cache.computations(), 1);
        let bits: Vec<u64> = results[0].as_ref().iter().map(|v| v.to_bits()).collect();
        for r in &results {
            let other: Vec<u64> = r.as_ref().iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits, other);
        }
    }

    #[test]
    fn distinct_series_get_distinct_entries() {
        let cache = TransformCache::new();
        let a = ts(&[1.0, 2.0, 3.0]);
        let b = ts(&[1.0, 2.0, 3.0]);
        let _ = cache.get(&a, Transform::Derivative);
        let _ = cache.get(&b, Transform::Derivative);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn clear_resets() {
        let cache = TransformCache::new();
        let s = ts(&[1.0, 2.0, 3.0]);
        let _ = cache.get(&s, Transform::Derivative);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.computations(), 0);
        let _ = cache.get(&s, Transform::Derivative);
        assert_eq!(cache.computations(), 1);
    }
}
