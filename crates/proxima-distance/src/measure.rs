//! Distance measure trait, measure kinds and configured measures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::TransformCache;
use crate::distance::Distance;
use crate::dtw::Dtw;
use crate::erp::Erp;
use crate::error::{DistanceError, SpaceError};
use crate::euclidean::Euclidean;
use crate::lcss::Lcss;
use crate::msm::Msm;
use crate::series::{TimeSeries, TimeSeriesView};
use crate::space::{Param, ParamSet};
use crate::transform::Transform;
use crate::twed::Twed;
use crate::wdtw::Wdtw;

/// A dissimilarity between two series with early abandonment.
///
/// Implementations return the exact distance whenever it is `<= cutoff`. Above
/// the cutoff they may stop early and return [`Distance::INFINITY`]. Pass
/// `f64::INFINITY` to disable abandonment.
pub trait DistanceMeasure: Send + Sync {
    /// Compute the distance between `a` and `b`, abandoning above `cutoff`.
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance;
}

/// The family of a distance measure, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    /// Lock-step squared Euclidean distance.
    Euclidean,
    /// Dynamic time warping with a Sakoe-Chiba window.
    Dtw,
    /// DTW on the derivative transform.
    Ddtw,
    /// Weighted DTW with a logistic phase penalty.
    Wdtw,
    /// WDTW on the derivative transform.
    Wddtw,
    /// Edit distance with real penalty.
    Erp,
    /// Longest common subsequence.
    Lcss,
    /// Move-split-merge.
    Msm,
    /// Time warp edit distance.
    Twed,
}

impl MeasureKind {
    /// Every kind, in registration order.
    pub const ALL: [Self; 9] = [
        Self::Euclidean,
        Self::Dtw,
        Self::Ddtw,
        Self::Wdtw,
        Self::Wddtw,
        Self::Erp,
        Self::Lcss,
        Self::Msm,
        Self::Twed,
    ];

    /// Return the transform applied to both inputs before the kernel runs.
    #[must_use]
    pub fn transform(self) -> Transform {
        match self {
            Self::Ddtw | Self::Wddtw => Transform::Derivative,
            _ => Transform::Identity,
        }
    }

    /// Return the parameters this kind requires.
    #[must_use]
    pub fn params(self) -> &'static [Param] {
        match self {
            Self::Euclidean => &[],
            Self::Dtw | Self::Ddtw => &[Param::Window],
            Self::Wdtw | Self::Wddtw => &[Param::G],
            Self::Erp => &[Param::BandSize, Param::Penalty],
            Self::Lcss => &[Param::BandSize, Param::Epsilon],
            Self::Msm => &[Param::Cost],
            Self::Twed => &[Param::Nu, Param::Lambda],
        }
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Euclidean => "euclidean",
            Self::Dtw => "dtw",
            Self::Ddtw => "ddtw",
            Self::Wdtw => "wdtw",
            Self::Wddtw => "wddtw",
            Self::Erp => "erp",
            Self::Lcss => "lcss",
            Self::Msm => "msm",
            Self::Twed => "twed",
        };
        f.write_str(name)
    }
}

/// An immutable, fully parameterized distance measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MeasureConfig {
    /// Squared Euclidean distance.
    Euclidean,
    /// DTW with a window expressed as a fraction of the longer series.
    Dtw {
        /// Window fraction in `[0, 1]`.
        window: f64,
    },
    /// Derivative DTW.
    Ddtw {
        /// Window fraction in `[0, 1]`.
        window: f64,
    },
    /// Weighted DTW.
    Wdtw {
        /// Steepness of the logistic weight, `>= 0`.
        g: f64,
    },
    /// Derivative weighted DTW.
    Wddtw {
        /// Steepness of the logistic weight, `>= 0`.
        g: f64,
    },
    /// Edit distance with real penalty.
    Erp {
        /// Absolute warping band radius.
        band_size: usize,
        /// Gap value compared against unmatched points, `>= 0`.
        penalty: f64,
    },
    /// Longest common subsequence.
    Lcss {
        /// Absolute warping band radius.
        band_size: usize,
        /// Matching threshold, `>= 0`.
        epsilon: f64,
    },
    /// Move-split-merge.
    Msm {
        /// Cost of a split or merge operation, `>= 0`.
        cost: f64,
    },
    /// Time warp edit distance.
    Twed {
        /// Stiffness, `>= 0`.
        nu: f64,
        /// Deletion penalty, `>= 0`.
        lambda: f64,
    },
}

impl MeasureConfig {
    /// Return the family of this measure.
    #[must_use]
    pub fn kind(&self) -> MeasureKind {
        match self {
            Self::Euclidean => MeasureKind::Euclidean,
            Self::Dtw { .. } => MeasureKind::Dtw,
            Self::Ddtw { .. } => MeasureKind::Ddtw,
            Self::Wdtw { .. } => MeasureKind::Wdtw,
            Self::Wddtw { .. } => MeasureKind::Wddtw,
            Self::Erp { .. } => MeasureKind::Erp,
            Self::Lcss { .. } => MeasureKind::Lcss,
            Self::Msm { .. } => MeasureKind::Msm,
            Self::Twed { .. } => MeasureKind::Twed,
        }
    }

    /// Return the transform applied to inputs before the kernel.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.kind().transform()
    }

    /// Check every parameter against its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::InvalidParameter`] for a window outside `[0, 1]`
    /// or any negative or non-finite real parameter.
    pub fn validate(&self) -> Result<(), SpaceError> {
        let kind = self.kind();
        let invalid = |param, value| SpaceError::InvalidParameter { kind, param, value };
        let non_negative = |param, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(invalid(param, value))
            }
        };
        match *self {
            Self::Euclidean => Ok(()),
            Self::Dtw { window } | Self::Ddtw { window } => {
                if (0.0..=1.0).contains(&window) {
                    Ok(())
                } else {
                    Err(invalid(Param::Window, window))
                }
            }
            Self::Wdtw { g } | Self::Wddtw { g } => non_negative(Param::G, g),
            Self::Erp { penalty, .. } => non_negative(Param::Penalty, penalty),
            Self::Lcss { epsilon, .. } => non_negative(Param::Epsilon, epsilon),
            Self::Msm { cost } => non_negative(Param::Cost, cost),
            Self::Twed { nu, lambda } => {
                non_negative(Param::Nu, nu)?;
                non_negative(Param::Lambda, lambda)
            }
        }
    }

    /// Resolve a sampled parameter set into a validated measure.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SpaceError::MissingParameter`] | No measure kind, or a required value is absent |
    /// | [`SpaceError::InvalidParameter`] | A value is outside its valid range |
    pub fn from_params(params: &ParamSet) -> Result<Self, SpaceError> {
        let kind = params.kind().ok_or(SpaceError::MissingParameter {
            param: Param::Measure,
        })?;
        let get = |param| params.require(param);
        let band = |param| -> Result<usize, SpaceError> {
            let value = params.require(param)?;
            if value.is_finite() && value >= 0.0 {
                Ok(value.round() as usize)
            } else {
                Err(SpaceError::InvalidParameter { kind, param, value })
            }
        };
        let config = match kind {
            MeasureKind::Euclidean => Self::Euclidean,
            MeasureKind::Dtw => Self::Dtw {
                window: get(Param::Window)?,
            },
            MeasureKind::Ddtw => Self::Ddtw {
                window: get(Param::Window)?,
            },
            MeasureKind::Wdtw => Self::Wdtw { g: get(Param::G)? },
            MeasureKind::Wddtw => Self::Wddtw { g: get(Param::G)? },
            MeasureKind::Erp => Self::Erp {
                band_size: band(Param::BandSize)?,
                penalty: get(Param::Penalty)?,
            },
            MeasureKind::Lcss => Self::Lcss {
                band_size: band(Param::BandSize)?,
                epsilon: get(Param::Epsilon)?,
            },
            MeasureKind::Msm => Self::Msm {
                cost: get(Param::Cost)?,
            },
            MeasureKind::Twed => Self::Twed {
                nu: get(Param::Nu)?,
                lambda: get(Param::Lambda)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Compute the distance between two series under this measure.
    ///
    /// Inputs are transformed through `cache` first, so derivative series are
    /// computed at most once per series.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DistanceError::NumericAnomaly`] | Result is NaN, or infinite with no finite cutoff |
    pub fn distance(
        &self,
        cache: &TransformCache,
        a: &TimeSeries,
        b: &TimeSeries,
        cutoff: f64,
    ) -> Result<Distance, DistanceError> {
        let transform = self.transform();
        let a = cache.get(a, transform);
        let b = cache.get(b, transform);
        self.checked_distance(&a, &b, cutoff)
    }

    /// Distance from a query already passed through [`transform`](Self::transform)
    /// to an exemplar looked up through `cache`.
    ///
    /// Only the exemplar side touches the cache, so unseen queries never grow it.
    ///
    /// # Errors
    ///
    /// Same as [`distance`](Self::distance).
    pub fn distance_from_transformed(
        &self,
        cache: &TransformCache,
        query: &TimeSeries,
        exemplar: &TimeSeries,
        cutoff: f64,
    ) -> Result<Distance, DistanceError> {
        let exemplar = cache.get(exemplar, self.transform());
        self.checked_distance(query, &exemplar, cutoff)
    }

    fn checked_distance(
        &self,
        a: &TimeSeries,
        b: &TimeSeries,
        cutoff: f64,
    ) -> Result<Distance, DistanceError> {
        let dist = DistanceMeasure::distance(self, a.as_view(), b.as_view(), cutoff);
        let value = dist.value();
        if value.is_nan() || (value.is_infinite() && !cutoff.is_finite()) {
            return Err(DistanceError::NumericAnomaly {
                kind: self.kind(),
                value,
            });
        }
        Ok(dist)
    }
}

impl DistanceMeasure for MeasureConfig {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        match *self {
            Self::Euclidean => Euclidean.distance(a, b, cutoff),
            Self::Dtw { window } | Self::Ddtw { window } => {
                Dtw::with_window(window).distance(a, b, cutoff)
            }
            Self::Wdtw { g } | Self::Wddtw { g } => Wdtw::new(g).distance(a, b, cutoff),
            Self::Erp { band_size, penalty } => Erp::new(band_size, penalty).distance(a, b, cutoff),
            Self::Lcss { band_size, epsilon } => {
                Lcss::new(band_size, epsilon).distance(a, b, cutoff)
            }
            Self::Msm { cost } => Msm::new(cost).distance(a, b, cutoff),
            Self::Twed { nu, lambda } => Twed::new(nu, lambda).distance(a, b, cutoff),
        }
    }
}

impl fmt::Display for MeasureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Euclidean => write!(f, "euclidean"),
            Self::Dtw { window } => write!(f, "dtw(window={window:.4})"),
            Self::Ddtw { window } => write!(f, "ddtw(window={window:.4})"),
            Self::Wdtw { g } => write!(f, "wdtw(g={g:.4})"),
            Self::Wddtw { g } => write!(f, "wddtw(g={g:.4})"),
            Self::Erp { band_size, penalty } => {
                write!(f, "erp(band={band_size}, penalty={penalty:.4})")
            }
            Self::Lcss { band_size, epsilon } => {
                write!(f, "lcss(band={band_size}, epsilon={epsilon:.4})")
            }
            Self::Msm { cost } => write!(f, "msm(cost={cost:.4})"),
            Self::Twed { nu, lambda } => write!(f, "twed(nu={nu}, lambda={lambda:.4})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    fn every_kind() -> Vec<MeasureConfig> {
        vec![
            MeasureConfig::Euclidean,
            MeasureConfig::Dtw { window: 0.2 },
            MeasureConfig::Ddtw { window: 1.0 },
            MeasureConfig::Wdtw { g: 0.3 },
            MeasureConfig::Wddtw { g: 0.05 },
            MeasureConfig::Erp {
                band_size: 2,
                penalty: 0.5,
            },
            MeasureConfig::Lcss {
                band_size: 2,
                epsilon: 0.1,
            },
            MeasureConfig::Msm { cost: 0.5 },
            MeasureConfig::Twed {
                nu: 0.001,
                lambda: 0.1,
            },
        ]
    }

    #[test]
    fn self_distance_is_zero_for_every_kind() {
        let cache = TransformCache::new();
        let a = ts(&[0.3, 1.2, -0.7, 2.5, 0.0, 1.1]);
        for config in every_kind() {
            let d = config.distance(&cache, &a, &a, f64::INFINITY).unwrap();
            assert!(d.value().abs() < 1e-12, "{config}: {}", d.value());
        }
    }

    #[test]
    fn euclidean_aligns_unequal_lengths() {
        let cache = TransformCache::new();
        let d = MeasureConfig::Euclidean
            .distance(&cache, &ts(&[1.0, 2.0]), &ts(&[1.0, 2.0, 2.0]), f64::INFINITY)
            .unwrap();
        assert_eq!(d.value(), 0.0);
    }

    #[test]
    fn transformed_query_stays_out_of_cache() {
        let cache = TransformCache::new();
        let config = MeasureConfig::Ddtw { window: 1.0 };
        let exemplar = ts(&[0.0, 1.0, 4.0, 9.0, 16.0]);
        let query = ts(&[1.0, 0.0, 2.0, 5.0, 3.0]);

        let direct = config.distance(&cache, &query, &exemplar, f64::INFINITY).unwrap();
        cache.clear();

        let prepared = config.transform().apply(&query);
        let via_prepared = config
            .distance_from_transformed(&cache, &prepared, &exemplar, f64::INFINITY)
            .unwrap();
        assert_eq!(direct.value(), via_prepared.value());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn every_measure_accepts_unequal_lengths() {
        let cache = TransformCache::new();
        let a = ts(&[0.0, 1.0, 2.0, 1.0, 0.0]);
        let b = ts(&[0.0, 2.0, 0.0]);
        for config in every_kind() {
            let d = config.distance(&cache, &a, &b, f64::INFINITY).unwrap();
            assert!(d.value().is_finite(), "{config}");
        }
    }

    #[test]
    fn overflow_is_a_numeric_anomaly() {
        let cache = TransformCache::new();
        let a = ts(&[1e200, -1e200]);
        let b = ts(&[-1e200, 1e200]);
        let result = MeasureConfig::Euclidean.distance(&cache, &a, &b, f64::INFINITY);
        assert!(matches!(result, Err(DistanceError::NumericAnomaly { .. })));
    }

    #[test]
    fn abandoned_distance_is_not_an_anomaly() {
        let cache = TransformCache::new();
        let a = ts(&[0.0, 0.0, 0.0]);
        let b = ts(&[5.0, 5.0, 5.0]);
        let d = MeasureConfig::Dtw { window: 1.0 }
            .distance(&cache, &a, &b, 1.0)
            .unwrap();
        assert!(d.is_infinite());
    }

    #[test]
    fn derivative_measures_use_the_cache() {
        let cache = TransformCache::new();
        let a = ts(&[0.0, 1.0, 3.0, 6.0]);
        let b = ts(&[1.0, 1.0, 2.0, 4.0]);
        let config = MeasureConfig::Ddtw { window: 0.5 };
        let first = config.distance(&cache, &a, &b, f64::INFINITY).unwrap();
        let second = config.distance(&cache, &a, &b, f64::INFINITY).unwrap();
        assert_eq!(first.value().to_bits(), second.value().to_bits());
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn validate_rejects_out_of_range_window() {
        let err = MeasureConfig::Dtw { window: 1.5 }.validate().unwrap_err();
        assert!(matches!(
            err,
            SpaceError::InvalidParameter {
                param: Param::Window,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_negative_cost() {
        assert!(MeasureConfig::Msm { cost: -0.1 }.validate().is_err());
        assert!(
            MeasureConfig::Twed {
                nu: 0.1,
                lambda: f64::NAN
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn from_params_requires_a_kind() {
        let params = ParamSet::default();
        assert!(matches!(
            MeasureConfig::from_params(&params),
            Err(SpaceError::MissingParameter {
                param: Param::Measure
            })
        ));
    }

    #[test]
    fn from_params_requires_every_value() {
        let params = ParamSet::default()
            .with_kind(MeasureKind::Erp)
            .with_value(Param::BandSize, 3.0);
        assert!(matches!(
            MeasureConfig::from_params(&params),
            Err(SpaceError::MissingParameter {
                param: Param::Penalty
            })
        ));
    }

    #[test]
    fn from_params_builds_twed() {
        let params = ParamSet::default()
            .with_kind(MeasureKind::Twed)
            .with_value(Param::Nu, 0.5)
            .with_value(Param::Lambda, 0.1);
        assert_eq!(
            MeasureConfig::from_params(&params).unwrap(),
            MeasureConfig::Twed {
                nu: 0.5,
                lambda: 0.1
            }
        );
    }

    #[test]
    fn serde_uses_kind_tag() {
        let json = serde_json::to_string(&MeasureConfig::Msm { cost: 0.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"msm","cost":0.5}"#);
        let back: MeasureConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MeasureConfig::Msm { cost: 0.5 });
    }

    #[test]
    fn kind_transforms() {
        assert_eq!(MeasureKind::Ddtw.transform(), Transform::Derivative);
        assert_eq!(MeasureKind::Wddtw.transform(), Transform::Derivative);
        assert_eq!(MeasureKind::Msm.transform(), Transform::Identity);
    }
}
