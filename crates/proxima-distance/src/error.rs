//! Error types for series validation, distance computation and parameter spaces.

use crate::measure::MeasureKind;
use crate::space::Param;

/// Errors from time series validation and distance computation.
#[derive(Debug, thiserror::Error)]
pub enum DistanceError {
    /// Returned when an empty slice is provided as a time series.
    #[error("time series must be non-empty")]
    EmptySeries,

    /// Returned when a time series contains NaN, infinity, or negative infinity.
    #[error("time series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when a distance evaluates to NaN, or overflows to infinity
    /// without an early-abandon cutoff that could explain it.
    #[error("{kind} distance produced non-finite value {value}")]
    NumericAnomaly {
        /// The measure that produced the value.
        kind: MeasureKind,
        /// The offending raw value.
        value: f64,
    },
}

/// Errors from parameter space construction, sampling and resolution.
#[derive(Debug, thiserror::Error)]
pub enum SpaceError {
    /// Returned when a continuous range has `low > high` or non-finite bounds.
    #[error("invalid range for {param}: [{low}, {high}]")]
    InvalidRange {
        /// The parameter the range belongs to.
        param: Param,
        /// Lower bound provided.
        low: f64,
        /// Upper bound provided.
        high: f64,
    },

    /// Returned when a discrete or categorical dimension has no values.
    #[error("dimension {param} has no values to choose from")]
    EmptyDomain {
        /// The parameter with the empty domain.
        param: Param,
    },

    /// Returned when enumeration is requested with zero points per range.
    #[error("enumeration granularity must be at least 1, got {granularity}")]
    InvalidGranularity {
        /// The invalid granularity provided.
        granularity: usize,
    },

    /// Returned when a sampled parameter set lacks a value a measure needs.
    #[error("parameter set is missing {param}")]
    MissingParameter {
        /// The parameter that was not present.
        param: Param,
    },

    /// Returned when a measure parameter is outside its valid range.
    #[error("{kind} parameter {param} = {value} is out of range")]
    InvalidParameter {
        /// The measure being configured.
        kind: MeasureKind,
        /// The parameter that was rejected.
        param: Param,
        /// The rejected value.
        value: f64,
    },
}
