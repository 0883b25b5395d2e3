//! Elastic distance measures for time series classification.
//!
//! Pure math library, zero I/O. Provides validated series with stable
//! identities, a memoizing transform cache, nine distance measures with early
//! abandonment, and parameter spaces that sample fully configured measures.

mod cache;
mod constraint;
mod distance;
mod dtw;
mod erp;
mod error;
mod euclidean;
mod lcss;
mod measure;
mod msm;
mod series;
mod space;
mod transform;
mod twed;
mod wdtw;

pub use cache::TransformCache;
pub use constraint::BandConstraint;
pub use distance::Distance;
pub use dtw::Dtw;
pub use erp::Erp;
pub use error::{DistanceError, SpaceError};
pub use euclidean::Euclidean;
pub use lcss::Lcss;
pub use measure::{DistanceMeasure, MeasureConfig, MeasureKind};
pub use msm::Msm;
pub use series::{SeriesId, TimeSeries, TimeSeriesView};
pub use space::{Dimension, Domain, MeasureChoice, Param, ParamSet, ParamSpace, SeriesStats};
pub use transform::{Transform, derivative};
pub use twed::Twed;
pub use wdtw::Wdtw;
