//! Parameter spaces over distance measures: sampling, enumeration and the
//! default per-measure registrations.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SpaceError;
use crate::measure::MeasureKind;
use crate::series::TimeSeries;

/// Name of one parameter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    /// The categorical choice of measure kind.
    Measure,
    /// DTW / DDTW window fraction.
    Window,
    /// WDTW / WDDTW weight steepness.
    G,
    /// ERP / LCSS absolute band radius.
    BandSize,
    /// ERP gap value.
    Penalty,
    /// LCSS matching threshold.
    Epsilon,
    /// MSM split/merge cost.
    Cost,
    /// TWED stiffness.
    Nu,
    /// TWED deletion penalty.
    Lambda,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Measure => "measure",
            Self::Window => "window",
            Self::G => "g",
            Self::BandSize => "band_size",
            Self::Penalty => "penalty",
            Self::Epsilon => "epsilon",
            Self::Cost => "cost",
            Self::Nu => "nu",
            Self::Lambda => "lambda",
        };
        f.write_str(name)
    }
}

/// One option of a categorical measure dimension with its own sub-space.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureChoice {
    /// The measure kind selected by this option.
    pub kind: MeasureKind,
    /// Parameters sampled once this option is chosen.
    pub space: ParamSpace,
}

/// The values a dimension may take.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Continuous, inclusive `[low, high]`.
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// A finite list of values.
    Discrete(Vec<f64>),
    /// A categorical choice of measure, each with a nested space.
    Measures(Vec<MeasureChoice>),
}

/// A named dimension of a [`ParamSpace`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    param: Param,
    domain: Domain,
}

impl Dimension {
    /// Continuous dimension over `[low, high]`.
    #[must_use]
    pub fn uniform(param: Param, low: f64, high: f64) -> Self {
        Self {
            param,
            domain: Domain::Uniform { low, high },
        }
    }

    /// Dimension over a finite list of values.
    #[must_use]
    pub fn discrete(param: Param, values: Vec<f64>) -> Self {
        Self {
            param,
            domain: Domain::Discrete(values),
        }
    }

    /// Categorical dimension over measure kinds.
    #[must_use]
    pub fn measures(choices: Vec<MeasureChoice>) -> Self {
        Self {
            param: Param::Measure,
            domain: Domain::Measures(choices),
        }
    }

    /// Return the parameter this dimension assigns.
    #[must_use]
    pub fn param(&self) -> Param {
        self.param
    }

    /// Return the values this dimension may take.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    fn validate(&self) -> Result<(), SpaceError> {
        match &self.domain {
            Domain::Uniform { low, high } => {
                if low.is_finite() && high.is_finite() && low <= high {
                    Ok(())
                } else {
                    Err(SpaceError::InvalidRange {
                        param: self.param,
                        low: *low,
                        high: *high,
                    })
                }
            }
            Domain::Discrete(values) if values.is_empty() => {
                Err(SpaceError::EmptyDomain { param: self.param })
            }
            Domain::Discrete(_) => Ok(()),
            Domain::Measures(choices) if choices.is_empty() => {
                Err(SpaceError::EmptyDomain { param: self.param })
            }
            Domain::Measures(_) => Ok(()),
        }
    }
}

/// One point of a parameter space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    kind: Option<MeasureKind>,
    values: BTreeMap<Param, f64>,
}

impl ParamSet {
    /// Set the measure kind.
    #[must_use]
    pub fn with_kind(mut self, kind: MeasureKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set one parameter value.
    #[must_use]
    pub fn with_value(mut self, param: Param, value: f64) -> Self {
        self.values.insert(param, value);
        self
    }

    /// Return the chosen measure kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<MeasureKind> {
        self.kind
    }

    /// Return the value of `param`, if assigned.
    #[must_use]
    pub fn get(&self, param: Param) -> Option<f64> {
        self.values.get(&param).copied()
    }

    /// Return the value of `param`.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::MissingParameter`] if `param` was never assigned.
    pub fn require(&self, param: Param) -> Result<f64, SpaceError> {
        self.get(param).ok_or(SpaceError::MissingParameter { param })
    }

    fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        if other.kind.is_some() {
            out.kind = other.kind;
        }
        out.values.extend(other.values.iter().map(|(k, v)| (*k, *v)));
        out
    }
}

/// Summary of a training set used to scale data-dependent parameter ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Length of the longest series.
    pub max_length: usize,
    /// Population standard deviation of all values pooled together.
    pub std: f64,
}

impl SeriesStats {
    /// Compute stats over a collection of series. Empty input gives zeros.
    #[must_use]
    pub fn from_series<'a, I>(series: I) -> Self
    where
        I: IntoIterator<Item = &'a TimeSeries>,
    {
        let mut max_length = 0;
        let mut count = 0_usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let collected: Vec<&TimeSeries> = series.into_iter().collect();
        for s in &collected {
            max_length = max_length.max(s.len());
            count += s.len();
            sum += s.as_ref().iter().sum::<f64>();
        }
        if count == 0 {
            return Self {
                max_length,
                std: 0.0,
            };
        }
        let mean = sum / count as f64;
        for s in &collected {
            sum_sq += s.as_ref().iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        }
        Self {
            max_length,
            std: (sum_sq / count as f64).sqrt(),
        }
    }
}

/// An ordered list of dimensions that can be sampled or enumerated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSpace {
    dimensions: Vec<Dimension>,
}

impl ParamSpace {
    /// Build a space, validating every dimension.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SpaceError::InvalidRange`] | A uniform range has `low > high` or non-finite bounds |
    /// | [`SpaceError::EmptyDomain`] | A discrete or categorical dimension has no values |
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, SpaceError> {
        for dimension in &dimensions {
            dimension.validate()?;
        }
        Ok(Self { dimensions })
    }

    /// Return the dimensions in sampling order.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Draw one parameter set. Each dimension is sampled independently; a
    /// categorical choice samples only its own nested sub-space.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamSet {
        let mut set = ParamSet::default();
        self.sample_into(rng, &mut set);
        set
    }

    fn sample_into<R: Rng>(&self, rng: &mut R, set: &mut ParamSet) {
        for dimension in &self.dimensions {
            match &dimension.domain {
                Domain::Uniform { low, high } => {
                    let value = if low < high {
                        rng.gen_range(*low..=*high)
                    } else {
                        *low
                    };
                    set.values.insert(dimension.param, value);
                }
                Domain::Discrete(values) => {
                    let value = values[rng.gen_range(0..values.len())];
                    set.values.insert(dimension.param, value);
                }
                Domain::Measures(choices) => {
                    let choice = &choices[rng.gen_range(0..choices.len())];
                    set.kind = Some(choice.kind);
                    choice.space.sample_into(rng, set);
                }
            }
        }
    }

    /// Enumerate the full cartesian product of the space.
    ///
    /// Uniform dimensions are discretized into `granularity` evenly spaced
    /// points including both bounds (a single point is the lower bound).
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::InvalidGranularity`] when `granularity` is zero.
    pub fn enumerate(&self, granularity: usize) -> Result<Vec<ParamSet>, SpaceError> {
        if granularity == 0 {
            return Err(SpaceError::InvalidGranularity { granularity });
        }
        let mut sets = vec![ParamSet::default()];
        for dimension in &self.dimensions {
            let options: Vec<ParamSet> = match &dimension.domain {
                Domain::Uniform { low, high } => grid(*low, *high, granularity)
                    .into_iter()
                    .map(|v| ParamSet::default().with_value(dimension.param, v))
                    .collect(),
                Domain::Discrete(values) => values
                    .iter()
                    .map(|v| ParamSet::default().with_value(dimension.param, *v))
                    .collect(),
                Domain::Measures(choices) => {
                    let mut options = Vec::new();
                    for choice in choices {
                        for sub in choice.space.enumerate(granularity)? {
                            options.push(ParamSet::default().with_kind(choice.kind).merged(&sub));
                        }
                    }
                    options
                }
            };
            sets = sets
                .iter()
                .flat_map(|set| options.iter().map(move |option| set.merged(option)))
                .collect();
        }
        Ok(sets)
    }

    /// The categorical space over every measure kind, scaled to `stats`.
    #[must_use]
    pub fn proximity_forest(stats: &SeriesStats) -> Self {
        Self::over_kinds(&MeasureKind::ALL, stats)
    }

    /// The categorical space over the given kinds, scaled to `stats`.
    ///
    /// An empty `kinds` slice yields an empty space that samples nothing.
    #[must_use]
    pub fn over_kinds(kinds: &[MeasureKind], stats: &SeriesStats) -> Self {
        if kinds.is_empty() {
            return Self::default();
        }
        let choices = kinds
            .iter()
            .map(|&kind| MeasureChoice {
                kind,
                space: kind.space(stats),
            })
            .collect();
        Self {
            dimensions: vec![Dimension::measures(choices)],
        }
    }
}

fn grid(low: f64, high: f64, points: usize) -> Vec<f64> {
    if points == 1 || low == high {
        return vec![low];
    }
    let step = (high - low) / (points - 1) as f64;
    (0..points)
        .map(|i| if i == points - 1 { high } else { low + step * i as f64 })
        .collect()
}

/// Ten evenly spaced integer band radii in `0..=(len - 1) / 4`, deduplicated.
fn band_sizes(max_length: usize) -> Vec<f64> {
    let max = max_length.saturating_sub(1) / 4;
    let mut sizes: Vec<f64> = (0..10)
        .map(|i| (max as f64 * i as f64 / 9.0).round())
        .collect();
    sizes.dedup();
    sizes
}

/// 100 MSM costs: 25 linear steps over `[0.01, 0.1]`, then 25 steps of
/// `0.36 * d` above each of `d = 0.1, 1, 10`.
fn msm_costs() -> Vec<f64> {
    let mut costs: Vec<f64> = (0..25).map(|i| 0.01 + 0.00375 * i as f64).collect();
    for decade in [0.1, 1.0, 10.0] {
        costs.extend((1..=25).map(|i| decade + 0.36 * decade * i as f64));
    }
    costs
}

const TWED_NU: [f64; 10] = [1e-5, 1e-4, 5e-4, 1e-3, 5e-3, 0.01, 0.05, 0.1, 0.5, 1.0];

impl MeasureKind {
    /// The default parameter space for this kind, scaled to `stats`.
    #[must_use]
    pub fn space(self, stats: &SeriesStats) -> ParamSpace {
        let spread = || (0.2 * stats.std, stats.std);
        let dimensions = match self {
            Self::Euclidean => vec![],
            Self::Dtw | Self::Ddtw => vec![Dimension::uniform(Param::Window, 0.0, 0.25)],
            Self::Wdtw | Self::Wddtw => vec![Dimension::uniform(Param::G, 0.0, 1.0)],
            Self::Erp => {
                let (low, high) = spread();
                vec![
                    Dimension::discrete(Param::BandSize, band_sizes(stats.max_length)),
                    Dimension::uniform(Param::Penalty, low, high),
                ]
            }
            Self::Lcss => {
                let (low, high) = spread();
                vec![
                    Dimension::discrete(Param::BandSize, band_sizes(stats.max_length)),
                    Dimension::uniform(Param::Epsilon, low, high),
                ]
            }
            Self::Msm => vec![Dimension::discrete(Param::Cost, msm_costs())],
            Self::Twed => vec![
                Dimension::discrete(Param::Nu, TWED_NU.to_vec()),
                Dimension::discrete(Param::Lambda, (0..10).map(|i| i as f64 / 90.0).collect()),
            ],
        };
        ParamSpace { dimensions }
    }
}
