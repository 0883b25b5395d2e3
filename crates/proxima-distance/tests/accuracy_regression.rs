//! Accuracy regression tests for proxima-distance.
//!
//! Reference values are hand-checked raw costs (no square root) and are
//! hardcoded to catch regressions in the kernels.

use proxima_distance::{
    DistanceMeasure, Dtw, Erp, Lcss, MeasureConfig, MeasureKind, Msm, ParamSpace, SeriesStats,
    TimeSeries, TransformCache, Twed, Wdtw,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn ts(values: Vec<f64>) -> TimeSeries {
    TimeSeries::new(values).expect("valid test series")
}

fn reference_pairs() -> Vec<(TimeSeries, TimeSeries)> {
    vec![
        (ts(vec![0.0, 0.0, 0.0]), ts(vec![1.0, 1.0, 1.0])), // constant offset
        (ts(vec![0.0, 1.0, 0.0]), ts(vec![0.0, 0.0, 0.0])), // single peak
        (ts(vec![1.0, 2.0, 3.0, 4.0]), ts(vec![1.0, 2.0, 3.0, 4.0])), // identical
        (ts(vec![1.0, 2.0, 3.0]), ts(vec![3.0, 2.0, 1.0])), // reversed
        (ts(vec![0.0, 5.0, 0.0, 5.0]), ts(vec![5.0, 0.0, 5.0, 0.0])), // alternating
        (ts(vec![1.0]), ts(vec![5.0])),                     // single point
        (ts(vec![0.0, 0.0, 1.0]), ts(vec![1.0, 0.0, 0.0])), // shifted peak
        (ts(vec![0.0, 1.0, 2.0, 3.0, 4.0]), ts(vec![0.0, 0.0, 0.0, 0.0, 4.0])), // late ramp
        (ts(vec![10.0, 10.0, 10.0]), ts(vec![10.1, 9.9, 10.0])), // tiny perturbation
        (ts(vec![0.0, 3.0, 0.0, 3.0, 0.0]), ts(vec![3.0, 0.0, 3.0, 0.0, 3.0])), // opposite phase
    ]
}

// ---------------------------------------------------------------------------
// a) dtw_distances_match_known_values
// ---------------------------------------------------------------------------

#[test]
fn dtw_distances_match_known_values() {
    let expected = [3.0, 1.0, 0.0, 8.0, 50.0, 16.0, 2.0, 6.0, 0.02, 18.0];

    let dtw = Dtw::unconstrained();
    for (i, ((a, b), &exp)) in reference_pairs().iter().zip(expected.iter()).enumerate() {
        let dist = dtw.distance(a.as_view(), b.as_view(), f64::INFINITY).value();
        assert!(
            (dist - exp).abs() < 1e-10,
            "pair {i}: got {dist:.15}, expected {exp:.15}"
        );
    }
}

// ---------------------------------------------------------------------------
// b) dtw_distance_with_band_geq_unconstrained
// ---------------------------------------------------------------------------

#[test]
fn dtw_distance_with_band_geq_unconstrained() {
    let unconstrained = Dtw::unconstrained();
    let banded = Dtw::with_window(0.2);

    for (i, (a, b)) in reference_pairs().iter().enumerate() {
        let du = unconstrained.distance(a.as_view(), b.as_view(), f64::INFINITY).value();
        let db = banded.distance(a.as_view(), b.as_view(), f64::INFINITY).value();
        assert!(db >= du - 1e-10, "pair {i}: banded {db} < unconstrained {du}");
    }
}

// ---------------------------------------------------------------------------
// c) elastic_measures_match_known_values
// ---------------------------------------------------------------------------

#[test]
fn elastic_measures_match_known_values() {
    let a = ts(vec![0.0, 1.0, 2.0, 1.0]);
    let b = ts(vec![0.0, 2.0, 1.0, 1.0]);
    let cases: Vec<(&str, Box<dyn DistanceMeasure>, f64)> = vec![
        // diagonal: 0 + 1 + 1 + 0
        ("erp_diagonal", Box::new(Erp::new(0, 0.0)), 2.0),
        // matches at 0, 2 and 3: 1 - 3/4
        ("lcss_exact", Box::new(Lcss::new(1, 0.0)), 0.25),
        // g = 0 halves every DTW cost, and DTW here is 1
        ("wdtw_flat", Box::new(Wdtw::new(0.0)), 0.5),
    ];
    for (name, measure, expected) in cases {
        let d = measure.distance(a.as_view(), b.as_view(), f64::INFINITY).value();
        assert!((d - expected).abs() < 1e-10, "{name}: got {d}, expected {expected}");
    }
}

// ---------------------------------------------------------------------------
// d) abandonment_never_underreports
// ---------------------------------------------------------------------------

#[test]
fn abandonment_never_underreports() {
    let measures: Vec<Box<dyn DistanceMeasure>> = vec![
        Box::new(Dtw::with_window(0.3)),
        Box::new(Wdtw::new(0.2)),
        Box::new(Erp::new(2, 0.1)),
        Box::new(Msm::new(0.5)),
        Box::new(Twed::new(0.01, 0.1)),
    ];
    for (a, b) in reference_pairs() {
        for measure in &measures {
            let exact = measure.distance(a.as_view(), b.as_view(), f64::INFINITY).value();
            for cutoff in [0.0, 0.5, 1.0, 5.0, 100.0] {
                let cut = measure.distance(a.as_view(), b.as_view(), cutoff).value();
                if exact <= cutoff {
                    assert_eq!(cut, exact);
                } else {
                    assert!(cut == exact || cut.is_infinite());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// e) sampled_configs_are_usable
// ---------------------------------------------------------------------------

#[test]
fn sampled_configs_are_usable() {
    let train: Vec<TimeSeries> = (0..6)
        .map(|k| ts((0..24).map(|i| ((i + k) as f64 * 0.4).sin()).collect()))
        .collect();
    let stats = SeriesStats::from_series(&train);
    let space = ParamSpace::proximity_forest(&stats);
    let cache = TransformCache::new();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..300 {
        let config = MeasureConfig::from_params(&space.sample(&mut rng)).expect("valid sample");
        seen.insert(config.kind());
        let d = config
            .distance(&cache, &train[0], &train[3], f64::INFINITY)
            .expect("finite distance");
        assert!(d.value() >= 0.0, "{config}: {d}");
    }
    assert_eq!(seen.len(), MeasureKind::ALL.len());
    // Only the derivative measures touch the cache, once per series.
    assert_eq!(cache.computations(), 2);
}
