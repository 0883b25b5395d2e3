//! Property tests for the distance measures and the transform cache.

use proptest::prelude::*;
use proxima_distance::{MeasureConfig, TimeSeries, Transform, TransformCache};

fn series(max_len: usize) -> impl Strategy<Value = TimeSeries> {
    prop::collection::vec(-10.0f64..10.0, 1..max_len)
        .prop_map(|values| TimeSeries::new(values).expect("finite values"))
}

fn warping_family() -> impl Strategy<Value = MeasureConfig> {
    prop_oneof![
        (0.0f64..=1.0).prop_map(|window| MeasureConfig::Dtw { window }),
        (0.0f64..=1.0).prop_map(|window| MeasureConfig::Ddtw { window }),
        (0.0f64..=1.0).prop_map(|g| MeasureConfig::Wdtw { g }),
        (0.0f64..=1.0).prop_map(|g| MeasureConfig::Wddtw { g }),
    ]
}

fn any_measure() -> impl Strategy<Value = MeasureConfig> {
    prop_oneof![
        Just(MeasureConfig::Euclidean),
        warping_family(),
        (0usize..5, 0.0f64..2.0)
            .prop_map(|(band_size, penalty)| MeasureConfig::Erp { band_size, penalty }),
        (0usize..5, 0.0f64..2.0)
            .prop_map(|(band_size, epsilon)| MeasureConfig::Lcss { band_size, epsilon }),
        (0.01f64..10.0).prop_map(|cost| MeasureConfig::Msm { cost }),
        (0.0f64..1.0, 0.0f64..0.2).prop_map(|(nu, lambda)| MeasureConfig::Twed { nu, lambda }),
    ]
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_warping_family_is_symmetric(
        a in series(24),
        b in series(24),
        measure in warping_family(),
    ) {
        let cache = TransformCache::new();
        let ab = measure.distance(&cache, &a, &b, f64::INFINITY).unwrap().value();
        let ba = measure.distance(&cache, &b, &a, f64::INFINITY).unwrap().value();
        prop_assert!(close(ab, ba), "{measure}: {ab} vs {ba}");
    }

    #[test]
    fn prop_self_distance_is_zero(a in series(32), measure in any_measure()) {
        let cache = TransformCache::new();
        let d = measure.distance(&cache, &a, &a, f64::INFINITY).unwrap().value();
        prop_assert!(d.abs() < 1e-12, "{measure}: {d}");
    }

    #[test]
    fn prop_abandonment_never_underreports(
        a in series(20),
        b in series(20),
        measure in any_measure(),
        fraction in 0.0f64..2.0,
    ) {
        let cache = TransformCache::new();
        let exact = measure.distance(&cache, &a, &b, f64::INFINITY).unwrap().value();
        let cutoff = exact * fraction;
        let cut = measure.distance(&cache, &a, &b, cutoff).unwrap().value();
        if exact <= cutoff {
            prop_assert_eq!(cut, exact);
        } else {
            prop_assert!(cut >= exact);
        }
    }

    #[test]
    fn prop_derivative_cached_bit_identical(a in series(40)) {
        let cache = TransformCache::new();
        let first = cache.get(&a, Transform::Derivative).into_owned();
        let second = cache.get(&a, Transform::Derivative).into_owned();
        prop_assert_eq!(cache.computations(), 1);
        let bits = |s: &TimeSeries| s.as_ref().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&first), bits(&second));
        prop_assert_eq!(first.len(), a.len());
    }
}
