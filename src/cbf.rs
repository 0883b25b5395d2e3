//! Seeded Cylinder-Bell-Funnel generator.
//!
//! Class 0 (cylinder) is a plateau, class 1 (bell) a ramp up, class 2
//! (funnel) a ramp down, each over a random interval `[a, b]` with
//! `a ∈ [L/8, L/4)` and `b - a ∈ [L/4, 3L/4)`, scaled by `6 + η` and
//! overlaid with per-point noise. `η` and the noise are uniform in
//! `[-noise, noise]`.

use anyhow::{Result, ensure};
use rand::Rng;

use proxima_distance::TimeSeries;
use proxima_forest::Dataset;

/// Shortest length for which every interval bound is non-degenerate.
pub const MIN_LENGTH: usize = 8;

/// Generate `n_per_class` series of each shape, interleaved by class.
pub fn generate<R: Rng>(
    n_per_class: usize,
    length: usize,
    noise: f64,
    rng: &mut R,
) -> Result<Dataset> {
    ensure!(n_per_class > 0, "n_per_class must be at least 1");
    ensure!(length >= MIN_LENGTH, "length must be at least {MIN_LENGTH}, got {length}");
    ensure!(
        noise.is_finite() && noise >= 0.0,
        "noise must be finite and non-negative, got {noise}"
    );

    let mut series = Vec::with_capacity(3 * n_per_class);
    let mut labels = Vec::with_capacity(3 * n_per_class);
    for _ in 0..n_per_class {
        for class in 0..3 {
            series.push(shape(class, length, noise, rng)?);
            labels.push(class);
        }
    }
    Ok(Dataset::new(series, labels, 3)?)
}

fn shape<R: Rng>(class: usize, length: usize, noise: f64, rng: &mut R) -> Result<TimeSeries> {
    let jitter = |rng: &mut R| {
        if noise > 0.0 {
            rng.gen_range(-noise..=noise)
        } else {
            0.0
        }
    };

    let a = rng.gen_range(length / 8..length / 4);
    let b = (a + rng.gen_range(length / 4..length * 3 / 4)).min(length - 1);
    let height = 6.0 + jitter(rng);

    let values: Vec<f64> = (0..length)
        .map(|t| {
            let level = if (a..=b).contains(&t) {
                let ramp = (t - a) as f64 / (b - a) as f64;
                match class {
                    0 => 1.0,
                    1 => ramp,
                    _ => 1.0 - ramp,
                }
            } else {
                0.0
            };
            height * level + jitter(rng)
        })
        .collect();
    Ok(TimeSeries::new(values)?)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn balanced_and_interleaved() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = generate(4, 32, 1.0, &mut rng).unwrap();
        assert_eq!(data.len(), 12);
        assert_eq!(&data.labels()[..6], &[0, 1, 2, 0, 1, 2]);
        assert!(data.series().iter().all(|s| s.len() == 32));
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate(3, 16, 1.0, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let b = generate(3, 16, 1.0, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        for (x, y) in a.series().iter().zip(b.series()) {
            assert_eq!(x.as_ref(), y.as_ref());
        }
    }

    #[test]
    fn noiseless_cylinder_is_a_plateau() {
        let data = generate(1, 64, 0.0, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let cylinder = data.series_at(0).as_ref();
        assert!(cylinder.iter().all(|&v| v == 0.0 || v == 6.0));
        assert!(cylinder.contains(&6.0));
    }

    #[test]
    fn short_length_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(generate(2, 4, 1.0, &mut rng).is_err());
    }
}
