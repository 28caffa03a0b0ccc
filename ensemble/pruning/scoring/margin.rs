use ndarray::{Array1, ArrayView3, Axis};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{
    func::{predicted_labels, round_seed},
    ScoringError, ScoringFunction,
};
use crate::error::ConfigurationError;

/// Default reference-margin range from Martínez-Muñoz & Suárez (2004).
pub const DEFAULT_P_RANGE: [f64; 2] = [0.0, 0.25];

/// Mean squared distance between the sub-ensemble's average signed margin
/// and a random reference margin.
///
/// Every member and the candidate contribute `+1` for a correct sample and
/// `-1` otherwise; the per-sample average is compared against a reference
/// drawn uniformly from `p_range`. The reference is seeded from the
/// configured seed and the round, so all candidates of one round face the
/// same reference and reruns are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct MarginDistance {
    low: f64,
    high: f64,
    seed: u64,
}

impl MarginDistance {
    /// Creates the scorer with reference range `[low, high]`.
    pub fn new(p_range: [f64; 2], seed: u64) -> Result<Self, ConfigurationError> {
        let [low, high] = p_range;
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(ConfigurationError::InvalidProbabilityRange { low, high });
        }
        Ok(Self { low, high, seed })
    }

    /// Reference range.
    #[must_use]
    pub const fn p_range(&self) -> [f64; 2] {
        [self.low, self.high]
    }

    fn reference(&self, round: usize, samples: usize) -> Array1<f64> {
        if self.high <= self.low {
            return Array1::from_elem(samples, self.low);
        }
        let mut rng = SmallRng::seed_from_u64(round_seed(self.seed, round));
        (0..samples)
            .map(|_| rng.gen_range(self.low..self.high))
            .collect()
    }
}

impl Default for MarginDistance {
    fn default() -> Self {
        Self {
            low: DEFAULT_P_RANGE[0],
            high: DEFAULT_P_RANGE[1],
            seed: 0,
        }
    }
}

impl ScoringFunction for MarginDistance {
    fn name(&self) -> &str {
        "margin_distance"
    }

    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError> {
        let samples = target.len();
        let mut margin = Array1::<f64>::zeros(samples);
        for &member in selected.iter().chain(std::iter::once(&candidate)) {
            let labels = predicted_labels(predictions.index_axis(Axis(0), member));
            for ((slot, label), truth) in margin.iter_mut().zip(&labels).zip(target) {
                *slot += if label == truth { 1.0 } else { -1.0 };
            }
        }
        margin /= (selected.len() + 1) as f64;

        let reference = self.reference(selected.len(), samples);
        let distance = (&reference - &margin).mapv(|diff| diff * diff);
        Ok(distance.mean().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn pool() -> (Array3<f64>, Vec<usize>) {
        let target = vec![0, 1, 0, 1, 1, 0];
        let mut predictions = Array3::<f64>::zeros((2, target.len(), 2));
        for (sample, &label) in target.iter().enumerate() {
            predictions[[0, sample, label]] = 1.0;
            predictions[[1, sample, 1 - label]] = 1.0;
        }
        (predictions, target)
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(matches!(
            MarginDistance::new([0.5, 0.1], 0),
            Err(ConfigurationError::InvalidProbabilityRange { .. })
        ));
    }

    #[test]
    fn degenerate_range_gives_exact_distance() {
        let (predictions, target) = pool();
        let scorer = MarginDistance::new([0.0, 0.0], 3).unwrap();
        // Always-correct candidate: margin 1 everywhere, distance 1.
        let right = scorer.score(0, predictions.view(), &[], &target).unwrap();
        assert!((right - 1.0).abs() < 1e-12);
        // Paired with an always-wrong member the margin cancels to zero.
        let mixed = scorer.score(0, predictions.view(), &[1], &target).unwrap();
        assert!(mixed.abs() < 1e-12);
    }

    #[test]
    fn same_seed_same_score() {
        let (predictions, target) = pool();
        let a = MarginDistance::new(DEFAULT_P_RANGE, 11).unwrap();
        let b = MarginDistance::new(DEFAULT_P_RANGE, 11).unwrap();
        let first = a.score(1, predictions.view(), &[0], &target).unwrap();
        let second = b.score(1, predictions.view(), &[0], &target).unwrap();
        assert!((first - second).abs() < f64::EPSILON);
    }

    #[test]
    fn reference_stays_in_range() {
        let scorer = MarginDistance::new([0.1, 0.2], 5).unwrap();
        let reference = scorer.reference(2, 64);
        assert!(reference.iter().all(|&p| (0.1..0.2).contains(&p)));
    }
}
