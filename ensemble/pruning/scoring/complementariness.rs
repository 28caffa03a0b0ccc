use ndarray::{ArrayView3, Axis};

use super::{
    func::{predicted_labels, summed},
    ScoringError, ScoringFunction,
};

/// Negated count of samples the candidate gets right while the sub-ensemble's
/// majority vote gets them wrong (Martínez-Muñoz & Suárez, 2004).
///
/// With nothing selected the vote falls back to class 0 on every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct Complementariness;

impl ScoringFunction for Complementariness {
    fn name(&self) -> &str {
        "complementariness"
    }

    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError> {
        let own = predicted_labels(predictions.index_axis(Axis(0), candidate));
        let vote = predicted_labels(summed(predictions, selected).view());
        let complementary = own
            .iter()
            .zip(&vote)
            .zip(target)
            .filter(|((own, vote), truth)| own == truth && vote != truth)
            .count();
        Ok(-(complementary as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn counts_samples_fixed_by_candidate() {
        let mut predictions = Array3::<f64>::zeros((3, 4, 2));
        // Selected member: right on samples 0 and 1 only.
        for (sample, label) in [0, 1, 0, 1].into_iter().enumerate() {
            predictions[[0, sample, label]] = 1.0;
        }
        // Candidate 1 covers samples 2 and 3; candidate 2 repeats member 0.
        for (sample, label) in [1, 0, 1, 0].into_iter().enumerate() {
            predictions[[1, sample, label]] = 1.0;
        }
        for (sample, label) in [0, 1, 0, 1].into_iter().enumerate() {
            predictions[[2, sample, label]] = 1.0;
        }
        let target = [0, 1, 1, 0];
        let fixer = Complementariness
            .score(1, predictions.view(), &[0], &target)
            .unwrap();
        let copy = Complementariness
            .score(2, predictions.view(), &[0], &target)
            .unwrap();
        assert!((fixer + 2.0).abs() < f64::EPSILON);
        assert!(copy.abs() < f64::EPSILON);
    }
}
