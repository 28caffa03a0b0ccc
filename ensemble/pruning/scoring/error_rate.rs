use ndarray::ArrayView3;

use super::{
    func::{blended, error_rate, predicted_labels},
    ScoringError, ScoringFunction,
};

/// Misclassification rate of the sub-ensemble extended by the candidate.
///
/// Reduce-error pruning after Margineantu & Dietterich (1997).
#[derive(Debug, Clone, Copy, Default)]
pub struct SubEnsembleError;

impl ScoringFunction for SubEnsembleError {
    fn name(&self) -> &str {
        "error"
    }

    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError> {
        let blend = blended(predictions, candidate, selected);
        Ok(error_rate(&predicted_labels(blend.view()), target))
    }
}
