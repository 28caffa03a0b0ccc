use ndarray::{Array2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigurationError, scoring::func::predicted_labels};

/// Winner of one greedy round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// One-based round number.
    pub round: usize,
    /// Classifier added in this round.
    pub candidate: usize,
    /// Its winning score.
    pub score: f64,
    /// Candidates that were scored in this round.
    pub scored: usize,
}

/// Outcome of a pruning run: selected classifiers with uniform weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    indices: Vec<usize>,
    weights: Vec<f64>,
    rounds: Vec<RoundRecord>,
}

impl SelectionResult {
    pub(crate) fn from_rounds(rounds: Vec<RoundRecord>) -> Self {
        let indices: Vec<usize> = rounds.iter().map(|round| round.candidate).collect();
        Self {
            weights: uniform_weights(indices.len()),
            indices,
            rounds,
        }
    }

    /// Whole pool in ascending order, used when no pruning is needed.
    pub(crate) fn whole_pool(pool_size: usize) -> Self {
        Self {
            indices: (0..pool_size).collect(),
            weights: uniform_weights(pool_size),
            rounds: Vec::new(),
        }
    }

    /// Selected classifier indices, in selection order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Weight of each selected classifier, all `1 / len`.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Per-round winners; empty when the whole pool was kept.
    #[must_use]
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Whether the run kept the whole pool without any rounds.
    #[must_use]
    pub fn is_whole_pool(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Number of selected classifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Splits into `(indices, weights)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<usize>, Vec<f64>) {
        (self.indices, self.weights)
    }

    /// Weighted `N × C` prediction of the pruned ensemble.
    pub fn combine(
        &self,
        predictions: ArrayView3<'_, f64>,
    ) -> Result<Array2<f64>, ConfigurationError> {
        let (classifiers, samples, classes) = predictions.dim();
        let required = self.indices.iter().max().map_or(0, |&max| max + 1);
        if required > classifiers {
            return Err(ConfigurationError::PoolTooSmall {
                required,
                actual: classifiers,
            });
        }
        let mut combined = Array2::<f64>::zeros((samples, classes));
        for (&member, &weight) in self.indices.iter().zip(&self.weights) {
            combined.scaled_add(weight, &predictions.index_axis(Axis(0), member));
        }
        Ok(combined)
    }

    /// Class predicted by the pruned ensemble for every sample.
    pub fn predict(&self, predictions: ArrayView3<'_, f64>) -> Result<Vec<usize>, ConfigurationError> {
        Ok(predicted_labels(self.combine(predictions)?.view()))
    }

    /// Accuracy of the pruned ensemble against `target`.
    pub fn accuracy(
        &self,
        predictions: ArrayView3<'_, f64>,
        target: &[usize],
    ) -> Result<f64, ConfigurationError> {
        let labels = self.predict(predictions)?;
        if labels.len() != target.len() {
            return Err(ConfigurationError::TargetLengthMismatch {
                expected: labels.len(),
                actual: target.len(),
            });
        }
        if target.is_empty() {
            return Ok(0.0);
        }
        let correct = labels.iter().zip(target).filter(|(a, b)| a == b).count();
        Ok(correct as f64 / target.len() as f64)
    }
}

fn uniform_weights(count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    vec![1.0 / count as f64; count]
}
