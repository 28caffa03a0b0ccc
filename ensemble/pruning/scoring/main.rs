//! Scoring contract plus the reference sub-ensemble scoring functions.
//!
//! A scoring function rates one candidate classifier against the current
//! sub-ensemble; lower is better and `+inf` marks the candidate ineligible for
//! the round. Implementations must be pure so every candidate of a round can be
//! scored concurrently.

/// Complementariness with the sub-ensemble's majority vote.
pub mod complementariness;
/// Diversity-regularized selection.
pub mod drep;
/// Misclassification rate of the blended sub-ensemble.
pub mod error_rate;
/// Name-based construction of scoring functions.
pub mod factory;
/// Shared tensor helpers.
pub mod func;
/// Distance of the ensemble margin to a random reference.
pub mod margin;
/// Negated ROC-AUC of the blended sub-ensemble.
pub mod neg_auc;

use std::fmt;

use ndarray::ArrayView3;
use thiserror::Error;

/// Failure reported by a scoring function for a single candidate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoringError {
    /// The metric is not defined for the given inputs.
    #[error("metric undefined: {0}")]
    Undefined(String),
    /// The function produced `NaN`.
    #[error("score is not a number")]
    NotANumber,
    /// A custom scoring function reported a failure.
    #[error("{0}")]
    Failed(String),
}

/// Strategy rating a candidate against the current sub-ensemble.
pub trait ScoringFunction: Send + Sync {
    /// Short identifier used in logs and events.
    fn name(&self) -> &str;

    /// Scores `candidate` given the full `M × N × C` tensor, the indices
    /// selected so far (possibly empty) and the target labels.
    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError>;
}

type ScoreFn =
    dyn Fn(usize, ArrayView3<'_, f64>, &[usize], &[usize]) -> Result<f64, ScoringError>
        + Send
        + Sync;

/// Adapts a closure into a [`ScoringFunction`].
pub struct FnScorer {
    name: String,
    func: Box<ScoreFn>,
}

impl FnScorer {
    /// Wraps `func` under the given name.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(usize, ArrayView3<'_, f64>, &[usize], &[usize]) -> Result<f64, ScoringError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScorer").field("name", &self.name).finish()
    }
}

impl ScoringFunction for FnScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError> {
        (self.func)(candidate, predictions, selected, target)
    }
}
