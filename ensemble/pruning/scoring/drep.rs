use std::sync::Arc;

use ndarray::{ArrayView3, Axis};
use parking_lot::Mutex;

use super::{
    func::{blended, error_rate, predicted_labels, summed},
    ScoringError, ScoringFunction,
};
use crate::error::ConfigurationError;

/// Default diversity-retention fraction.
pub const DEFAULT_RHO: f64 = 0.25;

/// Diversity-regularized ensemble pruning (Li, Yu & Zhou, 2012).
///
/// Each round only the `ceil(rho * remaining)` unselected classifiers that
/// agree least with the sub-ensemble's consensus are eligible; the rest score
/// `+inf`. Eligible candidates score the blended misclassification rate.
/// Agreement ties rank the lower classifier index first.
///
/// Eligibility is computed once per round and shared by every candidate
/// scored against the same tensor and selection.
#[derive(Debug)]
pub struct Drep {
    rho: f64,
    round: Mutex<Option<EligibleRound>>,
}

/// Eligibility mask of one round, keyed by the tensor view and selection.
#[derive(Debug)]
struct EligibleRound {
    key: RoundKey,
    mask: Arc<[bool]>,
}

#[derive(Debug, PartialEq, Eq)]
struct RoundKey {
    data: usize,
    dim: (usize, usize, usize),
    strides: Vec<isize>,
    selected: Vec<usize>,
}

impl RoundKey {
    fn new(predictions: ArrayView3<'_, f64>, selected: &[usize]) -> Self {
        Self {
            data: predictions.as_ptr() as usize,
            dim: predictions.dim(),
            strides: predictions.strides().to_vec(),
            selected: selected.to_vec(),
        }
    }
}

impl Drep {
    /// Creates the scorer; `rho` must lie in `(0, 1]`.
    pub fn new(rho: f64) -> Result<Self, ConfigurationError> {
        if !(rho > 0.0 && rho <= 1.0) {
            return Err(ConfigurationError::InvalidRho(rho));
        }
        Ok(Self {
            rho,
            round: Mutex::new(None),
        })
    }

    /// Diversity-retention fraction.
    #[must_use]
    pub const fn rho(&self) -> f64 {
        self.rho
    }

    /// Unselected classifiers eligible this round, most diverse first.
    #[must_use]
    pub fn eligible(&self, predictions: ArrayView3<'_, f64>, selected: &[usize]) -> Vec<usize> {
        let classifiers = predictions.len_of(Axis(0));
        let mut taken = vec![false; classifiers];
        for &model in selected {
            taken[model] = true;
        }
        let consensus = predicted_labels(summed(predictions, selected).view());
        let mut agreement: Vec<(usize, usize)> = (0..classifiers)
            .filter(|&model| !taken[model])
            .map(|model| {
                let labels = predicted_labels(predictions.index_axis(Axis(0), model));
                let agree = labels
                    .iter()
                    .zip(&consensus)
                    .filter(|(own, vote)| own == vote)
                    .count();
                (model, agree)
            })
            .collect();
        agreement.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        let keep = (self.rho * agreement.len() as f64).ceil() as usize;
        agreement
            .into_iter()
            .take(keep.max(1))
            .map(|(model, _)| model)
            .collect()
    }

    fn eligible_mask(&self, predictions: ArrayView3<'_, f64>, selected: &[usize]) -> Arc<[bool]> {
        let key = RoundKey::new(predictions, selected);
        let cached = self
            .round
            .lock()
            .as_ref()
            .filter(|round| round.key == key)
            .map(|round| Arc::clone(&round.mask));
        if let Some(mask) = cached {
            return mask;
        }
        let mut mask = vec![false; predictions.len_of(Axis(0))];
        for model in self.eligible(predictions, selected) {
            mask[model] = true;
        }
        let mask: Arc<[bool]> = mask.into();
        *self.round.lock() = Some(EligibleRound {
            key,
            mask: Arc::clone(&mask),
        });
        mask
    }
}

impl Clone for Drep {
    fn clone(&self) -> Self {
        Self {
            rho: self.rho,
            round: Mutex::new(None),
        }
    }
}

impl Default for Drep {
    fn default() -> Self {
        Self {
            rho: DEFAULT_RHO,
            round: Mutex::new(None),
        }
    }
}

impl ScoringFunction for Drep {
    fn name(&self) -> &str {
        "drep"
    }

    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError> {
        if selected.is_empty() {
            // A new run; drop eligibility left over from an earlier one.
            self.round.lock().take();
            let own = predicted_labels(predictions.index_axis(Axis(0), candidate));
            return Ok(error_rate(&own, target));
        }
        if !self.eligible_mask(predictions, selected)[candidate] {
            return Ok(f64::INFINITY);
        }
        let blend = blended(predictions, candidate, selected);
        Ok(error_rate(&predicted_labels(blend.view()), target))
    }
}
