use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Dimensions of a validated prediction tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolShape {
    /// Number of base classifiers (`M`).
    pub classifiers: usize,
    /// Number of validation samples (`N`).
    pub samples: usize,
    /// Number of classes (`C`).
    pub classes: usize,
}

impl PoolShape {
    /// Reads the dimensions of an `M × N × C` tensor without validating it.
    #[must_use]
    pub fn of(predictions: ArrayView3<'_, f64>) -> Self {
        let (classifiers, samples, classes) = predictions.dim();
        Self {
            classifiers,
            samples,
            classes,
        }
    }

    /// Checks the tensor against the target labels.
    ///
    /// Requires at least one classifier, sample and class, one label per
    /// sample, and every label inside `[0, C)`.
    pub fn validate(
        predictions: ArrayView3<'_, f64>,
        target: &[usize],
    ) -> Result<Self, ConfigurationError> {
        let shape = Self::of(predictions);
        if shape.classifiers == 0 {
            return Err(ConfigurationError::EmptyPool);
        }
        if shape.samples == 0 || shape.classes == 0 {
            return Err(ConfigurationError::EmptyTensor {
                samples: shape.samples,
                classes: shape.classes,
            });
        }
        if target.len() != shape.samples {
            return Err(ConfigurationError::TargetLengthMismatch {
                expected: shape.samples,
                actual: target.len(),
            });
        }
        if let Some((sample, &label)) = target
            .iter()
            .enumerate()
            .find(|&(_, &label)| label >= shape.classes)
        {
            return Err(ConfigurationError::LabelOutOfRange {
                sample,
                label,
                classes: shape.classes,
            });
        }
        Ok(shape)
    }
}
