use thiserror::Error;

use crate::scoring::ScoringError;

/// Caller misconfiguration, detected before any round starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Requested sub-ensemble size was zero.
    #[error("requested count must be at least 1")]
    ZeroRequestedCount,
    /// Worker pool size was zero.
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    /// Builder finished without a scoring function.
    #[error("no scoring function supplied")]
    MissingScorer,
    /// Prediction tensor holds no classifiers.
    #[error("prediction tensor contains no classifiers")]
    EmptyPool,
    /// Prediction tensor has no samples or no classes.
    #[error("prediction tensor is empty: {samples} samples, {classes} classes")]
    EmptyTensor {
        /// Samples per classifier.
        samples: usize,
        /// Classes per sample.
        classes: usize,
    },
    /// Target length differs from the tensor's sample axis.
    #[error("target has {actual} labels but predictions cover {expected} samples")]
    TargetLengthMismatch {
        /// Samples in the prediction tensor.
        expected: usize,
        /// Labels supplied.
        actual: usize,
    },
    /// A target label is not a valid class index.
    #[error("label {label} at sample {sample} is outside [0, {classes})")]
    LabelOutOfRange {
        /// Offending sample.
        sample: usize,
        /// Offending label.
        label: usize,
        /// Classes in the prediction tensor.
        classes: usize,
    },
    /// A selection refers to classifiers a tensor does not have.
    #[error("selection needs {required} classifiers but the tensor has {actual}")]
    PoolTooSmall {
        /// Pool size the selection requires.
        required: usize,
        /// Pool size of the supplied tensor.
        actual: usize,
    },
    /// Diversity-retention fraction outside `(0, 1]`.
    #[error("rho must lie in (0, 1], got {0}")]
    InvalidRho(f64),
    /// Reference margin range is not a finite, ordered interval.
    #[error("p_range must be finite with low <= high, got [{low}, {high}]")]
    InvalidProbabilityRange {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Scoring function name not known to the factory.
    #[error("unknown scoring function: {0}")]
    UnknownMetric(String),
    /// Configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reasons a pruning run aborts.
#[derive(Debug, Error)]
pub enum PruningError {
    /// Inputs or settings were invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The scoring function failed for a candidate; the run is abandoned.
    #[error("scoring failed for candidate {candidate} in round {round}: {source}")]
    ScoringFailure {
        /// One-based round number.
        round: usize,
        /// Candidate classifier index.
        candidate: usize,
        /// Error returned by the scoring function.
        #[source]
        source: ScoringError,
    },
    /// The caller raised the abort flag.
    #[error("pruning cancelled during round {round}")]
    Cancelled {
        /// Round in progress when the abort was observed.
        round: usize,
    },
    /// The evaluation worker pool could not be started.
    #[error("failed to start evaluation workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl PruningError {
    /// Round and candidate of a scoring failure.
    #[must_use]
    pub const fn failed_candidate(&self) -> Option<(usize, usize)> {
        match self {
            Self::ScoringFailure {
                round, candidate, ..
            } => Some((*round, *candidate)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_failure_reports_round_and_candidate() {
        let err = PruningError::ScoringFailure {
            round: 1,
            candidate: 1,
            source: ScoringError::Failed("boom".into()),
        };
        assert_eq!(err.failed_candidate(), Some((1, 1)));
        let message = err.to_string();
        assert!(message.contains("candidate 1"));
        assert!(message.contains("round 1"));
    }

    #[test]
    fn configuration_errors_are_transparent() {
        let err: PruningError = ConfigurationError::TargetLengthMismatch {
            expected: 10,
            actual: 9,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "target has 9 labels but predictions cover 10 samples"
        );
        assert!(err.failed_candidate().is_none());
    }
}
