use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::ArrayView3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    error::{ConfigurationError, PruningError},
    scoring::{ScoringError, ScoringFunction},
};

/// Score of one candidate in one round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Candidate classifier index.
    pub candidate: usize,
    /// Score returned by the scoring function.
    pub score: f64,
}

impl ScoreRecord {
    /// Lowest score, ties going to the lowest candidate index.
    #[must_use]
    pub fn best(records: &[Self]) -> Option<Self> {
        records.iter().copied().min_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.candidate.cmp(&b.candidate))
        })
    }
}

/// Inputs of a single evaluation round.
#[derive(Clone, Copy)]
pub struct RoundContext<'a> {
    /// One-based round number.
    pub round: usize,
    /// Full `M × N × C` prediction tensor.
    pub predictions: ArrayView3<'a, f64>,
    /// Target labels.
    pub target: &'a [usize],
    /// Classifiers still in the candidate pool.
    pub candidates: &'a [usize],
    /// Classifiers selected in earlier rounds, in selection order.
    pub selected: &'a [usize],
    /// Raised by the caller to abandon the run.
    pub abort: Option<&'a AtomicBool>,
}

/// Why a round produced no score records.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The scoring function failed for a candidate.
    #[error("candidate {candidate}: {source}")]
    Scoring {
        /// Failing candidate.
        candidate: usize,
        /// Underlying failure.
        #[source]
        source: ScoringError,
    },
    /// The abort flag was raised.
    #[error("evaluation cancelled")]
    Cancelled,
}

/// Scores every remaining candidate of a round on a dedicated worker pool.
pub struct RoundEvaluator {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for RoundEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundEvaluator")
            .field("workers", &self.workers)
            .finish()
    }
}

impl RoundEvaluator {
    /// Starts a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self, PruningError> {
        if workers == 0 {
            return Err(ConfigurationError::ZeroWorkers.into());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("prune-eval-{idx}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Worker thread count.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Scores every candidate of the round.
    ///
    /// Records come back in candidate order, each carrying its own index. The
    /// first failure observed short-circuits the round and the remaining work
    /// is dropped.
    #[instrument(skip_all, fields(round = context.round, candidates = context.candidates.len()))]
    pub fn evaluate(
        &self,
        scorer: &dyn ScoringFunction,
        context: RoundContext<'_>,
    ) -> Result<Vec<ScoreRecord>, EvaluationError> {
        let RoundContext {
            predictions,
            target,
            candidates,
            selected,
            abort,
            ..
        } = context;

        let records = self.pool.install(|| {
            candidates
                .par_iter()
                .map(|&candidate| {
                    if abort.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                        return Err(EvaluationError::Cancelled);
                    }
                    let score = scorer
                        .score(candidate, predictions, selected, target)
                        .and_then(|score| {
                            if score.is_nan() {
                                Err(ScoringError::NotANumber)
                            } else {
                                Ok(score)
                            }
                        })
                        .map_err(|source| EvaluationError::Scoring { candidate, source })?;
                    Ok(ScoreRecord { candidate, score })
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        tracing::debug!(scored = records.len(), "round evaluated");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::FnScorer;
    use ndarray::Array3;

    fn context<'a>(
        predictions: &'a Array3<f64>,
        candidates: &'a [usize],
        target: &'a [usize],
    ) -> RoundContext<'a> {
        RoundContext {
            round: 1,
            predictions: predictions.view(),
            target,
            candidates,
            selected: &[],
            abort: None,
        }
    }

    #[test]
    fn records_pair_index_and_score() {
        let predictions = Array3::<f64>::zeros((6, 1, 2));
        let scorer = FnScorer::new("square", |candidate, _, _, _| {
            Ok((candidate * candidate) as f64)
        });
        let evaluator = RoundEvaluator::new(4).unwrap();
        let candidates = [5, 1, 3];
        let records = evaluator
            .evaluate(&scorer, context(&predictions, &candidates, &[0]))
            .unwrap();
        for record in &records {
            let expected = (record.candidate * record.candidate) as f64;
            assert!((record.score - expected).abs() < f64::EPSILON);
        }
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn best_breaks_ties_by_index() {
        let records = [
            ScoreRecord { candidate: 4, score: 0.5 },
            ScoreRecord { candidate: 2, score: 0.5 },
            ScoreRecord { candidate: 7, score: 0.9 },
        ];
        assert_eq!(ScoreRecord::best(&records).unwrap().candidate, 2);
        assert!(ScoreRecord::best(&[]).is_none());
    }

    #[test]
    fn infinite_scores_lose_to_finite_ones() {
        let records = [
            ScoreRecord { candidate: 0, score: f64::INFINITY },
            ScoreRecord { candidate: 1, score: 0.75 },
        ];
        assert_eq!(ScoreRecord::best(&records).unwrap().candidate, 1);
    }

    #[test]
    fn nan_is_a_scoring_failure() {
        let predictions = Array3::<f64>::zeros((2, 1, 2));
        let scorer = FnScorer::new("nan", |_, _, _, _| Ok(f64::NAN));
        let evaluator = RoundEvaluator::new(1).unwrap();
        let err = evaluator
            .evaluate(&scorer, context(&predictions, &[1], &[0]))
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Scoring {
                candidate: 1,
                source: ScoringError::NotANumber
            }
        ));
    }

    #[test]
    fn raised_abort_flag_cancels() {
        let predictions = Array3::<f64>::zeros((2, 1, 2));
        let scorer = FnScorer::new("zero", |_, _, _, _| Ok(0.0));
        let evaluator = RoundEvaluator::new(2).unwrap();
        let flag = AtomicBool::new(true);
        let mut ctx = context(&predictions, &[0, 1], &[0]);
        ctx.abort = Some(&flag);
        assert!(matches!(
            evaluator.evaluate(&scorer, ctx),
            Err(EvaluationError::Cancelled)
        ));
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            RoundEvaluator::new(0),
            Err(PruningError::Configuration(ConfigurationError::ZeroWorkers))
        ));
    }
}
