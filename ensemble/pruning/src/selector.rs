//! Greedy selection loop: `INIT → ROUND(1..=k) → DONE`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use indexmap::IndexSet;
use ndarray::ArrayView3;
use serde_json::{json, Value};
use shared_logging::LogLevel;

use crate::{
    config::PruningConfig,
    error::{ConfigurationError, PruningError},
    evaluator::{EvaluationError, RoundContext, RoundEvaluator, ScoreRecord},
    predictions::PoolShape,
    result::{RoundRecord, SelectionResult},
    scoring::{factory::ScoringFactory, ScoringFunction},
    telemetry::PruningTelemetry,
};

const DEFAULT_REQUESTED_COUNT: usize = 5;
const DEFAULT_WORKERS: usize = 8;

/// Prunes `predictions` down to `requested_count` classifiers with `scorer`.
///
/// Convenience wrapper building a one-off [`GreedyPruner`]; returns the
/// selected indices and their uniform weights.
pub fn prune<S>(
    predictions: ArrayView3<'_, f64>,
    target: &[usize],
    requested_count: usize,
    scorer: S,
    workers: usize,
) -> Result<(Vec<usize>, Vec<f64>), PruningError>
where
    S: ScoringFunction + 'static,
{
    let pruner = GreedyPruner::builder()
        .requested_count(requested_count)
        .workers(workers)
        .scorer(scorer)
        .build()?;
    Ok(pruner.prune(predictions, target)?.into_parts())
}

/// Builder for [`GreedyPruner`].
pub struct GreedyPrunerBuilder {
    requested_count: usize,
    workers: usize,
    scorer: Option<Arc<dyn ScoringFunction>>,
    telemetry: Option<PruningTelemetry>,
    abort: Option<Arc<AtomicBool>>,
}

impl Default for GreedyPrunerBuilder {
    fn default() -> Self {
        Self {
            requested_count: DEFAULT_REQUESTED_COUNT,
            workers: DEFAULT_WORKERS,
            scorer: None,
            telemetry: None,
            abort: None,
        }
    }
}

impl GreedyPrunerBuilder {
    /// Number of classifiers to select.
    #[must_use]
    pub fn requested_count(mut self, count: usize) -> Self {
        self.requested_count = count;
        self
    }

    /// Worker threads used to score a round.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Scoring function; its parameters are fixed for the pruner's lifetime.
    #[must_use]
    pub fn scorer(self, scorer: impl ScoringFunction + 'static) -> Self {
        self.shared_scorer(Arc::new(scorer))
    }

    /// Scoring function produced by [`ScoringFactory`].
    #[must_use]
    pub fn boxed_scorer(self, scorer: Box<dyn ScoringFunction>) -> Self {
        self.shared_scorer(Arc::from(scorer))
    }

    /// Scoring function shared with other pruners.
    #[must_use]
    pub fn shared_scorer(mut self, scorer: Arc<dyn ScoringFunction>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: PruningTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Flag the caller may raise to abandon a run in progress.
    #[must_use]
    pub fn abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Validates the settings and starts the worker pool.
    pub fn build(self) -> Result<GreedyPruner, PruningError> {
        if self.requested_count == 0 {
            return Err(ConfigurationError::ZeroRequestedCount.into());
        }
        let scorer = self.scorer.ok_or(ConfigurationError::MissingScorer)?;
        let evaluator = RoundEvaluator::new(self.workers)?;
        Ok(GreedyPruner {
            requested_count: self.requested_count,
            scorer,
            evaluator,
            telemetry: self.telemetry,
            abort: self.abort,
        })
    }
}

/// Greedy, ordering-based pruner.
///
/// Each round scores every unselected classifier against the current
/// selection and adds the lowest-scoring one; ties go to the lower index.
pub struct GreedyPruner {
    requested_count: usize,
    scorer: Arc<dyn ScoringFunction>,
    evaluator: RoundEvaluator,
    telemetry: Option<PruningTelemetry>,
    abort: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for GreedyPruner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreedyPruner")
            .field("requested_count", &self.requested_count)
            .field("scorer", &self.scorer.name())
            .field("workers", &self.evaluator.workers())
            .finish()
    }
}

impl GreedyPruner {
    /// Returns a builder with the default count (5) and workers (8).
    #[must_use]
    pub fn builder() -> GreedyPrunerBuilder {
        GreedyPrunerBuilder::default()
    }

    /// Builder preloaded from a validated configuration.
    pub fn builder_from_config(config: &PruningConfig) -> Result<GreedyPrunerBuilder, PruningError> {
        config.validate()?;
        let scorer = ScoringFactory::create(&config.scoring)?;
        Ok(Self::builder()
            .requested_count(config.requested_count)
            .workers(config.workers)
            .boxed_scorer(scorer))
    }

    /// Builds a pruner straight from a configuration.
    pub fn from_config(config: &PruningConfig) -> Result<Self, PruningError> {
        Self::builder_from_config(config)?.build()
    }

    /// Requested sub-ensemble size.
    #[must_use]
    pub const fn requested_count(&self) -> usize {
        self.requested_count
    }

    /// Name of the configured scoring function.
    #[must_use]
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Runs the greedy selection.
    ///
    /// Either every round commits its winner and a result is returned, or the
    /// run aborts with no partial selection.
    pub fn prune(
        &self,
        predictions: ArrayView3<'_, f64>,
        target: &[usize],
    ) -> Result<SelectionResult, PruningError> {
        let shape = PoolShape::validate(predictions, target)?;
        self.log(
            LogLevel::Info,
            "pruning.start",
            json!({
                "pool": shape.classifiers,
                "samples": shape.samples,
                "classes": shape.classes,
                "requested": self.requested_count,
                "scorer": self.scorer.name(),
                "workers": self.evaluator.workers(),
            }),
        );

        if self.requested_count >= shape.classifiers {
            let result = SelectionResult::whole_pool(shape.classifiers);
            self.log(
                LogLevel::Info,
                "pruning.degenerate",
                json!({ "pool": shape.classifiers, "requested": self.requested_count }),
            );
            self.finish(&result);
            return Ok(result);
        }

        match self.run_rounds(predictions, target, shape) {
            Ok(result) => {
                self.finish(&result);
                Ok(result)
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    "pruning.failed",
                    json!({ "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    fn run_rounds(
        &self,
        predictions: ArrayView3<'_, f64>,
        target: &[usize],
        shape: PoolShape,
    ) -> Result<SelectionResult, PruningError> {
        let mut remaining: IndexSet<usize> = (0..shape.classifiers).collect();
        let mut selected: Vec<usize> = Vec::with_capacity(self.requested_count);
        let mut rounds = Vec::with_capacity(self.requested_count);

        for round in 1..=self.requested_count {
            if self.aborted() {
                return Err(PruningError::Cancelled { round });
            }
            let candidates: Vec<usize> = remaining.iter().copied().collect();
            let context = RoundContext {
                round,
                // Reborrow so the view shares the round-local lifetime.
                predictions: predictions.view(),
                target,
                candidates: &candidates,
                selected: &selected,
                abort: self.abort.as_deref(),
            };
            let records = self
                .evaluator
                .evaluate(&*self.scorer, context)
                .map_err(|err| match err {
                    EvaluationError::Scoring { candidate, source } => PruningError::ScoringFailure {
                        round,
                        candidate,
                        source,
                    },
                    EvaluationError::Cancelled => PruningError::Cancelled { round },
                })?;
            let Some(winner) = ScoreRecord::best(&records) else {
                // The guard keeps the pool non-empty while rounds remain.
                return Err(ConfigurationError::EmptyPool.into());
            };

            remaining.shift_remove(&winner.candidate);
            selected.push(winner.candidate);
            let record = RoundRecord {
                round,
                candidate: winner.candidate,
                score: winner.score,
                scored: records.len(),
            };
            self.log(
                LogLevel::Debug,
                "pruning.round",
                json!({
                    "round": round,
                    "candidate": winner.candidate,
                    "score": winner.score,
                    "remaining": remaining.len(),
                }),
            );
            self.event(
                "pruning.round.completed",
                json!({ "round": round, "candidate": winner.candidate, "score": winner.score }),
            );
            rounds.push(record);
        }

        Ok(SelectionResult::from_rounds(rounds))
    }

    fn aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn finish(&self, result: &SelectionResult) {
        self.log(
            LogLevel::Info,
            "pruning.complete",
            json!({ "selected": result.indices(), "rounds": result.rounds().len() }),
        );
        self.event(
            "pruning.completed",
            json!({ "selected": result.indices(), "weights": result.weights() }),
        );
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(telemetry) = self.telemetry.as_ref() {
            let _ = telemetry.log(level, message, metadata);
        }
    }

    fn event(&self, event_type: &str, payload: Value) {
        if let Some(telemetry) = self.telemetry.as_ref() {
            let _ = telemetry.event(event_type, payload);
        }
    }
}
