#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Greedy, ordering-based ensemble pruning.
//!
//! Given the class-probability predictions of `M` base classifiers over `N`
//! validation samples (an `M × N × C` tensor) and the validation labels, the
//! pruner grows a sub-ensemble one classifier per round, each time adding the
//! candidate that minimizes a pluggable [`ScoringFunction`].

/// Error taxonomy shared by every stage of a pruning run.
pub mod error;

/// Input validation for prediction tensors and label vectors.
pub mod predictions;

/// Parallel scoring of every remaining candidate in a round.
pub mod evaluator;

/// Round-by-round orchestration of the greedy selection.
pub mod selector;

/// Selected indices, uniform weights and round provenance.
pub mod result;

/// Serializable run configuration.
pub mod config;

/// Scoring contract and the reference scoring functions.
#[path = "../scoring/main.rs"]
pub mod scoring;

/// Structured logging and event emission for pruning runs.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use config::{PruningConfig, ScoringConfig, ScoringKind};
pub use error::{ConfigurationError, PruningError};
pub use evaluator::{EvaluationError, RoundContext, RoundEvaluator, ScoreRecord};
pub use predictions::PoolShape;
pub use result::{RoundRecord, SelectionResult};
pub use scoring::{
    complementariness::Complementariness, drep::Drep, error_rate::SubEnsembleError,
    factory::ScoringFactory, margin::MarginDistance, neg_auc::NegativeAuc, FnScorer,
    ScoringError, ScoringFunction,
};
pub use selector::{prune, GreedyPruner, GreedyPrunerBuilder};
pub use telemetry::{PruningTelemetry, PruningTelemetryBuilder};
