use std::{fs, path::Path, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigurationError,
    scoring::{drep::DEFAULT_RHO, margin::DEFAULT_P_RANGE},
};

/// Reference scoring functions selectable by name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    /// Blended sub-ensemble misclassification rate.
    #[default]
    #[serde(alias = "reduce_error")]
    Error,
    /// Negated ROC-AUC of the blended sub-ensemble.
    #[serde(alias = "auc")]
    NegAuc,
    /// Negated count of samples the candidate fixes.
    #[serde(alias = "complementary")]
    Complementariness,
    /// Distance of the signed margin to a random reference.
    #[serde(alias = "margin")]
    MarginDistance,
    /// Diversity-regularized blended error.
    Drep,
}

impl ScoringKind {
    /// Every kind, in listing order.
    pub const ALL: [Self; 5] = [
        Self::Error,
        Self::NegAuc,
        Self::Complementariness,
        Self::MarginDistance,
        Self::Drep,
    ];

    /// Canonical snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::NegAuc => "neg_auc",
            Self::Complementariness => "complementariness",
            Self::MarginDistance => "margin_distance",
            Self::Drep => "drep",
        }
    }
}

impl FromStr for ScoringKind {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" | "reduce_error" => Ok(Self::Error),
            "neg_auc" | "auc" => Ok(Self::NegAuc),
            "complementariness" | "complementary" => Ok(Self::Complementariness),
            "margin_distance" | "margin" => Ok(Self::MarginDistance),
            "drep" => Ok(Self::Drep),
            _ => Err(ConfigurationError::UnknownMetric(value.to_string())),
        }
    }
}

/// Scoring function choice plus the parameters bound at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Which reference scoring function to use.
    pub metric: ScoringKind,
    /// Diversity-retention fraction for [`ScoringKind::Drep`].
    pub rho: f64,
    /// Reference margin range for [`ScoringKind::MarginDistance`].
    pub p_range: [f64; 2],
    /// Seed for the margin reference draws.
    pub seed: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            metric: ScoringKind::default(),
            rho: DEFAULT_RHO,
            p_range: DEFAULT_P_RANGE,
            seed: 0,
        }
    }
}

/// Settings for a pruning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PruningConfig {
    /// Size of the sub-ensemble to select.
    pub requested_count: usize,
    /// Worker threads scoring candidates within a round.
    pub workers: usize,
    /// Scoring function settings.
    pub scoring: ScoringConfig,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            requested_count: 5,
            workers: 8,
            scoring: ScoringConfig::default(),
        }
    }
}

impl PruningConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("loading pruning config {}", path.display()))
    }

    /// Checks counts and scoring parameters without building anything.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.requested_count == 0 {
            return Err(ConfigurationError::ZeroRequestedCount);
        }
        if self.workers == 0 {
            return Err(ConfigurationError::ZeroWorkers);
        }
        match self.scoring.metric {
            ScoringKind::Drep if !(self.scoring.rho > 0.0 && self.scoring.rho <= 1.0) => {
                Err(ConfigurationError::InvalidRho(self.scoring.rho))
            }
            ScoringKind::MarginDistance => {
                let [low, high] = self.scoring.p_range;
                if low.is_finite() && high.is_finite() && low <= high {
                    Ok(())
                } else {
                    Err(ConfigurationError::InvalidProbabilityRange { low, high })
                }
            }
            _ => Ok(()),
        }
    }
}
