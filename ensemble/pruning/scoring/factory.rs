use super::{
    complementariness::Complementariness, drep::Drep, error_rate::SubEnsembleError,
    margin::MarginDistance, neg_auc::NegativeAuc, ScoringFunction,
};
use crate::{
    config::{ScoringConfig, ScoringKind},
    error::ConfigurationError,
};

/// Builds scoring functions from configuration or by name.
pub struct ScoringFactory;

impl ScoringFactory {
    /// Creates the scoring function described by `config`, binding its
    /// parameters once.
    pub fn create(config: &ScoringConfig) -> Result<Box<dyn ScoringFunction>, ConfigurationError> {
        let scorer: Box<dyn ScoringFunction> = match config.metric {
            ScoringKind::Error => Box::new(SubEnsembleError),
            ScoringKind::NegAuc => Box::new(NegativeAuc),
            ScoringKind::Complementariness => Box::new(Complementariness),
            ScoringKind::MarginDistance => {
                Box::new(MarginDistance::new(config.p_range, config.seed)?)
            }
            ScoringKind::Drep => Box::new(Drep::new(config.rho)?),
        };
        Ok(scorer)
    }

    /// Creates a scoring function by name with default parameters.
    pub fn create_named(name: &str) -> Result<Box<dyn ScoringFunction>, ConfigurationError> {
        let metric: ScoringKind = name.parse()?;
        Self::create(&ScoringConfig {
            metric,
            ..ScoringConfig::default()
        })
    }

    /// Canonical names of every available scoring function.
    #[must_use]
    pub fn available() -> Vec<&'static str> {
        ScoringKind::ALL.iter().map(|kind| kind.name()).collect()
    }

    /// One-line description of a scoring function.
    #[must_use]
    pub fn description(name: &str) -> Option<&'static str> {
        let kind: ScoringKind = name.parse().ok()?;
        Some(match kind {
            ScoringKind::Error => "misclassification rate of the sub-ensemble with the candidate added",
            ScoringKind::NegAuc => "negated ROC-AUC of the sub-ensemble with the candidate added",
            ScoringKind::Complementariness => {
                "negated count of samples the candidate fixes for the sub-ensemble vote"
            }
            ScoringKind::MarginDistance => {
                "squared distance of the average signed margin to a random reference"
            }
            ScoringKind::Drep => "blended error restricted to the most diverse fraction rho",
        })
    }

    /// Names of the parameters a scoring function reads from its config.
    #[must_use]
    pub fn supported_params(name: &str) -> Vec<&'static str> {
        match name.parse::<ScoringKind>() {
            Ok(ScoringKind::MarginDistance) => vec!["p_range", "seed"],
            Ok(ScoringKind::Drep) => vec!["rho"],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_every_available_metric() {
        for name in ScoringFactory::available() {
            let scorer = ScoringFactory::create_named(name).unwrap();
            assert_eq!(scorer.name(), name);
            assert!(ScoringFactory::description(name).is_some());
        }
    }

    #[test]
    fn accepts_aliases() {
        assert_eq!(ScoringFactory::create_named("auc").unwrap().name(), "neg_auc");
        assert_eq!(
            ScoringFactory::create_named("DREP").unwrap().name(),
            "drep"
        );
    }

    #[test]
    fn unknown_metric_is_a_configuration_error() {
        assert!(matches!(
            ScoringFactory::create_named("kappa"),
            Err(ConfigurationError::UnknownMetric(name)) if name == "kappa"
        ));
    }

    #[test]
    fn invalid_parameters_surface_at_construction() {
        let config = ScoringConfig {
            metric: ScoringKind::Drep,
            rho: 2.0,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            ScoringFactory::create(&config),
            Err(ConfigurationError::InvalidRho(_))
        ));
    }

    #[test]
    fn lists_parameters() {
        assert_eq!(ScoringFactory::supported_params("drep"), vec!["rho"]);
        assert!(ScoringFactory::supported_params("error").is_empty());
    }
}
