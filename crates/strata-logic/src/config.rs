//! Pass tunables and the errors that abort a run before it starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Position;

/// Reasons a generation run is refused up front.
///
/// Anything that goes wrong once the passes are running is an infeasible
/// placement and is skipped instead.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("level range is empty: top {top} is below bottom {bottom}")]
    EmptyLevelRange { top: i32, bottom: i32 },
    #[error("start level {start} is outside {bottom}..={top}")]
    StartLevelOutOfRange { start: i32, top: i32, bottom: i32 },
    #[error("level {0} is missing")]
    MissingLevel(i32),
    #[error("level {0} has no sectors")]
    EmptyLevel(i32),
    #[error("{what} at {position} does not reference a sector")]
    MissingSector { what: &'static str, position: Position },
    #[error("seed {0} is negative")]
    InvalidSeed(i64),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("static table data is malformed: {0}")]
    TableData(#[from] serde_json::Error),
}

/// Tunables of the generation passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Eligible sectors skipped between two random gangs.
    pub random_gang_interval: usize,
    /// Chance of a blocker on each passage-to-camp border pair.
    pub border_blocker_frequency: f64,
    /// Chance of a hazard cluster on each passage-to-camp border pair.
    pub border_hazard_frequency: f64,
    /// Upper bound of random poison/radiation clusters per level.
    pub max_hazard_clusters: usize,
    /// Unflagged steps at the tail of a path that force a requirement there.
    pub required_resource_tail_steps: usize,
    /// Chance that all but one route to a point of interest is blocked.
    pub poi_blocker_probability: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            random_gang_interval: 45,
            border_blocker_frequency: 0.25,
            border_hazard_frequency: 0.5,
            max_hazard_clusters: 4,
            required_resource_tail_steps: 3,
            poi_blocker_probability: 0.75,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.random_gang_interval == 0 {
            return Err(GenerationError::InvalidConfig(
                "random_gang_interval must be positive".into(),
            ));
        }
        for (name, p) in [
            ("border_blocker_frequency", self.border_blocker_frequency),
            ("border_hazard_frequency", self.border_hazard_frequency),
            ("poi_blocker_probability", self.poi_blocker_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(GenerationError::InvalidConfig(format!(
                    "{} must be within 0..=1, got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GenerationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_probability() {
        let config = GenerationConfig {
            border_blocker_frequency: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("border_blocker_frequency"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GenerationConfig = serde_json::from_str(r#"{"random_gang_interval": 10}"#).unwrap();
        assert_eq!(config.random_gang_interval, 10);
        assert_eq!(config.max_hazard_clusters, 4);
    }
}
