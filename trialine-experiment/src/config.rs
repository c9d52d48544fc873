use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use trialine_core::{KeyCode, RangeError};
use trialine_timing::UniformGap;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid experiment config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Static settings for a simple reaction-time experiment, read once before
/// the timeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub exp_id: String,
    pub practice_trials: u32,
    pub experiment_trials: u32,
    /// Inclusive bounds of the post-trial gap.
    pub gap_range_ms: (u64, u64),
    pub continue_key: KeyCode,
    pub response_key: KeyCode,
    pub response_timeout_ms: Option<u64>,
    pub instructions_delay_ms: u64,
    pub start_block_delay_ms: u64,
    pub stimulus: String,
    pub welcome_text: String,
    pub instructions: Vec<String>,
    pub start_practice_text: String,
    pub start_test_text: String,
    pub end_text: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            exp_id: "simple_rt".to_string(),
            practice_trials: 5,
            experiment_trials: 50,
            gap_range_ms: (UniformGap::DEFAULT_MIN_MS, UniformGap::DEFAULT_MAX_MS),
            continue_key: KeyCode::ENTER,
            response_key: KeyCode::SPACE,
            response_timeout_ms: None,
            instructions_delay_ms: 1000,
            start_block_delay_ms: 1000,
            stimulus: "<div class = shapebox><div id = cross></div></div>".to_string(),
            welcome_text: "<div class = centerbox><p class = block-text>Welcome to the simple RT experiment. Press <strong>enter</strong> to begin.</p></div>".to_string(),
            instructions: vec![
                "<div class = centerbox><p class = block-text>In this experiment, we are testing how fast you can respond. On each trial press the spacebar as quickly as possible <strong>after</strong> you see the large \"X\".</p></div>".to_string(),
            ],
            start_practice_text: "<div class = centerbox><p class = center-block-text>We will start {n} practice trials. Press <strong>enter</strong> to begin.</p></div>".to_string(),
            start_test_text: "<div class = centerbox><p class = block-text>We will now start the test. Respond to the \"X\" as quickly as possible by pressing the spacebar. Press <strong>enter</strong> to begin.</p></div>".to_string(),
            end_text: "<div class = centerbox><p class = center-block-text>Finished with this task.</p><p class = center-block-text>Press <strong>enter</strong> to continue.</p></div>".to_string(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn gap_policy(&self) -> Result<UniformGap, RangeError> {
        UniformGap::new(self.gap_range_ms.0, self.gap_range_ms.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_simple_rt() {
        let config = ExperimentConfig::default();
        assert_eq!(config.exp_id, "simple_rt");
        assert_eq!((config.practice_trials, config.experiment_trials), (5, 50));
        assert_eq!(config.gap_policy().unwrap(), UniformGap::default());
        assert_eq!(config.continue_key, KeyCode::ENTER);
        assert_eq!(config.response_key, KeyCode::SPACE);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = ExperimentConfig::from_json_str(
            r#"{"exp_id": "choice_rt", "practice_trials": 2, "gap_range_ms": [500, 800]}"#,
        )
        .unwrap();
        assert_eq!(config.exp_id, "choice_rt");
        assert_eq!(config.practice_trials, 2);
        assert_eq!(config.experiment_trials, 50);
        assert_eq!(config.gap_policy().unwrap(), UniformGap::new(500, 800).unwrap());
    }

    #[test]
    fn inverted_gap_range_fails_at_policy_construction() {
        let config =
            ExperimentConfig::from_json_str(r#"{"gap_range_ms": [3000, 1000]}"#).unwrap();
        assert_eq!(
            config.gap_policy(),
            Err(RangeError {
                min_ms: 3000,
                max_ms: 1000
            })
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ExperimentConfig::from_path("/nonexistent/trialine.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/trialine.json"));
    }
}
