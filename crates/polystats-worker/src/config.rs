use polystats_client::DEFAULT_SOURCE_URL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How workers serialize their contributions to the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Each worker folds into a private aggregate; partials are reduced after the join
    #[default]
    PartialReduce,
    /// Workers fold into one aggregate behind a mutex
    Locked,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::PartialReduce => "partial_reduce",
            MergeStrategy::Locked => "locked",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partial_reduce" | "partial-reduce" => Ok(MergeStrategy::PartialReduce),
            "locked" => Ok(MergeStrategy::Locked),
            other => Err(format!(
                "unknown merge strategy '{}' (expected partial_reduce or locked)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_url: String,
    pub polygons_num: usize,
    pub timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pool_size: usize,
    pub merge_strategy: MergeStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            polygons_num: 3,
            timeout_secs: 60,
            request_timeout_secs: 10,
            pool_size: 10,
            merge_strategy: MergeStrategy::PartialReduce,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Overall run deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.polygons_num, 3);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.merge_strategy, MergeStrategy::PartialReduce);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "polygons_num: 25\nmerge_strategy: locked\ntimeout_secs: 5").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();

        assert_eq!(config.polygons_num, 25);
        assert_eq!(config.merge_strategy, MergeStrategy::Locked);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.pool_size, 10);
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pool_size: 0").unwrap();

        match PipelineConfig::from_file(file.path()) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("pool_size")),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file("/nonexistent/polystats.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_merge_strategy_parse() {
        assert_eq!("locked".parse::<MergeStrategy>().unwrap(), MergeStrategy::Locked);
        assert_eq!(
            "partial-reduce".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::PartialReduce
        );
        assert!("fastest".parse::<MergeStrategy>().is_err());
        assert_eq!(MergeStrategy::Locked.to_string(), "locked");
    }
}
