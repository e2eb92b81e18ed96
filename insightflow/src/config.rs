//! Configuration for the analysis pipeline.
//!
//! Values come from an optional TOML file, then environment overrides, then
//! whatever the caller (usually the CLI) sets on top.

use crate::errors::ConfigError;
use crate::pipeline::FailureMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const ENV_PREFIX: &str = "INSIGHTFLOW_";

/// Settings of one analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory receiving the report, plots and model outputs.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Memory bank location. Defaults to `<report_dir>/memory_bank.json`.
    #[serde(default)]
    pub memory_file: Option<PathBuf>,
    /// Number of memory records kept.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    /// Worker limit for the parallel analysis stage.
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,
    /// Per-agent timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub agent_timeout_seconds: Option<f64>,
    /// What happens when the parallel analysis stage fails.
    #[serde(default)]
    pub analyze_failure_mode: FailureMode,
    /// Text generation model.
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Text generation API key. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Forecast horizon in days.
    #[serde(default = "default_forecast_steps")]
    pub forecast_steps: usize,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

const fn default_memory_capacity() -> usize {
    crate::memory::DEFAULT_CAPACITY
}

const fn default_parallel_workers() -> usize {
    3
}

fn default_model_name() -> String {
    "gemini-2.5-flash".to_string()
}

const fn default_forecast_steps() -> usize {
    crate::collaborators::DEFAULT_FORECAST_STEPS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            memory_file: None,
            memory_capacity: default_memory_capacity(),
            parallel_workers: default_parallel_workers(),
            agent_timeout_seconds: None,
            analyze_failure_mode: FailureMode::default(),
            model_name: default_model_name(),
            api_key: None,
            forecast_steps: default_forecast_steps(),
        }
    }
}

impl PipelineConfig {
    /// Loads the configuration: the TOML file if given, then the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value is
    /// out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides read through `lookup`.
    ///
    /// Recognized keys are `GEMINI_API_KEY` and `INSIGHTFLOW_REPORT_DIR`,
    /// `INSIGHTFLOW_MEMORY_FILE`, `INSIGHTFLOW_MEMORY_CAPACITY`,
    /// `INSIGHTFLOW_PARALLEL_WORKERS`, `INSIGHTFLOW_AGENT_TIMEOUT_SECONDS`,
    /// `INSIGHTFLOW_MODEL_NAME`, `INSIGHTFLOW_FORECAST_STEPS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(dir) = var("REPORT_DIR") {
            self.report_dir = PathBuf::from(dir);
        }
        if let Some(file) = var("MEMORY_FILE") {
            self.memory_file = Some(PathBuf::from(file));
        }
        if let Some(model) = var("MODEL_NAME") {
            self.model_name = model;
        }
        if let Some(value) = var("MEMORY_CAPACITY") {
            self.memory_capacity = parse_env("memory_capacity", &value)?;
        }
        if let Some(value) = var("PARALLEL_WORKERS") {
            self.parallel_workers = parse_env("parallel_workers", &value)?;
        }
        if let Some(value) = var("AGENT_TIMEOUT_SECONDS") {
            self.agent_timeout_seconds = Some(parse_env("agent_timeout_seconds", &value)?);
        }
        if let Some(value) = var("FORECAST_STEPS") {
            self.forecast_steps = parse_env("forecast_steps", &value)?;
        }
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| {
            Err(ConfigError::Invalid {
                field: field.to_string(),
                message: message.to_string(),
            })
        };
        if self.memory_capacity == 0 {
            return invalid("memory_capacity", "must be at least 1");
        }
        if self.parallel_workers == 0 {
            return invalid("parallel_workers", "must be at least 1");
        }
        if self.forecast_steps == 0 {
            return invalid("forecast_steps", "must be at least 1");
        }
        if let Some(timeout) = self.agent_timeout_seconds {
            if !timeout.is_finite() || timeout <= 0.0 {
                return invalid("agent_timeout_seconds", "must be a positive number of seconds");
            }
        }
        if self.model_name.trim().is_empty() {
            return invalid("model_name", "must not be empty");
        }
        Ok(())
    }

    /// Returns the memory bank path.
    #[must_use]
    pub fn memory_path(&self) -> PathBuf {
        self.memory_file
            .clone()
            .unwrap_or_else(|| self.report_dir.join("memory_bank.json"))
    }

    /// Returns the per-agent timeout.
    #[must_use]
    pub fn agent_timeout(&self) -> Option<Duration> {
        self.agent_timeout_seconds.map(Duration::from_secs_f64)
    }

    /// Returns the directory for chart data.
    #[must_use]
    pub fn plots_dir(&self) -> PathBuf {
        self.report_dir.join("plots")
    }

    /// Returns the directory for model outputs.
    #[must_use]
    pub fn ml_dir(&self) -> PathBuf {
        self.report_dir.join("ml")
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        field: field.to_string(),
        message: format!("cannot parse '{value}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.report_dir, PathBuf::from("reports"));
        assert_eq!(config.memory_path(), PathBuf::from("reports/memory_bank.json"));
        assert_eq!(config.memory_capacity, 10);
        assert_eq!(config.parallel_workers, 3);
        assert_eq!(config.forecast_steps, 14);
        assert_eq!(config.model_name, "gemini-2.5-flash");
        assert_eq!(config.analyze_failure_mode, FailureMode::Abort);
        assert!(config.agent_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_with_partial_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("insightflow.toml");
        std::fs::write(
            &path,
            "report_dir = \"out\"\nparallel_workers = 2\nagent_timeout_seconds = 1.5\nanalyze_failure_mode = \"continue\"\n",
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.report_dir, PathBuf::from("out"));
        assert_eq!(config.memory_path(), PathBuf::from("out/memory_bank.json"));
        assert_eq!(config.parallel_workers, 2);
        assert_eq!(config.agent_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.analyze_failure_mode, FailureMode::Continue);
        assert_eq!(config.memory_capacity, 10);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "parallel_workers = \"many\"").unwrap();
        assert!(matches!(PipelineConfig::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load(Some(Path::new("/nonexistent/insightflow.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::default()
            .with_env(env(&[
                ("GEMINI_API_KEY", "secret"),
                ("INSIGHTFLOW_REPORT_DIR", "/tmp/reports"),
                ("INSIGHTFLOW_PARALLEL_WORKERS", "5"),
                ("INSIGHTFLOW_MODEL_NAME", ""),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.parallel_workers, 5);
        assert_eq!(config.model_name, "gemini-2.5-flash");
    }

    #[test]
    fn test_bad_env_value() {
        let err = PipelineConfig::default()
            .with_env(env(&[("INSIGHTFLOW_MEMORY_CAPACITY", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("memory_capacity"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = PipelineConfig {
            parallel_workers: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "parallel_workers"));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = PipelineConfig {
            api_key: Some("secret".into()),
            ..PipelineConfig::default()
        };
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("secret"));
    }
}
