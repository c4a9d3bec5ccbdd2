//! Runner configuration.
//!
//! Precedence, lowest to highest: built-in defaults, the optional TOML file,
//! environment variables (a `.env` file is honored), then CLI flags applied
//! by `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::Variant;
use crate::error::ConfigError;
use crate::llm::{DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT};

/// Default ceiling for one batch invocation.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Top-level runner configuration, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Ollama base URL. Default: "http://localhost:11434".
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Per-request timeout. Default: "600s".
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,

    /// Directory holding the questionnaire JSON files. Default: "./tests".
    #[serde(default = "default_tests_dir")]
    pub tests_dir: PathBuf,

    /// Where reports are written. Default: "./results".
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Where batch logs are written. Default: "./logs".
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Ceiling for one model/variant invocation in a batch. Default: "2h".
    #[serde(
        default = "default_model_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub model_timeout: Duration,

    /// Models skipped by the batch runner.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Runner variants. The built-in `labeled` and `unlabeled` are used when empty.
    #[serde(default, rename = "variant")]
    pub variants: Vec<Variant>,
}

impl RunnerConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: RunnerConfig = toml::from_str(&content)?;
        if config.variants.is_empty() {
            config.variants = Variant::builtin();
        }
        config.validate()?;
        Ok(config)
    }

    /// Defaults only, for when no config file is given.
    pub fn minimal() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            request_timeout: default_request_timeout(),
            tests_dir: default_tests_dir(),
            results_dir: default_results_dir(),
            log_dir: default_log_dir(),
            model_timeout: default_model_timeout(),
            exclude: Vec::new(),
            variants: Variant::builtin(),
        }
    }

    /// Load the file if one is given, otherwise start from defaults, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::minimal(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `OLLAMA_BASE_URL`, `ENNEABENCH_TESTS_DIR`,
    /// `ENNEABENCH_RESULTS_DIR` and `ENNEABENCH_REQUEST_TIMEOUT_SECS`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = optional_env("OLLAMA_BASE_URL")? {
            self.ollama_url = url;
        }
        if let Some(dir) = optional_env("ENNEABENCH_TESTS_DIR")? {
            self.tests_dir = PathBuf::from(dir);
        }
        if let Some(dir) = optional_env("ENNEABENCH_RESULTS_DIR")? {
            self.results_dir = PathBuf::from(dir);
        }
        let secs = parse_optional_env(
            "ENNEABENCH_REQUEST_TIMEOUT_SECS",
            self.request_timeout.as_secs(),
        )?;
        self.request_timeout = Duration::from_secs(secs);
        self.validate()
    }

    /// Look up a variant by name (case-insensitive).
    pub fn variant(&self, name: &str) -> Result<&Variant, ConfigError> {
        self.variants
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "variant".to_string(),
                message: format!(
                    "unknown variant '{name}', expected one of: {}",
                    self.variant_names().join(", ")
                ),
            })
    }

    pub fn variant_names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.name.as_str()).collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ollama_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "ollama_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        for variant in &self.variants {
            variant.validate()?;
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if self.variants[..i]
                .iter()
                .any(|v| v.name.eq_ignore_ascii_case(&variant.name))
            {
                return Err(ConfigError::InvalidValue {
                    key: "variant".to_string(),
                    message: format!("duplicate variant name '{}'", variant.name),
                });
            }
        }
        Ok(())
    }
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("./tests")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_model_timeout() -> Duration {
    DEFAULT_MODEL_TIMEOUT
}

/// Deserialize a duration from a string like "300s", "5m", "2h".
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        secs.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("invalid seconds: {e}"))
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .map(|m| Duration::from_secs(m * 60))
            .map_err(|e| format!("invalid minutes: {e}"))
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .map(|h| Duration::from_secs(h * 60 * 60))
            .map_err(|e| format!("invalid hours: {e}"))
    } else {
        // Assume seconds if no suffix
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("invalid duration '{s}': {e}"))
    }
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
