use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::oracle::SearchLocale;
use crate::pipeline::PipelineSettings;
use crate::rate_limit::RateLimitSettings;

pub const DEFAULT_PERSPECTIVES: [&str; 3] = ["common.json", "leftist.json", "rightist.json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub links_per_text: usize,
    pub safe: String,
    pub language: String,
    pub country: String,
    /// Overrides the search API endpoint.
    pub endpoint: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let locale = SearchLocale::default();
        Self {
            links_per_text: 10,
            safe: locale.safe,
            language: locale.language,
            country: locale.country,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds.
    pub delay_between_requests: f64,
    pub max_retries: u32,
    pub oracle_attempts: u32,
    pub requests_per_minute: u32,
    pub rate_limit_enabled: bool,
    pub wait_on_rate_limit: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay_between_requests: 1.0,
            max_retries: 3,
            oracle_attempts: 3,
            requests_per_minute: 10,
            rate_limit_enabled: false,
            wait_on_rate_limit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Used when `LLM_MODEL` is not set.
    pub model: String,
    pub temperature: f32,
    pub relevance_threshold: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.1,
            relevance_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub save_results: bool,
    pub output_folder: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_results: true,
            output_folder: PathBuf::from("output"),
        }
    }
}

/// Run configuration, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub search: SearchConfig,
    pub rate_limiting: RateLimitConfig,
    pub llm: LlmConfig,
    pub output: OutputConfig,
    pub data_folder: Option<PathBuf>,
    pub perspectives: Option<Vec<String>>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = read_json(path)?;
        config.validate()?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.llm.relevance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::invalid(
                "llm.relevance_threshold",
                format!("{} is outside 0.0..=1.0", threshold),
            ));
        }
        if !self.llm.temperature.is_finite() || self.llm.temperature < 0.0 {
            return Err(ConfigError::invalid(
                "llm.temperature",
                "must be a non-negative number",
            ));
        }
        if self.search.links_per_text == 0 {
            return Err(ConfigError::invalid("search.links_per_text", "must be at least 1"));
        }

        let rl = &self.rate_limiting;
        if !rl.delay_between_requests.is_finite() || rl.delay_between_requests < 0.0 {
            return Err(ConfigError::invalid(
                "rate_limiting.delay_between_requests",
                "must be a non-negative number of seconds",
            ));
        }
        if rl.max_retries == 0 {
            return Err(ConfigError::invalid("rate_limiting.max_retries", "must be at least 1"));
        }
        if rl.oracle_attempts == 0 {
            return Err(ConfigError::invalid(
                "rate_limiting.oracle_attempts",
                "must be at least 1",
            ));
        }
        if rl.requests_per_minute == 0 {
            return Err(ConfigError::invalid(
                "rate_limiting.requests_per_minute",
                "must be at least 1",
            ));
        }
        if matches!(&self.perspectives, Some(p) if p.is_empty()) {
            return Err(ConfigError::invalid("perspectives", "list is empty"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limiting.delay_between_requests)
    }

    pub fn data_folder(&self) -> PathBuf {
        self.data_folder
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn perspective_files(&self) -> Vec<String> {
        match &self.perspectives {
            Some(files) => files.clone(),
            None => DEFAULT_PERSPECTIVES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn locale(&self) -> SearchLocale {
        SearchLocale {
            language: self.search.language.clone(),
            country: self.search.country.clone(),
            safe: self.search.safe.clone(),
        }
    }

    pub fn rate_limit(&self) -> RateLimitSettings {
        RateLimitSettings {
            enabled: self.rate_limiting.rate_limit_enabled,
            requests_per_minute: self.rate_limiting.requests_per_minute,
            wait_on_limit: self.rate_limiting.wait_on_rate_limit,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            links_per_text: self.search.links_per_text,
            relevance_threshold: self.llm.relevance_threshold,
            delay_between_requests: self.delay(),
            max_retries: self.rate_limiting.max_retries,
            oracle_attempts: self.rate_limiting.oracle_attempts,
            locale: self.locale(),
        }
    }
}

/// Search API credentials, from the environment (or `.env`).
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

impl SearchCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require_env("SEARCH_API_KEY")?,
            engine_id: require_env("SEARCH_ENGINE_ID")?,
        })
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    dotenv::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
