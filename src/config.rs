//! Configuration loading using the prefer crate for discovery.
//!
//! Every section has full defaults, so an empty file (or no file at all)
//! is a valid configuration. Secrets usually come from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::NormalizeConfig;
use crate::llm::LlmConfig;
use crate::scrapers::controller::{DEFAULT_ESCALATION_STATUSES, DEFAULT_MAX_CONTENT_BYTES};
use crate::scrapers::http_client::{DEFAULT_DIRECT_TIMEOUT, DEFAULT_MAX_BODY_BYTES};
use crate::scrapers::{BlockRules, BrowserEngineConfig, IdentityPools, UnblockConfig};

/// Name used for config file discovery.
pub const APP_NAME: &str = "recipe-acquire";

const REDACTED: &str = "********";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} config {}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// Direct-tier and controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_direct_timeout_secs")]
    pub direct_timeout_secs: u64,
    /// Cap on returned page text, in bytes.
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
    /// Cap on a raw response body read off the wire, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Direct-tier HTTP statuses that escalate instead of failing.
    #[serde(default = "default_escalation_statuses")]
    pub escalation_statuses: Vec<u16>,
}

fn default_direct_timeout_secs() -> u64 {
    DEFAULT_DIRECT_TIMEOUT.as_secs()
}

fn default_max_content_bytes() -> usize {
    DEFAULT_MAX_CONTENT_BYTES
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_escalation_statuses() -> Vec<u16> {
    DEFAULT_ESCALATION_STATUSES.to_vec()
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            direct_timeout_secs: default_direct_timeout_secs(),
            max_content_bytes: default_max_content_bytes(),
            max_body_bytes: default_max_body_bytes(),
            escalation_statuses: default_escalation_statuses(),
        }
    }
}

impl FetchSettings {
    pub fn direct_timeout(&self) -> Duration {
        Duration::from_secs(self.direct_timeout_secs)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub unblock: UnblockConfig,
    #[serde(default)]
    pub identity: IdentityPools,
    #[serde(default)]
    pub block: BlockRules,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    ///
    /// Falls back to defaults (with env overrides) when no file is found or
    /// the discovered file cannot be parsed.
    pub async fn load() -> Self {
        match prefer::load(APP_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("{}", e);
                        Self::default_with_env()
                    }
                },
                None => Self::default_with_env(),
            },
            Err(_) => {
                debug!("No config file found, using defaults");
                Self::default_with_env()
            }
        }
    }

    /// Defaults with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML, and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        debug!("Loaded config from {}", path.display());
        Ok(config.with_env_overrides())
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_error("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_error("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_error("JSON", e.to_string())),
        }
    }

    /// Load from `--config` when given, otherwise discover.
    pub async fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_path(path).await,
            None => Ok(Self::load().await),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// - `UNBLOCK_API_KEY`, `UNBLOCK_ENDPOINT`: unblocking proxy
    /// - `CHROME_PATH`: browser executable
    /// - `LLM_*`: see [`LlmConfig::with_env_overrides`]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = var("UNBLOCK_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.unblock.api_key = Some(key);
        }
        if let Some(endpoint) = var("UNBLOCK_ENDPOINT") {
            self.unblock.endpoint = endpoint;
        }
        if let Some(path) = var("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        self.llm = self.llm.with_overrides(&var);
        self
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.unblock.api_key.is_some() {
            config.unblock.api_key = Some(REDACTED.to_string());
        }
        if config.llm.api_key.is_some() {
            config.llm.api_key = Some(REDACTED.to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{}", ext))
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fetch.direct_timeout_secs, 20);
        assert_eq!(config.fetch.max_content_bytes, 50_000);
        assert_eq!(config.fetch.escalation_statuses, [401, 403, 406, 429, 451, 503]);
        assert_eq!(config.browser.navigation_timeout_secs, 15);
        assert_eq!(config.unblock.timeout_secs, 45);
        assert_eq!(config.block.min_length, 160);
        assert_eq!(config.normalize.default_instruction_group, "Instructions");
    }

    #[tokio::test]
    async fn test_load_toml() {
        let file = write_config(
            "toml",
            r#"
[fetch]
direct_timeout_secs = 5

[browser]
enabled = false
max_contexts = 1

[block]
extra_phrases = ["please wait while we check"]

[normalize]
default_instruction_group = "הוראות הכנה"
"#,
        );
        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.fetch.direct_timeout(), Duration::from_secs(5));
        assert_eq!(config.fetch.max_content_bytes, 50_000);
        assert!(!config.browser.enabled);
        assert_eq!(config.browser.max_contexts, 1);
        assert_eq!(config.block.extra_phrases, ["please wait while we check"]);
        assert_eq!(config.normalize.default_instruction_group, "הוראות הכנה");
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let file = write_config("yaml", "unblock:\n  endpoint: https://proxy.example/api\n");
        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.unblock.endpoint, "https://proxy.example/api");

        let config = Config::parse(Path::new("c.json"), r#"{"llm": {"model": "qwen2.5:14b"}}"#).unwrap();
        assert_eq!(config.llm.model, "qwen2.5:14b");
        assert!(config.browser.enabled);
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let file = write_config("toml", "[fetch\n");
        let err = Config::load_from_path(file.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));

        let missing = Config::load_from_path(Path::new("/nonexistent/recipe.toml")).await;
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_overrides_and_redaction() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("UNBLOCK_API_KEY", "secret"),
            ("CHROME_PATH", "/opt/chrome"),
            ("LLM_API_KEY", "sk-test"),
        ]);
        let config = Config::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.unblock.api_key.as_deref(), Some("secret"));
        assert_eq!(config.browser.chrome_path, Some(PathBuf::from("/opt/chrome")));

        let shown = config.redacted();
        assert_eq!(shown.unblock.api_key.as_deref(), Some(REDACTED));
        assert_eq!(shown.llm.api_key.as_deref(), Some(REDACTED));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }
}
