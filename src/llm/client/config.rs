//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_RECIPE_PROMPT;

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }
}

/// Configuration for the LLM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether model calls are allowed at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// LLM provider (ollama or openai)
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key for OpenAI-compatible providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Ask the provider for JSON-only output
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Custom recipe prompt (uses {source} and {content} placeholders)
    #[serde(default)]
    pub recipe_prompt: Option<String>,
    /// Maximum bytes of page text to send to the model (cut at a char boundary)
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.1
}

fn default_json_mode() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_content_bytes() -> usize {
    12000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: LlmProvider::default(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            json_mode: default_json_mode(),
            timeout_secs: default_timeout_secs(),
            recipe_prompt: None,
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true" or "false"
    /// - `LLM_PROVIDER`: "ollama" (default), "openai", "groq", or "together"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key for OpenAI-compatible providers
    /// - `LLM_MODEL`: Model name
    /// - `LLM_MAX_CONTENT_BYTES`: Max page bytes to send
    ///
    /// An explicit `LLM_PROVIDER` picks the provider's default endpoint
    /// unless `LLM_ENDPOINT` is also set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overrides from any key lookup; `with_env_overrides` passes the process env.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = var("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        let explicit_endpoint = var("LLM_ENDPOINT");
        if let Some(provider_str) = var("LLM_PROVIDER") {
            if let Some(provider) = LlmProvider::parse(&provider_str) {
                self.provider = provider;
            }
            if explicit_endpoint.is_none() {
                match provider_str.to_lowercase().as_str() {
                    "groq" => self.endpoint = "https://api.groq.com/openai".to_string(),
                    "openai" => self.endpoint = "https://api.openai.com".to_string(),
                    "together" => self.endpoint = "https://api.together.xyz".to_string(),
                    _ => {}
                }
            }
        }
        if let Some(endpoint) = explicit_endpoint {
            self.endpoint = endpoint;
        }
        if let Some(key) = var("LLM_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = var("LLM_MODEL") {
            self.model = model;
        }
        if let Some(n) = var("LLM_MAX_CONTENT_BYTES").and_then(|v| v.parse().ok()) {
            self.max_content_bytes = n;
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Get the recipe prompt, using custom or default.
    pub fn get_recipe_prompt(&self) -> &str {
        self.recipe_prompt.as_deref().unwrap_or(DEFAULT_RECIPE_PROMPT)
    }
}
