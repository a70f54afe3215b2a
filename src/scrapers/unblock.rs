//! Unblocking-proxy tier: hands the URL to a third-party scraping API.
//!
//! The provider is reached with a single GET of the form
//! `{endpoint}?{api_key_param}={key}&{url_param}={target}&{params...}` and
//! answers with the target page body.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::block_detector::BlockDetector;
use super::controller::{FetchStrategy, StrategyKind, TierError, TierResponse};
use super::http_client::{apply_identity, read_body, tier_error, Identity, DEFAULT_MAX_BODY_BYTES};
use crate::utils::{looks_like_html, strip_html};

/// Unblocking proxy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnblockConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key. The tier is not installed without one.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_param")]
    pub api_key_param: String,

    #[serde(default = "default_url_param")]
    pub url_param: String,

    /// Extra provider parameters (JS rendering, premium proxies, ...).
    #[serde(default = "default_params")]
    pub params: BTreeMap<String, String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Forward the identity's headers to the provider.
    #[serde(default)]
    pub forward_headers: bool,
}

fn default_endpoint() -> String {
    "https://app.scrapingbee.com/api/v1/".to_string()
}

fn default_api_key_param() -> String {
    "api_key".to_string()
}

fn default_url_param() -> String {
    "url".to_string()
}

fn default_params() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("render_js".to_string(), "true".to_string()),
        ("premium_proxy".to_string(), "true".to_string()),
    ])
}

fn default_timeout() -> u64 {
    45
}

impl Default for UnblockConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            api_key_param: default_api_key_param(),
            url_param: default_url_param(),
            params: default_params(),
            timeout_secs: default_timeout(),
            forward_headers: false,
        }
    }
}

impl UnblockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Key to use, if the tier should be installed.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Provider request URL for `target`.
    pub fn request_url(&self, api_key: &str, target: &str) -> Result<url::Url, url::ParseError> {
        let mut pairs: Vec<(&str, &str)> = vec![
            (self.api_key_param.as_str(), api_key),
            (self.url_param.as_str(), target),
        ];
        pairs.extend(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        url::Url::parse_with_params(&self.endpoint, pairs)
    }
}

/// Client for the unblocking proxy.
pub struct UnblockClient {
    client: Client,
    config: UnblockConfig,
    api_key: String,
    max_body_bytes: usize,
}

impl UnblockClient {
    /// Build the client; `None` when no API key is configured.
    pub fn from_config(config: &UnblockConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(api_key) = config.usable_api_key() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Some(Self {
            client,
            api_key: api_key.to_string(),
            config: config.clone(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }))
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

#[async_trait]
impl FetchStrategy for UnblockClient {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UnblockingProxy
    }

    fn deadline(&self) -> Duration {
        self.config.timeout() + Duration::from_secs(5)
    }

    async fn retrieve(
        &self,
        url: &str,
        identity: &Identity,
        _detector: &BlockDetector,
    ) -> Result<TierResponse, TierError> {
        let request_url = self
            .config
            .request_url(&self.api_key, url)
            .map_err(|e| TierError::Unavailable(format!("bad unblock endpoint: {}", e)))?;

        let mut request = self.client.get(request_url);
        if self.config.forward_headers {
            request = apply_identity(request, identity);
        }

        let response = request.send().await.map_err(tier_error)?;
        let status = response.status();
        debug!("Unblock proxy answered {} for {}", status, url);
        if !status.is_success() {
            return Err(TierError::Status(status.as_u16()));
        }

        let body = read_body(response, self.max_body_bytes)
            .await
            .map_err(tier_error)?;
        let text = if looks_like_html(&body) {
            strip_html(&body)
        } else {
            body
        };

        Ok(TierResponse {
            text,
            status: Some(status.as_u16()),
        })
    }
}
