//! Headless browser tier for anti-bot protected sites.
//!
//! Uses chromiumoxide (CDP) with stealth evasion techniques to get past
//! bot detection systems like Akamai, Cloudflare, etc. Each fetch runs in its
//! own browser process; a semaphore caps how many run at once.

mod config;
mod extract;
#[cfg(feature = "browser")]
mod fetch;
mod stealth;
mod types;

pub use config::BrowserEngineConfig;
pub use extract::best_content_text;
pub use stealth::stealth_scripts;
pub use types::WaitState;

#[cfg(feature = "browser")]
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
#[cfg(feature = "browser")]
use tokio::sync::Semaphore;

use super::block_detector::BlockDetector;
use super::controller::{FetchStrategy, StrategyKind, TierError, TierResponse};
use super::http_client::Identity;

/// The browser tier cannot run here (no Chrome, launch failed, not compiled in).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BrowserUnavailable(pub String);

/// Every navigation attempt ran out of time.
#[derive(Debug, Error)]
#[error("navigation timed out after {0} attempts")]
pub struct NavigationTimedOut(pub u32);

/// Browser-based fetcher with stealth capabilities.
pub struct BrowserFetcher {
    pub(crate) config: BrowserEngineConfig,
    #[cfg(feature = "browser")]
    permits: Arc<Semaphore>,
}

impl BrowserFetcher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            #[cfg(feature = "browser")]
            permits: Arc::new(Semaphore::new(config.max_contexts.max(1))),
            config,
        }
    }

    pub fn config(&self) -> &BrowserEngineConfig {
        &self.config
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub async fn fetch(
        &self,
        _url: &str,
        _identity: &Identity,
        _detector: &BlockDetector,
    ) -> anyhow::Result<String> {
        Err(BrowserUnavailable(
            "Browser support not compiled. Rebuild with: cargo build --features browser".to_string(),
        )
        .into())
    }
}

fn tier_error(err: anyhow::Error) -> TierError {
    if err.downcast_ref::<NavigationTimedOut>().is_some() {
        TierError::Timeout
    } else if let Some(unavailable) = err.downcast_ref::<BrowserUnavailable>() {
        TierError::Unavailable(unavailable.0.clone())
    } else {
        TierError::Network(format!("{:#}", err))
    }
}

#[async_trait]
impl FetchStrategy for BrowserFetcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadlessBrowser
    }

    fn deadline(&self) -> Duration {
        self.config.deadline()
    }

    async fn retrieve(
        &self,
        url: &str,
        identity: &Identity,
        detector: &BlockDetector,
    ) -> Result<TierResponse, TierError> {
        self.fetch(url, identity, detector)
            .await
            .map(|text| TierResponse { text, status: None })
            .map_err(tier_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_mapping() {
        let timed_out: anyhow::Error = NavigationTimedOut(3).into();
        assert_eq!(tier_error(timed_out), TierError::Timeout);

        let missing = Err::<(), _>(BrowserUnavailable("no chrome".into()))
            .context("launching")
            .unwrap_err();
        assert_eq!(tier_error(missing), TierError::Unavailable("no chrome".into()));

        let other = anyhow::anyhow!("socket closed");
        assert!(matches!(tier_error(other), TierError::Network(_)));
    }

    #[test]
    fn test_defaults() {
        let fetcher = BrowserFetcher::new(BrowserEngineConfig::default());
        assert_eq!(fetcher.kind(), StrategyKind::HeadlessBrowser);
        assert_eq!(fetcher.deadline(), Duration::from_secs(120));
        assert_eq!(fetcher.config().navigation_retries, 2);
        assert_eq!(fetcher.config().scroll_cycles, 3);
    }
}
