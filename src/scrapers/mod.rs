//! Page retrieval: block detection, identities and the escalating fetch tiers.

pub mod block_detector;
pub mod browser;
pub mod controller;
pub mod http_client;
pub mod unblock;

pub use block_detector::{BlockDetector, BlockReason, BlockRules, BlockVerdict};
pub use browser::{BrowserEngineConfig, BrowserFetcher};
pub use controller::{
    FetchAttempt, FetchController, FetchError, FetchErrorKind, FetchStrategy, FetchTrace,
    FetchedPage, StrategyKind, TierError, TierResponse,
};
pub use http_client::{HttpClient, Identity, IdentityPools};
pub use unblock::{UnblockClient, UnblockConfig};

use tracing::debug;

use crate::config::Config;

impl FetchController {
    /// Controller with every tier the configuration allows.
    ///
    /// Direct is always installed, the browser unless disabled, and the
    /// unblocking proxy only when an API key is present.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut controller = FetchController::new(
            BlockDetector::new(config.block.clone()),
            config.identity.clone(),
        )
        .with_max_content_bytes(config.fetch.max_content_bytes)
        .with_escalation_statuses(config.fetch.escalation_statuses.clone())
        .with_strategy(
            HttpClient::new(config.fetch.direct_timeout())?
                .with_max_body_bytes(config.fetch.max_body_bytes),
        );

        if config.browser.enabled {
            controller = controller.with_strategy(BrowserFetcher::new(config.browser.clone()));
        } else {
            debug!("Browser tier disabled");
        }

        match UnblockClient::from_config(&config.unblock)? {
            Some(client) => {
                controller = controller
                    .with_strategy(client.with_max_body_bytes(config.fetch.max_body_bytes))
            }
            None => debug!("No unblock API key, proxy tier not installed"),
        }

        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_tiers() {
        let mut config = Config::default();
        let controller = FetchController::from_config(&config).unwrap();
        assert_eq!(
            controller.tiers(),
            vec![StrategyKind::Direct, StrategyKind::HeadlessBrowser]
        );

        config.browser.enabled = false;
        config.unblock.api_key = Some("key".to_string());
        let controller = FetchController::from_config(&config).unwrap();
        assert_eq!(
            controller.tiers(),
            vec![StrategyKind::Direct, StrategyKind::UnblockingProxy]
        );
    }
}
