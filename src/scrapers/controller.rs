//! Escalating fetch controller.
//!
//! Strategies run strictly in order: direct HTTP, headless browser,
//! unblocking proxy. The first result the [`BlockDetector`] accepts wins; a
//! tier is never revisited once the controller has moved past it.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::block_detector::{BlockDetector, BlockVerdict};
use super::http_client::{Identity, IdentityPools};
use crate::utils::truncate_to_bytes;

/// Statuses that mean "the site is refusing us", not "the page is gone".
pub const DEFAULT_ESCALATION_STATUSES: &[u16] = &[401, 403, 406, 429, 451, 503];

/// Default cap on text handed downstream.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 50_000;

/// Fetch tiers, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    HeadlessBrowser,
    UnblockingProxy,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::HeadlessBrowser => "headless_browser",
            Self::UnblockingProxy => "unblocking_proxy",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text a strategy managed to retrieve.
#[derive(Debug, Clone)]
pub struct TierResponse {
    /// Readable text (HTML already stripped).
    pub text: String,
    pub status: Option<u16>,
}

/// Why a strategy produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("strategy unavailable: {0}")]
    Unavailable(String),
}

/// One retrieval tier.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Upper bound on one `retrieve` call, enforced by the controller.
    fn deadline(&self) -> Duration;

    /// Retrieve readable text for `url` presenting `identity`.
    ///
    /// The detector is available for strategies with an in-tier fallback.
    async fn retrieve(
        &self,
        url: &str,
        identity: &Identity,
        detector: &BlockDetector,
    ) -> Result<TierResponse, TierError>;
}

/// How one attempt ended.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    #[serde(skip)]
    pub text: Option<String>,
    pub text_bytes: usize,
    pub http_status: Option<u16>,
    pub verdict: Option<BlockVerdict>,
    pub error: Option<String>,
    /// The tier failed with [`TierError::Timeout`].
    pub timed_out: bool,
}

/// Record of one strategy invocation.
#[derive(Debug, Clone, Serialize)]
pub struct FetchAttempt {
    pub strategy: StrategyKind,
    pub url: String,
    pub headers_used: Vec<(String, String)>,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Terminal fetch failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Every tier was blocked or failed: caller must supply content another way.
    UpstreamBlocked,
    NetworkFailure,
    Timeout,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpstreamBlocked => "upstream_blocked",
            Self::NetworkFailure => "network_failure",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch failed for good.
#[derive(Debug, Clone, Error)]
#[error("fetch failed ({kind}) for {url}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    /// Last HTTP status seen, if any.
    pub status: Option<u16>,
}

/// Successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub text: String,
    pub strategy: StrategyKind,
}

/// Everything one `fetch` did.
#[derive(Debug)]
pub struct FetchTrace {
    pub attempts: Vec<FetchAttempt>,
    pub result: Result<FetchedPage, FetchError>,
}

impl FetchTrace {
    /// Strategies invoked, in order.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.attempts.iter().map(|a| a.strategy).collect()
    }
}

/// Escalation state machine over an ordered set of strategies.
pub struct FetchController {
    strategies: Vec<Box<dyn FetchStrategy>>,
    detector: BlockDetector,
    identities: IdentityPools,
    max_content_bytes: usize,
    escalation_statuses: Vec<u16>,
}

impl FetchController {
    pub fn new(detector: BlockDetector, identities: IdentityPools) -> Self {
        Self {
            strategies: Vec::new(),
            detector,
            identities,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            escalation_statuses: DEFAULT_ESCALATION_STATUSES.to_vec(),
        }
    }

    /// Install a strategy. Strategies are kept in escalation order no
    /// matter the order they are added in.
    pub fn with_strategy(mut self, strategy: impl FetchStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self.strategies.sort_by_key(|s| s.kind());
        self
    }

    pub fn with_max_content_bytes(mut self, max: usize) -> Self {
        self.max_content_bytes = max;
        self
    }

    pub fn with_escalation_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.escalation_statuses = statuses;
        self
    }

    /// Installed tiers, in order.
    pub fn tiers(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn detector(&self) -> &BlockDetector {
        &self.detector
    }

    /// Fetch readable text for `url`.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_traced(url).await.result.map(|page| page.text)
    }

    /// Fetch and report every attempt made.
    pub async fn fetch_traced(&self, url: &str) -> FetchTrace {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut saw_block = false;
        let mut last_status = None;

        for strategy in &self.strategies {
            let kind = strategy.kind();
            let identity = self.identities.next_identity();
            debug!("Trying {} for {} as {}", kind, url, identity.user_agent);

            let start = Instant::now();
            let result = match tokio::time::timeout(
                strategy.deadline(),
                strategy.retrieve(url, &identity, &self.detector),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(TierError::Timeout),
            };
            let elapsed = start.elapsed();

            match result {
                Ok(response) => {
                    let text = truncate_to_bytes(&response.text, self.max_content_bytes).to_string();
                    let verdict = self.detector.classify(&text);
                    if response.status.is_some() {
                        last_status = response.status;
                    }
                    attempts.push(FetchAttempt {
                        strategy: kind,
                        url: url.to_string(),
                        headers_used: identity.headers(),
                        elapsed,
                        outcome: AttemptOutcome {
                            text_bytes: text.len(),
                            text: Some(text.clone()),
                            http_status: response.status,
                            verdict: Some(verdict),
                            error: None,
                            timed_out: false,
                        },
                    });

                    if !verdict.is_blocked {
                        info!("Fetched {} via {} ({} bytes)", url, kind, text.len());
                        return FetchTrace {
                            attempts,
                            result: Ok(FetchedPage {
                                text,
                                strategy: kind,
                            }),
                        };
                    }

                    saw_block = true;
                    warn!(
                        "{} result for {} looks blocked ({:?}), escalating",
                        kind, url, verdict.reason
                    );
                }
                Err(err) => {
                    attempts.push(FetchAttempt {
                        strategy: kind,
                        url: url.to_string(),
                        headers_used: identity.headers(),
                        elapsed,
                        outcome: AttemptOutcome {
                            text: None,
                            text_bytes: 0,
                            http_status: match err {
                                TierError::Status(s) => Some(s),
                                _ => None,
                            },
                            verdict: None,
                            error: Some(err.to_string()),
                            timed_out: err == TierError::Timeout,
                        },
                    });

                    if let TierError::Status(status) = err {
                        last_status = Some(status);
                        if self.escalation_statuses.contains(&status) {
                            saw_block = true;
                        } else if kind == StrategyKind::Direct {
                            // A missing or broken page won't render any better in a browser.
                            warn!("{} returned HTTP {} for {}, not escalating", kind, status, url);
                            return FetchTrace {
                                attempts,
                                result: Err(FetchError {
                                    kind: FetchErrorKind::NetworkFailure,
                                    url: url.to_string(),
                                    status: Some(status),
                                }),
                            };
                        }
                    }
                    warn!("{} failed for {}: {}, escalating", kind, url, err);
                }
            }
        }

        let all_timeouts = !attempts.is_empty()
            && attempts
                .iter()
                .all(|a| a.outcome.timed_out);
        let kind = if attempts.is_empty() {
            FetchErrorKind::NetworkFailure
        } else if all_timeouts && !saw_block {
            FetchErrorKind::Timeout
        } else {
            FetchErrorKind::UpstreamBlocked
        };

        warn!("All fetch tiers exhausted for {} ({})", url, kind);
        FetchTrace {
            attempts,
            result: Err(FetchError {
                kind,
                url: url.to_string(),
                status: last_status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const CONTENT: &str = "Preheat the oven to 180C. Cream butter and sugar, beat in the eggs one \
        at a time, then fold in the flour and bake for forty minutes until golden and springy.";

    #[derive(Clone)]
    enum Script {
        Text(&'static str),
        Fail(TierError),
        Hang,
    }

    struct Scripted {
        kind: StrategyKind,
        script: Script,
        calls: Arc<Mutex<Vec<StrategyKind>>>,
    }

    #[async_trait]
    impl FetchStrategy for Scripted {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn deadline(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn retrieve(
            &self,
            _url: &str,
            _identity: &Identity,
            _detector: &BlockDetector,
        ) -> Result<TierResponse, TierError> {
            self.calls.lock().unwrap().push(self.kind);
            match &self.script {
                Script::Text(t) => Ok(TierResponse {
                    text: t.to_string(),
                    status: Some(200),
                }),
                Script::Fail(e) => Err(e.clone()),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err(TierError::Network("unreachable".into()))
                }
            }
        }
    }

    fn controller(scripts: &[(StrategyKind, Script)]) -> (FetchController, Arc<Mutex<Vec<StrategyKind>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut c = FetchController::new(BlockDetector::default(), IdentityPools::default());
        for (kind, script) in scripts {
            c = c.with_strategy(Scripted {
                kind: *kind,
                script: script.clone(),
                calls: calls.clone(),
            });
        }
        (c, calls)
    }

    #[tokio::test]
    async fn test_direct_success_stops_escalation() {
        let (c, calls) = controller(&[
            (StrategyKind::Direct, Script::Text(CONTENT)),
            (StrategyKind::HeadlessBrowser, Script::Text(CONTENT)),
        ]);
        let trace = c.fetch_traced("https://example.com/r").await;
        assert_eq!(trace.result.unwrap().strategy, StrategyKind::Direct);
        assert_eq!(*calls.lock().unwrap(), vec![StrategyKind::Direct]);
    }

    #[tokio::test]
    async fn test_blocked_direct_goes_to_browser_before_proxy() {
        // Added out of order on purpose.
        let (c, calls) = controller(&[
            (StrategyKind::UnblockingProxy, Script::Text(CONTENT)),
            (StrategyKind::HeadlessBrowser, Script::Text("Access Denied")),
            (StrategyKind::Direct, Script::Text("Checking your browser before accessing")),
        ]);
        let trace = c.fetch_traced("https://example.com/r").await;
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                StrategyKind::Direct,
                StrategyKind::HeadlessBrowser,
                StrategyKind::UnblockingProxy
            ]
        );
        assert_eq!(trace.result.unwrap().strategy, StrategyKind::UnblockingProxy);
    }

    #[tokio::test]
    async fn test_escalation_status_escalates() {
        let (c, calls) = controller(&[
            (StrategyKind::Direct, Script::Fail(TierError::Status(403))),
            (StrategyKind::HeadlessBrowser, Script::Text(CONTENT)),
        ]);
        let text = c.fetch("https://example.com/r").await.unwrap();
        assert_eq!(text, CONTENT);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_terminal() {
        let (c, calls) = controller(&[
            (StrategyKind::Direct, Script::Fail(TierError::Status(404))),
            (StrategyKind::HeadlessBrowser, Script::Text(CONTENT)),
        ]);
        let err = c.fetch("https://example.com/gone").await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NetworkFailure);
        assert_eq!(err.status, Some(404));
        assert_eq!(*calls.lock().unwrap(), vec![StrategyKind::Direct]);
    }

    #[tokio::test]
    async fn test_exhaustion_is_upstream_blocked() {
        let (c, _) = controller(&[
            (StrategyKind::Direct, Script::Fail(TierError::Status(429))),
            (StrategyKind::HeadlessBrowser, Script::Fail(TierError::Unavailable("no chrome".into()))),
            (StrategyKind::UnblockingProxy, Script::Text("Access denied")),
        ]);
        let err = c.fetch("https://example.com/r").await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::UpstreamBlocked);
        assert_eq!(err.url, "https://example.com/r");
    }

    #[tokio::test]
    async fn test_deadline_enforced_and_all_timeouts_reported() {
        let (c, _) = controller(&[(StrategyKind::Direct, Script::Hang)]);
        let trace = c.fetch_traced("https://slow.example.com").await;
        assert_eq!(trace.result.unwrap_err().kind, FetchErrorKind::Timeout);
        assert_eq!(trace.attempts[0].outcome.error.as_deref(), Some("timed out"));
        assert!(trace.attempts[0].outcome.timed_out);
    }

    #[tokio::test]
    async fn test_network_error_worded_like_timeout_is_not_a_timeout() {
        let (c, _) = controller(&[
            (StrategyKind::Direct, Script::Fail(TierError::Network("timed out".into()))),
            (StrategyKind::HeadlessBrowser, Script::Fail(TierError::Timeout)),
        ]);
        let trace = c.fetch_traced("https://example.com/r").await;
        assert!(!trace.attempts[0].outcome.timed_out);
        assert!(trace.attempts[1].outcome.timed_out);
        assert_eq!(trace.result.unwrap_err().kind, FetchErrorKind::UpstreamBlocked);
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        static LONG: std::sync::LazyLock<&'static str> =
            std::sync::LazyLock::new(|| Box::leak(CONTENT.repeat(10).into_boxed_str()));
        let (c, _) = controller(&[(StrategyKind::Direct, Script::Text(*LONG))]);
        let c = c.with_max_content_bytes(300);
        let text = c.fetch("https://example.com/r").await.unwrap();
        assert!(text.len() <= 300);
    }

    #[tokio::test]
    async fn test_trace_records_headers_and_verdicts() {
        let (c, _) = controller(&[
            (StrategyKind::Direct, Script::Text("")),
            (StrategyKind::HeadlessBrowser, Script::Text(CONTENT)),
        ]);
        let trace = c.fetch_traced("https://example.com/r").await;
        assert_eq!(trace.strategies(), vec![StrategyKind::Direct, StrategyKind::HeadlessBrowser]);
        let first = &trace.attempts[0];
        assert!(first.outcome.verdict.unwrap().is_blocked);
        assert!(first.headers_used.iter().any(|(k, _)| k == "user-agent"));
    }
}
