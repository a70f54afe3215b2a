//! Fetch controller escalation through the public API, with scripted tiers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recipe_acquire::scrapers::{
    BlockDetector, FetchController, FetchErrorKind, FetchStrategy, Identity, IdentityPools,
    StrategyKind, TierError, TierResponse,
};

const RECIPE_TEXT: &str = "Shakshuka. Warm olive oil in a wide pan, soften the onion and \
    peppers, add garlic, cumin and paprika, pour in the crushed tomatoes and simmer for ten \
    minutes. Make wells, crack in the eggs, cover and cook until the whites set.";

const CHALLENGE: &str = "Just a moment... Checking your browser before accessing the site.";

type Calls = Arc<Mutex<Vec<(StrategyKind, String)>>>;

struct Tier {
    kind: StrategyKind,
    reply: Result<&'static str, TierError>,
    calls: Calls,
}

#[async_trait]
impl FetchStrategy for Tier {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn retrieve(
        &self,
        _url: &str,
        identity: &Identity,
        _detector: &BlockDetector,
    ) -> Result<TierResponse, TierError> {
        self.calls
            .lock()
            .unwrap()
            .push((self.kind, identity.user_agent.clone()));
        self.reply.clone().map(|text| TierResponse {
            text: text.to_string(),
            status: Some(200),
        })
    }
}

fn build(tiers: Vec<(StrategyKind, Result<&'static str, TierError>)>) -> (FetchController, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let mut controller = FetchController::new(BlockDetector::default(), IdentityPools::default());
    // Added in reverse to show the controller orders tiers itself.
    for (kind, reply) in tiers.into_iter().rev() {
        controller = controller.with_strategy(Tier {
            kind,
            reply,
            calls: calls.clone(),
        });
    }
    (controller, calls)
}

fn kinds(calls: &Calls) -> Vec<StrategyKind> {
    calls.lock().unwrap().iter().map(|(k, _)| *k).collect()
}

#[tokio::test]
async fn blocked_direct_result_tries_browser_before_proxy() {
    let (controller, calls) = build(vec![
        (StrategyKind::Direct, Ok(CHALLENGE)),
        (StrategyKind::HeadlessBrowser, Ok(CHALLENGE)),
        (StrategyKind::UnblockingProxy, Ok(RECIPE_TEXT)),
    ]);

    let trace = controller.fetch_traced("https://recipes.example/shakshuka").await;
    assert_eq!(
        kinds(&calls),
        [
            StrategyKind::Direct,
            StrategyKind::HeadlessBrowser,
            StrategyKind::UnblockingProxy
        ]
    );
    assert_eq!(trace.strategies(), kinds(&calls));

    let page = trace.result.unwrap();
    assert_eq!(page.strategy, StrategyKind::UnblockingProxy);
    assert_eq!(page.text, RECIPE_TEXT);

    let first = &trace.attempts[0].outcome;
    assert!(first.verdict.unwrap().is_blocked);
    assert!(!trace.attempts[0].headers_used.is_empty());
}

#[tokio::test]
async fn successful_browser_skips_proxy() {
    let (controller, calls) = build(vec![
        (StrategyKind::Direct, Err(TierError::Status(403))),
        (StrategyKind::HeadlessBrowser, Ok(RECIPE_TEXT)),
        (StrategyKind::UnblockingProxy, Ok(RECIPE_TEXT)),
    ]);

    let text = controller.fetch("https://recipes.example/x").await.unwrap();
    assert_eq!(text, RECIPE_TEXT);
    assert_eq!(kinds(&calls), [StrategyKind::Direct, StrategyKind::HeadlessBrowser]);
}

#[tokio::test]
async fn not_found_is_terminal() {
    let (controller, calls) = build(vec![
        (StrategyKind::Direct, Err(TierError::Status(404))),
        (StrategyKind::HeadlessBrowser, Ok(RECIPE_TEXT)),
    ]);

    let err = controller.fetch("https://recipes.example/gone").await.unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::NetworkFailure);
    assert_eq!(err.status, Some(404));
    assert_eq!(kinds(&calls), [StrategyKind::Direct]);
}

#[tokio::test]
async fn exhausted_tiers_report_upstream_blocked() {
    let (controller, calls) = build(vec![
        (StrategyKind::Direct, Ok("")),
        (StrategyKind::HeadlessBrowser, Err(TierError::Network("crashed".into()))),
        (StrategyKind::UnblockingProxy, Ok(CHALLENGE)),
    ]);

    let err = controller.fetch("https://recipes.example/walled").await.unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::UpstreamBlocked);
    assert_eq!(err.url, "https://recipes.example/walled");
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn all_timeouts_report_timeout() {
    let (controller, _) = build(vec![
        (StrategyKind::Direct, Err(TierError::Timeout)),
        (StrategyKind::HeadlessBrowser, Err(TierError::Timeout)),
    ]);

    let err = controller.fetch("https://slow.example").await.unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::Timeout);
}

#[tokio::test]
async fn output_is_capped() {
    let long: &'static str = Box::leak(RECIPE_TEXT.repeat(10).into_boxed_str());
    let (controller, _) = build(vec![(StrategyKind::Direct, Ok(long))]);
    let controller = controller.with_max_content_bytes(300);

    let text = controller.fetch("https://recipes.example/long").await.unwrap();
    assert!(text.len() <= 300);
    assert!(long.starts_with(&text));
}
