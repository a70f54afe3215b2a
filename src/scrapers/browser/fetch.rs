//! Browser session lifecycle and the page workflow.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, Headers, ResourceType, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::extract::best_content_text;
use super::stealth::stealth_scripts;
use super::types::{PageProbe, WaitState, CONTENT_SELECTORS, PROBE_SCRIPT, SCROLL_SCRIPT};
use super::{BrowserEngineConfig, BrowserFetcher, BrowserUnavailable, NavigationTimedOut};
use crate::scrapers::block_detector::BlockDetector;
use crate::scrapers::http_client::Identity;
use crate::utils::{looks_like_html, strip_html};

const PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Sub-resources that never carry recipe text.
const BLOCKED_RESOURCE_TYPES: &[ResourceType] = &[
    ResourceType::Image,
    ResourceType::Media,
    ResourceType::Font,
    ResourceType::Stylesheet,
];

/// Chrome args that hide the most obvious automation tells.
const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--disable-extensions",
    "--metrics-recording-only",
    "--safebrowsing-disable-auto-update",
    "--no-sandbox", // Often needed for headless in containers/restricted environments
    "--disable-gpu",
    "--disable-software-rasterizer",
];

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// Find a Chrome executable.
fn find_chrome(config: &BrowserEngineConfig) -> Result<PathBuf> {
    if let Some(ref path) = config.chrome_path {
        if path.exists() {
            return Ok(path.clone());
        }
        warn!("Configured Chrome path {} does not exist", path.display());
    }

    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            debug!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    // Check if in PATH via `which`
    for cmd in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    debug!("Found Chrome in PATH: {}", path);
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(BrowserUnavailable(
        "Chrome/Chromium not found; install it or set CHROME_PATH".to_string(),
    )
    .into())
}

/// One isolated browser process.
///
/// Dropping the session aborts the CDP handler and interception tasks;
/// chromiumoxide kills the child process when the `Browser` is dropped, and
/// the profile directory goes with the `TempDir` after it.
struct BrowserSession {
    browser: Browser,
    tasks: Vec<JoinHandle<()>>,
    profile: TempDir,
}

/// Fresh, empty Chrome profile directory, removed on drop.
fn new_profile_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("recipe-acquire-")
        .tempdir()
        .context("Failed to create browser profile directory")
}

impl BrowserSession {
    async fn launch(config: &BrowserEngineConfig, identity: &Identity) -> Result<Self> {
        let chrome_path = find_chrome(config)?;
        let profile = new_profile_dir()?;
        let profile_dir = profile.path().to_path_buf();

        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&profile_dir);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        for arg in STEALTH_ARGS {
            builder = builder.arg(*arg);
        }
        builder = builder.arg(format!("--user-agent={}", identity.user_agent));
        if let Some(lang) = identity.languages().first() {
            builder = builder.arg(format!("--lang={}", lang));
        }
        builder = builder.arg(if identity.profile.mobile {
            "--window-size=412,915"
        } else {
            "--window-size=1920,1080"
        });

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserUnavailable(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            tasks: vec![handler_task],
            profile,
        })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        debug!("Closed browser using profile {}", self.profile.path().display());
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl BrowserFetcher {
    /// Render `url` and return its readable text.
    pub async fn fetch(
        &self,
        url: &str,
        identity: &Identity,
        detector: &BlockDetector,
    ) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BrowserUnavailable("browser pool closed".to_string()))?;

        let mut session = BrowserSession::launch(&self.config, identity).await?;
        let result = self.drive(&mut session, url, identity, detector).await;
        session.close().await;
        result
    }

    async fn drive(
        &self,
        session: &mut BrowserSession,
        url: &str,
        identity: &Identity,
        detector: &BlockDetector,
    ) -> Result<String> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to create page")?;

        prepare_page(&page, identity).await?;
        if self.config.block_resources {
            session.tasks.push(block_subresources(&page).await?);
        }

        info!("Navigating to {}", url);
        let state = self.navigate_with_retries(&page, url).await?;
        debug!("Page reached {}", state);

        self.wait_for_content(&page).await;

        for _ in 0..self.config.scroll_cycles {
            if let Err(e) = page.evaluate(SCROLL_SCRIPT).await {
                debug!("Scroll failed: {}", e);
                break;
            }
            tokio::time::sleep(self.config.scroll_pause()).await;
        }

        let html = page.content().await.context("Failed to read page content")?;
        let text = best_content_text(&html, self.config.min_content_chars);

        if detector.is_blocked(&text) {
            warn!("Rendered page for {} looks blocked, trying in-page fetch", url);
            match in_page_fetch(&page, url).await {
                Ok(fetched) if !detector.is_blocked(&fetched) => return Ok(fetched),
                Ok(_) => debug!("In-page fetch for {} was blocked too", url),
                Err(e) => debug!("In-page fetch for {} failed: {:#}", url, e),
            }
        }

        Ok(text)
    }

    async fn navigate_with_retries(&self, page: &Page, url: &str) -> Result<WaitState> {
        let attempts = self.config.navigation_retries + 1;
        let timeout = self.config.navigation_timeout();
        let mut last_error = None;

        for attempt in 1..=attempts {
            for state in WaitState::ORDER {
                match tokio::time::timeout(timeout, navigate_and_wait(page, url, state)).await {
                    Ok(Ok(())) => return Ok(state),
                    Ok(Err(e)) => {
                        debug!("Navigation to {} ({}) failed: {:#}", url, state, e);
                        last_error = Some(e);
                    }
                    Err(_) => debug!("Navigation to {} timed out waiting for {}", url, state),
                }
            }
            warn!("Navigation attempt {}/{} failed for {}", attempt, attempts, url);
        }

        match last_error {
            Some(e) => Err(e.context(format!("Navigation to {} failed", url))),
            None => Err(NavigationTimedOut(attempts).into()),
        }
    }

    async fn wait_for_content(&self, page: &Page) {
        let selector = self
            .config
            .wait_for_selector
            .as_deref()
            .unwrap_or(CONTENT_SELECTORS);

        let found = tokio::time::timeout(self.config.selector_wait(), async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(PROBE_INTERVAL).await;
            }
        })
        .await;

        if found.is_err() {
            debug!("No content selector appeared, continuing");
        }
    }
}

/// Identity overrides and stealth scripts, applied before navigation.
async fn prepare_page(page: &Page, identity: &Identity) -> Result<()> {
    let ua_override = SetUserAgentOverrideParams::builder()
        .user_agent(identity.user_agent.clone())
        .accept_language(identity.accept_language.clone())
        .platform(identity.profile.platform.navigator_platform())
        .build()
        .map_err(|e| anyhow!("Invalid user agent override: {}", e))?;
    page.execute(ua_override).await?;

    // Chrome sets fetch metadata and encoding itself; only forward the rest.
    let extra: serde_json::Map<String, serde_json::Value> = identity
        .headers()
        .into_iter()
        .filter(|(name, _)| {
            !matches!(
                name.as_str(),
                "user-agent" | "accept-language" | "accept-encoding"
            ) && !name.starts_with("sec-fetch-")
        })
        .map(|(name, value)| (name, serde_json::Value::String(value)))
        .collect();
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(
        serde_json::Value::Object(extra),
    )))
    .await?;

    for script in stealth_scripts(identity) {
        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
        {
            debug!("Stealth script registration skipped: {}", e);
        }
    }

    Ok(())
}

/// Fail image/media/font/stylesheet requests before they leave the browser.
async fn block_subresources(page: &Page) -> Result<JoinHandle<()>> {
    // Subscribe before enabling so no paused request is missed.
    let mut paused = page.event_listener::<EventRequestPaused>().await?;

    let patterns: Vec<RequestPattern> = BLOCKED_RESOURCE_TYPES
        .iter()
        .map(|resource| {
            RequestPattern::builder()
                .resource_type(resource.clone())
                .request_stage(RequestStage::Request)
                .build()
        })
        .collect();
    page.execute(EnableParams::builder().patterns(patterns).build())
        .await?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let fail = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
            if let Err(e) = page.execute(fail).await {
                debug!("Failed to abort request: {}", e);
            }
        }
    }))
}

/// Navigate and poll until `state` is reached. Unbounded; callers time it out.
async fn navigate_and_wait(page: &Page, url: &str, state: WaitState) -> Result<()> {
    let params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| anyhow!("Invalid URL: {}", e))?;
    let response = page.execute(params).await?;
    if let Some(ref error) = response.result.error_text {
        return Err(anyhow!("Navigation error: {}", error));
    }

    let mut last_count = None;
    let mut stable_since = Instant::now();
    loop {
        // Evaluation fails while the document is being swapped; keep polling.
        if let Ok(value) = page.evaluate(PROBE_SCRIPT).await {
            if let Ok(probe) = value.into_value::<PageProbe>() {
                if last_count != Some(probe.resource_count) {
                    last_count = Some(probe.resource_count);
                    stable_since = Instant::now();
                }
                if state.is_reached(&probe, stable_since.elapsed().as_millis() as u64) {
                    return Ok(());
                }
            }
        }
        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}

/// Re-request `url` from inside the page so the browser's cookie jar and
/// any solved challenge tokens come along.
async fn in_page_fetch(page: &Page, url: &str) -> Result<String> {
    let url_literal = serde_json::to_string(url)?;
    let script = format!(
        r#"
        (async () => {{
            try {{
                const response = await fetch({}, {{
                    method: 'GET',
                    credentials: 'include'
                }});
                return {{ status: response.status, body: await response.text() }};
            }} catch (e) {{
                return {{ error: e.toString() }};
            }}
        }})()
        "#,
        url_literal
    );

    let result: serde_json::Value = page
        .evaluate(script)
        .await?
        .into_value()
        .context("Failed to parse fetch result")?;

    if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
        return Err(anyhow!("JavaScript fetch failed: {}", error));
    }

    let status = result.get("status").and_then(|s| s.as_u64()).unwrap_or(0);
    if !(200..300).contains(&status) {
        return Err(anyhow!("JavaScript fetch returned HTTP {}", status));
    }

    let body = result.get("body").and_then(|b| b.as_str()).unwrap_or("");
    Ok(if looks_like_html(body) {
        strip_html(body)
    } else {
        body.to_string()
    })
}
