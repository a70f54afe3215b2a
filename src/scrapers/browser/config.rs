//! Browser tier configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Browser tier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Install the browser tier at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Explicit Chrome/Chromium executable. Searched for when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Timeout for one navigation attempt, in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Hard ceiling on the whole browser tier, in seconds.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// Browser processes allowed open at once.
    #[serde(default = "default_max_contexts")]
    pub max_contexts: usize,

    /// Extra navigation attempts after the first one fails.
    #[serde(default = "default_navigation_retries")]
    pub navigation_retries: u32,

    /// Scroll-and-wait cycles for lazily loaded content.
    #[serde(default = "default_scroll_cycles")]
    pub scroll_cycles: u32,

    #[serde(default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,

    /// How long to wait for a content selector to appear, in milliseconds.
    #[serde(default = "default_selector_wait_ms")]
    pub selector_wait_ms: u64,

    /// Wait for this CSS selector instead of the built-in content selectors.
    #[serde(default)]
    pub wait_for_selector: Option<String>,

    /// Content containers shorter than this fall back to the whole page.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Abort image/media/font/stylesheet requests.
    #[serde(default = "default_block_resources")]
    pub block_resources: bool,
}

fn default_enabled() -> bool {
    true
}

pub fn default_headless() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    15
}

fn default_deadline() -> u64 {
    120
}

fn default_max_contexts() -> usize {
    2
}

fn default_navigation_retries() -> u32 {
    2
}

fn default_scroll_cycles() -> u32 {
    3
}

fn default_scroll_pause_ms() -> u64 {
    800
}

fn default_selector_wait_ms() -> u64 {
    5_000
}

fn default_min_content_chars() -> usize {
    200
}

fn default_block_resources() -> bool {
    true
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            headless: default_headless(),
            proxy: None,
            chrome_path: None,
            chrome_args: Vec::new(),
            navigation_timeout_secs: default_navigation_timeout(),
            deadline_secs: default_deadline(),
            max_contexts: default_max_contexts(),
            navigation_retries: default_navigation_retries(),
            scroll_cycles: default_scroll_cycles(),
            scroll_pause_ms: default_scroll_pause_ms(),
            selector_wait_ms: default_selector_wait_ms(),
            wait_for_selector: None,
            min_content_chars: default_min_content_chars(),
            block_resources: default_block_resources(),
        }
    }
}

impl BrowserEngineConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn selector_wait(&self) -> Duration {
        Duration::from_millis(self.selector_wait_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}
