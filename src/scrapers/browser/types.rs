//! Page load states and the probes used to detect them.

use std::fmt;

/// Load milestones, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

impl WaitState {
    pub const ORDER: [WaitState; 3] = [Self::DomContentLoaded, Self::Load, Self::NetworkIdle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomContentLoaded => "domcontentloaded",
            Self::Load => "load",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// Whether a probe snapshot satisfies this state.
    ///
    /// `stable_for_ms` is how long the resource count has been unchanged.
    pub fn is_reached(&self, probe: &PageProbe, stable_for_ms: u64) -> bool {
        if probe.href == "about:blank" {
            return false;
        }
        match self {
            Self::DomContentLoaded => {
                probe.ready_state == "interactive" || probe.ready_state == "complete"
            }
            Self::Load => probe.ready_state == "complete",
            Self::NetworkIdle => {
                probe.ready_state == "complete" && stable_for_ms >= NETWORK_IDLE_MS
            }
        }
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quiet period that counts as network idle.
pub const NETWORK_IDLE_MS: u64 = 500;

/// Snapshot returned by [`PROBE_SCRIPT`].
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProbe {
    pub href: String,
    pub ready_state: String,
    pub resource_count: u64,
}

pub const PROBE_SCRIPT: &str = r#"({
    href: String(location.href),
    readyState: document.readyState,
    resourceCount: performance.getEntriesByType('resource').length
})"#;

pub const SCROLL_SCRIPT: &str =
    "window.scrollBy(0, Math.max(window.innerHeight, document.body ? document.body.scrollHeight / 3 : 600))";

/// Selectors whose presence suggests the main content has rendered.
pub const CONTENT_SELECTORS: &str =
    "main, article, [role=main], [itemtype*=Recipe], .recipe, .wprm-recipe-container, .tasty-recipes";
