//! Browser identity randomization.
//!
//! Each fetch attempt presents a complete, internally consistent browser
//! fingerprint. Client hints must agree with the user agent: a Firefox UA
//! that sends `sec-ch-ua`, or a Windows UA claiming `"macOS"`, is itself a
//! detection signal.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Real browser user agents (desktop and mobile).
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Chrome on Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Chrome on Android
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Firefox on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Safari on iPhone
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Mobile/15E148 Safari/604.1",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

pub const DEFAULT_ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "he-IL,he;q=0.9,en-US;q=0.8,en;q=0.7",
    "en-US,en;q=0.9,he;q=0.8",
    "en-US,en;q=0.8,fr;q=0.6",
];

pub const DEFAULT_REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
    "https://www.pinterest.com/",
];

/// Browser engine family, as far as client hints are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFamily {
    Chrome,
    Edge,
    Firefox,
    Safari,
}

impl BrowserFamily {
    /// Whether this family sends `sec-ch-ua` headers at all.
    pub fn sends_client_hints(&self) -> bool {
        matches!(self, Self::Chrome | Self::Edge)
    }
}

/// Operating system as reported by `sec-ch-ua-platform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    Linux,
    Android,
    #[serde(rename = "iOS")]
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Android => "Android",
            Self::Ios => "iOS",
        }
    }

    /// `navigator.platform` value matching this OS.
    pub fn navigator_platform(&self) -> &'static str {
        match self {
            Self::Windows => "Win32",
            Self::MacOs => "MacIntel",
            Self::Linux => "Linux x86_64",
            Self::Android => "Linux armv8l",
            Self::Ios => "iPhone",
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Self::Android | Self::Ios)
    }
}

/// Parsed facts about a user agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentProfile {
    pub family: BrowserFamily,
    pub platform: Platform,
    pub major_version: Option<u32>,
    pub mobile: bool,
}

impl UserAgentProfile {
    /// Derive family, platform and version from a UA string.
    pub fn parse(user_agent: &str) -> Self {
        let platform = if user_agent.contains("Android") {
            Platform::Android
        } else if user_agent.contains("iPhone") || user_agent.contains("iPad") {
            Platform::Ios
        } else if user_agent.contains("Windows") {
            Platform::Windows
        } else if user_agent.contains("Macintosh") || user_agent.contains("Mac OS X") {
            Platform::MacOs
        } else {
            Platform::Linux
        };

        let (family, major_version) = if let Some(v) = version_after(user_agent, "Edg/") {
            (BrowserFamily::Edge, Some(v))
        } else if let Some(v) = version_after(user_agent, "Firefox/") {
            (BrowserFamily::Firefox, Some(v))
        } else if let Some(v) = version_after(user_agent, "Chrome/") {
            (BrowserFamily::Chrome, Some(v))
        } else {
            (
                BrowserFamily::Safari,
                version_after(user_agent, "Version/"),
            )
        };

        Self {
            family,
            platform,
            major_version,
            mobile: platform.is_mobile() || user_agent.contains("Mobile"),
        }
    }

    /// `sec-ch-ua` brand list, `None` for families that never send it.
    pub fn sec_ch_ua(&self) -> Option<String> {
        let version = self.major_version?;
        match self.family {
            BrowserFamily::Chrome => Some(format!(
                "\"Google Chrome\";v=\"{v}\", \"Chromium\";v=\"{v}\", \"Not_A Brand\";v=\"24\"",
                v = version
            )),
            BrowserFamily::Edge => Some(format!(
                "\"Microsoft Edge\";v=\"{v}\", \"Chromium\";v=\"{v}\", \"Not_A Brand\";v=\"24\"",
                v = version
            )),
            BrowserFamily::Firefox | BrowserFamily::Safari => None,
        }
    }
}

fn version_after(user_agent: &str, marker: &str) -> Option<u32> {
    let start = user_agent.find(marker)? + marker.len();
    let digits: String = user_agent[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// One complete browser fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub user_agent: String,
    pub accept_language: String,
    pub referer: Option<String>,
    pub sec_ch_ua: Option<String>,
    pub sec_ch_ua_mobile: Option<String>,
    pub sec_ch_ua_platform: Option<String>,
    #[serde(skip)]
    pub profile: UserAgentProfile,
}

impl Identity {
    /// Build an identity, deriving client hints from the user agent.
    pub fn new(user_agent: &str, accept_language: &str, referer: Option<&str>) -> Self {
        let profile = UserAgentProfile::parse(user_agent);
        let sec_ch_ua = profile.sec_ch_ua();
        let (sec_ch_ua_mobile, sec_ch_ua_platform) = if sec_ch_ua.is_some() {
            (
                Some(if profile.mobile { "?1" } else { "?0" }.to_string()),
                Some(format!("\"{}\"", profile.platform.as_str())),
            )
        } else {
            (None, None)
        };

        Self {
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
            referer: referer.map(|r| r.to_string()),
            sec_ch_ua,
            sec_ch_ua_mobile,
            sec_ch_ua_platform,
            profile,
        }
    }

    /// Languages for `navigator.languages`, from the accept-language value.
    pub fn languages(&self) -> Vec<String> {
        self.accept_language
            .split(',')
            .filter_map(|part| part.split(';').next())
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect()
    }

    /// Full request header set, lowercase names.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("user-agent".to_string(), self.user_agent.clone()),
            (
                "accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            ("accept-language".to_string(), self.accept_language.clone()),
            (
                "accept-encoding".to_string(),
                "gzip, deflate, br".to_string(),
            ),
            ("upgrade-insecure-requests".to_string(), "1".to_string()),
            ("sec-fetch-dest".to_string(), "document".to_string()),
            ("sec-fetch-mode".to_string(), "navigate".to_string()),
            (
                "sec-fetch-site".to_string(),
                if self.referer.is_some() { "cross-site" } else { "none" }.to_string(),
            ),
            ("sec-fetch-user".to_string(), "?1".to_string()),
        ];
        if let Some(ref referer) = self.referer {
            headers.push(("referer".to_string(), referer.clone()));
        }
        if let Some(ref v) = self.sec_ch_ua {
            headers.push(("sec-ch-ua".to_string(), v.clone()));
        }
        if let Some(ref v) = self.sec_ch_ua_mobile {
            headers.push(("sec-ch-ua-mobile".to_string(), v.clone()));
        }
        if let Some(ref v) = self.sec_ch_ua_platform {
            headers.push(("sec-ch-ua-platform".to_string(), v.clone()));
        }
        headers
    }
}

/// Immutable pools identities are drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPools {
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    #[serde(default = "default_accept_languages")]
    pub accept_languages: Vec<String>,
    /// Referers; an identity may also go out without one.
    #[serde(default = "default_referers")]
    pub referers: Vec<String>,
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
}

fn default_accept_languages() -> Vec<String> {
    DEFAULT_ACCEPT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

fn default_referers() -> Vec<String> {
    DEFAULT_REFERERS.iter().map(|s| s.to_string()).collect()
}

impl Default for IdentityPools {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
            accept_languages: default_accept_languages(),
            referers: default_referers(),
        }
    }
}

impl IdentityPools {
    /// Draw an identity using the thread-local RNG.
    pub fn next_identity(&self) -> Identity {
        self.next_identity_with(&mut rand::rng())
    }

    /// Draw an identity from a caller-supplied RNG.
    pub fn next_identity_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Identity {
        let user_agent = self
            .user_agents
            .choose(rng)
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_USER_AGENTS[0]);
        let accept_language = self
            .accept_languages
            .choose(rng)
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_ACCEPT_LANGUAGES[0]);
        // One slot in (n + 1) goes out without a referer, like a typed URL.
        let referer_slot = rng.random_range(0..=self.referers.len());
        let referer = self.referers.get(referer_slot).map(|s| s.as_str());

        Identity::new(user_agent, accept_language, referer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_chrome_windows_hints() {
        let identity = Identity::new(DEFAULT_USER_AGENTS[0], "en-US,en;q=0.9", None);
        assert_eq!(identity.profile.family, BrowserFamily::Chrome);
        assert_eq!(identity.sec_ch_ua_platform.as_deref(), Some("\"Windows\""));
        assert_eq!(identity.sec_ch_ua_mobile.as_deref(), Some("?0"));
        assert!(identity.sec_ch_ua.as_deref().unwrap().contains("v=\"131\""));
    }

    #[test]
    fn test_edge_detected_before_chrome() {
        let ua = DEFAULT_USER_AGENTS.last().unwrap();
        let identity = Identity::new(ua, "en-US", None);
        assert_eq!(identity.profile.family, BrowserFamily::Edge);
        assert!(identity.sec_ch_ua.unwrap().contains("Microsoft Edge"));
    }

    #[test]
    fn test_android_chrome_is_mobile() {
        let identity = Identity::new(DEFAULT_USER_AGENTS[4], "en-US", None);
        assert_eq!(identity.profile.platform, Platform::Android);
        assert_eq!(identity.sec_ch_ua_mobile.as_deref(), Some("?1"));
        assert_eq!(identity.sec_ch_ua_platform.as_deref(), Some("\"Android\""));
    }

    #[test]
    fn test_firefox_and_safari_send_no_hints() {
        for ua in DEFAULT_USER_AGENTS {
            let identity = Identity::new(ua, "en-US", None);
            if !identity.profile.family.sends_client_hints() {
                assert!(identity.sec_ch_ua.is_none(), "{}", ua);
                assert!(identity.sec_ch_ua_mobile.is_none());
                assert!(identity.sec_ch_ua_platform.is_none());
                assert!(!identity.headers().iter().any(|(k, _)| k.starts_with("sec-ch-ua")));
            }
        }
    }

    #[test]
    fn test_every_default_agent_is_consistent() {
        for ua in DEFAULT_USER_AGENTS {
            let profile = UserAgentProfile::parse(ua);
            if ua.contains("iPhone") {
                assert_eq!(profile.platform, Platform::Ios);
                assert_eq!(profile.family, BrowserFamily::Safari);
            }
            if ua.contains("Firefox") {
                assert_eq!(profile.family, BrowserFamily::Firefox);
            }
            assert!(profile.major_version.is_some(), "{}", ua);
        }
    }

    #[test]
    fn test_fixed_pool_is_deterministic() {
        let pools = IdentityPools {
            user_agents: vec![DEFAULT_USER_AGENTS[5].to_string()],
            accept_languages: vec!["he-IL,he;q=0.9".to_string()],
            referers: Vec::new(),
        };
        let identity = pools.next_identity();
        assert_eq!(identity.user_agent, DEFAULT_USER_AGENTS[5]);
        assert_eq!(identity.accept_language, "he-IL,he;q=0.9");
        assert!(identity.referer.is_none());
        assert_eq!(identity.languages(), vec!["he-IL", "he"]);
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        let pools = IdentityPools::default();
        let a = pools.next_identity_with(&mut StdRng::seed_from_u64(7));
        let b = pools.next_identity_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_headers_complete() {
        let identity = Identity::new(DEFAULT_USER_AGENTS[0], "en-US", Some("https://www.google.com/"));
        let headers = identity.headers();
        let get = |name: &str| headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
        assert_eq!(get("referer"), Some("https://www.google.com/"));
        assert_eq!(get("sec-fetch-site"), Some("cross-site"));
        assert!(get("accept-encoding").unwrap().contains("br"));
        assert!(get("sec-ch-ua").is_some());
    }
}
