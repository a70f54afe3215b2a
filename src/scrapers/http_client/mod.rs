//! Direct HTTP tier: a plain GET presenting a randomized browser identity.

mod identity;

pub use identity::{
    BrowserFamily, Identity, IdentityPools, Platform, UserAgentProfile, DEFAULT_ACCEPT_LANGUAGES,
    DEFAULT_REFERERS, DEFAULT_USER_AGENTS,
};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use tracing::debug;

use super::block_detector::BlockDetector;
use super::controller::{FetchStrategy, StrategyKind, TierError, TierResponse};
use crate::utils::{looks_like_html, strip_html};

/// Default timeout for the direct tier.
pub const DEFAULT_DIRECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default ceiling on a raw (decompressed) response body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Maximum redirects followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// HTTP client used by the direct tier.
///
/// Keeps no cookie store: the client is shared by every fetch.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpClient {
    /// Create a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self {
            client,
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `identity`'s headers and return readable text.
    ///
    /// Non-2xx statuses come back as [`TierError::Status`] so the
    /// controller can decide whether to escalate.
    pub async fn get_text(&self, url: &str, identity: &Identity) -> Result<TierResponse, TierError> {
        let request = apply_identity(self.client.get(url), identity);
        let response = request.send().await.map_err(tier_error)?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);
        if !status.is_success() {
            return Err(TierError::Status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(false);
        let body = read_body(response, self.max_body_bytes)
            .await
            .map_err(tier_error)?;

        let text = if is_html || looks_like_html(&body) {
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

/// Copy identity headers onto a request.
///
/// `accept-encoding` is left to reqwest so it keeps decompressing bodies.
pub(crate) fn apply_identity(
    mut request: reqwest::RequestBuilder,
    identity: &Identity,
) -> reqwest::RequestBuilder {
    for (name, value) in identity.headers() {
        if name == "accept-encoding" {
            continue;
        }
        request = request.header(name, value);
    }
    request
}

/// Read at most `max_bytes` of the body, chunk by chunk.
///
/// A cut through a multi-byte character becomes U+FFFD.
pub(crate) async fn read_body(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> Result<String, reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = max_bytes.saturating_sub(buf.len());
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            debug!("Response body cut at {} bytes", max_bytes);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Map a transport error onto the tier error taxonomy.
pub(crate) fn tier_error(err: reqwest::Error) -> TierError {
    if err.is_timeout() {
        TierError::Timeout
    } else if let Some(status) = err.status() {
        TierError::Status(status.as_u16())
    } else {
        TierError::Network(err.to_string())
    }
}

#[async_trait]
impl FetchStrategy for HttpClient {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn deadline(&self) -> Duration {
        // Body download is covered by the client timeout; leave slack for DNS.
        self.timeout + Duration::from_secs(5)
    }

    async fn retrieve(
        &self,
        url: &str,
        identity: &Identity,
        _detector: &BlockDetector,
    ) -> Result<TierResponse, TierError> {
        self.get_text(url, identity).await
    }
}
