use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{browser, detect_block_reason, identity, FetchError};
use crate::core::config::AnimeinConfig;

/// Per-attempt timeout for a plain HTTP fetch.
const DIRECT_TIMEOUT_SECS: u64 = 15;
/// Unblocking proxies render the page server-side, so they get longer.
const UNBLOCKER_TIMEOUT_SECS: u64 = 45;

/// One way of turning a URL into page HTML.
///
/// Strategies hold no session state; the HTTP client is passed in per call.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, client: &reqwest::Client, url: &str) -> Result<String, FetchError>;
}

fn classify_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::Fatal(e.to_string())
    } else {
        FetchError::Transient(e.to_string())
    }
}

/// Plain `reqwest` GET with a rotated UA and browser-like headers.
pub struct DirectFetch;

#[async_trait]
impl FetchStrategy for DirectFetch {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let mut request = client
            .get(url)
            .timeout(Duration::from_secs(DIRECT_TIMEOUT_SECS))
            .header("User-Agent", identity::random_user_agent());
        for (key, value) in identity::stealth_headers() {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(classify_reqwest)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest)?;

        if let Some(reason) = detect_block_reason(status, &body) {
            return Err(FetchError::Blocked { reason });
        }
        if !(200..300).contains(&status) {
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }
        Ok(body)
    }
}

/// Unblocking proxy: the target URL goes out as a query param with the API
/// token, the rendered page HTML comes back.
pub struct UnblockerFetch {
    pub api_url: String,
    pub token: String,
}

#[async_trait]
impl FetchStrategy for UnblockerFetch {
    fn name(&self) -> &'static str {
        "unblocker"
    }

    async fn fetch(&self, client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let response = client
            .get(&self.api_url)
            .timeout(Duration::from_secs(UNBLOCKER_TIMEOUT_SECS))
            .query(&[("apikey", self.token.as_str()), ("url", url)])
            .send()
            .await
            .map_err(classify_reqwest)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest)?;

        if !(200..300).contains(&status) {
            return Err(FetchError::Transient(format!(
                "unblocker returned HTTP {status}"
            )));
        }
        // The proxy can still hand back the target's challenge page verbatim.
        if let Some(reason) = detect_block_reason(200, &body) {
            return Err(FetchError::Blocked { reason });
        }
        Ok(body)
    }
}

/// Fresh headless browser per call; see `fetch::browser`.
pub struct HeadlessFetch;

#[async_trait]
impl FetchStrategy for HeadlessFetch {
    fn name(&self) -> &'static str {
        "headless"
    }

    async fn fetch(&self, _client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let html = browser::fetch_page_html(url)
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        if let Some(reason) = detect_block_reason(200, &html) {
            return Err(FetchError::Blocked { reason });
        }
        Ok(html)
    }
}

/// Assemble the ordered strategy list from config.
///
/// Direct is always first. Unblocker joins when a token resolves; headless
/// joins when enabled and a local browser binary exists.
pub fn build_strategies(config: &AnimeinConfig) -> Vec<Arc<dyn FetchStrategy>> {
    let mut strategies: Vec<Arc<dyn FetchStrategy>> = vec![Arc::new(DirectFetch)];

    if let Some(token) = config.unblocker.resolve_token() {
        let api_url = config.unblocker.resolve_api_url();
        info!("unblocker strategy enabled ({})", api_url);
        strategies.push(Arc::new(UnblockerFetch { api_url, token }));
    }

    if config.headless.resolve_enabled() {
        if browser::browser_available() {
            info!("headless fallback strategy enabled");
            strategies.push(Arc::new(HeadlessFetch));
        } else {
            debug!("headless fallback unavailable: no browser binary found");
        }
    }

    strategies
}
