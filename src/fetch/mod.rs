//! Fetch layer: mirror fallback over ordered strategies.
//!
//! Every page fetch walks the source's mirror list in order and, per mirror,
//! the configured strategies in order (direct HTTP, unblocker proxy, headless
//! browser). Exactly one attempt per mirror/strategy pair; no retries, no
//! backoff. A 200 response only counts when the body carries one of the
//! source's content markers, so a block page served with 200 still falls
//! through to the next option.

pub mod browser;
pub mod identity;
pub mod strategy;

pub use strategy::{build_strategies, DirectFetch, FetchStrategy, HeadlessFetch, UnblockerFetch};

use aho_corasick::AhoCorasick;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A fetched page plus where and how it came from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// Mirror base URL the page was served from, without a trailing slash.
    /// Relative hrefs and slug stripping resolve against this.
    pub base: String,
    /// Name of the strategy that produced the page.
    pub via: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch blocked: {reason}")]
    Blocked { reason: String },
    #[error("transient fetch failure: {0}")]
    Transient(String),
    #[error("fatal fetch failure: {0}")]
    Fatal(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

const BLOCK_MARKERS: &[&str] = &[
    "cf-turnstile",
    "cf-chl-widget",
    "challenge-platform",
    "unusual traffic",
    "access denied",
    "attention required",
    "enable javascript and cookies",
    "captcha",
    "ddos-guard",
];

static BLOCK_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

fn block_matcher() -> &'static AhoCorasick {
    BLOCK_MATCHER.get_or_init(|| {
        // Patterns are simple substrings; Aho-Corasick gives linear-time scan.
        AhoCorasick::new(BLOCK_MARKERS).expect("valid block markers")
    })
}

/// Classify a response as a block/challenge, returning the reason tag.
pub fn detect_block_reason(status: u16, body: &str) -> Option<String> {
    match status {
        403 => return Some("HTTP 403 forbidden".to_string()),
        429 => return Some("HTTP 429 rate limited".to_string()),
        503 => return Some("HTTP 503 challenge page".to_string()),
        _ => {}
    }

    let lower = body.to_lowercase();
    if let Some(m) = block_matcher().find(&lower) {
        return Some(format!(
            "challenge marker: {}",
            BLOCK_MARKERS[m.pattern().as_usize()]
        ));
    }

    if status == 200 && lower.trim().len() < 256 {
        return Some("suspiciously small response body".to_string());
    }

    None
}

fn has_content_marker(html: &str, markers: &[&str]) -> bool {
    if markers.is_empty() {
        return true;
    }
    let lower = html.to_lowercase();
    markers.iter().any(|m| lower.contains(&m.to_lowercase()))
}

/// Walk `mirrors` in order, trying each strategy in order, and return the
/// first body that passes the content-marker check.
///
/// One attempt per mirror/strategy pair. A `Fatal` error skips the rest of
/// the strategies for that mirror (a malformed URL fails them all the same
/// way). When everything fails, the `Unavailable` error lists every
/// attempt's reason.
pub async fn fetch_first_ok(
    client: &reqwest::Client,
    strategies: &[Arc<dyn FetchStrategy>],
    mirrors: &[String],
    path: &str,
    markers: &[&str],
) -> Result<FetchedPage, FetchError> {
    if mirrors.is_empty() {
        return Err(FetchError::Fatal("no mirrors configured".to_string()));
    }

    let mut failures: Vec<String> = Vec::new();

    for mirror in mirrors {
        let base = mirror.trim_end_matches('/');
        let url = format!("{}{}", base, path);

        for strategy in strategies {
            match strategy.fetch(client, &url).await {
                Ok(html) => {
                    if has_content_marker(&html, markers) {
                        debug!(mirror = %base, via = strategy.name(), "fetch ok");
                        return Ok(FetchedPage {
                            html,
                            base: base.to_string(),
                            via: strategy.name(),
                        });
                    }
                    debug!(mirror = %base, via = strategy.name(), "content marker missing");
                    failures.push(format!(
                        "{} [{}]: content marker missing",
                        base,
                        strategy.name()
                    ));
                }
                Err(FetchError::Fatal(msg)) => {
                    failures.push(format!("{} [{}]: {}", base, strategy.name(), msg));
                    break;
                }
                Err(e) => {
                    debug!(mirror = %base, via = strategy.name(), error = %e, "fetch attempt failed");
                    failures.push(format!("{} [{}]: {}", base, strategy.name(), e));
                }
            }
        }
    }

    Err(FetchError::Unavailable(failures.join("; ")))
}

/// Fetch a path from a source through the shared cache, outbound limiter and
/// strategy list in `AppState`.
pub async fn fetch_source_page(
    state: &crate::core::AppState,
    profile: &crate::sources::SourceProfile,
    path: &str,
) -> Result<FetchedPage, FetchError> {
    let key = format!("{}:{}", profile.name, path);
    if let Some(cache) = &state.page_cache {
        if let Some(page) = cache.get(&key).await {
            debug!(key = %key, "page cache hit");
            return Ok(page);
        }
    }

    let _permit = state
        .outbound_limit
        .acquire()
        .await
        .map_err(|_| FetchError::Transient("outbound limiter closed".to_string()))?;

    let mirrors = state.config.resolve_mirrors(profile.name, profile.mirrors);
    let page = fetch_first_ok(
        &state.http_client,
        &state.strategies,
        &mirrors,
        path,
        profile.markers,
    )
    .await?;

    if let Some(cache) = &state.page_cache {
        cache.insert(key, page.clone()).await;
    }
    Ok(page)
}
