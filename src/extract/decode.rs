//! Server-value decoding for stream pages.
//!
//! The `<option value>` attributes on episode pages carry anything from a
//! base64-wrapped iframe tag to a bare URL, depending on the site build.
//! `smart_decode` applies one fixed fallback ladder and tags the outcome
//! instead of guessing: callers can tell a real URL from a passthrough.

use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

/// Outcome of decoding one raw server `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The payload held an iframe tag; this is its `src`.
    EmbedFrame(String),
    /// The value decoded to (or already was) a plain URL.
    Plain(String),
    /// Nothing recognizable; the original value passed through untouched.
    Raw(String),
}

impl Decoded {
    pub fn url(&self) -> &str {
        match self {
            Decoded::EmbedFrame(u) | Decoded::Plain(u) | Decoded::Raw(u) => u,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Decoded::Raw(_))
    }
}

static IFRAME_SRC_RE: OnceLock<Regex> = OnceLock::new();

fn iframe_src(html: &str) -> Option<String> {
    let re = IFRAME_SRC_RE
        .get_or_init(|| Regex::new(r#"src=["']([^"']+)["']"#).expect("valid iframe src regex"));
    if !html.contains("<iframe") {
        return None;
    }
    re.captures(html).map(|c| c[1].trim().to_string())
}

fn decode_base64_text(value: &str) -> Option<String> {
    // Values arrive with or without padding depending on the site build.
    let mut padded = value.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(padded.as_bytes())
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Decode one server value: base64 iframe → base64 URL → plain URL →
/// unencoded iframe → tagged raw passthrough. Never errors, never returns a
/// silently-emptied value.
pub fn smart_decode(value: &str) -> Decoded {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Decoded::Raw(String::new());
    }

    if let Some(text) = decode_base64_text(trimmed) {
        if let Some(src) = iframe_src(&text) {
            return Decoded::EmbedFrame(src);
        }
        let text = text.trim();
        if text.starts_with("http://") || text.starts_with("https://") {
            return Decoded::Plain(text.to_string());
        }
        // Decoded to text we don't recognize; fall through to the raw checks.
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Decoded::Plain(trimmed.to_string());
    }
    if let Some(src) = iframe_src(trimmed) {
        return Decoded::EmbedFrame(src);
    }

    Decoded::Raw(trimmed.to_string())
}

/// Whether a URL points at a playable media file rather than an embed page.
pub fn is_direct_media(url: &str) -> bool {
    let lower = url.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or("");
    [".mp4", ".m3u8", ".webm", ".mkv"]
        .iter()
        .any(|ext| path.ends_with(ext))
        || lower.contains("googlevideo.com")
        || lower.contains("googleusercontent.com")
        || lower.contains("video.blogger.com")
}
