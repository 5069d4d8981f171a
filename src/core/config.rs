use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// AnimeinConfig — file-based config loader (animein.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Unblocker-proxy sub-config (mirrors the `unblocker` key in animein.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct UnblockerConfig {
    /// Proxy API endpoint — e.g. `https://api.zenrows.com/v1/`.
    pub api_url: Option<String>,
    /// API token. Never logged. The strategy is disabled when no token resolves.
    pub token: Option<String>,
}

impl UnblockerConfig {
    /// Token: JSON field → `UNBLOCKER_TOKEN` env var → `None` (strategy off).
    pub fn resolve_token(&self) -> Option<String> {
        if let Some(t) = &self.token {
            let t = t.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        }
        std::env::var(ENV_UNBLOCKER_TOKEN)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Endpoint: JSON field → `UNBLOCKER_API_URL` env var → ZenRows default.
    pub fn resolve_api_url(&self) -> String {
        if let Some(u) = &self.api_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        std::env::var(ENV_UNBLOCKER_API_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.zenrows.com/v1/".to_string())
    }
}

/// Headless-browser sub-config (mirrors the `headless` key in animein.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct HeadlessConfig {
    /// Whether the headless-Chrome fallback strategy may run at all.
    /// Defaults to `true`; it still requires a discoverable browser binary.
    pub enabled: Option<bool>,
}

impl HeadlessConfig {
    /// Enabled: JSON field → `HEADLESS_FALLBACK` env var ("0" disables) → `true`.
    pub fn resolve_enabled(&self) -> bool {
        if let Some(b) = self.enabled {
            return b;
        }
        std::env::var(ENV_HEADLESS_FALLBACK)
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true)
    }
}

/// Top-level config loaded from `animein.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct AnimeinConfig {
    /// Listen port. Overridden by `--port`, then `ANIMEIN_PORT`/`PORT`.
    pub port: Option<u16>,
    /// Primary source module serving the anime routes (`kuramanime` | `anichin`).
    pub source: Option<String>,
    /// Per-source mirror-list overrides, keyed by source name. Order matters:
    /// mirrors are tried first to last, one attempt each.
    #[serde(default)]
    pub mirrors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub unblocker: UnblockerConfig,
    #[serde(default)]
    pub headless: HeadlessConfig,
    /// Page-cache TTL in seconds. `0` disables caching.
    pub cache_ttl_secs: Option<u64>,
    /// Max concurrent outbound fetches across all requests.
    pub outbound_limit: Option<usize>,
    /// Streaming-server ranking weights (see [`crate::rank::RankWeights`]).
    #[serde(default)]
    pub rank: crate::rank::RankWeights,
}

impl AnimeinConfig {
    /// Port: JSON field → `ANIMEIN_PORT` → `PORT` → 8000.
    pub fn resolve_port(&self) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        for var in [ENV_PORT, "PORT"] {
            if let Some(p) = std::env::var(var).ok().and_then(|v| v.trim().parse().ok()) {
                return p;
            }
        }
        8000
    }

    /// Source name: JSON field → `ANIMEIN_SOURCE` env var → `kuramanime`.
    pub fn resolve_source(&self) -> String {
        if let Some(s) = &self.source {
            let s = s.trim().to_ascii_lowercase();
            if !s.is_empty() {
                return s;
            }
        }
        std::env::var(ENV_SOURCE)
            .ok()
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "kuramanime".to_string())
    }

    /// Mirror list for `source`: non-empty JSON override → built-in defaults.
    pub fn resolve_mirrors(&self, source: &str, defaults: &[&str]) -> Vec<String> {
        if let Some(list) = self.mirrors.get(source) {
            let list: Vec<String> = list
                .iter()
                .map(|m| m.trim_end_matches('/').to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !list.is_empty() {
                return list;
            }
        }
        defaults.iter().map(|m| m.trim_end_matches('/').to_string()).collect()
    }

    /// Cache TTL: JSON field → `CACHE_TTL_SECS` env var → 300.
    pub fn resolve_cache_ttl_secs(&self) -> u64 {
        if let Some(n) = self.cache_ttl_secs {
            return n;
        }
        std::env::var(ENV_CACHE_TTL_SECS)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(300)
    }

    /// Outbound-fetch concurrency cap: JSON field → `OUTBOUND_LIMIT` → 32.
    pub fn resolve_outbound_limit(&self) -> usize {
        if let Some(n) = self.outbound_limit {
            return n.max(1);
        }
        std::env::var(ENV_OUTBOUND_LIMIT)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(|n: usize| n.max(1))
            .unwrap_or(32)
    }
}

/// Load `animein.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `ANIMEIN_CONFIG` env var path
/// 2. `./animein.json`  (process cwd)
/// 3. `../animein.json` (one level up — repo root when running from a member dir)
///
/// Missing file → `AnimeinConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `AnimeinConfig::default()`.
pub fn load_config() -> AnimeinConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("animein.json"),
            std::path::PathBuf::from("../animein.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<AnimeinConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("animein.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "animein.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return AnimeinConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    // No config file found anywhere — silently use defaults (env-var fallbacks apply).
    AnimeinConfig::default()
}

// ---------------------------------------------------------------------------

pub const ENV_CONFIG: &str = "ANIMEIN_CONFIG";
pub const ENV_PORT: &str = "ANIMEIN_PORT";
pub const ENV_SOURCE: &str = "ANIMEIN_SOURCE";
pub const ENV_UNBLOCKER_TOKEN: &str = "UNBLOCKER_TOKEN";
pub const ENV_UNBLOCKER_API_URL: &str = "UNBLOCKER_API_URL";
pub const ENV_HEADLESS_FALLBACK: &str = "HEADLESS_FALLBACK";
pub const ENV_CACHE_TTL_SECS: &str = "CACHE_TTL_SECS";
pub const ENV_OUTBOUND_LIMIT: &str = "OUTBOUND_LIMIT";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is **auto-discovery** (see `fetch::browser::find_chrome_executable()`).
/// This function only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}
