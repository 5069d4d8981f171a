//! Per-request headless fallback using `chromiumoxide`.
//!
//! Some mirrors sit behind JS challenges that plain HTTP fetches cannot pass.
//! This strategy launches a fresh browser, navigates, waits for the page to
//! settle, snapshots the HTML and closes the browser again. One browser per
//! fetch: nothing is pooled, so a crashed or hung Chromium never outlives the
//! request that started it.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Whole navigate+settle+snapshot sequence is capped at this.
const HEADLESS_TIMEOUT_SECS: u64 = 30;
/// Resource count must hold still this long before the page counts as settled.
const SETTLE_QUIET_MS: u64 = 1_500;
const SETTLE_TIMEOUT_MS: u64 = 15_000;

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    // 1. Explicit env override
    if let Some(p) = crate::core::config::chrome_executable_override() {
        return Some(p);
    }

    // 2. PATH scan (Linux / macOS / Windows package managers)
    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "brave-browser",
            "brave",
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    // 3. Platform-specific well-known paths
    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/brave-browser",
            "/usr/bin/brave",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Returns `true` when a usable browser binary is present on this machine.
pub fn browser_available() -> bool {
    find_chrome_executable().is_some()
}

// ── Headless launch + snapshot ────────────────────────────────────────────────

/// Build a `BrowserConfig` for headless operation with stealth defaults.
///
/// `--disable-blink-features=AutomationControlled` hides the
/// `navigator.webdriver` flag; the UA is drawn from the shared pool so the
/// headless fetch presents the same identity family as the direct fetches.
fn build_headless_config(exe: &str) -> Result<BrowserConfig> {
    let ua = super::identity::random_user_agent();

    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1366,
            height: 768,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1366, 768)
        .arg("--disable-gpu")
        .arg("--no-sandbox") // often required in CI / restricted environments
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage") // avoids /dev/shm OOM in containers
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--disable-breakpad")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua))
        .build()
        .map_err(|e| anyhow!("failed to build browser config: {}", e))
}

/// Wait until `document.readyState` is complete and the resource count stops
/// growing for `quiet_ms` consecutive ms, or until `timeout_ms` has elapsed.
///
/// Polls `performance.getEntriesByType("resource").length` every 250 ms — a
/// networkidle heuristic that works without CDP Network events.
async fn wait_until_settled(page: &Page, quiet_ms: u64, timeout_ms: u64) {
    let poll = Duration::from_millis(250);
    let start = std::time::Instant::now();
    let mut last_count: u64 = 0;
    let mut stable_since = std::time::Instant::now();

    loop {
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            debug!("wait_until_settled: timeout after {}ms", timeout_ms);
            return;
        }

        let count: u64 = page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_u64())
            .unwrap_or(0);

        let ready_complete: bool = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_str().map(|s| s == "complete"))
            .unwrap_or(false);

        if !ready_complete || count != last_count {
            last_count = count;
            stable_since = std::time::Instant::now();
        } else if stable_since.elapsed().as_millis() as u64 >= quiet_ms {
            debug!(
                "wait_until_settled: idle after {}ms ({} resources)",
                start.elapsed().as_millis(),
                count
            );
            return;
        }

        tokio::time::sleep(poll).await;
    }
}

/// Fetch the rendered HTML of `url` with a fresh headless browser.
///
/// The browser is closed on every exit path — success, timeout or error —
/// before this function returns.
pub async fn fetch_page_html(url: &str) -> Result<String> {
    let exe = find_chrome_executable().ok_or_else(|| {
        anyhow!(
            "no browser found; install Chrome, Chromium or Brave, or set CHROME_EXECUTABLE"
        )
    })?;

    info!("headless fetch: {} (browser: {})", url, exe);

    let config = build_headless_config(&exe)?;
    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| anyhow!("failed to launch browser ({}): {}", exe, e))?;

    let _handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler error: {}", e);
            }
        }
    });

    let snapshot = async {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| anyhow!("failed to open page: {}", e))?;

        wait_until_settled(&page, SETTLE_QUIET_MS, SETTLE_TIMEOUT_MS).await;

        let html = page
            .content()
            .await
            .map_err(|e| anyhow!("failed to snapshot page content: {}", e))?;

        debug!("headless fetch ok: {} chars", html.len());
        Ok(html)
    };

    let result: Result<String> =
        match tokio::time::timeout(Duration::from_secs(HEADLESS_TIMEOUT_SECS), snapshot).await {
            Ok(r) => r,
            Err(_) => Err(anyhow!(
                "headless fetch timed out after {}s",
                HEADLESS_TIMEOUT_SECS
            )),
        };

    // Best-effort cleanup — don't let a close error shadow the fetch result
    if let Err(e) = browser.close().await {
        warn!("browser close error (non-fatal): {}", e);
    }

    result
}
