//! Chromium page loader using chromiumoxide.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{LoadOptions, LoadedPage, PageLoader, WaitStrategy};
use crate::session::Cookie;

const FALLBACK_CHROMIUM: &str = "/usr/bin/chromium";
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// chromiumoxide's own command timeout; the handler never gets less.
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Locate a Chromium binary.
///
/// Order: the configured path, `PATH` lookups, then `/usr/bin/chromium`.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured chromium not found, searching PATH");
    }

    for name in ["chromium", "chromium-browser", "google-chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    let fallback = PathBuf::from(FALLBACK_CHROMIUM);
    fallback.exists().then_some(fallback)
}

/// Launches a fresh headless Chromium for every page load.
pub struct ChromiumLoader {
    executable: PathBuf,
    options: LoadOptions,
}

impl ChromiumLoader {
    pub fn new(executable: PathBuf, options: LoadOptions) -> Self {
        Self {
            executable,
            options,
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .request_timeout(self.options.navigation_timeout.max(MIN_REQUEST_TIMEOUT))
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .context("failed to launch Chromium")?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {e}");
                }
            }
        });

        Ok((browser, handle))
    }

    async fn capture(&self, browser: &Browser, url: &str) -> Result<LoadedPage> {
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        page.set_user_agent(self.options.user_agent.clone())
            .await
            .context("failed to set user agent")?;

        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::json!({ "referer": url }),
        )))
        .await
        .context("failed to set referer header")?;

        let start = Instant::now();
        let timeout = self.options.navigation_timeout;
        match tokio::time::timeout(timeout, navigate(&page, url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => bail!("navigation failed: {e:#}"),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
        debug!(url, elapsed_ms = start.elapsed().as_millis() as u64, "page loaded");

        match self.options.wait {
            WaitStrategy::NetworkIdle => {
                let remaining = timeout.saturating_sub(start.elapsed());
                wait_for_network_idle(&page, self.options.idle_window, remaining).await;
            }
            WaitStrategy::DomContent => tokio::time::sleep(self.options.settle_delay).await,
        }

        let cookies = page
            .get_cookies()
            .await
            .context("failed to read cookies")?
            .into_iter()
            .map(|c| Cookie::new(c.name, c.value))
            .collect();

        let user_agent: String = page
            .evaluate("navigator.userAgent")
            .await
            .context("failed to read navigator.userAgent")?
            .into_value()
            .map_err(|e| anyhow!("failed to convert user agent: {e:?}"))?;

        let html = page.content().await.context("failed to get HTML")?;

        let final_url = page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_else(|| url.to_string());

        Ok(LoadedPage {
            html,
            final_url,
            user_agent,
            cookies,
        })
    }
}

#[async_trait]
impl PageLoader for ChromiumLoader {
    async fn load(&self, url: &str) -> Result<LoadedPage> {
        let (mut browser, handler) = self.launch().await?;
        info!(url, "browser launched");

        let outcome = self.capture(&browser, url).await;

        // Release on every path, including failed captures.
        if let Err(e) = browser.close().await {
            warn!("browser close failed, killing: {e}");
            let _ = browser.kill().await;
        }
        let _ = browser.wait().await;
        handler.abort();
        info!(url, ok = outcome.is_ok(), "browser closed");

        outcome
    }
}

/// Navigate away from `about:blank` and wait until the document is complete.
///
/// `Page.navigate` is capped at 30 s inside chromiumoxide, so the navigation
/// is started from script and only the caller's deadline applies.
async fn navigate(page: &Page, url: &str) -> Result<()> {
    let target = serde_json::to_string(url)?;
    page.evaluate_expression(format!("window.location.assign({target})"))
        .await
        .context("failed to start navigation")?;

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        // The old execution context goes away mid-navigation; keep asking.
        let Ok(state) = page
            .evaluate_expression("[location.href, document.readyState]")
            .await
        else {
            continue;
        };
        let Ok((href, ready)) = state.into_value::<(String, String)>() else {
            continue;
        };
        if href.starts_with("chrome-error://") {
            bail!("{url} could not be loaded");
        }
        if href != "about:blank" && ready == "complete" {
            return Ok(());
        }
    }
}

/// Poll resource timing until nothing new has loaded for `idle`.
async fn wait_for_network_idle(page: &Page, idle: Duration, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    let mut last: Option<u64> = None;
    let mut quiet_since = Instant::now();

    while Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        let count = match page
            .evaluate_expression("performance.getEntriesByType('resource').length")
            .await
        {
            Ok(value) => value.into_value::<u64>().ok(),
            Err(e) => {
                debug!("resource count unavailable: {e}");
                None
            }
        };

        if count != last {
            last = count;
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= idle {
            debug!("network idle reached");
            return;
        }
    }
    warn!("network idle not reached before timeout, capturing anyway");
}
