//! Headless Chromium session used to render listing pages.
//!
//! The journal fills its table of contents client-side, so a plain HTTP fetch
//! returns an empty shell. Each listing page gets a fresh browser session that
//! is closed again on every exit path.

use crate::config::CrawlConfig;
use crate::error::{Result, TocError};
use crate::extract::ARTICLE_SELECTOR;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Interval between checks for the marker element
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolve the browser executable: explicit path, then `CHROMIUM_PATH`.
///
/// Returns `None` to let chromiumoxide search the usual install locations.
pub fn resolve_executable(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_home(path));
    }

    match std::env::var("CHROMIUM_PATH") {
        Ok(raw) if !raw.trim().is_empty() => {
            let path = expand_home(Path::new(raw.trim()));
            if path.exists() {
                info!(path = %path.display(), "Using browser from CHROMIUM_PATH");
                Some(path)
            } else {
                warn!(path = %path.display(), "CHROMIUM_PATH points to a missing file, falling back to auto-detection");
                None
            }
        }
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Desktop viewport matching the window size. Without it every page is
/// emulated at chromiumoxide's 800x600 default.
fn viewport(config: &CrawlConfig) -> Viewport {
    let (width, height) = config.window_size;
    Viewport {
        width,
        height,
        ..Default::default()
    }
}

/// Browser configuration: headless, fixed viewport, spoofed user agent and
/// Chromium's own logging reduced to fatal errors.
fn browser_config(config: &CrawlConfig) -> Result<BrowserConfig> {
    let (width, height) = config.window_size;
    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_secs(30))
        .window_size(width, height)
        .viewport(viewport(config))
        .arg(format!("--user-agent={}", config.user_agent))
        .arg("--disable-gpu")
        .arg("--disable-extensions")
        .arg("--disable-software-rasterizer")
        .arg("--ignore-certificate-errors")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--log-level=3")
        .arg("--silent")
        .arg("--mute-audio");

    if let Some(path) = resolve_executable(config.chrome_path.as_deref()) {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(TocError::Launch)
}

/// One running browser process plus the task driving its DevTools connection.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Start a headless browser.
    ///
    /// # Errors
    ///
    /// Returns [`TocError::Launch`] when the executable cannot be found or
    /// refuses to start. This is not retried.
    pub async fn launch(config: &CrawlConfig) -> Result<Self> {
        let browser_config = browser_config(config)?;

        debug!("Launching headless browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| TocError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let msg = e.to_string();
                    // Events chromiumoxide has no type for surface as deserialisation errors
                    if msg.contains("data did not match any variant") || msg.contains("Failed to deserialize") {
                        trace!(error = %msg, "Ignored unknown CDP message");
                    } else {
                        error!(error = %msg, "Browser handler error");
                    }
                }
            }
            trace!("Browser handler finished");
        });

        Ok(Self { browser, handler })
    }

    /// Render a listing page and return its final markup.
    ///
    /// Waits for the first article container, then scrolls until the page
    /// height stops growing (or the pass limit is hit).
    pub async fn render_listing(&self, url: &Url, config: &CrawlConfig) -> Result<String> {
        let page = self.browser.new_page(url.as_str()).await?;

        let result = async {
            wait_for_selector(&page, ARTICLE_SELECTOR, config.page_timeout).await?;
            scroll_until_stable(&page, config).await?;
            Ok::<_, TocError>(page.content().await?)
        }
        .await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "Failed to close page");
        }
        result
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to wait for browser exit");
        }
        self.handler.abort();
    }
}

/// The few page operations the wait and scroll loops need.
#[allow(async_fn_in_trait)]
pub trait RenderedPage {
    /// Whether `selector` currently matches an element.
    async fn has_element(&self, selector: &str) -> bool;

    /// Current `document.body.scrollHeight` in pixels.
    async fn scroll_height(&self) -> Result<u64>;

    /// Scroll the window to vertical offset `y`.
    async fn scroll_to(&self, y: u64) -> Result<()>;
}

impl RenderedPage for Page {
    async fn has_element(&self, selector: &str) -> bool {
        self.find_element(selector).await.is_ok()
    }

    async fn scroll_height(&self) -> Result<u64> {
        self.evaluate("document.body.scrollHeight")
            .await?
            .into_value::<u64>()
            .map_err(|e| TocError::Browser(format!("Unreadable page height: {}", e)))
    }

    async fn scroll_to(&self, y: u64) -> Result<()> {
        let script = format!("window.scrollTo(0, {});", y);
        self.evaluate(script.as_str()).await?;
        Ok(())
    }
}

/// Poll until `selector` matches an element or `timeout` elapses.
pub async fn wait_for_selector<P: RenderedPage>(page: &P, selector: &str, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    loop {
        if page.has_element(selector).await {
            debug!(selector, elapsed = ?start.elapsed(), "Marker element present");
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(TocError::Timeout {
                selector: selector.to_string(),
                secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Scroll to the bottom in small steps until lazily loaded content stops
/// extending the page.
///
/// Gives up after `max_scroll_passes` passes and treats the page as complete.
pub async fn scroll_until_stable<P: RenderedPage>(page: &P, config: &CrawlConfig) -> Result<()> {
    let step = u64::from(config.scroll_step_px);
    let mut last_height = page.scroll_height().await?;

    for pass in 1..=config.max_scroll_passes {
        let mut y = 0;
        while y < last_height {
            page.scroll_to(y).await?;
            config.scroll_pause.pause().await;
            y += step;
        }

        config.scroll_settle.pause().await;

        let new_height = page.scroll_height().await?;
        if new_height == last_height {
            debug!(pass, height = new_height, "Page height stable");
            return Ok(());
        }
        debug!(pass, from = last_height, to = new_height, "Page grew while scrolling");
        last_height = new_height;
    }

    warn!(
        passes = config.max_scroll_passes,
        height = last_height,
        "Page height never settled, treating content as complete"
    );
    Ok(())
}
