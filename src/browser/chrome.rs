use crate::error::{Result, ScrapeError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOAD_EVENT_TIMEOUT: Duration = Duration::from_secs(30);

const INSTALL_HINT: &str = "Chrome not found. You can:\n\
     - Install Chrome: https://www.google.com/chrome/\n\
     - Ubuntu/Debian: sudo apt install chromium-browser\n\
     - Fedora: sudo dnf install chromium\n\
     - macOS: brew install --cask google-chrome\n\
     - Or specify path: --chrome-path /path/to/chrome\n\
     - Linux sandbox issue? Try: --no-sandbox";

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Launch a private Chrome instance
    Sandboxed {
        chrome_path: Option<PathBuf>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Attach to an existing Chrome started with --remote-debugging-port
    DebugPort(u16),
}

impl ChromeDriver {
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Fresh profile per run so no cookies or dismissed modals carry over
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                let temp_dir = std::env::temp_dir()
                    .join(format!("tm-class-scraper-{}-{}", std::process::id(), unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    ScrapeError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config.user_data_dir(&temp_dir);

                if no_sandbox {
                    config = config.no_sandbox();
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => {
                            config = config.chrome_executable(path);
                        }
                        Err(e) => {
                            log::warn!("Auto-download failed ({}), trying system Chrome", e);
                        }
                    }
                }

                let config = config
                    .build()
                    .map_err(|e| ScrapeError::LaunchFailed(format!("{}. \n\n{}", e, INSTALL_HINT)))?;

                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| ScrapeError::LaunchFailed(format!("{}. \n\n{}", e, INSTALL_HINT)))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // drain browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    ScrapeError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                             Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // drain browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// First page that is not a chrome:// tab, creating one if none exists
    async fn get_active_page(&self) -> Result<Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Other(format!("Failed to create page: {}", e)))
    }

    /// Navigate the active page and wait for its load event
    pub async fn navigate(&self, url: &str) -> Result<Page> {
        use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};

        log::info!("Navigating to {}", url);
        let page = self.get_active_page().await?;

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ScrapeError::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        // Subscribe before navigating so the event cannot be missed
        let mut load_events = page.event_listener::<EventLoadEventFired>().await?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();
            if error_str.contains("oneshot canceled") {
                ScrapeError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                ScrapeError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(ScrapeError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(LOAD_EVENT_TIMEOUT, load_events.next()).await {
            Ok(Some(_)) => log::debug!("Page load event fired"),
            Ok(None) => log::warn!("Load event stream closed before the page loaded"),
            Err(_) => {
                return Err(ScrapeError::NavigationFailed(format!(
                    "Timed out after {:?} waiting for {} to load",
                    LOAD_EVENT_TIMEOUT, url
                )));
            }
        }

        Ok(page)
    }

    /// Close the browser connection
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| ScrapeError::Other(e.to_string()))?;
        if let Err(e) = self.browser.wait().await {
            log::debug!("Browser process wait failed: {}", e);
        }
        Ok(())
    }

    /// Ensure Chrome is installed, downloading if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| ScrapeError::Other("Cannot determine cache directory".to_string()))?
            .join("tm-class-scraper")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| ScrapeError::Other(format!("Failed to create cache dir: {}", e)))?;

        let marker = cache_dir.join(".downloaded");
        if marker.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir) {
                return Ok(executable);
            }
        }

        log::info!("Downloading Chrome for Testing into {}", cache_dir.display());
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| ScrapeError::Other(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| ScrapeError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&marker, info.executable_path.to_string_lossy().as_bytes())
            .await
            .map_err(|e| ScrapeError::Other(format!("Failed to write marker: {}", e)))?;

        log::info!("Chrome downloaded to {}", info.executable_path.display());

        Ok(info.executable_path)
    }

    /// The marker written after a download records the executable path;
    /// fall back to the usual layouts if it is missing or stale.
    fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        if let Ok(recorded) = std::fs::read_to_string(cache_dir.join(".downloaded")) {
            let recorded = PathBuf::from(recorded.trim());
            if recorded.exists() {
                return Some(recorded);
            }
        }

        let possible_paths = [
            cache_dir.join("chrome"),
            cache_dir.join("chrome.exe"),
            cache_dir.join("Google Chrome.app/Contents/MacOS/Google Chrome"),
            cache_dir.join("chrome-linux/chrome"),
            cache_dir.join("chrome-mac/Chromium.app/Contents/MacOS/Chromium"),
            cache_dir.join("chrome-win/chrome.exe"),
        ];

        possible_paths.into_iter().find(|path| path.exists())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
