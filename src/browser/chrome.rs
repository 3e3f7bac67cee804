// spider_chrome re-exports chromiumoxide API
use crate::error::{JourneyError, Result};
use crate::surface::Surface;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Sandboxed mode - launches Chrome using system installation
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Advanced mode - connects to existing Chrome on debug port
    DebugPort(u16),
}

#[derive(Debug, Deserialize)]
struct ElementOrigin {
    x: f64,
    y: f64,
}

impl ChromeDriver {
    /// Helper method to get the current active page, excluding Chrome's new-tab-page
    async fn get_active_page(&self) -> Result<chromiumoxide::page::Page> {
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
            .map_err(|e| JourneyError::Other(format!("Failed to create page: {}", e)))
    }

    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory per instance so sessions never share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                let temp_dir = std::env::temp_dir().join(format!("journey-chrome-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    JourneyError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config
                    .user_data_dir(&temp_dir)
                    // prototypes render through WebGL
                    .arg("--use-gl=angle")
                    .arg("--use-angle=gl-egl")
                    .arg(format!("--user-agent={}", USER_AGENT));

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => {
                            config = config.chrome_executable(path);
                        }
                        Err(e) => {
                            log::warn!("Auto-download failed ({}), trying system Chrome...", e);
                        }
                    }
                }

                let config = config.build().map_err(|e| {
                    JourneyError::LaunchFailed(format!(
                        "{}. Install Chrome, pass --chrome-path, or try --no-sandbox on Linux",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
                    JourneyError::LaunchFailed(format!(
                        "{}. Install Chrome, pass --chrome-path, or try --no-sandbox on Linux",
                        e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    JourneyError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                             Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Navigate to a URL and wait for the load event
    pub async fn navigate(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};

        // Normalize URL - add https:// if no protocol specified
        let normalized_url = if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("file://")
            && !url.starts_with("about:")
            && !url.starts_with("data:")
        {
            log::debug!("Normalizing URL: {} -> https://{}", url, url);
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        log::info!("Navigating to: {}", normalized_url);
        let page = self.get_active_page().await?;

        let params = NavigateParams::builder()
            .url(&normalized_url)
            .build()
            .map_err(|e| {
                JourneyError::NavigationFailed(format!("Invalid URL {}: {}", normalized_url, e))
            })?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();

            // "oneshot canceled" means the browser connection is gone
            if error_str.contains("oneshot canceled") {
                JourneyError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                JourneyError::NavigationFailed(format!(
                    "Failed to navigate to {}: {}",
                    normalized_url, e
                ))
            }
        })?;

        if let Some(error_text) = response.result.error_text.clone() {
            log::error!("Navigation error from browser: {}", error_text);
            return Err(JourneyError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        let load_result = tokio::time::timeout(
            Duration::from_secs(30),
            page.event_listener::<EventLoadEventFired>(),
        )
        .await;

        match load_result {
            Ok(Ok(_)) => log::debug!("Page load event listener attached"),
            Ok(Err(e)) => log::warn!("Could not wait for load event: {}", e),
            Err(_) => {
                return Err(JourneyError::NavigationFailed(format!(
                    "Timed out waiting for {} to load",
                    normalized_url
                )));
            }
        }

        // Additional small delay for page state to stabilize
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    /// Get current URL
    pub async fn current_url(&self) -> Result<String> {
        let page = self.get_active_page().await?;

        let url = page
            .url()
            .await
            .map_err(|e| JourneyError::Other(e.to_string()))?
            .ok_or(JourneyError::NoPage)?;

        Ok(url)
    }

    /// Take a PNG screenshot of the current page
    pub async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        let page = self.get_active_page().await?;

        let params = chromiumoxide::page::ScreenshotParams::builder()
            .full_page(full_page)
            .build();

        page.screenshot(params)
            .await
            .map_err(|e| JourneyError::Other(format!("Failed to take screenshot: {}", e)))
    }

    /// Press and release the left mouse button at page coordinates
    pub async fn click(&self, x: f64, y: f64) -> Result<()> {
        let page = self.get_active_page().await?;

        for event_type in [
            DispatchMouseEventType::MouseMoved,
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let params = DispatchMouseEventParams::builder()
                .r#type(event_type)
                .x(x)
                .y(y)
                .button(MouseButton::Left)
                .click_count(1)
                .build()
                .map_err(|e| JourneyError::Other(format!("Invalid mouse event: {}", e)))?;

            page.execute(params).await.map_err(|e| {
                JourneyError::Other(format!("Click at ({}, {}) failed: {}", x, y, e))
            })?;
        }

        log::debug!("Clicked at ({:.1}, {:.1})", x, y);
        Ok(())
    }

    /// Execute JavaScript and return a specific type
    pub async fn execute_script_typed<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
    ) -> Result<T> {
        let page = self.get_active_page().await?;

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| JourneyError::Other(format!("Script execution failed: {}", e)))?;

        result
            .into_value()
            .map_err(|e| JourneyError::Other(format!("Failed to deserialize result: {}", e)))
    }

    /// Check if the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => {
                if let Some(page) = pages.first() {
                    matches!(
                        tokio::time::timeout(Duration::from_secs(2), page.url()).await,
                        Ok(Ok(_))
                    )
                } else {
                    true
                }
            }
            Err(_) => false,
        }
    }

    /// Close the browser connection
    pub async fn close(&mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| JourneyError::Other(e.to_string()))?;
        Ok(())
    }

    /// Ensure Chrome is installed, downloading if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| JourneyError::Other("Cannot determine cache directory".to_string()))?
            .join("journey-webdriver")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| JourneyError::Other(format!("Failed to create cache dir: {}", e)))?;

        let revision_info_path = cache_dir.join(".downloaded");
        if revision_info_path.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir).await {
                return Ok(executable);
            }
        }

        log::info!("Downloading Chrome for Testing (first time only, ~150MB)...");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| JourneyError::Other(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| JourneyError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&revision_info_path, "downloaded")
            .await
            .map_err(|e| JourneyError::Other(format!("Failed to write marker: {}", e)))?;

        log::info!("Chrome downloaded successfully");

        Ok(info.executable_path)
    }

    /// Find Chrome executable in cache directory
    async fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        let possible_paths = vec![
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

#[async_trait]
impl Surface for ChromeDriver {
    async fn capture(&self, full_page: bool) -> Result<Vec<u8>> {
        self.screenshot(full_page).await
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.click(x, y).await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        ChromeDriver::navigate(self, url).await
    }

    async fn current_url(&self) -> Result<String> {
        ChromeDriver::current_url(self).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.get_active_page().await?;

        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| JourneyError::ElementNotFound(selector.to_string()))
    }

    async fn element_origin(&self, selector: &str) -> Result<(f64, f64)> {
        let selector_js = serde_json::to_string(selector)?;
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({selector_js});
                if (!el) return null;
                const rect = el.getBoundingClientRect();
                return {{ x: rect.x + window.scrollX, y: rect.y + window.scrollY }};
            }})()"#
        );

        let origin: Option<ElementOrigin> = self.execute_script_typed(&script).await?;
        origin
            .map(|o| (o.x, o.y))
            .ok_or_else(|| JourneyError::ElementNotFound(selector.to_string()))
    }

    async fn is_alive(&self) -> bool {
        ChromeDriver::is_alive(self).await
    }

    async fn close(&mut self) -> Result<()> {
        ChromeDriver::close(self).await
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
