//! Headless browser screenshot capture
//!
//! Uses Chrome DevTools Protocol via chromiumoxide to render each tool's
//! landing page and save a viewport PNG. Compiled in behind the
//! `browser-capture` feature; a stub takes its place when disabled.

use crate::config::CaptureConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Screenshot boundary, mockable for dry runs and tests
#[async_trait]
pub trait ScreenshotCapturer: Send + Sync {
    /// Capture a screenshot of `url`, saving it under `output_dir` with a
    /// filename derived from `tool_name`. Returns the saved file path.
    async fn capture(&self, url: &str, tool_name: &str, output_dir: &Path) -> Result<PathBuf>;

    /// Release browser resources. Safe to call when nothing was launched.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Filename for a captured screenshot
pub fn output_path(output_dir: &Path, tool_name: &str) -> PathBuf {
    let stem = crate::assets::screenshot_filename(tool_name);
    let stem = if stem.is_empty() {
        "tool"
    } else {
        stem.as_str()
    };
    output_dir.join(format!("{}.png", stem))
}

#[cfg(feature = "browser-capture")]
mod browser_impl {
    use super::*;
    use crate::error::Error;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::page::ScreenshotParams;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::timeout;
    use tracing::{debug, info, warn};

    /// Captures screenshots with a lazily-launched headless Chrome instance
    pub struct BrowserCapturer {
        config: CaptureConfig,
        browser: Arc<Mutex<Option<Browser>>>,
        handler_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    }

    impl BrowserCapturer {
        pub fn new(config: CaptureConfig) -> Self {
            Self {
                config,
                browser: Arc::new(Mutex::new(None)),
                handler_handle: Arc::new(Mutex::new(None)),
            }
        }

        /// Launch the browser on first use
        async fn ensure_browser(&self) -> Result<()> {
            let mut browser_guard = self.browser.lock().await;
            if browser_guard.is_some() {
                return Ok(());
            }

            info!("Launching headless Chrome browser...");

            let mut builder = BrowserConfig::builder()
                .window_size(self.config.viewport_width, self.config.viewport_height);

            if self.config.no_sandbox {
                builder = builder.no_sandbox();
            }

            builder = builder
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--disable-extensions");

            let browser_config = builder
                .build()
                .map_err(|e| Error::Capture(format!("Failed to build browser config: {}", e)))?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| Error::Capture(format!("Failed to launch browser: {}", e)))?;

            let handle = tokio::spawn(async move {
                while let Some(result) = handler.next().await {
                    if result.is_err() {
                        break;
                    }
                }
            });

            *browser_guard = Some(browser);
            *self.handler_handle.lock().await = Some(handle);

            info!("Headless browser launched successfully");
            Ok(())
        }
    }

    #[async_trait]
    impl ScreenshotCapturer for BrowserCapturer {
        async fn capture(
            &self,
            url: &str,
            tool_name: &str,
            output_dir: &Path,
        ) -> Result<PathBuf> {
            self.ensure_browser().await?;
            std::fs::create_dir_all(output_dir)?;

            debug!("Capturing screenshot of {}", url);

            let browser_guard = self.browser.lock().await;
            let browser = browser_guard
                .as_ref()
                .ok_or_else(|| Error::Capture("Browser not initialized".to_string()))?;

            let page = browser
                .new_page(url)
                .await
                .map_err(|e| Error::Capture(format!("Failed to create page: {}", e)))?;

            let nav_timeout = Duration::from_millis(self.config.nav_timeout_ms);
            timeout(nav_timeout, page.wait_for_navigation())
                .await
                .map_err(|_| Error::Capture(format!("Page load timeout: {}", url)))?
                .map_err(|e| Error::Capture(format!("Navigation failed: {}", e)))?;

            // Client-rendered pages need a moment after the load event
            if self.config.settle_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
            }

            let path = output_path(output_dir, tool_name);
            page.save_screenshot(ScreenshotParams::builder().full_page(false).build(), &path)
                .await
                .map_err(|e| Error::Capture(format!("Screenshot failed: {}", e)))?;

            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }

            debug!("Saved screenshot to {:?}", path);
            Ok(path)
        }

        async fn close(&self) -> Result<()> {
            let mut browser_guard = self.browser.lock().await;
            if let Some(mut browser) = browser_guard.take() {
                browser
                    .close()
                    .await
                    .map_err(|e| Error::Capture(format!("Failed to close browser: {}", e)))?;
            }

            let mut handle_guard = self.handler_handle.lock().await;
            if let Some(handle) = handle_guard.take() {
                handle.abort();
            }

            Ok(())
        }
    }
}

#[cfg(feature = "browser-capture")]
pub use browser_impl::BrowserCapturer;

/// Stub capturer when the browser-capture feature is disabled
#[cfg(not(feature = "browser-capture"))]
pub struct BrowserCapturer {
    _config: CaptureConfig,
}

#[cfg(not(feature = "browser-capture"))]
impl BrowserCapturer {
    pub fn new(config: CaptureConfig) -> Self {
        Self { _config: config }
    }
}

#[cfg(not(feature = "browser-capture"))]
#[async_trait]
impl ScreenshotCapturer for BrowserCapturer {
    async fn capture(&self, url: &str, _tool_name: &str, _output_dir: &Path) -> Result<PathBuf> {
        Err(crate::error::Error::Capture(format!(
            "Screenshot capture not available for {}. \
             Compile with --features browser-capture to enable headless browser support.",
            url
        )))
    }
}

/// Check if browser capture was compiled in
pub fn is_capture_available() -> bool {
    cfg!(feature = "browser-capture")
}

/// Fabricates a screenshot without launching a browser (dry runs)
pub struct DryRunCapturer;

#[async_trait]
impl ScreenshotCapturer for DryRunCapturer {
    async fn capture(&self, _url: &str, tool_name: &str, output_dir: &Path) -> Result<PathBuf> {
        Ok(output_path(output_dir, tool_name))
    }
}
