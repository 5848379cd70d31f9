//! Chrome/Chromium/Edge sessions through `headless_chrome`.
//!
//! `headless_chrome` drives the browser over a synchronous DevTools
//! connection, so every call is moved onto the blocking pool with
//! `tokio::task::spawn_blocking`. The executable is located by
//! [`chrome_finder`] unless one is set explicitly.

use super::{BrowserLauncher, BrowserPage, BrowserSession, PdfOptions, WaitPolicy};
use crate::config::DEFAULT_BROWSER_TIMEOUT;
use crate::error::ConvertError;
use async_trait::async_trait;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves once the window `load` event fired and web fonts are ready.
/// Stands in for network idle; requests started after `load` are not seen.
const SETTLE_SCRIPT: &str = r#"new Promise(function (resolve) {
  function fonts() {
    var ready = document.fonts && document.fonts.ready ? document.fonts.ready : Promise.resolve();
    ready.then(function () { resolve(true); }, function () { resolve(true); });
  }
  if (document.readyState === "complete") { fonts(); }
  else { window.addEventListener("load", fonts, { once: true }); }
})"#;

/// Launches a local Chromium-family browser.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    timeout: Option<Duration>,
    sandbox: bool,
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        Self::new(Some(DEFAULT_BROWSER_TIMEOUT))
    }
}

impl ChromeLauncher {
    /// Launcher bounding navigation and printing by `timeout`.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            executable: None,
            timeout,
            sandbox: true,
        }
    }

    /// Use this executable instead of searching for one.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Enable or disable the browser sandbox. Disabling it is needed when
    /// running as root inside most containers.
    pub fn sandbox(mut self, enabled: bool) -> Self {
        self.sandbox = enabled;
        self
    }

    fn resolve_executable(&self) -> Result<PathBuf, ConvertError> {
        if let Some(path) = &self.executable {
            if !path.is_file() {
                return Err(ConvertError::BrowserLaunchFailure(format!(
                    "'{}' does not exist",
                    path.display()
                )));
            }
            return Ok(path.clone());
        }

        match chrome_finder::find_chrome() {
            Ok(path) => Ok(path),
            Err(e) => {
                warn!("{}; trying the automation library's default lookup", e);
                headless_chrome::browser::default_executable().map_err(|fallback| {
                    ConvertError::BrowserLaunchFailure(format!(
                        "{e}. Install Google Chrome, Chromium or Microsoft Edge, or set {}. ({fallback})",
                        chrome_finder::CHROME_PATH_ENV
                    ))
                })
            }
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, ConvertError> {
        let executable = self.resolve_executable()?;
        info!("Launching browser: {}", executable.display());

        let idle = self
            .timeout
            .map_or(DEFAULT_BROWSER_TIMEOUT, |t| t.max(DEFAULT_BROWSER_TIMEOUT));
        let sandbox = self.sandbox;
        let browser = run_blocking("browser launch", move || {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(sandbox)
                .idle_browser_timeout(idle)
                .path(Some(executable))
                .build()
                .map_err(|e| ConvertError::BrowserLaunchFailure(e.to_string()))?;
            Browser::new(options).map_err(|e| ConvertError::BrowserLaunchFailure(format!("{e:#}")))
        })
        .await?;

        Ok(Box::new(ChromeSession {
            browser: Mutex::new(Some(Arc::new(browser))),
            timeout: self.timeout,
        }))
    }
}

/// A running browser process. Dropping the last handle kills it.
pub struct ChromeSession {
    browser: Mutex<Option<Arc<Browser>>>,
    timeout: Option<Duration>,
}

impl ChromeSession {
    fn browser(&self) -> Result<Arc<Browser>, ConvertError> {
        self.browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ConvertError::Internal("browser session already released".into()))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, ConvertError> {
        let browser = self.browser()?;
        let timeout = self.timeout;
        let tab = run_blocking("new tab", move || {
            let tab = browser
                .new_tab()
                .map_err(|e| ConvertError::RasterizationFailure(format!("opening a page: {e:#}")))?;
            if let Some(t) = timeout {
                tab.set_default_timeout(t);
            }
            Ok(tab)
        })
        .await?;

        Ok(Box::new(ChromePage {
            tab,
            timeout: self.timeout,
        }))
    }

    async fn release(&self) -> Result<(), ConvertError> {
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(browser) = browser {
            run_blocking("browser shutdown", move || {
                drop(browser);
                Ok(())
            })
            .await?;
            debug!("Browser closed");
        }
        Ok(())
    }
}

/// One tab.
pub struct ChromePage {
    tab: Arc<Tab>,
    timeout: Option<Duration>,
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&self, url: &str, wait: WaitPolicy) -> Result<(), ConvertError> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        let navigation = run_blocking("navigation", move || {
            tab.navigate_to(&url).map_err(load_failed)?;
            if wait.dom_content_loaded {
                tab.wait_until_navigated().map_err(load_failed)?;
            }
            if wait.network_idle {
                tab.evaluate(SETTLE_SCRIPT, true).map_err(load_failed)?;
            }
            Ok(())
        });
        bounded(self.timeout, "loading the document", navigation).await
    }

    async fn print(&self, options: PdfOptions) -> Result<Vec<u8>, ConvertError> {
        let tab = Arc::clone(&self.tab);
        let printing = run_blocking("printing", move || {
            let pdf_options = PrintToPdfOptions {
                print_background: Some(options.print_background),
                prefer_css_page_size: Some(options.prefer_css_page_size),
                ..Default::default()
            };
            tab.print_to_pdf(Some(pdf_options))
                .map_err(|e| ConvertError::RasterizationFailure(format!("printing: {e:#}")))
        });
        let pdf = bounded(self.timeout, "printing", printing).await?;
        debug!("Printed {} bytes of PDF", pdf.len());
        Ok(pdf)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn load_failed(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::RasterizationFailure(format!("loading the document: {e:#}"))
}

async fn run_blocking<T, F>(what: &'static str, f: F) -> Result<T, ConvertError>
where
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Internal(format!("{what} task panicked: {e}")))?
}

async fn bounded<T>(
    timeout: Option<Duration>,
    what: &str,
    fut: impl std::future::Future<Output = Result<T, ConvertError>>,
) -> Result<T, ConvertError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            ConvertError::RasterizationFailure(format!("{what} timed out after {limit:?}"))
        })?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_executable_must_exist() {
        let launcher = ChromeLauncher::default().with_executable("/definitely/not/chrome");
        let err = launcher.resolve_executable().unwrap_err();
        assert!(matches!(err, ConvertError::BrowserLaunchFailure(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn acquire_with_missing_executable_fails_to_launch() {
        let launcher = ChromeLauncher::new(None).with_executable("/definitely/not/chrome");
        let err = launcher.acquire().await.err().unwrap();
        assert!(matches!(err, ConvertError::BrowserLaunchFailure(_)));
    }

    #[test]
    fn default_launcher_uses_default_timeout_and_sandbox() {
        let launcher = ChromeLauncher::default();
        assert_eq!(launcher.timeout, Some(DEFAULT_BROWSER_TIMEOUT));
        assert!(launcher.sandbox);
        assert!(!ChromeLauncher::default().sandbox(false).sandbox);
    }

    #[tokio::test]
    async fn slow_work_times_out_as_rasterization_failure() {
        let err = bounded(Some(Duration::from_millis(10)), "printing", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ConvertError::RasterizationFailure(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn no_timeout_waits_for_completion() {
        let value = bounded(None, "printing", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
