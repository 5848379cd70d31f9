//! Headless browser sessions used to print documents into PDF.
//!
//! The converter never talks to a browser directly. It goes through three
//! small traits so tests can substitute a fake browser and so the session
//! lifecycle lives in one place:
//!
//! ```text
//! BrowserLauncher::acquire ─▶ BrowserSession ─▶ BrowserPage::goto / print
//!                                   │
//!                                   └─ release (always, via with_session)
//! ```
//!
//! [`with_session`] is the only way the crate uses a session: it acquires
//! one, runs the given work, and releases the session whether the work
//! succeeded or not.

pub mod chrome;

use crate::error::ConvertError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

pub use chrome::ChromeLauncher;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Wait for the DOM to be parsed.
    pub dom_content_loaded: bool,
    /// Wait until the page stopped loading resources.
    ///
    /// [`ChromeLauncher`] approximates this with the window `load` event
    /// followed by `document.fonts.ready`. Requests a script starts after
    /// `load`, such as lazy images or `fetch` calls, are not awaited.
    pub network_idle: bool,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            dom_content_loaded: true,
            network_idle: true,
        }
    }
}

/// Print settings for [`BrowserPage::print`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfOptions {
    /// Include CSS backgrounds.
    pub print_background: bool,
    /// Use the page size declared by the document's `@page` rule.
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            print_background: true,
            prefer_css_page_size: true,
        }
    }
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a fresh browser session.
    ///
    /// Fails with [`ConvertError::BrowserLaunchFailure`] when no browser can
    /// be found or started.
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, ConvertError>;
}

/// A running browser.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a new page.
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, ConvertError>;

    /// Shut the browser down. Calling it more than once is harmless.
    async fn release(&self) -> Result<(), ConvertError>;
}

/// A page inside a [`BrowserSession`].
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Load `url` and wait as described by `wait`.
    async fn goto(&self, url: &str, wait: WaitPolicy) -> Result<(), ConvertError>;

    /// Print the loaded document.
    async fn print(&self, options: PdfOptions) -> Result<Vec<u8>, ConvertError>;
}

/// Run `work` inside a freshly acquired session, then release it.
///
/// The session is released on both paths. When `work` fails its error is
/// returned even if releasing fails too; a release failure after successful
/// work is returned as the result.
///
/// ```rust,no_run
/// use deckconv::browser::{with_session, ChromeLauncher, PdfOptions, WaitPolicy};
///
/// # async fn run() -> Result<(), deckconv::ConvertError> {
/// let launcher = ChromeLauncher::default();
/// let url = "data:text/html,<h1>Hi</h1>".to_string();
/// let pdf = with_session(&launcher, move |session| {
///     Box::pin(async move {
///         let page = session.new_page().await?;
///         page.goto(&url, WaitPolicy::default()).await?;
///         page.print(PdfOptions::default()).await
///     })
/// })
/// .await?;
/// assert!(pdf.starts_with(b"%PDF-"));
/// # Ok(())
/// # }
/// ```
pub async fn with_session<T, F>(launcher: &dyn BrowserLauncher, work: F) -> Result<T, ConvertError>
where
    F: for<'s> FnOnce(&'s dyn BrowserSession) -> BoxFuture<'s, Result<T, ConvertError>>,
{
    let session = launcher.acquire().await?;
    debug!("Browser session acquired");

    let outcome = work(session.as_ref()).await;
    let released = session.release().await;
    debug!("Browser session released");

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            warn!("Failed to release browser after error: {}", release_err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    struct FakeLauncher {
        counters: Arc<Counters>,
        fail_release: bool,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        fail_release: bool,
    }

    struct FakePage;

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn acquire(&self) -> Result<Box<dyn BrowserSession>, ConvertError> {
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                counters: Arc::clone(&self.counters),
                fail_release: self.fail_release,
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn new_page(&self) -> Result<Box<dyn BrowserPage>, ConvertError> {
            Ok(Box::new(FakePage))
        }

        async fn release(&self) -> Result<(), ConvertError> {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
            if self.fail_release {
                return Err(ConvertError::Internal("browser would not close".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserPage for FakePage {
        async fn goto(&self, url: &str, _wait: WaitPolicy) -> Result<(), ConvertError> {
            if url.contains("broken") {
                return Err(ConvertError::RasterizationFailure("navigation failed".into()));
            }
            Ok(())
        }

        async fn print(&self, _options: PdfOptions) -> Result<Vec<u8>, ConvertError> {
            Ok(b"%PDF-1.7 fake".to_vec())
        }
    }

    fn launcher(fail_release: bool) -> (FakeLauncher, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            FakeLauncher {
                counters: Arc::clone(&counters),
                fail_release,
            },
            counters,
        )
    }

    async fn print(launcher: &FakeLauncher, url: &str) -> Result<Vec<u8>, ConvertError> {
        let url = url.to_string();
        with_session(launcher, move |session| {
            Box::pin(async move {
                let page = session.new_page().await?;
                page.goto(&url, WaitPolicy::default()).await?;
                page.print(PdfOptions::default()).await
            })
        })
        .await
    }

    #[test]
    fn defaults_wait_for_everything_and_print_backgrounds() {
        let wait = WaitPolicy::default();
        assert!(wait.dom_content_loaded && wait.network_idle);
        let pdf = PdfOptions::default();
        assert!(pdf.print_background && pdf.prefer_css_page_size);
    }

    #[tokio::test]
    async fn released_after_success() {
        let (launcher, counters) = launcher(false);
        let pdf = print(&launcher, "data:text/html,ok").await.unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn released_after_failure() {
        let (launcher, counters) = launcher(false);
        let err = print(&launcher, "data:text/html,broken").await.unwrap_err();
        assert!(matches!(err, ConvertError::RasterizationFailure(_)));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn work_error_wins_over_release_error() {
        let (launcher, counters) = launcher(true);
        let err = tokio_test::block_on(print(&launcher, "broken")).unwrap_err();
        assert!(matches!(err, ConvertError::RasterizationFailure(_)));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_error_surfaces_after_success() {
        let (launcher, _) = launcher(true);
        let err = tokio_test::block_on(print(&launcher, "fine")).unwrap_err();
        assert!(matches!(err, ConvertError::Internal(_)));
    }
}
