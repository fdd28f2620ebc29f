//! Browser automation seam.
//!
//! The pipeline only talks to the browser through the [`Browser`] and [`Page`]
//! traits, which keeps every interaction flow testable against a scripted page.
//! [`chromium`] provides the production implementation on top of chromiumoxide.

pub mod chromium;
mod script;

pub use chromium::ChromiumBrowser;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Interval between element-presence checks in [`Page::wait_for`].
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors raised by the browser engine.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser context failed: {0}")]
    Context(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("interaction failed: {0}")]
    Interaction(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Load state to wait for after a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Document parsed; scripts may still be loading.
    DomContentLoaded,
    /// Load event fired and network traffic has settled.
    NetworkIdle,
}

/// How a click is delivered to an element.
///
/// Overlays on the catalog pages regularly swallow plain clicks, so callers
/// try these in order until one succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMethod {
    /// Real mouse events at the element's center.
    Direct,
    /// `element.click()` invoked from script.
    Script,
    /// A synthetic bubbling `MouseEvent` dispatched on the element.
    Dispatch,
}

impl ClickMethod {
    /// All activation methods, most faithful first.
    pub const FALLBACK_ORDER: [ClickMethod; 3] =
        [ClickMethod::Direct, ClickMethod::Script, ClickMethod::Dispatch];
}

/// Locates elements on a page.
///
/// Matches `css`, optionally restricted to descendants of the `index`-th
/// element matching a scope selector, optionally filtered to elements whose
/// text contains a substring. `nth` picks among the surviving matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub css: String,
    pub text: Option<String>,
    pub scope: Option<Scope>,
    pub nth: usize,
}

/// Ancestor restriction for a [`Target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub css: String,
    pub index: usize,
}

impl Target {
    pub fn css(css: impl Into<String>) -> Self {
        Self { css: css.into(), text: None, scope: None, nth: 0 }
    }

    /// Keeps only elements whose text contains `text`.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Restricts matching to descendants of the `index`-th `css` match.
    pub fn within(mut self, css: impl Into<String>, index: usize) -> Self {
        self.scope = Some(Scope { css: css.into(), index });
        self
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = nth;
        self
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{}[{}] ", scope.css, scope.index)?;
        }
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.text {
            write!(f, " (text contains '{}')", text)?;
        }
        if self.nth > 0 {
            write!(f, " #{}", self.nth)?;
        }
        Ok(())
    }
}

/// A browser process able to hand out isolated browsing contexts.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a fresh context (own cookies, storage and cache) with one page.
    async fn new_context(&self) -> Result<Box<dyn Page>>;
}

/// One page inside an isolated browsing context.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, wait: WaitUntil) -> Result<()>;

    /// Waits until network activity settles or `timeout` elapses.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// Number of elements matching `target` (ignoring `nth`).
    async fn count(&self, target: &Target) -> Result<usize>;

    async fn is_enabled(&self, target: &Target) -> Result<bool>;

    /// Replaces the value of an input, firing `input` and `change` events.
    async fn fill(&self, target: &Target, value: &str) -> Result<()>;

    async fn press_key(&self, target: &Target, key: &str) -> Result<()>;

    async fn click(&self, target: &Target, method: ClickMethod) -> Result<()>;

    /// Outer HTML of the element, or `None` when nothing matches.
    async fn outer_html(&self, target: &Target) -> Result<Option<String>>;

    /// Address of the document currently loaded.
    async fn url(&self) -> Result<String>;

    /// Text content of every element matching `css`, in document order.
    async fn texts(&self, css: &str, visible_only: bool) -> Result<Vec<String>>;

    /// Closes the page and releases its browsing context.
    async fn close(&self) -> Result<()>;

    /// Polls until `target` is present. `Ok(false)` means the bound elapsed.
    async fn wait_for(&self, target: &Target, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(target).await? > 0 {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Sleeps for a fixed settle delay; zero returns immediately.
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Returns the first candidate present on the page.
pub async fn first_present<'a>(page: &dyn Page, candidates: &'a [Target]) -> Result<Option<&'a Target>> {
    for candidate in candidates {
        if page.count(candidate).await? > 0 {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
