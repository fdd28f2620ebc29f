//! Chromium backend over the Chrome DevTools Protocol (chromiumoxide).

use super::script;
use super::{Browser, BrowserError, ClickMethod, Page, Result, Target, WaitUntil};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser as CdpBrowser, BrowserConfig, Handler};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Options for launching Chrome.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for a single page navigation.
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            sandbox: true,
            window_width: 1366,
            window_height: 900,
            navigation_timeout: Duration::from_secs(60),
        }
    }
}

/// A launched Chrome process. Shared by every key of a batch; each key gets
/// its own browser context from [`Browser::new_context`].
pub struct ChromiumBrowser {
    browser: Arc<CdpBrowser>,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumBrowser {
    /// Launches Chrome with the given options.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .request_timeout(options.navigation_timeout)
            // Hide navigator.webdriver from the catalog's bot checks
            .arg("--disable-blink-features=AutomationControlled");

        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;
        let (browser, handler) =
            CdpBrowser::launch(config).await.map_err(|e| BrowserError::Launch(e.to_string()))?;

        info!("Launched Chrome (headless: {})", options.headless);

        Ok(Self {
            browser: Arc::new(browser),
            handler_task: spawn_handler_task(handler),
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Closes the browser process and stops the CDP event loop.
    pub async fn shutdown(self) {
        if let Err(e) = self.browser.execute(CloseParams::default()).await {
            debug!("Browser close returned: {}", e);
        }
        self.handler_task.abort();
        info!("Chrome shut down");
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("CDP handler event error: {}", e);
            }
        }
    })
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_context(&self) -> Result<Box<dyn Page>> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::Context(e.to_string()))?
            .result
            .browser_context_id;

        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(context_id.clone());

        let page = match self.browser.new_page(params).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&self.browser, context_id).await;
                return Err(BrowserError::Context(format!("Failed to open page: {}", e)));
            }
        };

        debug!("Opened browser context {:?}", context_id);

        Ok(Box::new(ChromiumPage {
            browser: Arc::clone(&self.browser),
            page,
            context_id,
            navigation_timeout: self.navigation_timeout,
            next_token: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }))
    }
}

async fn dispose_context(browser: &CdpBrowser, context_id: BrowserContextId) {
    if let Err(e) = browser.execute(DisposeBrowserContextParams::new(context_id)).await {
        warn!("Failed to dispose browser context: {}", e);
    }
}

/// A page living in its own browser context.
pub struct ChromiumPage {
    browser: Arc<CdpBrowser>,
    page: chromiumoxide::Page,
    context_id: BrowserContextId,
    navigation_timeout: Duration,
    next_token: AtomicU64,
    closed: AtomicBool,
}

impl ChromiumPage {
    async fn eval<T: DeserializeOwned>(&self, js: String) -> Result<T> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    /// Marks the target element and returns a selector addressing only it.
    async fn mark(&self, target: &Target) -> Result<String> {
        let token = format!("t{}", self.next_token.fetch_add(1, Ordering::Relaxed));
        match self.eval::<Option<bool>>(script::mark(target, &token)).await? {
            Some(true) => Ok(token),
            _ => Err(BrowserError::ElementNotFound(target.to_string())),
        }
    }

    async fn unmark(&self, token: &str) {
        if let Err(e) = self.eval::<bool>(script::unmark(token)).await {
            debug!("Failed to clear element marker: {}", e);
        }
    }

    async fn element(&self, token: &str, target: &Target) -> Result<chromiumoxide::Element> {
        self.page
            .find_element(script::marker_selector(token))
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", target, e)))
    }

}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str, wait: WaitUntil) -> Result<()> {
        debug!("Navigating to {} ({:?})", url, wait);

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(BrowserError::Navigation(format!("{}: {}", url, e))),
            Err(_) => {
                // Fragment-only navigations never fire a load event
                if self.url().await.ok().as_deref() != Some(url) {
                    return Err(BrowserError::Navigation(format!(
                        "{}: timed out after {:?}",
                        url, self.navigation_timeout
                    )));
                }
            }
        }

        if wait == WaitUntil::NetworkIdle {
            self.wait_for_network_idle(self.navigation_timeout).await?;
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if !self.eval::<bool>(script::network_idle(timeout_ms)).await? {
            debug!("Network did not settle within {:?}", timeout);
        }
        Ok(())
    }

    async fn count(&self, target: &Target) -> Result<usize> {
        Ok(self.eval::<Option<usize>>(script::count(target)).await?.unwrap_or(0))
    }

    async fn is_enabled(&self, target: &Target) -> Result<bool> {
        Ok(self.eval::<Option<bool>>(script::is_enabled(target)).await?.unwrap_or(false))
    }

    async fn fill(&self, target: &Target, value: &str) -> Result<()> {
        match self.eval::<Option<bool>>(script::fill(target, value)).await? {
            Some(true) => Ok(()),
            _ => Err(BrowserError::ElementNotFound(target.to_string())),
        }
    }

    async fn press_key(&self, target: &Target, key: &str) -> Result<()> {
        let token = self.mark(target).await?;
        let result = match self.element(&token, target).await {
            Ok(element) => element
                .press_key(key)
                .await
                .map(|_| ())
                .map_err(|e| BrowserError::Interaction(format!("press {} on {}: {}", key, target, e))),
            Err(e) => Err(e),
        };
        self.unmark(&token).await;
        result
    }

    async fn click(&self, target: &Target, method: ClickMethod) -> Result<()> {
        if method != ClickMethod::Direct {
            return match self.eval::<Option<bool>>(script::click(target, method)).await? {
                Some(true) => Ok(()),
                _ => Err(BrowserError::ElementNotFound(target.to_string())),
            };
        }

        let token = self.mark(target).await?;
        let result = match self.element(&token, target).await {
            Ok(element) => element
                .click()
                .await
                .map(|_| ())
                .map_err(|e| BrowserError::Interaction(format!("click {}: {}", target, e))),
            Err(e) => Err(e),
        };
        self.unmark(&token).await;
        result
    }

    async fn outer_html(&self, target: &Target) -> Result<Option<String>> {
        self.eval(script::outer_html(target)).await
    }

    async fn url(&self) -> Result<String> {
        self.eval("location.href".to_string()).await
    }

    async fn texts(&self, css: &str, visible_only: bool) -> Result<Vec<String>> {
        self.eval(script::texts(css, visible_only)).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let page_result = self
            .page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Context(format!("Failed to close page: {}", e)));

        let dispose_result = self
            .browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Context(format!("Failed to dispose context: {}", e)));

        debug!("Closed browser context {:?}", self.context_id);
        page_result.and(dispose_result)
    }
}
