//! Per-key browsing session: navigation with retries and login.

use crate::browser::{
    first_present, settle, Browser, BrowserError, ClickMethod, Page, Target, WaitUntil,
};
use crate::catalog::selectors::{hachette, login, search};
use crate::config::{Config, Waits};
use crate::error::CrawlError;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Navigating { attempt: u32 },
    LoggingIn,
    /// Logged in and on a page with the search box.
    Authenticated,
    /// Loaded anonymously; ready to search without login.
    Browsing,
    LoginFailed,
}

/// Result of [`Session::establish`] that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    LoginFailed,
}

/// One isolated browsing context, owned by exactly one lookup key.
pub struct Session {
    page: Box<dyn Page>,
    state: SessionState,
}

impl Session {
    /// Opens a fresh browser context.
    pub async fn open(browser: &dyn Browser) -> Result<Self, CrawlError> {
        let page = browser.new_context().await?;
        Ok(Self { page, state: SessionState::Unauthenticated })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Loads the catalog and, when `authenticated`, logs in.
    ///
    /// Navigation failures are errors once every attempt is used up; a login
    /// that does not go through is [`Readiness::LoginFailed`] and is never
    /// retried.
    pub async fn establish(
        &mut self,
        config: &Config,
        authenticated: bool,
    ) -> Result<Readiness, CrawlError> {
        self.navigate_to(&config.base_url, &config.waits).await?;

        if !authenticated {
            self.transition(SessionState::Browsing);
            return Ok(Readiness::Ready);
        }

        self.transition(SessionState::LoggingIn);
        let logged_in = match self.login(config).await {
            Ok(logged_in) => logged_in,
            Err(e) => {
                warn!("Login aborted: {}", e);
                false
            }
        };

        if logged_in {
            self.transition(SessionState::Authenticated);
            Ok(Readiness::Ready)
        } else {
            self.transition(SessionState::LoginFailed);
            Ok(Readiness::LoginFailed)
        }
    }

    /// Logs in to a customer-number form, such as the Hachette trade
    /// site, on the page already loaded.
    pub async fn establish_with_customer(
        &mut self,
        customer: &str,
        waits: &Waits,
    ) -> Result<Readiness, CrawlError> {
        self.transition(SessionState::LoggingIn);

        if self.customer_login(customer, waits).await? {
            self.transition(SessionState::Authenticated);
            Ok(Readiness::Ready)
        } else {
            self.transition(SessionState::LoginFailed);
            Ok(Readiness::LoginFailed)
        }
    }

    /// Releases the browser context.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to release session: {}", e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Loads `url`, retrying with exponential backoff.
    pub async fn navigate_to(&mut self, url: &str, waits: &Waits) -> Result<(), CrawlError> {
        let attempts = waits.nav_retries.max(1);
        let mut last_error: Option<BrowserError> = None;

        for attempt in 1..=attempts {
            self.transition(SessionState::Navigating { attempt });

            match self.page.goto(url, WaitUntil::DomContentLoaded).await {
                Ok(()) => {
                    settle(Duration::from_millis(waits.load_settle_ms)).await;
                    return Ok(());
                }
                Err(e) => {
                    if attempt < attempts {
                        let delay = waits.backoff(attempt);
                        warn!("Retry {} for {}: {} (waiting {:?})", attempt, url, e, delay);
                        settle(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let source = last_error.unwrap_or_else(|| BrowserError::Navigation(url.to_string()));
        warn!("Failed to load {} after {} attempts", url, attempts);

        Err(CrawlError::NavigationExhausted { url: url.to_string(), attempts, source })
    }

    async fn customer_login(&self, customer: &str, waits: &Waits) -> Result<bool, BrowserError> {
        let page = self.page();
        page.wait_for_network_idle(Duration::from_millis(waits.network_idle_ms)).await?;

        let Some(input) = first_present(page, &hachette::CUSTOMER_INPUT).await? else {
            warn!("Customer number input field not found");
            return Ok(false);
        };
        debug!("Customer number input: {}", input);
        page.fill(input, customer).await?;

        let Some(submit) = first_present(page, &hachette::SUBMIT).await? else {
            warn!("Login button not found");
            return Ok(false);
        };
        debug!("Login button: {}", submit);
        page.click(submit, ClickMethod::Direct).await?;

        page.wait_for_network_idle(Duration::from_millis(waits.network_idle_ms)).await?;
        settle(Duration::from_millis(waits.load_settle_ms)).await;
        info!("Submitted customer number");
        Ok(true)
    }

    /// Fills and submits the login form. `Ok(false)` is a failed login.
    async fn login(&self, config: &Config) -> Result<bool, BrowserError> {
        let waits = &config.waits;
        let page = self.page();

        let Some((email, password)) = config.credentials() else {
            warn!("No credentials configured, cannot log in");
            return Ok(false);
        };

        if !page
            .wait_for(&Target::css(login::SECTION), Duration::from_millis(waits.login_form_ms))
            .await?
        {
            warn!("Login form did not appear");
            return Ok(false);
        }

        let Some(email_input) = first_present(page, &login::EMAIL).await? else {
            warn!("Email input field not found");
            return Ok(false);
        };
        debug!("Email input: {}", email_input);
        page.fill(email_input, email).await?;
        settle(Duration::from_millis(waits.type_pause_ms)).await;

        let Some(password_input) = first_present(page, &login::PASSWORD).await? else {
            warn!("Password input field not found");
            return Ok(false);
        };
        debug!("Password input: {}", password_input);
        page.fill(password_input, password).await?;
        settle(Duration::from_millis(waits.type_pause_ms)).await;

        let Some(submit) = first_present(page, &login::SUBMIT).await? else {
            warn!("Login button not found");
            return Ok(false);
        };
        debug!("Login button: {}", submit);
        page.click(submit, ClickMethod::Direct).await?;

        if page
            .wait_for(&Target::css(login::LANDMARK), Duration::from_millis(waits.login_landmark_ms))
            .await?
        {
            info!("Logged in to Edelweiss");
            return Ok(true);
        }

        debug!("No dashboard landmark after login, opening dashboard");
        if let Err(e) = page.goto(&config.dashboard_url, WaitUntil::DomContentLoaded).await {
            warn!("Dashboard navigation failed: {}", e);
            return Ok(false);
        }
        settle(Duration::from_millis(waits.load_settle_ms)).await;

        let confirmed = page
            .wait_for(&Target::css(search::INPUT), Duration::from_millis(waits.login_confirm_ms))
            .await?;

        if confirmed {
            info!("Logged in to Edelweiss (confirmed via dashboard)");
        } else {
            warn!("Login may have failed: dashboard not accessible");
        }
        Ok(confirmed)
    }
}
