//! Scripted browser for driving the pipeline without Chrome.
//!
//! Pages are plain HTML strings evaluated with scraper on every call. Clicks
//! on elements with a known `id` either layer extra markup over the page (a
//! popover or side panel) or replace the page body (a form submit). Escape
//! removes the layers; Enter in the keyword box shows the results page.

#![allow(dead_code)]

use async_trait::async_trait;
use edel_crawler::browser::{Browser, BrowserError, ClickMethod, Page, Result, Target, WaitUntil};
use edel_crawler::config::{Config, HachetteConfig, Waits};
use scraper::{ElementRef, Html, Selector};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://edelweiss.test/";
pub const DASHBOARD_URL: &str = "https://edelweiss.test/#dashboard";

pub const RESULTS: &str = include_str!("../fixtures/search_results.html");

pub const SEARCH_PAGE: &str = r#"
    <header class="appHeader___p2Lx1">
      <input name="keywords" type="text" placeholder="Search titles, authors, ISBNs">
    </header>
    <main class="resultsList___Vd0sQ"></main>
"#;

pub const LOGIN_PAGE: &str = r#"
    <section class="login">
      <input name="email" type="text" placeholder="Email">
      <input name="pword" type="password">
      <button type="submit" id="sign-in">Sign In</button>
    </section>
"#;

pub const HACHETTE_LOGIN_URL: &str = "https://hachette.test/login";
pub const HACHETTE_CATALOG_URL: &str = "https://hachette.test/catalogue/HNZ-2026-01";

pub const HACHETTE_CATALOG: &str = include_str!("../fixtures/hachette_catalog.html");

pub const HACHETTE_LOGIN: &str = r#"
    <form class="login">
      <label>Customer number <input type="text" name="customerNumber"></label>
      <button type="submit" id="hachette-login">Log in</button>
    </form>
"#;

pub const HACHETTE_INDEX: &str = r#"
    <ul class="catalogues">
      <li><a id="cat-hcb" href="/catalogue/HCB-2025-12">12. December 2025 HCB</a></li>
      <li><a id="cat-hnz" href="/catalogue/HNZ-2026-01">01. January 2026 HNZ</a></li>
    </ul>
"#;

pub const POPOVER: &str = r#"
    <div class="MuiPopover-paper">
      <ul>
        <li>BISAC Subjects</li>
        <li>JUVENILE FICTION / Fantasy &amp; Magic</li>
        <li>JUVENILE FICTION / Books &amp; Libraries</li>
      </ul>
    </div>
"#;

pub const DESCRIPTION: &str = "When twelve-year-old Evan discovers a hidden library in the \
    woods, he finds shelves of books that seem to remember every reader who ever opened them.";

pub fn title_panel() -> String {
    format!(
        r#"
    <div class="rightPanel___Cl_TH">
      <button aria-label="Content">Content</button>
      <div role="tabpanel" id="title-references-tabpanel-0">
        <div class="MuiBox-root css-old1by"><div><p>{}</p></div></div>
      </div>
    </div>
"#,
        DESCRIPTION
    )
}

/// What a click on an element does.
#[derive(Debug, Clone)]
pub enum OnClick {
    /// Adds markup on top of the page until Escape.
    Overlay(String),
    /// Replaces the page body.
    Replace(String),
    /// Follows a link: new address and body.
    Navigate { url: String, html: String },
}

/// Behaviour of the pages handed out for one context.
#[derive(Debug, Clone)]
pub struct FakeSite {
    /// Navigations that fail before one succeeds
    pub nav_failures: u32,
    pub landing: String,
    pub dashboard: Option<String>,
    /// Shown after Enter in the keyword box
    pub results: Option<String>,
    /// Keyed by element id
    pub clicks: Vec<(String, OnClick)>,
    /// Element ids whose direct clicks are intercepted
    pub blocked_direct: Vec<String>,
    /// Selectors whose markup cannot be read back
    pub failing_reads: Vec<String>,
}

impl FakeSite {
    /// Anonymous catalog: the landing page already has the search box.
    pub fn anonymous(results: &str) -> Self {
        Self {
            nav_failures: 0,
            landing: SEARCH_PAGE.to_string(),
            dashboard: None,
            results: Some(results.to_string()),
            clicks: Vec::new(),
            blocked_direct: Vec::new(),
            failing_reads: Vec::new(),
        }
    }

    /// Catalog behind a login form that leads to the search box.
    pub fn with_login(results: &str) -> Self {
        Self {
            landing: LOGIN_PAGE.to_string(),
            dashboard: Some(SEARCH_PAGE.to_string()),
            ..Self::anonymous(results)
        }
        .on_click("sign-in", OnClick::Replace(SEARCH_PAGE.to_string()))
    }

    /// Hachette trade site: customer login, catalog index, one catalog.
    pub fn hachette() -> Self {
        Self { landing: HACHETTE_LOGIN.to_string(), results: None, ..Self::anonymous(SEARCH_PAGE) }
            .on_click("hachette-login", OnClick::Replace(HACHETTE_INDEX.to_string()))
            .on_click(
                "cat-hnz",
                OnClick::Navigate {
                    url: HACHETTE_CATALOG_URL.to_string(),
                    html: HACHETTE_CATALOG.to_string(),
                },
            )
    }

    /// Every navigation fails.
    pub fn unreachable() -> Self {
        Self { nav_failures: u32::MAX, ..Self::anonymous(SEARCH_PAGE) }
    }

    pub fn landing(mut self, html: &str) -> Self {
        self.landing = html.to_string();
        self
    }

    pub fn failing_navigations(mut self, count: u32) -> Self {
        self.nav_failures = count;
        self
    }

    pub fn on_click(mut self, id: &str, action: OnClick) -> Self {
        self.clicks.push((id.to_string(), action));
        self
    }

    pub fn block_direct_click(mut self, id: &str) -> Self {
        self.blocked_direct.push(id.to_string());
        self
    }

    pub fn failing_read(mut self, css: &str) -> Self {
        self.failing_reads.push(css.to_string());
        self
    }

    /// Results fixture with the BISAC popover wired to the first row.
    pub fn with_popover(self) -> Self {
        self.on_click("bisac-0", OnClick::Overlay(POPOVER.to_string()))
    }
}

/// Hands out one scripted page per context, in queue order.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    sites: Arc<Mutex<VecDeque<FakeSite>>>,
    events: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn new(sites: Vec<FakeSite>) -> Self {
        Self { sites: Arc::new(Mutex::new(sites.into())), events: Arc::default() }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_events(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn opened(&self) -> usize {
        self.count_events("open")
    }

    pub fn closed(&self) -> usize {
        self.count_events("close")
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_context(&self) -> Result<Box<dyn Page>> {
        let site = self
            .sites
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BrowserError::Context("no more contexts".to_string()))?;

        self.events.lock().unwrap().push("open".to_string());
        Ok(Box::new(FakePage::new(site, self.events.clone())))
    }
}

struct PageState {
    url: String,
    body: String,
    overlays: Vec<String>,
    nav_failures: u32,
}

pub struct FakePage {
    site: FakeSite,
    state: Mutex<PageState>,
    events: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    fn new(site: FakeSite, events: Arc<Mutex<Vec<String>>>) -> Self {
        let state = PageState {
            url: "about:blank".to_string(),
            body: String::new(),
            overlays: Vec::new(),
            nav_failures: site.nav_failures,
        };
        Self { site, state: Mutex::new(state), events }
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn document(&self) -> Html {
        let state = self.state.lock().unwrap();
        Html::parse_document(&format!(
            "<html><body>{}{}</body></html>",
            state.body,
            state.overlays.concat()
        ))
    }

    fn parse(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| BrowserError::Evaluation(format!("{}: {:?}", css, e)))
    }

    fn matches<'a>(doc: &'a Html, target: &Target) -> Result<Vec<ElementRef<'a>>> {
        let selector = Self::parse(&target.css)?;

        let mut found: Vec<ElementRef<'a>> = match &target.scope {
            Some(scope) => {
                let scope_selector = Self::parse(&scope.css)?;
                match doc.select(&scope_selector).nth(scope.index) {
                    Some(root) => root.select(&selector).collect(),
                    None => Vec::new(),
                }
            }
            None => doc.select(&selector).collect(),
        };

        if let Some(text) = &target.text {
            found.retain(|el| el.text().collect::<String>().contains(text.as_str()));
        }
        Ok(found)
    }

    /// Id (or tag) and attributes of the `nth` match.
    fn resolve(&self, target: &Target) -> Result<(String, Option<String>, bool)> {
        let doc = self.document();
        let found = Self::matches(&doc, target)?;
        let el = found
            .get(target.nth)
            .ok_or_else(|| BrowserError::ElementNotFound(target.to_string()))?;

        let value = el.value();
        let label = value.id().map(|id| format!("#{}", id)).unwrap_or_else(|| value.name().to_string());
        Ok((label, value.id().map(str::to_string), value.attr("name") == Some("keywords")))
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _wait: WaitUntil) -> Result<()> {
        self.log(format!("goto {}", url));

        let mut state = self.state.lock().unwrap();
        if state.nav_failures > 0 {
            state.nav_failures -= 1;
            return Err(BrowserError::Navigation(format!("{}: net::ERR_CONNECTION_RESET", url)));
        }

        state.body = match (&self.site.dashboard, url.ends_with("#dashboard")) {
            (Some(dashboard), true) => dashboard.clone(),
            _ => self.site.landing.clone(),
        };
        state.overlays.clear();
        state.url = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn count(&self, target: &Target) -> Result<usize> {
        let doc = self.document();
        Ok(Self::matches(&doc, target)?.len())
    }

    async fn is_enabled(&self, target: &Target) -> Result<bool> {
        let doc = self.document();
        let found = Self::matches(&doc, target)?;
        Ok(found.get(target.nth).is_some_and(|el| el.value().attr("disabled").is_none()))
    }

    async fn fill(&self, target: &Target, value: &str) -> Result<()> {
        self.resolve(target)?;
        self.log(format!("fill {}={}", target.css, value));
        Ok(())
    }

    async fn press_key(&self, target: &Target, key: &str) -> Result<()> {
        let (label, _, is_search) = self.resolve(target)?;
        self.log(format!("key {} on {}", key, label));

        let mut state = self.state.lock().unwrap();
        match key {
            "Escape" => state.overlays.clear(),
            "Enter" if is_search => {
                if let Some(results) = &self.site.results {
                    state.body = results.clone();
                }
                state.overlays.clear();
            }
            _ => {}
        }
        Ok(())
    }

    async fn click(&self, target: &Target, method: ClickMethod) -> Result<()> {
        let (label, id, _) = self.resolve(target)?;

        if let Some(id) = &id {
            if method == ClickMethod::Direct && self.site.blocked_direct.contains(id) {
                return Err(BrowserError::Interaction(format!("click on {} intercepted", label)));
            }
        }
        self.log(format!("click {} via {:?}", label, method));

        let action = id.and_then(|id| {
            self.site.clicks.iter().find(|(key, _)| *key == id).map(|(_, action)| action.clone())
        });

        let mut state = self.state.lock().unwrap();
        match action {
            Some(OnClick::Overlay(html)) => state.overlays.push(html),
            Some(OnClick::Replace(html)) => {
                state.body = html;
                state.overlays.clear();
            }
            Some(OnClick::Navigate { url, html }) => {
                state.url = url;
                state.body = html;
                state.overlays.clear();
            }
            None => {}
        }
        Ok(())
    }

    async fn outer_html(&self, target: &Target) -> Result<Option<String>> {
        if self.site.failing_reads.contains(&target.css) {
            return Err(BrowserError::Evaluation(format!("{}: node detached", target)));
        }
        let doc = self.document();
        Ok(Self::matches(&doc, target)?.get(target.nth).map(|el| el.html()))
    }

    async fn url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn texts(&self, css: &str, _visible_only: bool) -> Result<Vec<String>> {
        let doc = self.document();
        let selector = Self::parse(css)?;
        Ok(doc.select(&selector).map(|el| el.text().collect::<String>()).collect())
    }

    async fn close(&self) -> Result<()> {
        self.log("close".to_string());
        Ok(())
    }
}

/// Configuration with every wait and delay zeroed.
pub fn test_config(output: PathBuf) -> Config {
    Config {
        base_url: BASE_URL.to_string(),
        dashboard_url: DASHBOARD_URL.to_string(),
        email: Some("buyer@bookshop.example".to_string()),
        password: Some("hunter2".to_string()),
        output,
        delay_ms: 0,
        delay_jitter_ms: 0,
        waits: Waits {
            navigation_ms: 0,
            nav_retries: 3,
            backoff_ms: 0,
            load_settle_ms: 0,
            results_ms: 0,
            popover_ms: 0,
            panel_ms: 0,
            panel_settle_ms: 0,
            expand_settle_ms: 0,
            content_settle_ms: 0,
            login_form_ms: 0,
            login_landmark_ms: 0,
            login_confirm_ms: 0,
            network_idle_ms: 0,
            clear_pause_ms: 0,
            type_pause_ms: 0,
            catalog_ms: 0,
        },
        hachette: HachetteConfig {
            login_url: HACHETTE_LOGIN_URL.to_string(),
            customer_number: None,
        },
        ..Config::default()
    }
}
