//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::browser::chromium::LaunchOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog entry page
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Dashboard page, used to confirm a login
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    /// Account email for authenticated extraction
    #[serde(default)]
    pub email: Option<String>,

    /// Account password for authenticated extraction
    #[serde(default)]
    pub password: Option<String>,

    /// Log in before searching (enables summary extraction)
    #[serde(default = "default_true")]
    pub login: bool,

    /// Run Chrome without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Chrome/Chromium executable (auto-detected when unset)
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Keep Chrome's sandbox enabled
    #[serde(default = "default_true")]
    pub sandbox: bool,

    /// Results file, rewritten after every key
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Base delay between keys in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Bounds for every wait in the pipeline
    #[serde(default)]
    pub waits: Waits,

    /// Hachette trade catalog access
    #[serde(default)]
    pub hachette: HachetteConfig,
}

fn default_base_url() -> String {
    "https://www.edelweiss.plus/".to_string()
}

fn default_dashboard_url() -> String {
    "https://www.edelweiss.plus/#dashboard".to_string()
}

fn default_true() -> bool {
    true
}

fn default_output() -> PathBuf {
    PathBuf::from("edelweiss_results.json")
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_delay_jitter_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dashboard_url: default_dashboard_url(),
            email: None,
            password: None,
            login: true,
            headless: true,
            chrome_path: None,
            sandbox: true,
            output: default_output(),
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            format: OutputFormat::Table,
            waits: Waits::default(),
            hachette: HachetteConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("dashboard_url", &self.dashboard_url)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("login", &self.login)
            .field("headless", &self.headless)
            .field("chrome_path", &self.chrome_path)
            .field("sandbox", &self.sandbox)
            .field("output", &self.output)
            .field("delay_ms", &self.delay_ms)
            .field("delay_jitter_ms", &self.delay_jitter_ms)
            .field("format", &self.format)
            .field("waits", &self.waits)
            .field("hachette", &self.hachette)
            .finish()
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("edel-crawler.toml");
        if local_config.exists() {
            debug!("Found edel-crawler.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("edel-crawler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(email) = std::env::var("EDEL_EMAIL") {
            self.email = Some(email);
        }

        if let Ok(password) = std::env::var("EDEL_PASSWORD") {
            self.password = Some(password);
        }

        if let Ok(output) = std::env::var("EDEL_OUTPUT") {
            self.output = PathBuf::from(output);
        }

        if let Ok(delay) = std::env::var("EDEL_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(chrome) = std::env::var("EDEL_CHROME") {
            self.chrome_path = Some(PathBuf::from(chrome));
        }

        if let Ok(customer) = std::env::var("HACHETTE_CUSTOMER") {
            self.hachette.customer_number = Some(customer);
        }

        self
    }

    /// Email and password, when both are configured and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }

    /// Chrome launch settings derived from this configuration.
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            sandbox: self.sandbox,
            navigation_timeout: Duration::from_millis(self.waits.navigation_ms),
            ..LaunchOptions::default()
        }
    }
}

/// Hachette trade catalog settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HachetteConfig {
    pub login_url: String,
    /// Account number typed into the login form
    pub customer_number: Option<String>,
}

impl Default for HachetteConfig {
    fn default() -> Self {
        Self { login_url: "https://ati.hachette.co.nz/login".to_string(), customer_number: None }
    }
}

impl HachetteConfig {
    /// The customer number, when configured and non-empty.
    pub fn customer(&self) -> Option<&str> {
        self.customer_number.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

impl std::fmt::Debug for HachetteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HachetteConfig")
            .field("login_url", &self.login_url)
            .field("customer_number", &self.customer_number.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Wait bounds and settle delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Waits {
    /// Single page load
    pub navigation_ms: u64,
    /// Page load attempts before giving up on a key
    pub nav_retries: u32,
    /// First retry delay; doubles on every further attempt
    pub backoff_ms: u64,
    /// Pause after a page load
    pub load_settle_ms: u64,
    /// First result row to appear
    pub results_ms: u64,
    /// BISAC popover to open
    pub popover_ms: u64,
    /// Title side panel to open
    pub panel_ms: u64,
    pub panel_settle_ms: u64,
    pub expand_settle_ms: u64,
    pub content_settle_ms: u64,
    /// Login form to render
    pub login_form_ms: u64,
    /// Dashboard landmark after submitting credentials
    pub login_landmark_ms: u64,
    /// Search box after re-opening the dashboard
    pub login_confirm_ms: u64,
    /// Network settling after a search
    pub network_idle_ms: u64,
    pub clear_pause_ms: u64,
    pub type_pause_ms: u64,
    /// Catalog page to load after picking a catalog link
    pub catalog_ms: u64,
}

impl Default for Waits {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            nav_retries: 3,
            backoff_ms: 2_000,
            load_settle_ms: 2_000,
            results_ms: 15_000,
            popover_ms: 3_000,
            panel_ms: 8_000,
            panel_settle_ms: 3_000,
            expand_settle_ms: 2_000,
            content_settle_ms: 2_000,
            login_form_ms: 10_000,
            login_landmark_ms: 15_000,
            login_confirm_ms: 5_000,
            network_idle_ms: 10_000,
            clear_pause_ms: 1_000,
            type_pause_ms: 500,
            catalog_ms: 10_000,
        }
    }
}

impl Waits {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
