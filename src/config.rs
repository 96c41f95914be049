//! Configuration management for clearread using the prefer crate.
//!
//! Strategy order, per-step thresholds and endpoints are policy: they come
//! from a config file (discovered by prefer or given explicitly) and can be
//! overridden from the environment.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::DEFAULT_SEARCH_HOST;
use crate::models::Method;
use crate::quality::QualityPolicy;

/// Default reader proxy; the target URL is appended verbatim.
pub const DEFAULT_READER_ENDPOINT: &str = "https://r.jina.ai/";

/// Default Wayback availability API.
pub const DEFAULT_ARCHIVE_ENDPOINT: &str = "https://archive.org/wayback/available";

/// One step of the escalation: which strategy, how long it may take and the
/// quality floor its output must clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPolicy {
    pub method: Method,
    pub timeout_secs: u64,
    pub min_text_length: usize,
    #[serde(default)]
    pub min_paragraphs: usize,
}

impl StepPolicy {
    /// Built-in policy for a method.
    pub fn default_for(method: Method) -> Self {
        let (timeout_secs, min_text_length, min_paragraphs) = match method {
            Method::Live => (60, 500, 3),
            Method::Mercenary => (30, 200, 0),
            Method::Headless => (60, 200, 0),
            Method::Archive => (30, 100, 0),
        };
        Self {
            method,
            timeout_secs,
            min_text_length,
            min_paragraphs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn quality(&self) -> QualityPolicy {
        QualityPolicy::new(self.min_text_length, self.min_paragraphs)
    }
}

fn default_steps() -> Vec<StepPolicy> {
    Method::ALL.into_iter().map(StepPolicy::default_for).collect()
}

/// Direct fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    /// Timeout for each individual request, in seconds.
    pub request_timeout_secs: u64,
    /// Host used to build the browser profile's site-search referer.
    pub search_host: String,
    /// Try the social-preview identities when both primary identities are blocked.
    pub social_fallback: bool,
    /// Minimum body length for a social-preview response to count.
    pub min_fallback_body: usize,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            search_host: DEFAULT_SEARCH_HOST.to_string(),
            social_fallback: true,
            min_fallback_body: 500,
        }
    }
}

/// External readability proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Bodies shorter than this are treated as failures.
    pub min_body_length: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_READER_ENDPOINT.to_string(),
            timeout_secs: 25,
            min_body_length: 100,
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window (default: true).
    pub headless: bool,
    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    pub remote_url: Option<String>,
    /// Explicit Chrome/Chromium executable.
    pub chrome_path: Option<PathBuf>,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// Maximum browser sessions alive at once across all requests.
    pub max_concurrent: usize,
    pub navigation_timeout_secs: u64,
    /// Fixed wait after navigation for client-side rendering.
    pub settle_ms: u64,
    /// Extra wait granted to an interstitial challenge page.
    pub challenge_wait_secs: u64,
    /// Wait after scrolling for lazy content.
    pub scroll_wait_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            remote_url: None,
            chrome_path: None,
            chrome_args: Vec::new(),
            max_concurrent: 2,
            navigation_timeout_secs: 30,
            settle_ms: 3000,
            challenge_wait_secs: 10,
            scroll_wait_ms: 1500,
        }
    }
}

/// Archive snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Availability API; `?url=<target>` is appended.
    pub endpoint: String,
    pub lookup_timeout_secs: u64,
    pub snapshot_timeout_secs: u64,
    /// Fetch the raw `id_` capture instead of the toolbar-wrapped page.
    pub raw_snapshot: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ARCHIVE_ENDPOINT.to_string(),
            lookup_timeout_secs: 10,
            snapshot_timeout_secs: 15,
            raw_snapshot: true,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Proxy for every outbound HTTP request (e.g., "socks5://127.0.0.1:1080").
    pub socks_proxy: Option<String>,
    /// Ordered escalation steps.
    pub steps: Vec<StepPolicy>,
    pub direct: DirectConfig,
    pub reader: ReaderConfig,
    pub browser: BrowserConfig,
    pub archive: ArchiveConfig,
    /// File this configuration was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            socks_proxy: None,
            direct: DirectConfig::default(),
            reader: ReaderConfig::default(),
            browser: BrowserConfig::default(),
            archive: ArchiveConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no file is found or it cannot be parsed.
    pub async fn load() -> Self {
        match prefer::load("clearread").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    /// Defaults with environment overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        // CLEARREAD_ORDER - comma separated methods, reorders and subsets steps
        if let Ok(order) = env::var("CLEARREAD_ORDER") {
            if !order.trim().is_empty() {
                match parse_order(&order) {
                    Ok(methods) => self.steps = self.reordered(&methods),
                    Err(e) => warn!("Ignoring CLEARREAD_ORDER: {}", e),
                }
            }
        }

        // SOCKS_PROXY - route every HTTP strategy through a proxy
        if let Ok(proxy) = env::var("SOCKS_PROXY") {
            if !proxy.is_empty() {
                self.socks_proxy = Some(proxy);
            }
        }

        if let Ok(endpoint) = env::var("READER_ENDPOINT") {
            if !endpoint.is_empty() {
                self.reader.endpoint = endpoint;
            }
        }

        if let Ok(endpoint) = env::var("ARCHIVE_ENDPOINT") {
            if !endpoint.is_empty() {
                self.archive.endpoint = endpoint;
            }
        }

        // BROWSER_URL - connect to a remote DevTools endpoint instead of launching
        if let Ok(url) = env::var("BROWSER_URL") {
            if !url.is_empty() {
                self.browser.remote_url = Some(url);
            }
        }

        if let Ok(path) = env::var("CHROME_PATH") {
            if !path.is_empty() {
                self.browser.chrome_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(max) = env::var("BROWSER_MAX_CONCURRENT") {
            match max.parse::<usize>() {
                Ok(n) if n > 0 => self.browser.max_concurrent = n,
                _ => warn!("Ignoring BROWSER_MAX_CONCURRENT={}", max),
            }
        }

        self
    }

    /// Steps for `methods`, in that order, keeping configured policies where
    /// they exist.
    pub fn reordered(&self, methods: &[Method]) -> Vec<StepPolicy> {
        methods
            .iter()
            .map(|m| {
                self.steps
                    .iter()
                    .find(|s| s.method == *m)
                    .cloned()
                    .unwrap_or_else(|| StepPolicy::default_for(*m))
            })
            .collect()
    }

    /// Step policy for `method`, if it is part of the escalation.
    pub fn step(&self, method: Method) -> Option<&StepPolicy> {
        self.steps.iter().find(|s| s.method == method)
    }

    /// Serialize the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Parse a comma separated method list, dropping duplicates.
pub fn parse_order(order: &str) -> Result<Vec<Method>, String> {
    let mut methods = Vec::new();
    for part in order.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let method: Method = part.parse()?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err("no methods listed".to_string());
    }
    Ok(methods)
}
