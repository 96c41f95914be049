//! Headless browser rendering for client-side-only pages.
//!
//! Uses chromiumoxide (CDP). A launched browser lives exactly as long as one
//! acquisition: `BrowserSession` closes it on the normal paths and its
//! `Drop` tears it down when the acquisition is cancelled or panics.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use super::Strategy;
use crate::config::BrowserConfig;
use crate::error::AcquisitionError;
use crate::models::{AcquisitionOutcome, Method};

/// Title/body phrases of interstitial bot challenges.
const CHALLENGE_PHRASES: &[&str] = &[
    "just a moment",
    "checking your browser",
    "verify you are human",
    "attention required",
    "access denied",
    "captcha",
];

/// Removes overlays, paywall and ad nodes and undoes clamp styling in the
/// rendered page before it is captured.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const CLEANUP_SCRIPT: &str = r#"
(() => {
    const patterns = ['paywall', 'subscribe', 'metered', 'piano', 'regwall', 'login-wall',
        'premium-content', 'fade-out', 'gradient-overlay', 'modal', 'overlay', 'popup',
        'cookie', 'consent', 'newsletter', 'advert', 'taboola', 'outbrain'];
    const selector = patterns
        .map(p => `[class*="${p}"], [id*="${p}"]`)
        .join(', ');
    document.querySelectorAll(selector).forEach(el => {
        if (el !== document.body && el !== document.documentElement) el.remove();
    });
    document.querySelectorAll('[style]').forEach(el => {
        const style = el.getAttribute('style').toLowerCase();
        if (style.includes('overflow') || style.includes('max-height') || style.includes('line-clamp')) {
            el.removeAttribute('style');
        }
    });
    document.querySelectorAll('[class]').forEach(el => {
        [...el.classList]
            .filter(c => c === 'truncate' || c === 'overflow-hidden' || c.startsWith('line-clamp'))
            .forEach(c => el.classList.remove(c));
    });
    document.documentElement.style.overflow = 'auto';
    if (document.body) document.body.style.overflow = 'auto';
    return true;
})()
"#;

/// Whether page text looks like a bot challenge rather than content.
pub fn is_challenge(text: &str) -> bool {
    let lower = text.to_lowercase();
    CHALLENGE_PHRASES.iter().any(|p| lower.contains(p))
}

/// How often the page is re-read while a challenge is being waited out.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const CHALLENGE_POLL: Duration = Duration::from_millis(500);

/// Re-read the page text until it no longer looks like a challenge, or give
/// up once `wait` has elapsed. Returns whether the challenge cleared.
///
/// Read failures count as still waiting: the page is usually mid-navigation
/// when the challenge script swaps documents.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
async fn wait_out_challenge<F, Fut>(mut page_text: F, wait: Duration, interval: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, AcquisitionError>>,
{
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match page_text().await {
            Ok(text) if !is_challenge(&text) => return true,
            Ok(_) => {}
            Err(e) => debug!("Page unreadable while challenged: {}", e),
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Renders the page in a real browser engine.
pub struct HeadlessRender {
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    config: BrowserConfig,
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    proxy: Option<String>,
    /// Bounds live browser sessions across every request using this strategy.
    permits: Arc<Semaphore>,
}

impl HeadlessRender {
    pub fn new(config: BrowserConfig, proxy: Option<&str>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            proxy: proxy.map(str::to_string),
            permits,
        }
    }
}

#[async_trait]
impl Strategy for HeadlessRender {
    fn method(&self) -> Method {
        Method::Headless
    }

    async fn acquire(&self, url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AcquisitionError::Internal("browser pool closed".to_string()))?;
        self.render(url).await
    }
}

#[cfg(not(feature = "browser"))]
impl HeadlessRender {
    async fn render(&self, _url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
        Err(AcquisitionError::BrowserUnavailable(
            "browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(feature = "browser")]
mod session {
    use std::future::Future;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::handler::{Handler, HandlerConfig};
    use chromiumoxide::{Browser, BrowserConfig as LaunchConfig, Page};
    use futures::StreamExt;
    use tokio::task::{AbortHandle, JoinHandle};
    use tracing::{debug, info, warn};
    use url::Url;

    use super::{is_challenge, wait_out_challenge, HeadlessRender, CHALLENGE_POLL, CLEANUP_SCRIPT};
    use crate::config::BrowserConfig;
    use crate::error::AcquisitionError;
    use crate::http_client::HttpClient;
    use crate::identity::BROWSER;
    use crate::models::AcquisitionOutcome;

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    const CHROME_COMMANDS: &[&str] = &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];

    /// Evasions applied once the page has a document.
    const STEALTH_SCRIPTS: &[&str] = &[
        "Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });",
        "window.chrome = window.chrome || { runtime: {}, loadTimes: function() {}, csi: function() {}, app: {} };",
        "Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'], configurable: true });",
    ];

    const PAGE_TEXT_SCRIPT: &str =
        "document.title + '\\n' + (document.body ? document.body.innerText.slice(0, 4000) : '')";

    const SCROLL_SCRIPT: &str =
        "window.scrollTo(0, document.body ? document.body.scrollHeight / 2 : 0); true";

    /// Budget for closing a remote tab after the session was dropped.
    const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Find a Chrome executable: configured path, well-known locations, then `PATH`.
    pub(super) fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = configured {
            if path.exists() {
                return Some(path.to_path_buf());
            }
            warn!("Configured Chrome path {} does not exist", path.display());
        }

        for path in CHROME_PATHS {
            let p = Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Some(p.to_path_buf());
            }
        }

        CHROME_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok())
    }

    fn cdp_error(context: &str, err: impl std::fmt::Display) -> AcquisitionError {
        AcquisitionError::Network(format!("{}: {}", context, err))
    }

    /// One browser, its CDP handler task and the page being rendered.
    pub struct BrowserSession {
        browser: Option<Browser>,
        handler: JoinHandle<()>,
        page: Option<Page>,
        remote: bool,
    }

    impl BrowserSession {
        /// Launch a local browser, or connect to `remote_url` when configured,
        /// and open a blank page.
        pub async fn open(
            config: &BrowserConfig,
            proxy: Option<&str>,
        ) -> Result<Self, AcquisitionError> {
            let (browser, mut handler, remote) = match config.remote_url.as_deref() {
                Some(remote_url) => {
                    let (browser, handler) = connect_remote(remote_url, config).await?;
                    (browser, handler, true)
                }
                None => {
                    let (browser, handler) = launch(config, proxy).await?;
                    (browser, handler, false)
                }
            };

            let handler = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let mut session = Self {
                browser: Some(browser),
                handler,
                page: None,
                remote,
            };
            let page = session
                .browser()?
                .new_page("about:blank")
                .await
                .map_err(|e| cdp_error("failed to open page", e))?;
            session.page = Some(page);
            Ok(session)
        }

        fn browser(&self) -> Result<&Browser, AcquisitionError> {
            self.browser
                .as_ref()
                .ok_or_else(|| AcquisitionError::Internal("browser already closed".to_string()))
        }

        fn page(&self) -> Result<&Page, AcquisitionError> {
            self.page
                .as_ref()
                .ok_or_else(|| AcquisitionError::Internal("browser page already closed".to_string()))
        }

        async fn eval_string(&self, script: &str) -> Result<String, AcquisitionError> {
            self.page()?
                .evaluate(script)
                .await
                .map_err(|e| cdp_error("script failed", e))?
                .into_value::<String>()
                .map_err(|e| cdp_error("unexpected script result", e))
        }

        /// Close the page and, for launched browsers, the browser itself.
        pub async fn close(mut self) {
            if let Some(page) = self.page.take() {
                let _ = page.close().await;
            }
            if self.remote {
                return;
            }
            if let Some(browser) = self.browser.as_mut() {
                if let Err(e) = browser.close().await {
                    debug!("Browser close failed: {}", e);
                }
                let _ = browser.wait().await;
            }
        }
    }

    impl Drop for BrowserSession {
        fn drop(&mut self) {
            let handler = self.handler.abort_handle();
            let browser = self.browser.take();
            match self.page.take() {
                // A remote browser outlives the session, so its tab must be
                // closed explicitly, and that needs the handler running.
                Some(page) if self.remote => release_in_background(
                    async move {
                        if let Err(e) = page.close().await {
                            debug!("Remote page close failed: {}", e);
                        }
                        drop(browser);
                    },
                    handler,
                ),
                // Dropping a launched `Browser` kills its child process.
                _ => {
                    drop(browser);
                    handler.abort();
                }
            }
        }
    }

    /// Run `release` on the current runtime, then stop the CDP handler.
    /// Outside a runtime the handler is stopped at once.
    pub(super) fn release_in_background<F>(release: F, handler: AbortHandle)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(RELEASE_TIMEOUT, release).await.is_err() {
                        debug!("Remote page close timed out");
                    }
                    handler.abort();
                });
            }
            Err(_) => handler.abort(),
        }
    }

    async fn launch(
        config: &BrowserConfig,
        proxy: Option<&str>,
    ) -> Result<(Browser, Handler), AcquisitionError> {
        let chrome_path = find_chrome(config.chrome_path.as_deref()).ok_or_else(|| {
            AcquisitionError::BrowserUnavailable(
                "Chrome/Chromium not found. Install it or set CHROME_PATH".to_string(),
            )
        })?;
        info!("Launching browser (headless={})", config.headless);

        let mut builder = LaunchConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_secs(config.navigation_timeout_secs));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(proxy) = proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("--safebrowsing-disable-auto-update")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let launch_config = builder.build().map_err(|e| {
            AcquisitionError::BrowserUnavailable(format!("invalid browser config: {}", e))
        })?;

        Browser::launch(launch_config).await.map_err(|e| {
            AcquisitionError::BrowserUnavailable(format!("failed to launch browser: {}", e))
        })
    }

    /// Connect to a remote Chrome instance through its `/json/version` endpoint.
    async fn connect_remote(
        url: &str,
        config: &BrowserConfig,
    ) -> Result<(Browser, Handler), AcquisitionError> {
        info!("Connecting to remote browser at {}", url);
        let timeout = Duration::from_secs(config.navigation_timeout_secs);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = HttpClient::new(timeout)
            .map_err(|e| AcquisitionError::BrowserUnavailable(e.to_string()))?;
        let (_, body) = client.get_text(&version_url, &[]).await.map_err(|e| {
            AcquisitionError::BrowserUnavailable(format!("remote browser unreachable: {}", e))
        })?;
        let version: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            AcquisitionError::BrowserUnavailable(format!("bad browser version info: {}", e))
        })?;
        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AcquisitionError::BrowserUnavailable(
                    "No webSocketDebuggerUrl in response".to_string(),
                )
            })?;

        let handler_config = HandlerConfig {
            request_timeout: timeout,
            ..Default::default()
        };
        Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| {
                AcquisitionError::BrowserUnavailable(format!("failed to connect: {}", e))
            })
    }

    impl HeadlessRender {
        pub(super) async fn render(&self, url: &Url) -> Result<AcquisitionOutcome, AcquisitionError> {
            let session = BrowserSession::open(&self.config, self.proxy.as_deref()).await?;
            let result = self.render_in(&session, url).await;
            session.close().await;
            result
        }

        async fn render_in(
            &self,
            session: &BrowserSession,
            url: &Url,
        ) -> Result<AcquisitionOutcome, AcquisitionError> {
            let config = &self.config;
            let page = session.page()?;

            page.execute(SetUserAgentOverrideParams::new(BROWSER.user_agent().to_string()))
                .await
                .map_err(|e| cdp_error("failed to set user agent", e))?;

            info!("Rendering {}", url);
            let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);
            match tokio::time::timeout(navigation_timeout, page.goto(url.as_str())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(cdp_error("navigation failed", e)),
                Err(_) => {
                    return Err(AcquisitionError::Timeout {
                        after: navigation_timeout,
                    })
                }
            }

            for script in STEALTH_SCRIPTS {
                if let Err(e) = page.evaluate(*script).await {
                    debug!("Stealth script injection skipped: {}", e);
                }
            }

            tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;

            if is_challenge(&session.eval_string(PAGE_TEXT_SCRIPT).await?) {
                info!("Challenge page on {}, waiting for it to clear", url);
                let wait = Duration::from_secs(config.challenge_wait_secs);
                let read = move || session.eval_string(PAGE_TEXT_SCRIPT);
                if !wait_out_challenge(read, wait, CHALLENGE_POLL).await {
                    debug!("Challenge still up after {}s", config.challenge_wait_secs);
                }
            }

            if let Err(e) = page.evaluate(SCROLL_SCRIPT).await {
                debug!("Scroll skipped: {}", e);
            }
            tokio::time::sleep(Duration::from_millis(config.scroll_wait_ms)).await;

            if let Err(e) = page.evaluate(CLEANUP_SCRIPT).await {
                warn!("Cleanup script failed on {}: {}", url, e);
            }

            let title = session.eval_string("document.title").await?;
            if is_challenge(&title) {
                return Err(AcquisitionError::Challenge(title));
            }

            let html = session
                .eval_string("document.documentElement.outerHTML")
                .await?;
            Ok(AcquisitionOutcome::success(html, 200))
        }
    }
}
