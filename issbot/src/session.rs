//! Browser session lifecycle: launch an isolated, evasion-hardened Chromium
//! context over CDP and tear it down again.

use crate::errors::RobotError;
use crate::types::Mode;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A user agent matching the pinned Chromium major; the default CDP one
/// advertises "HeadlessChrome" and gets flagged immediately.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// The portal is a Brazilian municipal system and renders differently for
/// other locales.
const PORTAL_LOCALE: &str = "pt-BR";

/// Runs before any page script: drops the `navigator.webdriver` flag and
/// fills in the properties headless contexts leave empty.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['pt-BR', 'pt', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3] });
window.chrome = window.chrome || { runtime: {} };
"#;

/// One isolated browser process plus its single working page.
///
/// The CDP event handler runs on a dedicated tokio task for the session's
/// whole lifetime; `close` aborts it after the browser is released.
pub struct ChromiumSession {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ChromiumSession {
    pub async fn launch(mode: Mode) -> Result<Self, RobotError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1280, 720)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--lang={PORTAL_LOCALE}"))
            .arg(format!("--user-agent={USER_AGENT}"));

        if mode == Mode::Interactive {
            builder = builder.with_head();
        } else {
            builder = builder.arg("--window-size=1920,1080");
        }

        let config = builder
            .build()
            .map_err(|e| RobotError::Session(format!("browser config rejected: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RobotError::Session(format!("browser launch failed: {e}")))?;
        info!(?mode, "browser session launched");

        // Drain CDP events until the transport drops.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("CDP event handler finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(RobotError::Session(format!("cannot open page: {e}")));
            }
        };

        // Must land before the first navigation to the portal.
        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
        {
            handler_task.abort();
            return Err(RobotError::Session(format!(
                "stealth script injection failed: {e}"
            )));
        }

        Ok(Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Best-effort teardown; safe to call more than once and never fails.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!("browser close reported: {e}");
            }
            if let Err(e) = browser.wait().await {
                warn!("browser wait reported: {e}");
            }
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
        info!("browser session closed");
    }
}
