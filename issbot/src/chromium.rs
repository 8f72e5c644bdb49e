//! CDP-backed implementation of the portal capability traits.
//!
//! All DOM probing runs through evaluated page scripts so CSS and XPath
//! locators go through one code path, and waits are bounded polling loops on
//! top of those probes (chromiumoxide exposes no stable wait API).

use crate::errors::RobotError;
use crate::selectors::is_xpath;
use crate::session::ChromiumSession;
use crate::surface::{KeypadKey, PortalDriver, PortalSurface};
use crate::types::Mode;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::page::ScreenshotParams;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Probe cadence for visibility/detachment/url waits.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opens one hardened Chromium context per task attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumDriver;

impl ChromiumDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortalDriver for ChromiumDriver {
    #[instrument(skip(self))]
    async fn open(&self, mode: Mode) -> Result<Box<dyn PortalSurface>, RobotError> {
        let session = ChromiumSession::launch(mode).await?;
        Ok(Box::new(session))
    }
}

/// Serialize a locator into a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Expression resolving a locator to an element (or null).
fn lookup_js(locator: &str) -> String {
    let lit = js_string(locator);
    if is_xpath(locator) {
        format!(
            "document.evaluate({lit}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        )
    } else {
        format!("document.querySelector({lit})")
    }
}

#[derive(Debug, Deserialize)]
struct KeyProbe {
    visible: bool,
    label: String,
}

impl ChromiumSession {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, RobotError> {
        let result = self
            .page()
            .evaluate(script)
            .await
            .map_err(|e| RobotError::Session(format!("script evaluation failed: {e}")))?;
        result
            .into_value::<T>()
            .map_err(|e| RobotError::Internal(format!("unexpected evaluation result: {e}")))
    }

    async fn probe_visible(&self, locator: &str) -> Result<bool, RobotError> {
        let lookup = lookup_js(locator);
        self.eval(format!(
            "(() => {{ const el = {lookup}; return el !== null && el.offsetParent !== null; }})()"
        ))
        .await
    }

    async fn probe_attached(&self, locator: &str) -> Result<bool, RobotError> {
        let lookup = lookup_js(locator);
        self.eval(format!("(() => {{ return {lookup} !== null; }})()"))
            .await
    }
}

#[async_trait]
impl PortalSurface for ChromiumSession {
    #[instrument(skip(self))]
    async fn goto(&self, url: &str) -> Result<(), RobotError> {
        self.page()
            .goto(url)
            .await
            .map_err(|e| RobotError::PortalOffline(format!("navigation to {url} failed: {e}")))?
            .wait_for_navigation()
            .await
            .map_err(|e| RobotError::PortalOffline(format!("navigation to {url} stalled: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, RobotError> {
        self.eval("window.location.href".to_string()).await
    }

    async fn title(&self) -> Result<String, RobotError> {
        self.eval("document.title || ''".to_string()).await
    }

    async fn body_text(&self) -> Result<String, RobotError> {
        self.eval("(document.body && document.body.innerText) || ''".to_string())
            .await
    }

    async fn fill(&self, locator: &str, value: &str) -> Result<(), RobotError> {
        let lookup = lookup_js(locator);
        let lit = js_string(value);
        // The portal is an ASP.NET WebForms app; it only picks the value up
        // when input/change fire.
        let filled: bool = self
            .eval(format!(
                "(() => {{
                    const el = {lookup};
                    if (el === null) return false;
                    el.value = {lit};
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()"
            ))
            .await?;
        if filled {
            Ok(())
        } else {
            Err(RobotError::Navigation(format!(
                "element to fill not found: {locator}"
            )))
        }
    }

    async fn click(&self, locator: &str) -> Result<(), RobotError> {
        let lookup = lookup_js(locator);
        let clicked: bool = self
            .eval(format!(
                "(() => {{ const el = {lookup}; if (el === null) return false; el.click(); return true; }})()"
            ))
            .await?;
        if clicked {
            Ok(())
        } else {
            Err(RobotError::Navigation(format!(
                "element to click not found: {locator}"
            )))
        }
    }

    async fn is_visible(&self, locator: &str) -> Result<bool, RobotError> {
        self.probe_visible(locator).await
    }

    async fn text_of(&self, locator: &str) -> Result<String, RobotError> {
        let lookup = lookup_js(locator);
        self.eval(format!(
            "(() => {{
                const el = {lookup};
                if (el === null) return '';
                return (el.value || el.innerText || '').trim();
            }})()"
        ))
        .await
    }

    async fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<bool, RobotError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.probe_visible(locator).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(locator, ?timeout, "element did not become visible");
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn wait_detached(&self, locator: &str, timeout: Duration) -> Result<bool, RobotError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.probe_attached(locator).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(locator, ?timeout, "element never detached");
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn wait_url_contains(
        &self,
        fragment: &str,
        timeout: Duration,
    ) -> Result<bool, RobotError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.current_url().await?.contains(fragment) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    #[instrument(skip(self, path))]
    async fn set_upload_file(&self, locator: &str, path: &Path) -> Result<(), RobotError> {
        // The upload input is hidden behind a styled button; setting the
        // files over CDP skips the picker dialog entirely.
        let element = self
            .page()
            .find_element(locator)
            .await
            .map_err(|e| RobotError::Navigation(format!("upload input {locator} not found: {e}")))?;
        let params = SetFileInputFilesParams::builder()
            .files(vec![path.display().to_string()])
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(RobotError::Internal)?;
        self.page()
            .execute(params)
            .await
            .map_err(|e| RobotError::Session(format!("file injection failed: {e}")))?;
        Ok(())
    }

    async fn keypad_candidates(&self, keys: &[String]) -> Result<Vec<KeypadKey>, RobotError> {
        let mut candidates = Vec::with_capacity(keys.len());
        for key in keys {
            let lookup = lookup_js(key);
            let probe: KeyProbe = self
                .eval(format!(
                    "(() => {{
                        const el = {lookup};
                        if (el === null || el.offsetParent === null) {{
                            return {{ visible: false, label: '' }};
                        }}
                        const label = el.getAttribute('value') || el.innerText || '';
                        return {{ visible: true, label: label.trim() }};
                    }})()"
                ))
                .await?;
            if probe.visible {
                candidates.push(KeypadKey {
                    label: probe.label,
                    target: key.clone(),
                });
            }
        }
        Ok(candidates)
    }

    async fn click_keypad(&self, target: &str) -> Result<(), RobotError> {
        self.click(target).await
    }

    async fn status_rows(&self, locator: &str) -> Result<Vec<String>, RobotError> {
        let lit = js_string(locator);
        self.eval(format!(
            "Array.from(document.querySelectorAll({lit}))
                .map(row => (row.innerText || '').trim())
                .filter(text => text.length > 0)"
        ))
        .await
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, RobotError> {
        self.page()
            .screenshot(ScreenshotParams::builder().build())
            .await
            .map_err(|e| RobotError::Session(format!("screenshot failed: {e}")))
    }

    async fn close(&self) {
        self.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_js_picks_xpath_evaluation_for_xpath_locators() {
        let js = lookup_js("//tr[contains(., '1')]//input");
        assert!(js.contains("document.evaluate"));
        let js = lookup_js("#txtLogin");
        assert!(js.contains("document.querySelector"));
    }

    #[test]
    fn locators_are_escaped_into_js_literals() {
        let js = lookup_js("//tr[contains(., 'o\"brien')]");
        assert!(js.contains("\\\""));
    }
}
