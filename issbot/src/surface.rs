//! Capability traits the phases are written against.
//!
//! Every interaction with the live portal page goes through [`PortalSurface`]
//! and sessions are produced by a [`PortalDriver`]. The orchestrator and the
//! phases never touch the browser directly, which keeps the whole flow
//! testable against a synthetic portal and isolates the automation logic from
//! the CDP plumbing.

use crate::errors::RobotError;
use crate::types::Mode;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// One visible key of the portal's virtual keypad: the label it currently
/// shows (typically two digit candidates, e.g. "3 ou 7") and a click target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadKey {
    pub label: String,
    pub target: String,
}

/// A live page inside an isolated browser session.
///
/// Wait methods resolve to `Ok(true)` when the condition was met within the
/// timeout and `Ok(false)` when it was not; `Err` is reserved for transport
/// failures. Classification of a miss is the caller's business.
#[async_trait]
pub trait PortalSurface: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), RobotError>;
    async fn current_url(&self) -> Result<String, RobotError>;
    async fn title(&self) -> Result<String, RobotError>;
    async fn body_text(&self) -> Result<String, RobotError>;

    async fn fill(&self, locator: &str, value: &str) -> Result<(), RobotError>;
    async fn click(&self, locator: &str) -> Result<(), RobotError>;
    async fn is_visible(&self, locator: &str) -> Result<bool, RobotError>;
    async fn text_of(&self, locator: &str) -> Result<String, RobotError>;

    async fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<bool, RobotError>;
    async fn wait_detached(&self, locator: &str, timeout: Duration) -> Result<bool, RobotError>;
    async fn wait_url_contains(&self, fragment: &str, timeout: Duration)
        -> Result<bool, RobotError>;

    /// Inject a file into an upload input without driving a picker dialog.
    async fn set_upload_file(&self, locator: &str, path: &Path) -> Result<(), RobotError>;

    /// Read the currently visible keypad keys and their labels. Re-queried
    /// from the live page on every call: the portal re-renders the digit
    /// assignment on each load.
    async fn keypad_candidates(&self, keys: &[String]) -> Result<Vec<KeypadKey>, RobotError>;
    async fn click_keypad(&self, target: &str) -> Result<(), RobotError>;

    /// Text of every row in the status grid addressed by `locator`.
    async fn status_rows(&self, locator: &str) -> Result<Vec<String>, RobotError>;

    async fn screenshot_png(&self) -> Result<Vec<u8>, RobotError>;

    /// Tear the session down. Idempotent and infallible by contract; a
    /// best-effort release even when an earlier phase left the page in an
    /// inconsistent state.
    async fn close(&self);
}

/// Produces isolated sessions, one per task attempt.
#[async_trait]
pub trait PortalDriver: Send + Sync {
    async fn open(&self, mode: Mode) -> Result<Box<dyn PortalSurface>, RobotError>;
}
