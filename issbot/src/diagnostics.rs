//! Diagnostic screenshot persistence.
//!
//! Side channel only: captures are best effort and a failed capture never
//! changes the outcome of a phase.

use crate::surface::PortalSurface;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Captures screenshots for one task, grouped under
/// `<diagnostics_dir>/<task_id>/`.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
    task_id: String,
}

impl Diagnostics {
    pub fn new(dir: &Path, task_id: &str) -> Self {
        Self {
            dir: dir.join(task_id),
            task_id: task_id.to_string(),
        }
    }

    /// Capture the current page into `<stage>_<unix_ts>.png`. Returns the
    /// written path when the capture and write both worked.
    pub async fn capture(&self, surface: &dyn PortalSurface, stage: &str) -> Option<PathBuf> {
        let png = match surface.screenshot_png().await {
            Ok(png) => png,
            Err(e) => {
                warn!(task_id = %self.task_id, stage, "screenshot capture failed: {e}");
                return None;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(task_id = %self.task_id, "cannot create diagnostics dir: {e}");
            return None;
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = self.dir.join(format!("{stage}_{timestamp}.png"));
        match std::fs::write(&path, png) {
            Ok(()) => {
                debug!(task_id = %self.task_id, path = %path.display(), "diagnostic screenshot saved");
                Some(path)
            }
            Err(e) => {
                warn!(task_id = %self.task_id, "cannot write screenshot: {e}");
                None
            }
        }
    }
}
