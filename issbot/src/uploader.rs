//! Artifact upload and the server-side processing barrier.

use crate::config::PortalConfig;
use crate::diagnostics::Diagnostics;
use crate::errors::RobotError;
use crate::selectors::SelectorMap;
use crate::surface::PortalSurface;
use crate::types::Task;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Check the artifact before any browser interaction so a bad path fails
/// without spending a session attempt.
pub fn check_artifact(path: &Path) -> Result<(), RobotError> {
    let meta = std::fs::metadata(path).map_err(|_| {
        RobotError::Processing(format!("artifact does not exist: {}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(RobotError::Processing(format!(
            "artifact is not a regular file: {}",
            path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(RobotError::Processing(format!(
            "artifact is empty: {}",
            path.display()
        )));
    }
    Ok(())
}

pub struct Uploader<'a> {
    surface: &'a dyn PortalSurface,
    selectors: &'a SelectorMap,
    config: &'a PortalConfig,
    diagnostics: &'a Diagnostics,
}

impl<'a> Uploader<'a> {
    pub fn new(
        surface: &'a dyn PortalSurface,
        selectors: &'a SelectorMap,
        config: &'a PortalConfig,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            surface,
            selectors,
            config,
            diagnostics,
        }
    }

    #[instrument(skip_all, fields(task_id = %task.task_id))]
    pub async fn upload(&self, task: &Task) -> Result<(), RobotError> {
        check_artifact(&task.artifact_path)?;
        let upload = &self.selectors.upload;
        task.progress("Uploading the declaration file...");

        // The converter writes point-decimal artifacts; make sure the portal
        // reads them that way when the option is on the page.
        if self.surface.is_visible(&upload.decimal_point_option).await? {
            self.surface.click(&upload.decimal_point_option).await?;
            debug!("decimal separator option set to point");
        }

        self.surface
            .set_upload_file(&upload.file_input, &task.artifact_path)
            .await?;
        self.diagnostics.capture(self.surface, "pre_import").await;
        self.surface.click(&upload.import_button).await?;
        info!("import triggered, synchronizing with server-side processing");

        // Processing barrier. Appearance is near-instant after the click;
        // missing it usually means the round trip finished faster than the
        // probe cadence, which is not a failure.
        if !self
            .surface
            .wait_visible(&upload.loading_overlay, self.config.overlay_appear_timeout)
            .await?
        {
            warn!("loading overlay never appeared; assuming a fast round trip");
        }
        // Detachment is the only reliable signal that ingestion finished.
        if !self
            .surface
            .wait_detached(&upload.loading_overlay, self.config.upload_timeout)
            .await?
        {
            self.diagnostics.capture(self.surface, "upload_stalled").await;
            return Err(RobotError::PortalOffline(format!(
                "server-side processing still running after {:?}",
                self.config.upload_timeout
            )));
        }

        self.diagnostics.capture(self.surface, "post_processing").await;
        info!("server-side processing finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_artifact_is_rejected() {
        let err = check_artifact(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, RobotError::Processing(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn directory_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_artifact(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn empty_artifact_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = check_artifact(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn regular_non_empty_artifact_passes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10;2026;07;173254880116;...").unwrap();
        assert!(check_artifact(file.path()).is_ok());
    }

    #[test]
    fn precondition_messages_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let empty = tempfile::NamedTempFile::new().unwrap();
        let missing = check_artifact(Path::new("/nope.txt")).unwrap_err().to_string();
        let directory = check_artifact(dir.path()).unwrap_err().to_string();
        let zero = check_artifact(empty.path()).unwrap_err().to_string();
        assert_ne!(missing, directory);
        assert_ne!(directory, zero);
        assert_ne!(missing, zero);
    }
}
