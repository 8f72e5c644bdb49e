//! Common types shared by every phase of the submission flow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// How the browser session runs.
///
/// Interactive sessions are visible and use wider human-cadence pauses so an
/// operator can follow along; headless sessions run unattended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Interactive,
    Headless,
}

/// Observer callback for human-readable progress lines. Pure observability:
/// emitting progress never affects control flow.
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

/// One submission request. Immutable for its whole lifetime; the robot
/// returns exactly one terminal [`Outcome`] per task.
#[derive(Clone)]
pub struct Task {
    pub task_id: String,
    pub artifact_path: PathBuf,
    pub entity_id: String,
    pub mode: Mode,
    pub progress_sink: Option<ProgressSink>,
}

impl Task {
    pub fn new(artifact_path: impl Into<PathBuf>, entity_id: impl Into<String>, mode: Mode) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            artifact_path: artifact_path.into(),
            entity_id: entity_id.into(),
            mode,
            progress_sink: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Emit a progress line to the sink, if one is attached.
    pub(crate) fn progress(&self, message: &str) {
        if let Some(sink) = &self.progress_sink {
            sink(message);
        }
    }

    /// Artifact file name as the portal displays it in its status grid.
    pub(crate) fn artifact_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.artifact_path.display().to_string())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("task_id", &self.task_id)
            .field("artifact_path", &self.artifact_path)
            .field("entity_id", &self.entity_id)
            .field("mode", &self.mode)
            .field("progress_sink", &self.progress_sink.is_some())
            .finish()
    }
}

/// The single record returned to the caller of [`crate::Robot::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub details: String,
}

impl Outcome {
    pub fn succeeded(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn failed(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: details.into(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "OK" } else { "FAILED" };
        if self.details.is_empty() {
            write!(f, "{status}: {}", self.message)
        } else {
            write!(f, "{status}: {} ({})", self.message, self.details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_exposes_artifact_file_name() {
        let task = Task::new("/tmp/declarations/decl_2026_07.txt", "12345", Mode::Headless);
        assert_eq!(task.artifact_name(), "decl_2026_07.txt");
    }

    #[test]
    fn tasks_get_distinct_ids_by_default() {
        let a = Task::new("/tmp/a.txt", "1", Mode::Headless);
        let b = Task::new("/tmp/a.txt", "1", Mode::Headless);
        assert_ne!(a.task_id, b.task_id);
    }

    #[test]
    fn outcome_display_includes_details_when_present() {
        let outcome = Outcome::failed("upload rejected", "invalid layout on line 3");
        let rendered = outcome.to_string();
        assert!(rendered.contains("FAILED"));
        assert!(rendered.contains("invalid layout on line 3"));
    }
}
