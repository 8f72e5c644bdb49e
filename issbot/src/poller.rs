//! Bounded polling of the consultation view.
//!
//! Ingestion is asynchronous on the portal side: right after the upload the
//! artifact sits in a queue and the authoritative verdict only shows up in
//! the consultation grid once background processing ran. The poller refreshes
//! that grid a bounded number of times and classifies the row matching the
//! artifact's file name.

use crate::config::PortalConfig;
use crate::errors::RobotError;
use crate::selectors::SelectorMap;
use crate::surface::PortalSurface;
use crate::types::Task;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const ACCEPTED_TERMS: &[&str] = &["sucesso", "êxito"];
const REJECTED_TERMS: &[&str] = &["erro", "rejeitado", "inválid", "falha"];
const PENDING_TERMS: &[&str] = &[
    "aguardando",
    "processando",
    "pendente",
    "em fila",
    "em processamento",
];

/// Classification of one status-grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Accepted,
    Rejected,
    Pending,
    Unknown,
}

/// Case-insensitive classification by the portal's wording. Success wins
/// over the other classes ("processado com sucesso" also matches no error
/// term, but the precedence is explicit anyway).
pub fn classify_row(text: &str) -> RowStatus {
    let lowered = text.to_lowercase();
    if ACCEPTED_TERMS.iter().any(|t| lowered.contains(t)) {
        return RowStatus::Accepted;
    }
    if REJECTED_TERMS.iter().any(|t| lowered.contains(t)) {
        return RowStatus::Rejected;
    }
    if PENDING_TERMS.iter().any(|t| lowered.contains(t)) {
        return RowStatus::Pending;
    }
    RowStatus::Unknown
}

/// Terminal verdict for a submitted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    /// Portal accepted the artifact; carries the full row text.
    Accepted(String),
    /// Portal explicitly rejected it; carries the full row text.
    Rejected(String),
}

pub struct Poller<'a> {
    surface: &'a dyn PortalSurface,
    selectors: &'a SelectorMap,
    config: &'a PortalConfig,
}

impl<'a> Poller<'a> {
    pub fn new(
        surface: &'a dyn PortalSurface,
        selectors: &'a SelectorMap,
        config: &'a PortalConfig,
    ) -> Self {
        Self {
            surface,
            selectors,
            config,
        }
    }

    /// Poll until the artifact's row reaches a terminal status or the
    /// attempt budget runs out.
    #[instrument(skip_all, fields(task_id = %task.task_id))]
    pub async fn poll(&self, task: &Task) -> Result<PollVerdict, RobotError> {
        let status = &self.selectors.status;
        let artifact_name = task.artifact_name();
        task.progress("Waiting for the portal to process the file...");

        self.surface.goto(&self.config.consultation_url).await?;

        for attempt in 1..=self.config.poll_max_attempts {
            // The grid needs a beat before a refresh returns anything new.
            sleep(self.config.poll_settle).await;

            if self.surface.is_visible(&status.refresh_button).await? {
                self.surface.click(&status.refresh_button).await?;
            } else {
                // Some revisions of the view have no refresh action; a
                // reload serves the same purpose.
                self.surface.goto(&self.config.consultation_url).await?;
            }

            // Same barrier shape as the upload: overlay up, overlay gone.
            if self
                .surface
                .wait_visible(&status.loading_overlay, self.config.overlay_appear_timeout)
                .await?
            {
                self.surface
                    .wait_detached(&status.loading_overlay, self.config.element_timeout)
                    .await?;
            }

            let rows = self.surface.status_rows(&status.rows).await?;
            let row = rows.iter().find(|row| row.contains(artifact_name.as_str()));
            match row {
                Some(row) => match classify_row(row) {
                    RowStatus::Accepted => {
                        info!(attempt, "artifact accepted");
                        return Ok(PollVerdict::Accepted(row.clone()));
                    }
                    RowStatus::Rejected => {
                        warn!(attempt, "artifact rejected: {row}");
                        return Ok(PollVerdict::Rejected(row.clone()));
                    }
                    RowStatus::Pending | RowStatus::Unknown => {
                        debug!(attempt, "artifact still processing");
                        task.progress(&format!(
                            "Still processing (check {attempt}/{})...",
                            self.config.poll_max_attempts
                        ));
                    }
                },
                None => {
                    // Not indexed yet; treated the same as pending.
                    debug!(attempt, "artifact row not present yet");
                }
            }
        }

        Err(RobotError::PollTimeout {
            attempts: self.config.poll_max_attempts,
            message: format!("'{artifact_name}' never reached a terminal status"),
        })
    }
}
