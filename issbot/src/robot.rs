//! The orchestrator: runs the phase sequence per task, applies the
//! retry/backoff policy and guarantees session teardown on every exit path.

use crate::chromium::ChromiumDriver;
use crate::config::PortalConfig;
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::diagnostics::Diagnostics;
use crate::errors::RobotError;
use crate::poller::{PollVerdict, Poller};
use crate::selectors::SelectorMap;
use crate::surface::{PortalDriver, PortalSurface};
use crate::types::{Outcome, Task};
use crate::uploader::check_artifact;
use crate::{auth::Authenticator, navigator::Navigator, uploader::Uploader};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Submits declaration artifacts to the portal.
///
/// Cheap to clone; concurrent tasks share the read-only credential store and
/// configuration but each gets its own browser session.
#[derive(Clone)]
pub struct Robot {
    driver: Arc<dyn PortalDriver>,
    store: Arc<CredentialStore>,
    config: Arc<PortalConfig>,
    selectors: Arc<SelectorMap>,
}

impl Robot {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self::with_driver(
            Arc::new(ChromiumDriver::new()),
            store,
            PortalConfig::default(),
            SelectorMap::default_map().clone(),
        )
    }

    /// Full-control constructor; tests inject a synthetic driver here.
    pub fn with_driver(
        driver: Arc<dyn PortalDriver>,
        store: Arc<CredentialStore>,
        config: PortalConfig,
        selectors: SelectorMap,
    ) -> Self {
        Self {
            driver,
            store,
            config: Arc::new(config),
            selectors: Arc::new(selectors),
        }
    }

    /// Run the full submission flow for one task and return its single
    /// terminal [`Outcome`]. Never panics and never surfaces a raw error:
    /// everything comes back classified.
    #[instrument(skip_all, fields(task_id = %task.task_id, entity = %task.entity_id))]
    pub async fn execute(&self, task: &Task) -> Outcome {
        info!(artifact = %task.artifact_path.display(), "starting submission");

        // Cheap failures first: no credentials or a bad artifact never cost
        // a browser session.
        let Some(record) = self.store.lookup(&task.entity_id) else {
            error!("no credential record for entity");
            return Outcome::failed(
                format!("No credential record for entity '{}'", task.entity_id),
                "register the entity's credentials in the environment configuration",
            );
        };
        if let Err(e) = check_artifact(&task.artifact_path) {
            error!("artifact precondition failed: {e}");
            return Outcome::failed("Declaration artifact rejected before upload", e.to_string());
        }

        let mut attempt = 1;
        loop {
            task.progress(&format!(
                "Starting attempt {attempt} of {}...",
                self.config.max_attempts
            ));
            match self.run_attempt(task, record).await {
                Ok(PollVerdict::Accepted(row)) => {
                    task.progress("Declaration accepted by the portal.");
                    return Outcome::succeeded(
                        format!("Declaration '{}' accepted by the portal", task.artifact_name()),
                        row,
                    );
                }
                Ok(PollVerdict::Rejected(row)) => {
                    task.progress("Declaration rejected by the portal.");
                    return Outcome::failed(
                        format!("Declaration '{}' rejected by the portal", task.artifact_name()),
                        row,
                    );
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let backoff = self.config.retry_backoff(attempt);
                    warn!(attempt, "infrastructure failure, retrying in {backoff:?}: {e}");
                    task.progress(&format!("Portal unstable, retrying in {backoff:?}..."));
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    error!(attempt, "portal still unavailable, giving up: {e}");
                    return Outcome::failed(
                        format!(
                            "Portal unavailable after {} attempts",
                            self.config.max_attempts
                        ),
                        e.to_string(),
                    );
                }
                Err(RobotError::Authentication(reason)) => {
                    error!("authentication failed: {reason}");
                    return Outcome::failed("Portal refused the sign-in", reason);
                }
                Err(e @ RobotError::PollTimeout { .. }) => {
                    // Distinct from success and from an explicit rejection:
                    // the artifact may still be processed; the caller can
                    // consult the portal later.
                    warn!("{e}");
                    return Outcome::failed(
                        "Submission result still undetermined; check the portal later",
                        e.to_string(),
                    );
                }
                Err(e) => {
                    error!("technical failure: {e}");
                    return Outcome::failed(
                        "Technical failure during the submission",
                        e.to_string(),
                    );
                }
            }
        }
    }

    /// One pass through the phase sequence. The session opened here is
    /// closed on every path out, including phase errors.
    async fn run_attempt(
        &self,
        task: &Task,
        record: &CredentialRecord,
    ) -> Result<PollVerdict, RobotError> {
        let surface = self.driver.open(task.mode).await?;
        let result = self.run_phases(surface.as_ref(), task, record).await;
        surface.close().await;
        result
    }

    async fn run_phases(
        &self,
        surface: &dyn PortalSurface,
        task: &Task,
        record: &CredentialRecord,
    ) -> Result<PollVerdict, RobotError> {
        let diagnostics = Diagnostics::new(&self.config.diagnostics_dir, &task.task_id);

        Authenticator::new(surface, &self.selectors, &self.config, &diagnostics)
            .login(task, &record.principal, &record.secret)
            .await?;
        Navigator::new(surface, &self.selectors, &self.config)
            .select(task, record)
            .await?;
        Uploader::new(surface, &self.selectors, &self.config, &diagnostics)
            .upload(task)
            .await?;
        Poller::new(surface, &self.selectors, &self.config)
            .poll(task)
            .await
    }
}
