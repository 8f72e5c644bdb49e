//! Entity selection: filter the contributor grid, pick the matching row and
//! move on to the upload view.

use crate::auth::ride_out_interstitial;
use crate::config::PortalConfig;
use crate::credentials::CredentialRecord;
use crate::errors::RobotError;
use crate::selectors::SelectorMap;
use crate::surface::PortalSurface;
use crate::types::Task;
use tracing::{info, instrument};

pub struct Navigator<'a> {
    surface: &'a dyn PortalSurface,
    selectors: &'a SelectorMap,
    config: &'a PortalConfig,
}

impl<'a> Navigator<'a> {
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

    /// Select the entity's account context and land on the upload view.
    #[instrument(skip_all, fields(task_id = %task.task_id, entity = %record.entity_id))]
    pub async fn select(&self, task: &Task, record: &CredentialRecord) -> Result<(), RobotError> {
        let entity = &self.selectors.entity;
        task.progress("Selecting the account context...");

        if !self
            .surface
            .wait_visible(&entity.registration_filter, self.config.navigation_timeout)
            .await?
        {
            return Err(RobotError::Navigation(
                "entity selection grid never appeared after sign-in".into(),
            ));
        }

        self.surface
            .fill(&entity.registration_filter, &record.entity_id)
            .await?;
        if let Some(auxiliary_id) = &record.auxiliary_id {
            if self.surface.is_visible(&entity.tax_id_filter).await? {
                self.surface.fill(&entity.tax_id_filter, auxiliary_id).await?;
            }
        }
        self.surface.click(&entity.search_button).await?;

        // The grid rebuilds asynchronously; the filtered row's select action
        // becoming visible is the refresh signal. One interstitial mid-flow
        // earns an extended wait before we give up on the row.
        let row_select = entity.row_select_for(&record.entity_id);
        let mut found = self
            .surface
            .wait_visible(&row_select, self.config.element_timeout)
            .await?;
        if !found && ride_out_interstitial(self.surface, self.config.interstitial_grace).await {
            found = self
                .surface
                .wait_visible(&row_select, self.config.element_timeout)
                .await?;
        }
        if !found {
            return Err(RobotError::Navigation(format!(
                "entity {} not found in the results grid",
                record.entity_id
            )));
        }

        self.surface.click(&row_select).await?;
        info!("entity context selected");

        // Deep link to the import view rather than clicking through menus;
        // direct URLs survive menu redesigns.
        task.progress("Opening the import view...");
        self.surface.goto(&self.config.import_url).await?;
        if !self
            .surface
            .wait_visible(&self.selectors.upload.file_input, self.config.element_timeout)
            .await?
        {
            return Err(RobotError::Navigation(
                "import view did not expose its upload control".into(),
            ));
        }
        Ok(())
    }
}
