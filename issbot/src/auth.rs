//! Sign-in phase: principal entry, virtual-keypad challenge resolution and
//! admission confirmation.

use crate::config::PortalConfig;
use crate::diagnostics::Diagnostics;
use crate::errors::RobotError;
use crate::selectors::SelectorMap;
use crate::surface::PortalSurface;
use crate::types::Task;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Title fragments that identify an anti-bot verification interstitial.
const INTERSTITIAL_TITLE_TERMS: &[&str] = &[
    "just a moment",
    "um momento",
    "verifica",
    "aguarde",
    "access denied",
];

/// Body fragments for the same, used when the title is inconclusive.
const INTERSTITIAL_BODY_TERMS: &[&str] = &[
    "checking your browser",
    "verificando seu navegador",
    "aguarde enquanto",
    "please wait",
];

/// Heuristic check for a full-page verification interstitial. Errors are
/// treated as "not an interstitial": the caller's element waits will catch a
/// genuinely broken page.
pub(crate) async fn interstitial_present(surface: &dyn PortalSurface) -> bool {
    let title = surface.title().await.unwrap_or_default().to_lowercase();
    if INTERSTITIAL_TITLE_TERMS.iter().any(|t| title.contains(t)) {
        return true;
    }
    let body = surface.body_text().await.unwrap_or_default().to_lowercase();
    INTERSTITIAL_BODY_TERMS.iter().any(|t| body.contains(t))
}

/// Wait out an interstitial, polling until it resolves or the grace period
/// runs dry. Returns whether the page ever looked like an interstitial.
pub(crate) async fn ride_out_interstitial(surface: &dyn PortalSurface, grace: Duration) -> bool {
    if !interstitial_present(surface).await {
        return false;
    }
    info!("verification interstitial detected, waiting for it to resolve");
    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        sleep(Duration::from_millis(500)).await;
        if !interstitial_present(surface).await {
            return true;
        }
    }
    true
}

/// Resolve the virtual-keypad challenge for `secret`.
///
/// The button-to-digit assignment is randomized per page load and only
/// exposed through the visible labels, so for each digit the currently
/// visible keys are re-read and the first key whose label contains the digit
/// is clicked. A digit with no matching key is unresolvable and fails the
/// whole login; retrying cannot help.
pub(crate) async fn solve_keypad(
    surface: &dyn PortalSurface,
    keys: &[String],
    secret: &str,
    pause: Duration,
) -> Result<(), RobotError> {
    for digit in secret.chars() {
        let candidates = surface.keypad_candidates(keys).await?;
        let hit = candidates.iter().find(|key| key.label.contains(digit));
        match hit {
            Some(key) => {
                debug!(label = %key.label, "keypad key matched digit");
                surface.click_keypad(&key.target).await?;
                sleep(pause).await;
            }
            None => {
                return Err(RobotError::Authentication(format!(
                    "digit '{digit}' not present on any visible keypad key"
                )));
            }
        }
    }
    Ok(())
}

/// Drives the sign-in flow on one live session.
pub struct Authenticator<'a> {
    surface: &'a dyn PortalSurface,
    selectors: &'a SelectorMap,
    config: &'a PortalConfig,
    diagnostics: &'a Diagnostics,
}

impl<'a> Authenticator<'a> {
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
    pub async fn login(
        &self,
        task: &Task,
        principal: &str,
        secret: &str,
    ) -> Result<(), RobotError> {
        let masked: String = principal.chars().take(4).collect();
        info!("signing in as '{masked}...'");
        task.progress("Navigating to the portal...");

        self.surface.goto(&self.config.login_url).await?;
        ride_out_interstitial(self.surface, self.config.interstitial_grace).await;

        let login = &self.selectors.login;
        if !self
            .surface
            .wait_visible(&login.username_input, self.config.navigation_timeout)
            .await?
        {
            // The entry page never rendered its sign-in form. Treated as
            // unavailability so the retry budget applies.
            return Err(RobotError::PortalOffline(
                "sign-in form never became visible".into(),
            ));
        }

        task.progress("Entering credentials...");
        self.surface.fill(&login.username_input, principal).await?;

        task.progress("Resolving the keypad challenge...");
        let pause = self.config.keypad_pause_for(task.mode);
        if let Err(e) = solve_keypad(self.surface, &login.keypad_keys, secret, pause).await {
            self.diagnostics.capture(self.surface, "keypad_failed").await;
            return Err(e);
        }

        // A beat between finishing the keypad and submitting; instant
        // submission trips the portal's bot heuristics.
        sleep(self.config.pre_submit_pause).await;
        task.progress("Submitting credentials...");
        self.surface.click(&login.submit_button).await?;

        if self
            .surface
            .wait_url_contains(&self.config.post_login_marker, self.config.navigation_timeout)
            .await?
        {
            info!("sign-in for '{masked}...' accepted");
            return Ok(());
        }

        // Timed out: distinguish an explicit rejection from an ambiguous
        // hang before classifying.
        self.diagnostics.capture(self.surface, "login_timeout").await;
        if self.surface.is_visible(&login.error_banner).await? {
            let reason = self.surface.text_of(&login.error_banner).await?;
            warn!("portal rejected the credentials: {reason}");
            return Err(RobotError::Authentication(reason));
        }
        // No rejection banner in sight; the usual culprit is an interstitial
        // outlasting the grace period, so this stays retryable.
        Err(RobotError::PortalOffline(
            "no admission and no rejection within the login timeout".into(),
        ))
    }
}
