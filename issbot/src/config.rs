//! Portal endpoints and timing constants.
//!
//! Every "settle" pause in the flow encodes an empirical assumption about the
//! portal's latency. They are kept here as named values rather than inline
//! sleeps so a recalibration touches exactly one place.

use crate::types::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOGIN_URL: &str =
    "https://www.issnetonline.com.br/goiania/online/login/login.aspx";
const DEFAULT_IMPORT_URL: &str = "https://www.issnetonline.com.br/goiania/online/Servicos_Contratados/ImportacaoServicosContratados.aspx";
const DEFAULT_CONSULTATION_URL: &str = "https://www.issnetonline.com.br/goiania/online/Servicos_Contratados/ConsultaImportacaoServicosContratados.aspx";

/// URL fragment that is only reachable once the portal has admitted the
/// session. Used as the post-login marker.
const POST_LOGIN_MARKER: &str = "SelecionarContribuinte.aspx";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub login_url: String,
    pub import_url: String,
    pub consultation_url: String,
    /// URL fragment that confirms an authenticated session.
    pub post_login_marker: String,
    /// Where diagnostic screenshots are persisted, grouped by task id.
    pub diagnostics_dir: PathBuf,

    /// Full page navigations; the portal is slow rendering its grids.
    #[serde(with = "secs")]
    pub navigation_timeout: Duration,
    /// Individual element visibility waits.
    #[serde(with = "secs")]
    pub element_timeout: Duration,
    /// Server-side ingestion of an uploaded artifact.
    #[serde(with = "secs")]
    pub upload_timeout: Duration,
    /// How long the loading overlay gets to appear after a submission click
    /// before we assume the round trip was too fast to observe.
    #[serde(with = "secs")]
    pub overlay_appear_timeout: Duration,
    /// Grace period for anti-bot verification interstitials to self-resolve.
    #[serde(with = "secs")]
    pub interstitial_grace: Duration,

    /// Pause after each virtual-keypad click, emulating human cadence.
    #[serde(with = "millis")]
    pub keypad_pause: Duration,
    /// Pause between finishing the credential entry and submitting the form.
    #[serde(with = "millis")]
    pub pre_submit_pause: Duration,

    /// Settle delay before each status refresh; the grid needs time before a
    /// refresh returns anything new.
    #[serde(with = "secs")]
    pub poll_settle: Duration,
    pub poll_max_attempts: u32,

    /// Total attempts of the full phase sequence (first try included).
    pub max_attempts: u32,
    /// Exponential backoff base: the n-th failed attempt waits base^n seconds.
    pub backoff_base: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            import_url: DEFAULT_IMPORT_URL.to_string(),
            consultation_url: DEFAULT_CONSULTATION_URL.to_string(),
            post_login_marker: POST_LOGIN_MARKER.to_string(),
            diagnostics_dir: PathBuf::from("diagnostics"),
            navigation_timeout: Duration::from_secs(60),
            element_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(120),
            overlay_appear_timeout: Duration::from_secs(5),
            interstitial_grace: Duration::from_secs(15),
            keypad_pause: Duration::from_millis(300),
            pre_submit_pause: Duration::from_millis(1000),
            poll_settle: Duration::from_secs(3),
            poll_max_attempts: 20,
            max_attempts: 3,
            backoff_base: 2,
        }
    }
}

impl PortalConfig {
    /// Environment overrides for deployments pointed at another municipality
    /// of the same portal family.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PORTAL_LOGIN_URL") {
            config.login_url = url;
        }
        if let Ok(url) = std::env::var("PORTAL_IMPORT_URL") {
            config.import_url = url;
        }
        if let Ok(url) = std::env::var("PORTAL_CONSULTATION_URL") {
            config.consultation_url = url;
        }
        if let Ok(dir) = std::env::var("PORTAL_DIAGNOSTICS_DIR") {
            config.diagnostics_dir = PathBuf::from(dir);
        }
        config
    }

    /// Keypad cadence for the given mode. Interactive sessions are slowed
    /// down so an operator can follow the clicks.
    pub fn keypad_pause_for(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Interactive => self.keypad_pause * 3,
            Mode::Headless => self.keypad_pause,
        }
    }

    /// Backoff before re-running the phase sequence after the n-th failed
    /// attempt (1-based): `backoff_base^attempt` seconds.
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(u64::from(self.backoff_base).saturating_pow(attempt))
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
