//! Automated declaration submission to a municipal tax portal.
//!
//! The portal offers no API, so a real browser session is driven through a
//! fixed phase sequence: sign-in (including the portal's randomized virtual
//! keypad), account-context selection, artifact upload and a bounded poll of
//! the asynchronous processing result. The [`Robot`] orchestrates the phases,
//! retries infrastructure failures with exponential backoff and always
//! returns a single classified [`Outcome`].
//!
//! Page interaction goes through the [`PortalSurface`] capability trait; the
//! shipped implementation drives Chromium over CDP, and tests swap in a
//! synthetic portal.

pub mod auth;
pub mod chromium;
pub mod config;
pub mod credentials;
pub mod diagnostics;
pub mod errors;
pub mod navigator;
pub mod poller;
pub mod robot;
pub mod selectors;
pub mod session;
pub mod surface;
#[cfg(test)]
mod tests;
pub mod types;
pub mod uploader;

pub use chromium::ChromiumDriver;
pub use config::PortalConfig;
pub use credentials::{CredentialRecord, CredentialStore};
pub use errors::RobotError;
pub use poller::{classify_row, PollVerdict, RowStatus};
pub use robot::Robot;
pub use selectors::SelectorMap;
pub use surface::{KeypadKey, PortalDriver, PortalSurface};
pub use types::{Mode, Outcome, ProgressSink, Task};
