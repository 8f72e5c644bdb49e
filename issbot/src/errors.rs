use thiserror::Error;

#[derive(Error, Debug)]
pub enum RobotError {
    #[error("No credential record for entity: {0}")]
    Credential(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Portal unavailable: {0}")]
    PortalOffline(String),

    #[error("No terminal processing status after {attempts} polls: {message}")]
    PollTimeout { attempts: u32, message: String },

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RobotError {
    /// Whether the retry/backoff loop may re-run the phase sequence after
    /// this error. Only infrastructure-shaped failures qualify; credential,
    /// business and polling failures are terminal on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RobotError::PortalOffline(_) | RobotError::Session(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infrastructure_errors_are_retryable() {
        assert!(RobotError::PortalOffline("503".into()).is_retryable());
        assert!(RobotError::Session("transport dropped".into()).is_retryable());

        assert!(!RobotError::Credential("123".into()).is_retryable());
        assert!(!RobotError::Authentication("rejected".into()).is_retryable());
        assert!(!RobotError::Navigation("no rows".into()).is_retryable());
        assert!(!RobotError::Processing("empty file".into()).is_retryable());
        assert!(!RobotError::Internal("bug".into()).is_retryable());
        assert!(!RobotError::PollTimeout {
            attempts: 20,
            message: "still pending".into()
        }
        .is_retryable());
    }

    #[test]
    fn poll_timeout_message_carries_attempt_count() {
        let err = RobotError::PollTimeout {
            attempts: 20,
            message: "row never appeared".into(),
        };
        assert!(err.to_string().contains("20"));
        assert!(err.to_string().contains("row never appeared"));
    }
}
