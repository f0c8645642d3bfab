use std::time::Duration;

/// Errors surfaced by the upload and recommendation clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad client input. Raised before any network call is made.
    #[error("{0}")]
    Validation(String),

    /// The upload endpoint answered with a non-2xx status.
    #[error("{message}")]
    Upload { status: u16, message: String },

    /// A recommendation endpoint answered with a non-2xx status.
    #[error("{message}")]
    Request { status: u16, message: String },

    /// The backend answered 2xx with a body we cannot normalize.
    #[error("unexpected response from server: {0}")]
    Protocol(String),

    /// Polling hit its deadline before the job settled.
    #[error("recommendation timed out after {}s", .elapsed.as_secs())]
    Timeout { elapsed: Duration },

    /// The backend reported the job as failed.
    #[error("recommendation failed: {0}")]
    JobFailed(String),

    #[error("network error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a status poll that failed this way should be retried on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Request { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_http_failures_are_transient() {
        assert!(ClientError::transport("connection reset").is_transient());
        assert!(ClientError::Request {
            status: 502,
            message: "bad gateway".to_string()
        }
        .is_transient());
        assert!(!ClientError::Protocol("missing status".to_string()).is_transient());
        assert!(!ClientError::Validation("empty".to_string()).is_transient());
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = ClientError::Timeout {
            elapsed: Duration::from_millis(120_400),
        };
        assert_eq!(err.to_string(), "recommendation timed out after 120s");
    }
}
