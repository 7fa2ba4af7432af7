use std::time::Duration;

use impact_core::ImpactError;
use thiserror::Error;

/// Failure talking to an external collaborator.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("{collaborator} timed out after {}ms", after.as_millis())]
    Timeout {
        collaborator: &'static str,
        after: Duration,
    },

    #[error("{collaborator} returned HTTP {status}: {body}")]
    Http {
        collaborator: &'static str,
        status: u16,
        body: String,
    },

    #[error("{collaborator} transport error: {message}")]
    Transport {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} sent an unreadable response: {message}")]
    Decode {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} not configured: {message}")]
    NotConfigured {
        collaborator: &'static str,
        message: String,
    },
}

impl ConnectorError {
    pub fn collaborator(&self) -> &'static str {
        match self {
            ConnectorError::Timeout { collaborator, .. }
            | ConnectorError::Http { collaborator, .. }
            | ConnectorError::Transport { collaborator, .. }
            | ConnectorError::Decode { collaborator, .. }
            | ConnectorError::NotConfigured { collaborator, .. } => collaborator,
        }
    }

    /// Worth another attempt: timeouts, transport failures, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            ConnectorError::Timeout { .. } | ConnectorError::Transport { .. } => true,
            ConnectorError::Http { status, .. } => *status == 429 || *status >= 500,
            ConnectorError::Decode { .. } | ConnectorError::NotConfigured { .. } => false,
        }
    }

    /// Classify a reqwest failure.
    pub fn from_reqwest(collaborator: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConnectorError::Decode {
                collaborator,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ConnectorError::Http {
                collaborator,
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            ConnectorError::Transport {
                collaborator,
                message: err.to_string(),
            }
        }
    }
}

impl From<ConnectorError> for ImpactError {
    fn from(err: ConnectorError) -> Self {
        ImpactError::CollaboratorUnavailable {
            collaborator: err.collaborator().to_string(),
            reason: err.to_string(),
        }
    }
}
