use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImpactError {
    #[error("not initialized: run 'impact init'")]
    NotInitialized,

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("system not found: {0}")]
    SystemNotFound(String),

    #[error("regulation not found: {0}")]
    RegulationNotFound(String),

    #[error("impact assessment not found: {0}")]
    AssessmentNotFound(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: String,
        reason: String,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ImpactError {
    /// True for the lookup failures that surface as 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ImpactError::WorkflowNotFound(_)
                | ImpactError::SystemNotFound(_)
                | ImpactError::RegulationNotFound(_)
                | ImpactError::AssessmentNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ImpactError>;
