use reportgen_protocol::{ServiceError, TopicId};
use thiserror::Error;

/// Errors surfaced to the chat layer by lifecycle operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("message input is empty")]
    EmptyInput,

    #[error("no active plan to act on")]
    NoActivePlan,

    #[error("topic not found: {0}")]
    TopicNotFound(TopicId),

    #[error("plan drafting failed: {0}")]
    PlanningFailed(String),

    #[error("generation request rejected: {0}")]
    GenerationRejected(String),

    #[error("generation status stream failed: {0}")]
    Stream(String),

    #[error("report service request failed: {0}")]
    Service(String),
}

pub type ChatResult<T> = Result<T, ChatError>;

impl From<ServiceError> for ChatError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::TopicNotFound(id) => Self::TopicNotFound(id),
            ServiceError::PlanningFailed { reason, .. } => Self::PlanningFailed(reason),
            ServiceError::GenerationRejected(reason) => Self::GenerationRejected(reason),
            other => Self::Service(other.to_string()),
        }
    }
}
