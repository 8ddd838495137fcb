use thiserror::Error;

use crate::ids::TopicId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("report service configuration error: {0}")]
    Configuration(String),
    #[error("report service request failed: {0}")]
    Network(String),
    #[error("report service response was malformed: {0}")]
    Protocol(String),
    #[error("planning failed: {reason}")]
    PlanningFailed {
        /// Topic id the server allocated before planning fell over, if the
        /// error body carried one. The caller must delete it so empty topics
        /// do not leak into the user's topic list.
        orphan_topic: Option<TopicId>,
        reason: String,
    },
    #[error("generation request rejected: {0}")]
    GenerationRejected(String),
    #[error("topic not found: {0}")]
    TopicNotFound(TopicId),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
