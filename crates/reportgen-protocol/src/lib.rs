//! Shared protocol surface for the report-generation client: ids and the
//! draft/real topic reference, conversation and artifact models, generation
//! status events, and the service traits the HTTP layer implements.

pub mod api;
pub mod error;
pub mod ids;
pub mod message;
pub mod status;

pub use api::{
    GenerateRequest, GenerationAccepted, PlanRequest, PlanResponse, ReportService,
    StatusEventStream, StatusEventSubscription, StatusStreamSource,
};
pub use error::{ServiceError, ServiceResult};
pub use ids::{ArtifactId, MessageId, TemplateId, TopicId, TopicRef};
pub use message::{
    Artifact, ArtifactKind, Message, Plan, PlanSection, Role, Topic, TopicStatus,
};
pub use status::{
    GenerationJobStatus, GenerationPhase, GenerationStatusEvent, StatusEventKind,
};
