use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;
use crate::ids::{ArtifactId, MessageId, TemplateId, TopicId};
use crate::message::{Artifact, Message, PlanSection};
use crate::status::GenerationStatusEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub topic: String,
    pub is_template_used: bool,
    pub template_id: Option<TemplateId>,
    pub is_web_search: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub topic_id: TopicId,
    pub plan: String,
    #[serde(default)]
    pub sections: Vec<PlanSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    pub plan: String,
    pub is_edit: bool,
    pub is_web_search: bool,
}

/// Body of the `202 Accepted` response to a generation request. The job runs
/// server-side; progress arrives on the status stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAccepted {
    pub topic_id: TopicId,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_check_url: Option<String>,
}

/// Unary surface of the report service. The orchestrator only ever talks to
/// the server through this trait, so tests can swap in an in-process fake.
#[async_trait]
pub trait ReportService: Send + Sync {
    async fn create_plan(&self, request: PlanRequest) -> ServiceResult<PlanResponse>;

    /// Accepted means the server answered 202; anything else surfaces as
    /// `ServiceError::GenerationRejected`.
    async fn start_generation(
        &self,
        topic_id: TopicId,
        request: GenerateRequest,
    ) -> ServiceResult<GenerationAccepted>;

    async fn fetch_messages(&self, topic_id: TopicId) -> ServiceResult<Vec<Message>>;

    async fn fetch_artifacts(&self, topic_id: TopicId) -> ServiceResult<Vec<Artifact>>;

    async fn fetch_artifact_content(&self, artifact_id: ArtifactId) -> ServiceResult<String>;

    async fn send_message(&self, topic_id: TopicId, content: &str) -> ServiceResult<()>;

    async fn delete_message(
        &self,
        topic_id: TopicId,
        message_id: MessageId,
    ) -> ServiceResult<()>;

    async fn delete_topic(&self, topic_id: TopicId) -> ServiceResult<()>;
}

#[async_trait]
pub trait StatusEventSubscription: Send {
    /// `Ok(None)` means the transport closed; `Err` is a transport failure.
    async fn next_event(&mut self) -> ServiceResult<Option<GenerationStatusEvent>>;
}

pub type StatusEventStream = Box<dyn StatusEventSubscription>;

/// Source of generation status streams, one per in-flight job.
#[async_trait]
pub trait StatusStreamSource: Send + Sync {
    async fn open(&self, topic_id: TopicId) -> ServiceResult<StatusEventStream>;
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{StatusEventStream, StatusEventSubscription};
    use crate::error::ServiceResult;
    use crate::status::GenerationStatusEvent;

    struct EmptyStatusSubscription;

    #[async_trait]
    impl StatusEventSubscription for EmptyStatusSubscription {
        async fn next_event(&mut self) -> ServiceResult<Option<GenerationStatusEvent>> {
            Ok(None)
        }
    }

    #[test]
    fn status_event_stream_alias_accepts_trait_objects() {
        let _stream: StatusEventStream = Box::new(EmptyStatusSubscription);
    }

    #[test]
    fn generation_accepted_parses_minimal_body() {
        let accepted: super::GenerationAccepted = serde_json::from_str(
            r#"{"topic_id":42,"status":"accepted"}"#,
        )
        .expect("deserialize accepted body");
        assert_eq!(accepted.topic_id.get(), 42);
        assert!(accepted.status_check_url.is_none());
    }
}
