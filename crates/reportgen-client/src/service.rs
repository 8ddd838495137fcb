use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;

use reportgen_protocol::{
    Artifact, ArtifactId, GenerateRequest, GenerationAccepted, Message, MessageId, PlanRequest,
    PlanResponse, ReportService, ServiceError, ServiceResult, TopicId,
};

use crate::config::ReportServiceConfig;

/// reqwest-backed implementation of [`ReportService`].
#[derive(Clone)]
pub struct ReportServiceClient {
    config: ReportServiceConfig,
    client: Client,
    // Same headers, no request timeout: the status stream stays open until a
    // terminal event or cancellation, which a unary timeout would sever.
    stream_client: Client,
}

impl ReportServiceClient {
    pub fn new(config: ReportServiceConfig) -> ServiceResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = config.api_token.as_deref() {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|error| {
                    ServiceError::Configuration(format!("REPORTGEN_API_TOKEN is invalid: {error}"))
                })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers.clone())
            .build()
            .map_err(|error| {
                ServiceError::Configuration(format!(
                    "failed to build report service HTTP client: {error}"
                ))
            })?;
        let stream_client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ServiceError::Configuration(format!(
                    "failed to build report service stream client: {error}"
                ))
            })?;

        Ok(Self {
            config,
            client,
            stream_client,
        })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(ReportServiceConfig::from_env()?)
    }

    pub fn config(&self) -> &ReportServiceConfig {
        &self.config
    }

    pub(crate) fn stream_http_client(&self) -> Client {
        self.stream_client.clone()
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ServiceResult<T> {
        let (status, body) = self.request_text(request).await?;
        if !status.is_success() {
            return Err(error_for_status(status, &body, None));
        }
        serde_json::from_str(&body).map_err(|error| {
            ServiceError::Protocol(format!("report service returned malformed JSON: {error}"))
        })
    }

    async fn request_status_only(
        &self,
        request: reqwest::RequestBuilder,
        topic_id: Option<TopicId>,
    ) -> ServiceResult<()> {
        let (status, body) = self.request_text(request).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(error_for_status(status, &body, topic_id))
        }
    }

    async fn request_text(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ServiceResult<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|error| ServiceError::Network(format!("request failed: {error}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ServiceError::Network(format!("response read failed: {error}")))?;
        Ok((status, body))
    }
}

fn error_for_status(status: StatusCode, body: &str, topic_id: Option<TopicId>) -> ServiceError {
    if status == StatusCode::NOT_FOUND {
        if let Some(topic_id) = topic_id {
            return ServiceError::TopicNotFound(topic_id);
        }
    }
    ServiceError::Network(format!("request failed with status {status}: {body}"))
}

/// Planning errors may carry the topic id the server allocated before the
/// plan draft fell over, under either `topic_id` or `detail.topic_id`.
fn parse_orphan_topic(body: &str) -> Option<TopicId> {
    let value: Value = serde_json::from_str(body).ok()?;
    let raw = value
        .get("topic_id")
        .or_else(|| value.get("detail").and_then(|detail| detail.get("topic_id")))?
        .as_i64()?;
    (raw > 0).then(|| TopicId::new(raw))
}

fn extract_error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .or_else(|| value.get("detail"))
                .and_then(|field| field.as_str().map(str::to_owned))
        })
        .unwrap_or_else(|| body.to_owned())
}

#[async_trait]
impl ReportService for ReportServiceClient {
    async fn create_plan(&self, request: PlanRequest) -> ServiceResult<PlanResponse> {
        let builder = self.client.post(self.endpoint("v1/reports/plan")).json(&request);
        let (status, body) = self.request_text(builder).await?;
        if !status.is_success() {
            return Err(ServiceError::PlanningFailed {
                orphan_topic: parse_orphan_topic(&body),
                reason: extract_error_reason(&body),
            });
        }
        serde_json::from_str(&body).map_err(|error| {
            ServiceError::Protocol(format!("plan response was malformed JSON: {error}"))
        })
    }

    async fn start_generation(
        &self,
        topic_id: TopicId,
        request: GenerateRequest,
    ) -> ServiceResult<GenerationAccepted> {
        let builder = self
            .client
            .post(self.endpoint(&format!("v1/reports/{topic_id}/generate")))
            .json(&request);
        let (status, body) = self.request_text(builder).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::TopicNotFound(topic_id));
        }
        if status != StatusCode::ACCEPTED {
            return Err(ServiceError::GenerationRejected(format!(
                "status {status}: {}",
                extract_error_reason(&body)
            )));
        }
        serde_json::from_str(&body).map_err(|error| {
            ServiceError::Protocol(format!("generation response was malformed JSON: {error}"))
        })
    }

    async fn fetch_messages(&self, topic_id: TopicId) -> ServiceResult<Vec<Message>> {
        let builder = self
            .client
            .get(self.endpoint(&format!("v1/topics/{topic_id}/messages")));
        self.request_json(builder).await
    }

    async fn fetch_artifacts(&self, topic_id: TopicId) -> ServiceResult<Vec<Artifact>> {
        let builder = self
            .client
            .get(self.endpoint(&format!("v1/topics/{topic_id}/artifacts")));
        self.request_json(builder).await
    }

    async fn fetch_artifact_content(&self, artifact_id: ArtifactId) -> ServiceResult<String> {
        let builder = self
            .client
            .get(self.endpoint(&format!("v1/artifacts/{artifact_id}/content")));
        let (status, body) = self.request_text(builder).await?;
        if !status.is_success() {
            return Err(error_for_status(status, &body, None));
        }
        Ok(body)
    }

    async fn send_message(&self, topic_id: TopicId, content: &str) -> ServiceResult<()> {
        let builder = self
            .client
            .post(self.endpoint(&format!("v1/topics/{topic_id}/messages")))
            .json(&serde_json::json!({ "content": content }));
        self.request_status_only(builder, Some(topic_id)).await
    }

    async fn delete_message(
        &self,
        topic_id: TopicId,
        message_id: MessageId,
    ) -> ServiceResult<()> {
        let builder = self
            .client
            .delete(self.endpoint(&format!("v1/topics/{topic_id}/messages/{message_id}")));
        self.request_status_only(builder, Some(topic_id)).await
    }

    async fn delete_topic(&self, topic_id: TopicId) -> ServiceResult<()> {
        let builder = self
            .client
            .delete(self.endpoint(&format!("v1/topics/{topic_id}")));
        self.request_status_only(builder, Some(topic_id)).await
    }
}
