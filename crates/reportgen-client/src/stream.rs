use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;

use reportgen_protocol::{
    GenerationStatusEvent, ServiceError, ServiceResult, StatusEventStream,
    StatusEventSubscription, StatusStreamSource, TopicId,
};

use crate::service::ReportServiceClient;

type ByteChunkStream =
    Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// Opens the server-push generation status stream for a topic. One request
/// per subscription; no reconnection on transport failure (replaying a job
/// that already completed server-side cannot be detected without an
/// idempotency key).
pub struct HttpStatusStreamSource {
    client: Client,
    base_url: String,
}

impl HttpStatusStreamSource {
    pub fn new(client: &ReportServiceClient) -> Self {
        Self {
            client: client.stream_http_client(),
            base_url: client.config().base_url.clone(),
        }
    }

    fn stream_url(&self, topic_id: TopicId) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1/reports/{topic_id}/status-stream")
    }
}

#[async_trait]
impl StatusStreamSource for HttpStatusStreamSource {
    async fn open(&self, topic_id: TopicId) -> ServiceResult<StatusEventStream> {
        let response = self
            .client
            .get(self.stream_url(topic_id))
            .send()
            .await
            .map_err(|error| {
                ServiceError::Network(format!("status stream request failed: {error}"))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::TopicNotFound(topic_id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Network(format!(
                "status stream failed with status {status}: {body}"
            )));
        }

        Ok(Box::new(HttpStatusEventStream {
            chunks: Box::pin(response.bytes_stream()),
            line_buffer: Vec::new(),
            pending: VecDeque::new(),
        }))
    }
}

struct HttpStatusEventStream {
    chunks: ByteChunkStream,
    line_buffer: Vec<u8>,
    pending: VecDeque<GenerationStatusEvent>,
}

impl HttpStatusEventStream {
    fn drain_complete_lines(&mut self) {
        while let Some(newline_index) = self.line_buffer.iter().position(|byte| *byte == b'\n') {
            let mut line = self
                .line_buffer
                .drain(..=newline_index)
                .collect::<Vec<_>>();
            if matches!(line.last(), Some(b'\n')) {
                line.pop();
            }
            if matches!(line.last(), Some(b'\r')) {
                line.pop();
            }
            if let Some(event) = parse_status_line(&line) {
                self.pending.push_back(event);
            }
        }
    }
}

#[async_trait]
impl StatusEventSubscription for HttpStatusEventStream {
    async fn next_event(&mut self) -> ServiceResult<Option<GenerationStatusEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => {
                    self.line_buffer.extend_from_slice(&chunk);
                    self.drain_complete_lines();
                }
                Some(Err(error)) => {
                    return Err(ServiceError::Network(format!(
                        "status stream read failed: {error}"
                    )));
                }
                None => {
                    if !self.line_buffer.is_empty() {
                        let remainder = std::mem::take(&mut self.line_buffer);
                        if let Some(event) = parse_status_line(&remainder) {
                            self.pending.push_back(event);
                            continue;
                        }
                    }
                    return Ok(None);
                }
            }
        }
    }
}

/// Parses one stream line into a status event. Lines may be bare JSON or SSE
/// framed (`data: {...}`); SSE `event:` fields, comments, and keep-alive
/// blanks are skipped. Unparseable lines are dropped rather than failing the
/// stream.
pub(crate) fn parse_status_line(line: &[u8]) -> Option<GenerationStatusEvent> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() || text.starts_with(':') || text.starts_with("event:") {
        return None;
    }
    let payload = text.strip_prefix("data:").map(str::trim).unwrap_or(text);
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::debug!(error = %error, "skipping unparseable status stream line");
            None
        }
    }
}
