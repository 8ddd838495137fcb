//! In-process fake of the report service and status-stream source, shared by
//! the orchestrator and facade tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reportgen_protocol::{
    Artifact, ArtifactId, ArtifactKind, GenerateRequest, GenerationAccepted, GenerationPhase,
    GenerationStatusEvent, Message, MessageId, PlanRequest, PlanResponse, ReportService, Role,
    ServiceError, ServiceResult, StatusEventKind, StatusEventStream, StatusEventSubscription,
    StatusStreamSource, TopicId, TopicRef,
};
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, Instant};

use crate::orchestrator::GenerationOrchestrator;
use crate::state::LifecyclePhase;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

type StreamItem = ServiceResult<Option<GenerationStatusEvent>>;

#[derive(Default)]
struct MockState {
    plan_failure: Option<ServiceError>,
    generation_rejection: Option<String>,
    topic_delete_failure: Option<ServiceError>,
    fetch_failures: u32,
    messages_by_topic: HashMap<TopicId, Vec<Message>>,
    artifacts_by_topic: HashMap<TopicId, Vec<Artifact>>,
    content_by_artifact: HashMap<ArtifactId, String>,
    plan_calls: usize,
    generate_requests: Vec<(TopicId, GenerateRequest)>,
    sent_messages: Vec<(TopicId, String)>,
    deleted_messages: Vec<(TopicId, MessageId)>,
    deleted_topics: Vec<TopicId>,
}

/// Scripted double for both halves of the server surface. Plans always land
/// on topic 42 unless a failure is queued first; status streams are fed by
/// the handles returned from [`MockService::push_stream`].
pub struct MockService {
    state: Mutex<MockState>,
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<StreamItem>>>,
    artifact_gate: Mutex<Option<ArtifactGate>>,
}

/// Parks the next artifact fetch until released, so a test can interleave
/// other operations while a caller sits inside that await point.
struct ArtifactGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

pub struct StreamHandle {
    sender: mpsc::UnboundedSender<StreamItem>,
}

impl StreamHandle {
    pub fn send(&self, item: StreamItem) {
        let _ = self.sender.send(item);
    }
}

impl MockService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            streams: Mutex::new(VecDeque::new()),
            artifact_gate: Mutex::new(None),
        }
    }

    /// Returns `(entered, release)`: `entered` fires when the next artifact
    /// fetch begins; the fetch then waits for `release`.
    pub fn hold_next_artifact_fetch(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.artifact_gate.lock().expect("artifact gate poisoned") = Some(ArtifactGate {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        (entered, release)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn push_stream(&self) -> StreamHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.streams
            .lock()
            .expect("mock streams poisoned")
            .push_back(receiver);
        StreamHandle { sender }
    }

    pub fn set_messages(&self, topic_id: TopicId, messages: Vec<Message>) {
        self.lock().messages_by_topic.insert(topic_id, messages);
    }

    pub fn set_artifacts(&self, topic_id: TopicId, artifacts: Vec<Artifact>) {
        self.lock().artifacts_by_topic.insert(topic_id, artifacts);
    }

    pub fn set_artifact_content(&self, artifact_id: ArtifactId, content: &str) {
        self.lock()
            .content_by_artifact
            .insert(artifact_id, content.to_owned());
    }

    pub fn fail_next_plan(&self, error: ServiceError) {
        self.lock().plan_failure = Some(error);
    }

    pub fn reject_generation(&self, reason: &str) {
        self.lock().generation_rejection = Some(reason.to_owned());
    }

    pub fn fail_next_topic_delete(&self, error: ServiceError) {
        self.lock().topic_delete_failure = Some(error);
    }

    pub fn fail_next_fetches(&self, count: u32) {
        self.lock().fetch_failures = count;
    }

    pub fn plan_calls(&self) -> usize {
        self.lock().plan_calls
    }

    pub fn generate_calls(&self) -> usize {
        self.lock().generate_requests.len()
    }

    pub fn last_generate_request(&self) -> Option<GenerateRequest> {
        self.lock()
            .generate_requests
            .last()
            .map(|(_, request)| request.clone())
    }

    pub fn sent_messages(&self) -> Vec<(TopicId, String)> {
        self.lock().sent_messages.clone()
    }

    pub fn deleted_messages(&self) -> Vec<(TopicId, MessageId)> {
        self.lock().deleted_messages.clone()
    }

    pub fn deleted_topics(&self) -> Vec<TopicId> {
        self.lock().deleted_topics.clone()
    }
}

#[async_trait]
impl ReportService for MockService {
    async fn create_plan(&self, _request: PlanRequest) -> ServiceResult<PlanResponse> {
        let mut state = self.lock();
        state.plan_calls += 1;
        if let Some(error) = state.plan_failure.take() {
            return Err(error);
        }
        Ok(PlanResponse {
            topic_id: TopicId::new(42),
            plan: "# 작성 계획".to_owned(),
            sections: Vec::new(),
        })
    }

    async fn start_generation(
        &self,
        topic_id: TopicId,
        request: GenerateRequest,
    ) -> ServiceResult<GenerationAccepted> {
        let mut state = self.lock();
        state.generate_requests.push((topic_id, request));
        if let Some(reason) = state.generation_rejection.clone() {
            return Err(ServiceError::GenerationRejected(reason));
        }
        Ok(GenerationAccepted {
            topic_id,
            status: "accepted".to_owned(),
            message: None,
            status_check_url: None,
        })
    }

    async fn fetch_messages(&self, topic_id: TopicId) -> ServiceResult<Vec<Message>> {
        let mut state = self.lock();
        if state.fetch_failures > 0 {
            state.fetch_failures -= 1;
            return Err(ServiceError::Network("scripted fetch failure".to_owned()));
        }
        Ok(state
            .messages_by_topic
            .get(&topic_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_artifacts(&self, topic_id: TopicId) -> ServiceResult<Vec<Artifact>> {
        let gate = self
            .artifact_gate
            .lock()
            .expect("artifact gate poisoned")
            .take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(self
            .lock()
            .artifacts_by_topic
            .get(&topic_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_artifact_content(&self, artifact_id: ArtifactId) -> ServiceResult<String> {
        self.lock()
            .content_by_artifact
            .get(&artifact_id)
            .cloned()
            .ok_or_else(|| ServiceError::Protocol(format!("unknown artifact {artifact_id}")))
    }

    async fn send_message(&self, topic_id: TopicId, content: &str) -> ServiceResult<()> {
        self.lock().sent_messages.push((topic_id, content.to_owned()));
        Ok(())
    }

    async fn delete_message(
        &self,
        topic_id: TopicId,
        message_id: MessageId,
    ) -> ServiceResult<()> {
        self.lock().deleted_messages.push((topic_id, message_id));
        Ok(())
    }

    async fn delete_topic(&self, topic_id: TopicId) -> ServiceResult<()> {
        let mut state = self.lock();
        if let Some(error) = state.topic_delete_failure.take() {
            return Err(error);
        }
        state.deleted_topics.push(topic_id);
        Ok(())
    }
}

struct MockStream {
    receiver: mpsc::UnboundedReceiver<StreamItem>,
}

#[async_trait]
impl StatusEventSubscription for MockStream {
    async fn next_event(&mut self) -> ServiceResult<Option<GenerationStatusEvent>> {
        match self.receiver.recv().await {
            Some(item) => item,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StatusStreamSource for MockService {
    async fn open(&self, _topic_id: TopicId) -> ServiceResult<StatusEventStream> {
        let receiver = self
            .streams
            .lock()
            .expect("mock streams poisoned")
            .pop_front()
            .ok_or_else(|| ServiceError::Network("no scripted stream left".to_owned()))?;
        Ok(Box::new(MockStream { receiver }))
    }
}

pub fn server_message(id: i64, role: Role, content: &str) -> Message {
    Message {
        id: Some(MessageId::new(id)),
        sequence_number: Some(id as u32),
        ..Message::provisional(role, content)
    }
}

pub fn server_plan_message(id: i64, content: &str) -> Message {
    Message {
        is_plan: true,
        ..server_message(id, Role::Assistant, content)
    }
}

pub fn server_report_message(id: i64, content: &str) -> Message {
    server_message(id, Role::Assistant, content)
}

pub fn report_artifact(artifact_id: i64, message_id: i64) -> Artifact {
    Artifact {
        id: ArtifactId::new(artifact_id),
        kind: ArtifactKind::Md,
        filename: format!("report-{artifact_id}.md"),
        message_id: Some(MessageId::new(message_id)),
        content: None,
    }
}

pub fn progress_event(status: GenerationPhase, percent: u8) -> GenerationStatusEvent {
    GenerationStatusEvent {
        event: StatusEventKind::StatusUpdate,
        status,
        progress_percent: percent,
        artifact_id: None,
        error_message: None,
    }
}

pub fn completed_event(artifact_id: i64) -> GenerationStatusEvent {
    GenerationStatusEvent {
        event: StatusEventKind::Completion,
        status: GenerationPhase::Completed,
        progress_percent: 100,
        artifact_id: Some(ArtifactId::new(artifact_id)),
        error_message: None,
    }
}

pub fn failed_event(reason: &str) -> GenerationStatusEvent {
    GenerationStatusEvent {
        event: StatusEventKind::Completion,
        status: GenerationPhase::Failed,
        progress_percent: 0,
        artifact_id: None,
        error_message: Some(reason.to_owned()),
    }
}

pub async fn wait_for_phase(orchestrator: &GenerationOrchestrator, phase: LifecyclePhase) {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while orchestrator.phase().await != phase {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for phase {phase:?}"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_job_progress(
    orchestrator: &GenerationOrchestrator,
    topic_id: TopicId,
    percent: u8,
) {
    let deadline = Instant::now() + TEST_TIMEOUT;
    loop {
        if orchestrator
            .job_status(topic_id)
            .await
            .is_some_and(|job| job.progress_percent >= percent)
        {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for job progress {percent}%"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_generation_idle(orchestrator: &GenerationOrchestrator, topic_id: TopicId) {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while orchestrator.is_generating(TopicRef::Real(topic_id)).await {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for generation to settle"
        );
        sleep(Duration::from_millis(10)).await;
    }
}
