use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reportgen_protocol::{
    Artifact, ArtifactId, GenerateRequest, GenerationJobStatus, Message, MessageId, Plan,
    PlanRequest, ReportService, ServiceError, StatusStreamSource, TemplateId, TopicId, TopicRef,
};
use reportgen_store::{merge_messages, MessageStore};
use reportgen_stream::{StatusStreamManager, StatusStreamMessage, StatusSubscription};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::{ChatError, ChatResult};
use crate::state::{LifecyclePhase, SessionState};

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub template_id: Option<TemplateId>,
    pub web_search: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub is_edit: bool,
    pub web_search: bool,
}

struct DriverSlot {
    seq: u64,
    task: JoinHandle<()>,
}

/// Coordinates the draft-to-report lifecycle for one chat session.
///
/// Messages for the not-yet-persisted conversation accumulate under
/// [`TopicRef::Draft`]; a successful planning call promotes them onto the
/// server-assigned topic id. Approving a plan starts a server-side job and a
/// background driver task that consumes its status subscription and settles
/// the session when the job terminates. Cloning is shallow: clones share all
/// state, which is how driver tasks reach back into the session.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    service: Arc<dyn ReportService>,
    streams: Arc<StatusStreamManager>,
    store: Arc<RwLock<MessageStore>>,
    session: Arc<RwLock<SessionState>>,
    jobs: Arc<RwLock<HashMap<TopicId, GenerationJobStatus>>>,
    drivers: Arc<RwLock<HashMap<TopicId, DriverSlot>>>,
    driver_seq: Arc<AtomicU64>,
}

impl GenerationOrchestrator {
    pub fn new(
        service: Arc<dyn ReportService>,
        stream_source: Arc<dyn StatusStreamSource>,
    ) -> Self {
        Self {
            service,
            streams: Arc::new(StatusStreamManager::new(stream_source)),
            store: Arc::new(RwLock::new(MessageStore::new())),
            session: Arc::new(RwLock::new(SessionState::default())),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            drivers: Arc::new(RwLock::new(HashMap::new())),
            driver_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submits a report topic: echoes the prompt into the draft, asks the
    /// server to draft a plan, and on success promotes the draft onto the
    /// returned topic id.
    pub async fn submit_topic(&self, prompt: &str, options: PlanOptions) -> ChatResult<TopicId> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        {
            let mut store = self.store.write().await;
            store.append_message(TopicRef::Draft, Message::provisional_user(prompt));
            store.set_generating(TopicRef::Draft, true);
        }
        {
            let mut session = self.session.write().await;
            session.phase = LifecyclePhase::Drafting;
            session.input_prompt = Some(prompt.to_owned());
        }

        let request = PlanRequest {
            topic: prompt.to_owned(),
            is_template_used: options.template_id.is_some(),
            template_id: options.template_id,
            is_web_search: options.web_search,
        };

        let response = match self.service.create_plan(request).await {
            Ok(response) => response,
            Err(error) => {
                self.handle_planning_failure(&error).await;
                return Err(error.into());
            }
        };
        let topic_id = response.topic_id;

        {
            let mut store = self.store.write().await;
            store.append_message(TopicRef::Draft, Message::provisional_plan(&*response.plan));
            store.set_generating(TopicRef::Draft, false);
        }
        {
            let mut session = self.session.write().await;
            session.active_plan = Some(Plan {
                topic_id,
                plan_text: response.plan,
                sections: response.sections,
            });
            session.phase = LifecyclePhase::PlanReady;
        }

        self.promote_draft(topic_id).await;
        Ok(topic_id)
    }

    /// Replaces the editable plan text before approval.
    pub async fn update_plan_text(&self, plan_text: &str) -> ChatResult<()> {
        let mut session = self.session.write().await;
        match session.active_plan.as_mut() {
            Some(plan) => {
                plan.plan_text = plan_text.to_owned();
                Ok(())
            }
            None => Err(ChatError::NoActivePlan),
        }
    }

    /// Approves the active plan and starts generation. The returned topic id
    /// identifies the job; its progress is readable via [`Self::job_status`]
    /// until a terminal event settles the session. Approving again while a
    /// job is in flight replaces that job's subscription rather than adding
    /// a second one.
    pub async fn approve_plan(&self, options: GenerateOptions) -> ChatResult<TopicId> {
        let (plan, prompt) = {
            let session = self.session.read().await;
            let plan = session.active_plan.clone().ok_or(ChatError::NoActivePlan)?;
            (plan, session.input_prompt.clone().unwrap_or_default())
        };
        let topic_id = plan.topic_id;
        let topic = TopicRef::Real(topic_id);

        self.abort_driver(topic_id).await;

        {
            let mut store = self.store.write().await;
            store.set_generating(topic, true);
        }
        {
            let mut session = self.session.write().await;
            session.phase = LifecyclePhase::Generating;
        }

        let request = GenerateRequest {
            topic: prompt,
            plan: plan.plan_text,
            is_edit: options.is_edit,
            is_web_search: options.web_search,
        };

        if let Err(error) = self.service.start_generation(topic_id, request).await {
            self.clear_job(topic_id).await;
            self.settle_phase(topic_id, LifecyclePhase::PlanReady).await;
            return Err(error.into());
        }

        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(topic_id, GenerationJobStatus::accepted(topic_id));
        }

        let subscription = match self.streams.subscribe(topic_id).await {
            Ok(subscription) => subscription,
            Err(error) => {
                self.clear_job(topic_id).await;
                self.settle_phase(topic_id, LifecyclePhase::PlanReady).await;
                return Err(ChatError::Stream(error.to_string()));
            }
        };

        self.spawn_driver(topic_id, subscription).await;
        Ok(topic_id)
    }

    /// Sends an ordinary chat message on an existing topic, with an immediate
    /// local echo that the authoritative re-fetch reconciles.
    pub async fn send_chat_message(&self, topic_id: TopicId, content: &str) -> ChatResult<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let topic = TopicRef::Real(topic_id);
        {
            let mut store = self.store.write().await;
            store.append_message(topic, Message::provisional_user(content));
        }
        self.service.send_message(topic_id, content).await?;

        match self.service.fetch_messages(topic_id).await {
            Ok(authoritative) => {
                let mut store = self.store.write().await;
                let merged = merge_messages(store.get(topic), authoritative);
                store.set_messages(topic, merged);
            }
            Err(error) => {
                tracing::warn!(
                    topic = %topic_id,
                    error = %error,
                    "post-send fetch failed; keeping the local echo"
                );
            }
        }
        Ok(())
    }

    pub async fn delete_message(
        &self,
        topic_id: TopicId,
        message_id: MessageId,
    ) -> ChatResult<()> {
        self.service.delete_message(topic_id, message_id).await?;
        let topic = TopicRef::Real(topic_id);
        let mut store = self.store.write().await;
        let remaining: Vec<Message> = store
            .get(topic)
            .iter()
            .filter(|message| message.id != Some(message_id))
            .cloned()
            .collect();
        store.set_messages(topic, remaining);
        Ok(())
    }

    /// Deletes a topic server-side and drops every local trace of it: cached
    /// messages, in-flight job, subscription, and recent-topic entry.
    pub async fn delete_topic(&self, topic_id: TopicId) -> ChatResult<()> {
        let topic = TopicRef::Real(topic_id);
        {
            let mut store = self.store.write().await;
            store.set_deleting(topic, true);
        }

        if let Err(error) = self.service.delete_topic(topic_id).await {
            let mut store = self.store.write().await;
            store.set_deleting(topic, false);
            return Err(error.into());
        }

        self.abort_driver(topic_id).await;
        {
            let mut store = self.store.write().await;
            store.clear(topic);
        }
        {
            let mut jobs = self.jobs.write().await;
            jobs.remove(&topic_id);
        }
        let mut session = self.session.write().await;
        session.forget_topic(topic_id);
        Ok(())
    }

    pub async fn open_artifact(&self, artifact_id: ArtifactId) -> ChatResult<String> {
        Ok(self.service.fetch_artifact_content(artifact_id).await?)
    }

    /// Cancels the in-flight generation for a topic, if any, discarding its
    /// job status. Used when the user navigates away mid-generation.
    pub async fn cancel_generation(&self, topic_id: TopicId) {
        self.abort_driver(topic_id).await;
        self.clear_job(topic_id).await;
        self.settle_phase(topic_id, LifecyclePhase::PlanReady).await;
    }

    /// Discards the draft conversation and any plan drafted from it.
    pub async fn abandon_draft(&self) {
        {
            let mut store = self.store.write().await;
            store.clear(TopicRef::Draft);
        }
        let mut session = self.session.write().await;
        session.active_plan = None;
        session.input_prompt = None;
        if session.selected == TopicRef::Draft {
            session.phase = LifecyclePhase::Idle;
        }
    }

    pub async fn selected_topic(&self) -> TopicRef {
        self.session.read().await.selected
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.session.read().await.phase
    }

    pub async fn active_plan(&self) -> Option<Plan> {
        self.session.read().await.active_plan.clone()
    }

    pub async fn recent_topics(&self) -> Vec<TopicId> {
        self.session.read().await.recent_topics.clone()
    }

    pub async fn messages(&self, topic: TopicRef) -> Vec<Message> {
        self.store.read().await.get(topic).to_vec()
    }

    pub async fn is_generating(&self, topic: TopicRef) -> bool {
        self.store.read().await.is_generating(topic)
    }

    pub async fn is_deleting(&self, topic: TopicRef) -> bool {
        self.store.read().await.is_deleting(topic)
    }

    pub async fn job_status(&self, topic_id: TopicId) -> Option<GenerationJobStatus> {
        self.jobs.read().await.get(&topic_id).cloned()
    }

    pub async fn active_subscription_count(&self) -> usize {
        self.streams.active_count().await
    }

    async fn handle_planning_failure(&self, error: &ServiceError) {
        if let ServiceError::PlanningFailed {
            orphan_topic: Some(orphan),
            ..
        } = error
        {
            // The server persisted a topic before planning fell over; remove
            // it so it never shows up in the user's topic list.
            if let Err(cleanup_error) = self.service.delete_topic(*orphan).await {
                tracing::warn!(
                    topic = %orphan,
                    error = %cleanup_error,
                    "failed to delete orphan topic after planning failure"
                );
            }
        }

        let mut store = self.store.write().await;
        store.append_message(
            TopicRef::Draft,
            Message::provisional_assistant(format!("Plan drafting failed: {error}")),
        );
        store.set_generating(TopicRef::Draft, false);
    }

    /// Promotion order matters: fill the real topic first, then switch the
    /// selection pointer, then clear the draft. A failed fetch leaves the
    /// draft content visible instead of an empty conversation.
    async fn promote_draft(&self, topic_id: TopicId) {
        match self.service.fetch_messages(topic_id).await {
            Ok(messages) => {
                {
                    let mut store = self.store.write().await;
                    store.set_messages(TopicRef::Real(topic_id), messages);
                }
                {
                    let mut session = self.session.write().await;
                    session.selected = TopicRef::Real(topic_id);
                }
                let mut store = self.store.write().await;
                store.clear(TopicRef::Draft);
            }
            Err(error) => {
                tracing::warn!(
                    topic = %topic_id,
                    error = %error,
                    "post-plan fetch failed; keeping draft content visible"
                );
            }
        }
    }

    async fn spawn_driver(&self, topic_id: TopicId, subscription: StatusSubscription) {
        let seq = self.driver_seq.fetch_add(1, Ordering::SeqCst);
        let orchestrator = self.clone();
        let task = tokio::spawn(async move {
            orchestrator.drive_generation(topic_id, subscription).await;
            let mut drivers = orchestrator.drivers.write().await;
            // A replacement may already own this slot; only clean up our own.
            if drivers.get(&topic_id).is_some_and(|slot| slot.seq == seq) {
                drivers.remove(&topic_id);
            }
        });
        let mut drivers = self.drivers.write().await;
        if let Some(previous) = drivers.insert(topic_id, DriverSlot { seq, task }) {
            previous.task.abort();
        }
    }

    async fn drive_generation(&self, topic_id: TopicId, mut subscription: StatusSubscription) {
        while let Some(message) = subscription.next().await {
            match message {
                StatusStreamMessage::Progress(event) => {
                    let mut jobs = self.jobs.write().await;
                    if let Some(job) = jobs.get_mut(&topic_id) {
                        job.apply(&event);
                    }
                }
                StatusStreamMessage::Completed { artifact_id } => {
                    self.finish_generation(topic_id, artifact_id).await;
                    break;
                }
                StatusStreamMessage::Failed { error_message } => {
                    self.fail_generation(topic_id, &error_message).await;
                    break;
                }
                StatusStreamMessage::TransportError(reason) => {
                    self.fail_generation(topic_id, &reason).await;
                    break;
                }
            }
        }
    }

    async fn finish_generation(&self, topic_id: TopicId, artifact_id: Option<ArtifactId>) {
        tracing::debug!(topic = %topic_id, artifact = ?artifact_id, "generation completed");
        let topic = TopicRef::Real(topic_id);

        match self.service.fetch_messages(topic_id).await {
            Ok(authoritative) => {
                let artifacts = match self.service.fetch_artifacts(topic_id).await {
                    Ok(artifacts) => artifacts,
                    Err(error) => {
                        tracing::warn!(topic = %topic_id, error = %error, "artifact fetch failed");
                        Vec::new()
                    }
                };
                // Merge against whatever the store holds at write time, in
                // one critical section. A chat send confirmed while the
                // fetches were in flight must survive the driver's write.
                let mut store = self.store.write().await;
                let mut merged = merge_messages(store.get(topic), authoritative);
                attach_artifacts(&mut merged, artifacts);
                store.set_messages(topic, merged);
            }
            Err(error) => {
                tracing::warn!(
                    topic = %topic_id,
                    error = %error,
                    "post-completion fetch failed; keeping local messages"
                );
            }
        }

        self.clear_job(topic_id).await;
        {
            let mut session = self.session.write().await;
            session.selected = topic;
            session.phase = LifecyclePhase::Complete;
            session.active_plan = None;
            session.remember_topic(topic_id);
        }
        let mut store = self.store.write().await;
        store.clear(TopicRef::Draft);
    }

    async fn fail_generation(&self, topic_id: TopicId, reason: &str) {
        tracing::warn!(topic = %topic_id, reason = %reason, "generation did not complete");
        self.clear_job(topic_id).await;
        // The plan and every message stay put so the user can retry.
        self.settle_phase(topic_id, LifecyclePhase::PlanReady).await;
    }

    async fn clear_job(&self, topic_id: TopicId) {
        {
            let mut store = self.store.write().await;
            store.set_generating(TopicRef::Real(topic_id), false);
        }
        let mut jobs = self.jobs.write().await;
        jobs.remove(&topic_id);
    }

    /// Moves the lifecycle phase only if the session still concerns this
    /// topic; a stale driver for an abandoned topic must not disturb it.
    async fn settle_phase(&self, topic_id: TopicId, phase: LifecyclePhase) {
        let mut session = self.session.write().await;
        let concerns_topic = session.selected == TopicRef::Real(topic_id)
            || session
                .active_plan
                .as_ref()
                .is_some_and(|plan| plan.topic_id == topic_id);
        if concerns_topic {
            session.phase = phase;
        }
    }

    async fn abort_driver(&self, topic_id: TopicId) {
        let slot = {
            let mut drivers = self.drivers.write().await;
            drivers.remove(&topic_id)
        };
        if let Some(slot) = slot {
            slot.task.abort();
        }
        self.streams.cancel(topic_id).await;
    }
}

/// Links fetched artifacts to the messages that produced them.
fn attach_artifacts(messages: &mut [Message], artifacts: Vec<Artifact>) {
    for artifact in artifacts {
        let Some(message_id) = artifact.message_id else {
            continue;
        };
        if let Some(message) = messages
            .iter_mut()
            .find(|message| message.id == Some(message_id))
        {
            if !message.artifact_ids.contains(&artifact.id) {
                message.artifact_ids.push(artifact.id);
            }
        }
    }
}
