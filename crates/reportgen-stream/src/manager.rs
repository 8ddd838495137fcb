use std::collections::HashMap;
use std::sync::Arc;

use reportgen_protocol::{
    GenerationPhase, ServiceResult, StatusEventStream, StatusStreamSource, TopicId,
};
use tokio::sync::{mpsc, RwLock};

use crate::subscription::{StatusStreamMessage, StatusSubscription, SubscriptionState};

/// Opens and tracks at most one live status subscription per topic. A second
/// `subscribe` for the same topic cancels and replaces the first, so two
/// relay tasks can never race to report the same job.
pub struct StatusStreamManager {
    source: Arc<dyn StatusStreamSource>,
    active: Arc<RwLock<HashMap<TopicId, Arc<SubscriptionState>>>>,
}

impl StatusStreamManager {
    pub fn new(source: Arc<dyn StatusStreamSource>) -> Self {
        Self {
            source,
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn subscribe(&self, topic_id: TopicId) -> ServiceResult<StatusSubscription> {
        self.cancel(topic_id).await;

        let stream = self.source.open(topic_id).await?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(SubscriptionState::default());

        {
            let mut active = self.active.write().await;
            active.insert(topic_id, Arc::clone(&state));
        }

        let relay_state = Arc::clone(&state);
        let registry = Arc::clone(&self.active);
        let task = tokio::spawn(async move {
            relay(topic_id, stream, &sender, &relay_state).await;
            let mut active = registry.write().await;
            // A replacement may already own this slot; only clean up our own.
            if active
                .get(&topic_id)
                .is_some_and(|entry| Arc::ptr_eq(entry, &relay_state))
            {
                active.remove(&topic_id);
            }
        });
        state.attach_relay_task(task);

        Ok(StatusSubscription::new(topic_id, receiver, state))
    }

    /// Cancels the active subscription for a topic, if any. Idempotent.
    pub async fn cancel(&self, topic_id: TopicId) {
        let state = {
            let mut active = self.active.write().await;
            active.remove(&topic_id)
        };
        if let Some(state) = state {
            state.cancel();
        }
    }

    pub async fn is_active(&self, topic_id: TopicId) -> bool {
        let active = self.active.read().await;
        active
            .get(&topic_id)
            .is_some_and(|state| !state.finished())
    }

    pub async fn active_count(&self) -> usize {
        let active = self.active.read().await;
        active.len()
    }
}

/// Consumes the transport until the first terminal event, forwarding progress
/// along the way. The shared `finished` flag makes terminal delivery
/// exactly-once even against duplicate server sends, trailing bytes after the
/// terminal event, or a concurrent cancel.
async fn relay(
    topic_id: TopicId,
    mut stream: StatusEventStream,
    sender: &mpsc::UnboundedSender<StatusStreamMessage>,
    state: &SubscriptionState,
) {
    loop {
        match stream.next_event().await {
            Ok(Some(event)) => {
                if state.finished() {
                    break;
                }
                match event.status {
                    GenerationPhase::Pending | GenerationPhase::Generating => {
                        let _ = sender.send(StatusStreamMessage::Progress(event));
                    }
                    GenerationPhase::Completed => {
                        if state.mark_finished() {
                            let _ = sender.send(StatusStreamMessage::Completed {
                                artifact_id: event.artifact_id,
                            });
                        }
                        break;
                    }
                    GenerationPhase::Failed => {
                        if state.mark_finished() {
                            let _ = sender.send(StatusStreamMessage::Failed {
                                error_message: event
                                    .error_message
                                    .unwrap_or_else(|| "generation failed".to_owned()),
                            });
                        }
                        break;
                    }
                }
            }
            Ok(None) => {
                // The job outcome is unknown; do not synthesize a completion.
                if state.mark_finished() {
                    let _ = sender.send(StatusStreamMessage::TransportError(
                        "status stream closed before a terminal event".to_owned(),
                    ));
                }
                break;
            }
            Err(error) => {
                tracing::warn!(topic = %topic_id, error = %error, "status stream transport failed");
                if state.mark_finished() {
                    let _ = sender.send(StatusStreamMessage::TransportError(error.to_string()));
                }
                break;
            }
        }
    }
}
