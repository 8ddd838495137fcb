use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reportgen_protocol::{ArtifactId, GenerationStatusEvent, TopicId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One message on a status subscription channel. A subscription yields zero
/// or more `Progress` messages followed by exactly one terminal message,
/// after which the channel ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusStreamMessage {
    Progress(GenerationStatusEvent),
    Completed { artifact_id: Option<ArtifactId> },
    Failed { error_message: String },
    TransportError(String),
}

impl StatusStreamMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Shared completion/cancellation state between a relay task, its
/// subscription handle, and the manager. The `finished` flag gates every
/// terminal send so a just-arrived terminal event and a caller-initiated
/// cancel can never both get through.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionState {
    finished: AtomicBool,
    cancelled: AtomicBool,
    relay_task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionState {
    pub(crate) fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Returns true exactly once, for whichever path claims the terminal
    /// transition first.
    pub(crate) fn mark_finished(&self) -> bool {
        !self.finished.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn attach_relay_task(&self, task: JoinHandle<()>) {
        let mut slot = self.relay_task.lock().expect("relay task slot poisoned");
        *slot = Some(task);
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.finished.store(true, Ordering::SeqCst);
        let task = {
            let mut slot = self.relay_task.lock().expect("relay task slot poisoned");
            slot.take()
        };
        if let Some(task) = task {
            task.abort();
        }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Consumer handle for one generation status subscription.
#[derive(Debug)]
pub struct StatusSubscription {
    topic_id: TopicId,
    receiver: mpsc::UnboundedReceiver<StatusStreamMessage>,
    state: Arc<SubscriptionState>,
}

impl StatusSubscription {
    pub(crate) fn new(
        topic_id: TopicId,
        receiver: mpsc::UnboundedReceiver<StatusStreamMessage>,
        state: Arc<SubscriptionState>,
    ) -> Self {
        Self {
            topic_id,
            receiver,
            state,
        }
    }

    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    /// Next message, or `None` once the subscription has delivered its
    /// terminal message or been cancelled. Messages queued before a cancel
    /// are suppressed, not delivered late.
    pub async fn next(&mut self) -> Option<StatusStreamMessage> {
        if self.state.cancelled() {
            self.receiver.close();
            return None;
        }
        let message = self.receiver.recv().await?;
        if self.state.cancelled() {
            self.receiver.close();
            return None;
        }
        Some(message)
    }

    /// Idempotent; safe to call before, during, or after termination. Severs
    /// the relay task if still running and prevents any further delivery.
    pub fn cancel(&self) {
        self.state.cancel();
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        self.state.cancel();
    }
}
