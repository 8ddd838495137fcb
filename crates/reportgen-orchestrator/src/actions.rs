use reportgen_protocol::{ArtifactId, MessageId, TopicId, TopicRef};

use crate::error::ChatResult;
use crate::orchestrator::{GenerateOptions, GenerationOrchestrator, PlanOptions};

/// Index of the generated report message in a topic's canonical layout:
/// prompt, plan, report. Deleting the report is treated as discarding the
/// whole topic, since a topic without its report has no further use.
const REPORT_MESSAGE_INDEX: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message started a new draft conversation and produced a plan.
    PlanDrafted { topic_id: TopicId },
    /// The message went to an existing topic as an ordinary chat turn.
    MessageSent { topic_id: TopicId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    MessageDeleted,
    TopicDeleted,
}

/// User-facing entry points, routed onto the orchestrator by current
/// selection rather than by explicit mode switches in the caller.
pub struct ChatActions {
    orchestrator: GenerationOrchestrator,
}

impl ChatActions {
    pub fn new(orchestrator: GenerationOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    /// Sends user input to wherever the session currently points: a draft
    /// submission kicks off planning, an existing topic gets a chat message.
    pub async fn send(&self, content: &str, options: PlanOptions) -> ChatResult<SendOutcome> {
        match self.orchestrator.selected_topic().await {
            TopicRef::Draft => {
                let topic_id = self.orchestrator.submit_topic(content, options).await?;
                Ok(SendOutcome::PlanDrafted { topic_id })
            }
            TopicRef::Real(topic_id) => {
                self.orchestrator.send_chat_message(topic_id, content).await?;
                Ok(SendOutcome::MessageSent { topic_id })
            }
        }
    }

    pub async fn edit_plan(&self, plan_text: &str) -> ChatResult<()> {
        self.orchestrator.update_plan_text(plan_text).await
    }

    pub async fn approve(&self, options: GenerateOptions) -> ChatResult<TopicId> {
        self.orchestrator.approve_plan(options).await
    }

    /// Deletes a message, escalating to whole-topic deletion when the target
    /// is the report message itself. A message the local cache does not know
    /// is forwarded as a plain delete; the server stays authoritative.
    pub async fn delete_message(
        &self,
        topic_id: TopicId,
        message_id: MessageId,
    ) -> ChatResult<DeleteOutcome> {
        let messages = self.orchestrator.messages(TopicRef::Real(topic_id)).await;
        let position = messages
            .iter()
            .position(|message| message.id == Some(message_id));

        if position == Some(REPORT_MESSAGE_INDEX) {
            self.orchestrator.delete_topic(topic_id).await?;
            Ok(DeleteOutcome::TopicDeleted)
        } else {
            self.orchestrator.delete_message(topic_id, message_id).await?;
            Ok(DeleteOutcome::MessageDeleted)
        }
    }

    pub async fn open_artifact(&self, artifact_id: ArtifactId) -> ChatResult<String> {
        self.orchestrator.open_artifact(artifact_id).await
    }
}
