use serde::{Deserialize, Serialize};

use crate::ids::{ArtifactId, TopicId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationPhase {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl GenerationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEventKind {
    StatusUpdate,
    Completion,
}

/// One event on the generation status stream, as emitted by the server.
/// `progress_percent` is expected to be non-decreasing but the server does
/// not guarantee it; consumers may smooth it for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStatusEvent {
    pub event: StatusEventKind,
    pub status: GenerationPhase,
    #[serde(default)]
    pub progress_percent: u8,
    #[serde(default)]
    pub artifact_id: Option<ArtifactId>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Client-side view of an in-flight generation job. Ephemeral: created when a
/// generation request is accepted and cleared on the terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJobStatus {
    pub topic_id: TopicId,
    pub phase: GenerationPhase,
    pub progress_percent: u8,
    pub artifact_id: Option<ArtifactId>,
    pub error_message: Option<String>,
}

impl GenerationJobStatus {
    pub fn accepted(topic_id: TopicId) -> Self {
        Self {
            topic_id,
            phase: GenerationPhase::Pending,
            progress_percent: 0,
            artifact_id: None,
            error_message: None,
        }
    }

    pub fn apply(&mut self, event: &GenerationStatusEvent) {
        self.phase = event.status;
        self.progress_percent = event.progress_percent;
        if event.artifact_id.is_some() {
            self.artifact_id = event.artifact_id;
        }
        if event.error_message.is_some() {
            self.error_message = event.error_message.clone();
        }
    }
}
