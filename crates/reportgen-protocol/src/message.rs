use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::{ArtifactId, MessageId, TemplateId, TopicId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One turn in a conversation. A message without an `id` is provisional: it
/// exists only for immediate feedback and is either superseded by a
/// server-confirmed message during a merge or discarded with its draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sequence_number: Option<u32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_plan: bool,
    #[serde(default)]
    pub artifact_ids: Vec<ArtifactId>,
}

impl Message {
    pub fn provisional(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            sequence_number: None,
            created_at: Some(OffsetDateTime::now_utc()),
            is_plan: false,
            artifact_ids: Vec::new(),
        }
    }

    pub fn provisional_user(content: impl Into<String>) -> Self {
        Self::provisional(Role::User, content)
    }

    pub fn provisional_assistant(content: impl Into<String>) -> Self {
        Self::provisional(Role::Assistant, content)
    }

    pub fn provisional_plan(content: impl Into<String>) -> Self {
        Self {
            is_plan: true,
            ..Self::provisional(Role::Assistant, content)
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Active,
    Archived,
    Deleted,
}

/// A persisted conversation thread. Does not exist client-side until the
/// planning call returns a server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub input_prompt: String,
    #[serde(default)]
    pub generated_title: Option<String>,
    pub status: TopicStatus,
    #[serde(default)]
    pub template_id: Option<TemplateId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSection {
    pub title: String,
    pub description: String,
}

/// The AI-proposed outline for a not-yet-generated report. Always refers to a
/// real topic id: planning is the step that promotes the draft. The text is
/// locally editable until generation starts or the draft is abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub topic_id: TopicId,
    pub plan_text: String,
    pub sections: Vec<PlanSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Md,
    Hwpx,
    #[serde(untagged)]
    Other(String),
}

/// A generated file linked to a message. Content is lazily fetched, never
/// embedded at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub filename: String,
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub content: Option<String>,
}
