use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(TopicId);
numeric_id!(MessageId);
numeric_id!(ArtifactId);
numeric_id!(TemplateId);

/// Reference to a conversation: either the single unsaved draft the client is
/// composing, or a server-identified topic. The wire protocol reserves topic
/// id `0` for the draft; server-assigned ids are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicRef {
    Draft,
    Real(TopicId),
}

impl TopicRef {
    pub fn from_wire(raw: i64) -> Self {
        if raw > 0 {
            Self::Real(TopicId::new(raw))
        } else {
            Self::Draft
        }
    }

    pub fn as_wire(self) -> i64 {
        match self {
            Self::Draft => 0,
            Self::Real(id) => id.get(),
        }
    }

    pub fn is_draft(self) -> bool {
        matches!(self, Self::Draft)
    }

    pub fn real_id(self) -> Option<TopicId> {
        match self {
            Self::Draft => None,
            Self::Real(id) => Some(id),
        }
    }
}

impl From<TopicId> for TopicRef {
    fn from(id: TopicId) -> Self {
        Self::Real(id)
    }
}

impl std::fmt::Display for TopicRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Real(id) => write!(f, "{id}"),
        }
    }
}
