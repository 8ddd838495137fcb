use std::collections::{HashMap, HashSet};

use reportgen_protocol::{Message, TopicRef};

/// Single source of truth for per-topic message sequences and coarse UI
/// flags. Operations are synchronous and total; merge semantics live with
/// the callers (see [`crate::merge::merge_messages`]). The store does no
/// internal locking: the orchestrator owns it behind a single lock so that
/// no two mutations interleave on the same topic.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: HashMap<TopicRef, Vec<Message>>,
    generating: HashSet<TopicRef>,
    deleting: HashSet<TopicRef>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total replacement, used after an authoritative fetch.
    pub fn set_messages(&mut self, topic: TopicRef, messages: Vec<Message>) {
        self.messages.insert(topic, messages);
    }

    /// Append-only, used for optimistic local additions.
    pub fn append_message(&mut self, topic: TopicRef, message: Message) {
        self.messages.entry(topic).or_default().push(message);
    }

    pub fn append_messages(&mut self, topic: TopicRef, messages: Vec<Message>) {
        self.messages.entry(topic).or_default().extend(messages);
    }

    /// Removes a topic's in-memory messages and flags; used when a draft is
    /// promoted or abandoned, or a topic is deleted.
    pub fn clear(&mut self, topic: TopicRef) {
        self.messages.remove(&topic);
        self.generating.remove(&topic);
        self.deleting.remove(&topic);
    }

    pub fn get(&self, topic: TopicRef) -> &[Message] {
        self.messages.get(&topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_generating(&mut self, topic: TopicRef, generating: bool) {
        if generating {
            self.generating.insert(topic);
        } else {
            self.generating.remove(&topic);
        }
    }

    pub fn is_generating(&self, topic: TopicRef) -> bool {
        self.generating.contains(&topic)
    }

    pub fn set_deleting(&mut self, topic: TopicRef, deleting: bool) {
        if deleting {
            self.deleting.insert(topic);
        } else {
            self.deleting.remove(&topic);
        }
    }

    pub fn is_deleting(&self, topic: TopicRef) -> bool {
        self.deleting.contains(&topic)
    }

    pub fn topics(&self) -> Vec<TopicRef> {
        self.messages.keys().copied().collect()
    }

    pub fn len(&self, topic: TopicRef) -> usize {
        self.messages.get(&topic).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self, topic: TopicRef) -> bool {
        self.len(topic) == 0
    }
}
