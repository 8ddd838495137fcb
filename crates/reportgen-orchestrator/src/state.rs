use reportgen_protocol::{Plan, TopicId, TopicRef};

/// Where the selected topic sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Nothing in flight; the draft conversation is empty.
    Idle,
    /// A prompt has been submitted and a plan is being drafted.
    Drafting,
    /// A plan exists and awaits approval (or another edit round).
    PlanReady,
    /// A generation job is running for the selected topic.
    Generating,
    /// The report finished and its artifacts are available.
    Complete,
}

/// Mutable per-session state guarded by the orchestrator's lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub selected: TopicRef,
    pub phase: LifecyclePhase,
    pub active_plan: Option<Plan>,
    /// The prompt that produced the active plan, replayed on approval.
    pub input_prompt: Option<String>,
    pub recent_topics: Vec<TopicId>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selected: TopicRef::Draft,
            phase: LifecyclePhase::Idle,
            active_plan: None,
            input_prompt: None,
            recent_topics: Vec::new(),
        }
    }
}

impl SessionState {
    pub fn remember_topic(&mut self, topic_id: TopicId) {
        if !self.recent_topics.contains(&topic_id) {
            self.recent_topics.push(topic_id);
        }
    }

    pub fn forget_topic(&mut self, topic_id: TopicId) {
        self.recent_topics.retain(|id| *id != topic_id);
        if self.selected == TopicRef::Real(topic_id) {
            self.selected = TopicRef::Draft;
            self.phase = LifecyclePhase::Idle;
            if self
                .active_plan
                .as_ref()
                .is_some_and(|plan| plan.topic_id == topic_id)
            {
                self.active_plan = None;
                self.input_prompt = None;
            }
        }
    }
}
