//! Drives the topic lifecycle from first prompt to finished report.
//!
//! The [`GenerationOrchestrator`] owns the per-session state machine: a
//! draft conversation accumulates locally, planning promotes it onto a
//! server-assigned topic, and an approved plan kicks off a generation job
//! whose status stream is consumed by a background driver task. The
//! [`ChatActions`] facade sits on top and routes user-facing operations to
//! the right lifecycle operation.

mod actions;
mod error;
mod orchestrator;
mod state;

#[cfg(test)]
mod test_support;

pub use actions::{ChatActions, DeleteOutcome, SendOutcome};
pub use error::{ChatError, ChatResult};
pub use orchestrator::{GenerateOptions, GenerationOrchestrator, PlanOptions};
pub use state::LifecyclePhase;
