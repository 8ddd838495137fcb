//! Streaming subscription manager: turns the server's generation status
//! stream into per-topic channels with exactly one terminal delivery and
//! idempotent cancellation.

pub mod manager;
pub mod subscription;

pub use manager::StatusStreamManager;
pub use subscription::{StatusStreamMessage, StatusSubscription};
