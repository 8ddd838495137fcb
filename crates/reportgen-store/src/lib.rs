//! Per-topic message store and the local/authoritative merge algorithm.

pub mod merge;
pub mod store;

pub use merge::merge_messages;
pub use store::MessageStore;
