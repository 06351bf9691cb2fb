//! Runtime layer of the metro status bot.
//!
//! Holds the outbound channels and the `check` cycle that ties the status
//! source, the state store and the publishers together.

pub mod oauth;
pub mod orchestrator;
pub mod publishers;

pub use orchestrator::{CycleReport, PublishFailure, StatusChecker};
