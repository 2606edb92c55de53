//! Testing utilities for advisor pipelines.
//!
//! This module provides:
//! - A scripted stage executor with call recording
//! - Canned subjects and stage payloads

mod fixtures;
mod mocks;

pub use fixtures::{advisor_executor, decision_payload, hpg_subject};
pub use mocks::{RecordedCall, ScriptedExecutor};
