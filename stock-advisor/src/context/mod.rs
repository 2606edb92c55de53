//! Per-run context.
//!
//! This module provides:
//! - The analysis subject
//! - The upstream view a dependent stage receives
//! - The record of a single pipeline run

mod run;
mod subject;
mod upstream;

pub use run::{PipelineRun, RunOutcome};
pub use subject::{today, Subject};
pub use upstream::UpstreamContext;
