//! Pipeline definition and execution.
//!
//! This module provides:
//! - Stage specifications and the dependency graph
//! - The advisor pipeline definition
//! - The tiered runner

mod definition;
mod graph;
mod runner;
mod spec;

pub use definition::{advisor_graph, decision_schema, AdvisorStage, ADVISOR_PIPELINE, DECISION_FIELDS};
pub use graph::StageGraph;
pub use runner::PipelineRunner;
pub use spec::{OutputSchema, StageSpec};
