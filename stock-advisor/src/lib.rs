//! # Stock Advisor
//!
//! Stage orchestration and result resolution for a multi-stage stock
//! analysis pipeline.
//!
//! Three independent analyses (news, fundamentals, technicals) run
//! concurrently for one ticker; an investment decision stage runs after them
//! with their outputs as context. The crate provides:
//!
//! - **Stage graph**: declare stages with dependencies and get execution tiers
//! - **Tiered runner**: concurrent tiers under one wall-clock budget
//! - **Result resolution**: pull one stage's text out of a loosely shaped run result
//! - **Decision decoding**: a structured recommendation that always has every field
//! - **Facet responses**: the shapes a transport layer serves
//!
//! How a stage computes its answer is up to the [`stages::StageExecutor`]
//! you plug in.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stock_advisor::prelude::*;
//!
//! let service = AdvisorService::new(Arc::new(MyExecutor::new()), AdvisorConfig::from_env()?)?;
//! let analysis = service.analyze_complete(&Subject::new("HPG")).await?;
//! println!("{}", analysis.investment_decision.decision);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod decision;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod resolve;
pub mod response;
pub mod service;
pub mod stages;
pub mod testing;

pub use service::AdvisorService;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AdvisorConfig, DisplayBudgets, PlaceholderLabels, ProviderConfig};
    pub use crate::context::{PipelineRun, RunOutcome, Subject, UpstreamContext};
    pub use crate::core::{AggregateRunResult, StageResult, StageStatus, StageValue, TaskOutput};
    pub use crate::decision::{Action, DecisionDecoder, DecisionRecord, Decoded};
    pub use crate::errors::{AdvisorError, ExecutorError, GraphDefinitionError, TimeoutOutcome};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{advisor_graph, AdvisorStage, PipelineRunner, StageGraph, StageSpec};
    pub use crate::resolve::{truncate_display, Resolution, ResultResolver};
    pub use crate::response::{
        CompleteAnalysis, FundamentalFacet, NewsFacet, ResponseAssembler, TechnicalFacet,
    };
    pub use crate::service::AdvisorService;
    pub use crate::stages::StageExecutor;
    pub use std::sync::Arc;
}
