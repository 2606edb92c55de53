//! Core domain model types.
//!
//! This module contains the values that flow between the runner, the
//! resolver and the decoder:
//! - Stage values and results with provenance
//! - The aggregate run result in its two shapes
//! - Stage status

mod aggregate;
mod result;
mod status;

pub use aggregate::{AggregateRunResult, StageRecord, TaskOutput};
pub use result::{StageResult, StageValue};
pub use status::StageStatus;
