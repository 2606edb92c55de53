//! Run lifecycle events.
//!
//! The runner reports what it is doing through an [`EventSink`]. Event
//! payloads are JSON objects carrying at least `run_id`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run has started.
pub const RUN_STARTED: &str = "run.started";
/// A run finished within budget.
pub const RUN_COMPLETED: &str = "run.completed";
/// Wide summary of a finished run, emitted last.
pub const RUN_SUMMARY: &str = "run.summary";
/// A run exceeded its budget.
pub const RUN_TIMEOUT: &str = "run.timeout";
/// A stage was dispatched to the executor.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage's executor returned a value.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage's executor failed; the stage continues degraded.
pub const STAGE_FAILED: &str = "stage.failed";
