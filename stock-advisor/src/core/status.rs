//! Stage status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a stage's executor call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The executor returned a value.
    #[default]
    Ok,
    /// The executor failed or panicked; the stage carries an empty value.
    Degraded,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

impl StageStatus {
    /// Returns true if the executor produced its own value.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }
}
