//! Error kinds surfaced by the scheduling core.
//!
//! Soft outcomes (a task that fits nowhere, a degenerate reconciliation) are
//! returned as data and never show up here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("malformed timestamp '{value}': {reason}")]
    MalformedTimestamp { value: String, reason: String },

    #[error("oracle response invalid: {0}")]
    OracleResponseInvalid(String),

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("invalid availability window on {date}: {start} is not before {end}")]
    InvalidWindow {
        date: String,
        start: String,
        end: String,
    },

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("bad pattern: {0}")]
    Pattern(String),
}

impl ScheduleError {
    pub fn malformed(value: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedTimestamp {
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;
