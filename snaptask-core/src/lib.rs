//! snaptask-core: scheduling engine for SnapTask
//!
//! Turns tasks plus free-time windows into a non-overlapping, policy-compliant
//! timetable, either by deterministic packing or by validating a schedule
//! proposed by an external reasoning oracle.

pub mod breakdown;
pub mod error;
pub mod oracle;
pub mod packer;
pub mod policy;
pub mod prompts;
pub mod reminders;
pub mod routine;
pub mod sanitizer;
pub mod task;
pub mod time;
pub mod verify;

pub use breakdown::{reconcile, Subtask};
pub use error::{Result, ScheduleError};
pub use oracle::{
    extract_tasks, propose_breakdown, propose_schedule, OracleSchedule, ProposedSchedule,
    ReasoningOracle,
};
pub use packer::{pack, pack_around, PackOutcome};
pub use policy::{ConstraintPolicy, Meal, MealWindow};
pub use reminders::{project_reminders, ReminderIntent, ReminderPolicy};
pub use routine::{roll_forward, routine_tasks};
pub use sanitizer::{sanitize, CandidateItem, SanitizedItem};
pub use task::{AvailabilityWindow, Priority, ScheduleRequest, ScheduledItem, Task};
pub use time::Interval;
pub use verify::{verify, RejectReason, Verification, VerifyWarning};
