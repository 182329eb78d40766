//! Re-validation of sanitized schedules against availability and policy.
//!
//! The sanitizer trusts nothing about structure but passes timestamps through
//! untouched. Verification parses them and keeps only items that could have
//! come out of the packer: inside a window, non-empty, not overlapping an
//! earlier accepted item. A buffer shortfall is reported but tolerated.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScheduleError;
use crate::policy::ConstraintPolicy;
use crate::sanitizer::SanitizedItem;
use crate::task::{AvailabilityWindow, ScheduledItem, Task};
use crate::time::{parse_timestamp, Interval};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    MissingTimestamp,
    MalformedTimestamp { value: String, reason: String },
    EmptyInterval,
    OutsideAvailability,
    Overlap { with: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub item: SanitizedItem,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyWarning {
    BufferShortfall {
        before: String,
        after: String,
        gap_minutes: i64,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Accepted items, in candidate order.
    pub accepted: Vec<ScheduledItem>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<VerifyWarning>,
}

impl Verification {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.warnings.is_empty()
    }

    /// Original tasks with no accepted item of the same description.
    ///
    /// Matching is case-insensitive and one-to-one, so a task submitted twice
    /// needs two accepted items.
    pub fn missing_tasks(&self, original_tasks: &[Task]) -> Vec<Task> {
        let mut used = vec![false; self.accepted.len()];
        let mut missing = Vec::new();
        for task in original_tasks {
            let needle = task.description.trim();
            let hit = self.accepted.iter().enumerate().position(|(i, item)| {
                !used[i] && item.task_description.trim().eq_ignore_ascii_case(needle)
            });
            match hit {
                Some(i) => used[i] = true,
                None => missing.push(task.clone()),
            }
        }
        missing
    }
}

/// Check sanitized items against `windows` and `policy`.
pub fn verify(
    items: &[SanitizedItem],
    windows: &[AvailabilityWindow],
    policy: &ConstraintPolicy,
) -> Verification {
    let mut out = Verification::default();

    for item in items {
        let slot = match resolve_interval(item) {
            Ok(slot) => slot,
            Err(reason) => {
                reject(&mut out, item, reason);
                continue;
            }
        };

        if !windows.iter().any(|w| slot.within(&w.interval())) {
            reject(&mut out, item, RejectReason::OutsideAvailability);
            continue;
        }

        if let Some(clash) = out.accepted.iter().find(|a| a.interval().overlaps(&slot)) {
            let reason = RejectReason::Overlap {
                with: clash.task_description.clone(),
            };
            reject(&mut out, item, reason);
            continue;
        }

        for earlier in &out.accepted {
            let prev = earlier.interval();
            if !policy.separated(&prev, &slot) {
                let gap = if slot.start >= prev.end {
                    slot.start - prev.end
                } else {
                    prev.start - slot.end
                };
                out.warnings.push(VerifyWarning::BufferShortfall {
                    before: earlier.task_description.clone(),
                    after: item.task_description.clone(),
                    gap_minutes: gap.num_minutes(),
                });
            }
        }

        out.accepted.push(ScheduledItem {
            task_description: item.task_description.clone(),
            start_time: slot.start,
            end_time: slot.end,
            priority: item.priority,
            is_daily_routine: item.is_daily_routine,
        });
    }

    out
}

fn resolve_interval(item: &SanitizedItem) -> Result<Interval, RejectReason> {
    let (Some(start), Some(end)) = (item.start_time.as_deref(), item.end_time.as_deref()) else {
        return Err(RejectReason::MissingTimestamp);
    };
    let start = parse_timestamp(start).map_err(malformed)?;
    let end = parse_timestamp(end).map_err(malformed)?;
    Interval::new(start, end).ok_or(RejectReason::EmptyInterval)
}

fn malformed(e: ScheduleError) -> RejectReason {
    match e {
        ScheduleError::MalformedTimestamp { value, reason } => {
            RejectReason::MalformedTimestamp { value, reason }
        }
        other => RejectReason::MalformedTimestamp {
            value: String::new(),
            reason: other.to_string(),
        },
    }
}

fn reject(out: &mut Verification, item: &SanitizedItem, reason: RejectReason) {
    warn!(item = %item.task_description, ?reason, "rejected oracle item");
    out.rejected.push(Rejection {
        item: item.clone(),
        reason,
    });
}
