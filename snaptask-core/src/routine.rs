//! Daily routine rollover.

use chrono::NaiveDate;

use crate::task::{ScheduledItem, Task};
use crate::time::combine;

/// Re-date daily-routine items to `next_date`, keeping wall-clock times.
/// Everything else is dropped. Output is chronological.
pub fn roll_forward(items: &[ScheduledItem], next_date: NaiveDate) -> Vec<ScheduledItem> {
    let mut out: Vec<ScheduledItem> = items
        .iter()
        .filter(|i| i.is_daily_routine)
        .map(|i| {
            // Keep the span so items crossing midnight still end the next day.
            let span = i.end_time - i.start_time;
            let start = combine(next_date, i.start_time.time());
            ScheduledItem {
                start_time: start,
                end_time: start + span,
                ..i.clone()
            }
        })
        .collect();
    out.sort_by_key(|i| i.start_time);
    out
}

/// Daily items turned back into tasks, for re-packing into new availability.
pub fn routine_tasks(items: &[ScheduledItem]) -> Vec<Task> {
    items
        .iter()
        .filter(|i| i.is_daily_routine)
        .map(|i| Task {
            description: i.task_description.clone(),
            priority: i.priority,
            estimated_duration_minutes: i32::try_from(i.interval().duration_minutes()).unwrap_or(i32::MAX),
            is_daily_routine: true,
        })
        .collect()
}
