//! Deterministic first-fit packer.
//!
//! Tasks are taken in priority order and placed into the earliest window
//! (chronologically) whose cursor still has room. There is no look-ahead or
//! backtracking: this is a greedy packer, not an optimal bin packer.
//!
//! Windows on the same date may overlap. Every placement is checked against
//! everything already placed on the timeline, so overlapping windows never
//! yield overlapping items and the buffer holds across windows too.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::policy::{infer_priority, mentioned_meal, ConstraintPolicy, Meal};
use crate::task::{AvailabilityWindow, ScheduledItem, Task};
use crate::time::{format_timestamp, Interval};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackOutcome {
    /// Placed items (tasks and injected meal breaks), chronological.
    pub schedule: Vec<ScheduledItem>,
    /// Tasks that fit in no window, or were invalid, in priority order.
    pub unplaced: Vec<Task>,
}

#[derive(Debug)]
struct Lane {
    window: Interval,
    cursor: NaiveDateTime,
}

/// Everything placed so far, across all windows and dates.
#[derive(Debug, Default)]
struct Timeline {
    occupied: Vec<Interval>,
}

impl Timeline {
    fn occupy(&mut self, slot: Interval) {
        self.occupied.push(slot);
    }

    /// Earliest slot of `minutes` starting at or after `from` that stays inside
    /// `window` and keeps the buffer to every occupied interval.
    fn first_free(
        &self,
        from: NaiveDateTime,
        minutes: i64,
        window: &Interval,
        policy: &ConstraintPolicy,
    ) -> Option<Interval> {
        let mut start = from.max(window.start);
        loop {
            let slot = Interval::starting_at(start, minutes);
            if !slot.within(window) {
                return None;
            }
            let blocked_until = self
                .occupied
                .iter()
                .filter(|o| !policy.separated(o, &slot))
                .map(|o| o.end + policy.buffer())
                .max();
            match blocked_until {
                None => return Some(slot),
                Some(next) => start = next,
            }
        }
    }
}

/// Pack `tasks` into `windows` under `policy`.
pub fn pack(tasks: &[Task], windows: &[AvailabilityWindow], policy: &ConstraintPolicy) -> PackOutcome {
    pack_around(tasks, windows, &[], policy)
}

/// Pack `tasks` into whatever capacity `fixed` items leave free.
///
/// `fixed` items are treated as already on the calendar: new items keep the
/// buffer to them, and a meal they cover is not injected again. The returned
/// schedule holds only the newly placed items.
pub fn pack_around(
    tasks: &[Task],
    windows: &[AvailabilityWindow],
    fixed: &[ScheduledItem],
    policy: &ConstraintPolicy,
) -> PackOutcome {
    let mut sorted_windows: Vec<&AvailabilityWindow> = windows.iter().collect();
    sorted_windows.sort_by_key(|w| (w.date(), w.start_time(), w.end_time()));

    let mut lanes: Vec<Lane> = sorted_windows
        .into_iter()
        .map(|w| Lane {
            window: w.interval(),
            cursor: w.interval().start,
        })
        .collect();

    let mut timeline = Timeline::default();
    let mut meals_taken: HashSet<(NaiveDate, Meal)> = HashSet::new();
    for item in fixed {
        timeline.occupy(item.interval());
        if let Some(meal) = mentioned_meal(&item.task_description) {
            meals_taken.insert((item.date(), meal));
        }
    }

    let mut outcome = PackOutcome::default();

    for task in policy.priority_order(tasks) {
        if let Err(e) = task.validate() {
            warn!(task = %task.description, error = %e, "skipping invalid task");
            outcome.unplaced.push(task.clone());
            continue;
        }

        let minutes = i64::from(task.estimated_duration_minutes);
        let placement = lanes.iter_mut().find_map(|lane| {
            let slot = timeline.first_free(lane.cursor, minutes, &lane.window, policy)?;
            Some((lane, slot))
        });

        let Some((lane, slot)) = placement else {
            debug!(task = %task.description, minutes, "no window has room");
            outcome.unplaced.push(task.clone());
            continue;
        };

        let priority = infer_priority(&task.description, task.priority);
        debug!(
            task = %task.description,
            start = %format_timestamp(slot.start),
            end = %format_timestamp(slot.end),
            "placed task"
        );
        timeline.occupy(slot);
        lane.cursor = slot.end + policy.buffer();
        outcome.schedule.push(ScheduledItem::from_task(task, slot, priority));

        let date = slot.date();
        if let Some(meal) = mentioned_meal(&task.description) {
            meals_taken.insert((date, meal));
        }

        for meal_window in policy.meals_crossed(&slot) {
            if meals_taken.contains(&(date, meal_window.meal)) {
                continue;
            }
            let meal_slot = policy
                .meal_break_slot(&slot, &meal_window, &lane.window)
                .and_then(|s| {
                    timeline.first_free(s.start, policy.meal_duration_minutes, &lane.window, policy)
                });
            match meal_slot {
                Some(meal_slot) => {
                    debug!(
                        meal = meal_window.meal.label(),
                        start = %format_timestamp(meal_slot.start),
                        after = %task.description,
                        "injected meal break"
                    );
                    timeline.occupy(meal_slot);
                    lane.cursor = meal_slot.end + policy.buffer();
                    meals_taken.insert((date, meal_window.meal));
                    outcome
                        .schedule
                        .push(policy.meal_break_item(meal_window.meal, meal_slot));
                }
                None => {
                    debug!(
                        meal = meal_window.meal.label(),
                        after = %task.description,
                        "meal break does not fit; skipped"
                    );
                }
            }
        }
    }

    outcome.schedule.sort_by_key(|item| item.start_time);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use crate::time::parse_timestamp;
    use proptest::prelude::*;

    fn window(date: &str, start: &str, end: &str) -> AvailabilityWindow {
        AvailabilityWindow::parse(date, start, end).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn descriptions(outcome: &PackOutcome) -> Vec<&str> {
        outcome
            .schedule
            .iter()
            .map(|i| i.task_description.as_str())
            .collect()
    }

    #[test]
    fn test_priority_precedence() {
        let tasks = vec![
            Task::new("A").with_priority(Priority::Low),
            Task::new("B").with_priority(Priority::High),
        ];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "14:00", "18:00")],
            &ConstraintPolicy::default(),
        );
        assert_eq!(descriptions(&out), vec!["B", "A"]);
        assert_eq!(out.schedule[0].start_time, ts("2025-07-21T14:00"));
        assert_eq!(out.schedule[1].start_time, ts("2025-07-21T14:40"));
        assert!(out.unplaced.is_empty());
    }

    #[test]
    fn test_unplaceable_task_is_reported() {
        let tasks = vec![Task::new("Long read").with_duration(30)];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "09:00", "09:20")],
            &ConstraintPolicy::default(),
        );
        assert!(out.schedule.is_empty());
        assert_eq!(out.unplaced, tasks);
    }

    #[test]
    fn test_invalid_task_goes_to_unplaced() {
        let tasks = vec![Task::new("zero").with_duration(0), Task::new("ok")];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "14:00", "18:00")],
            &ConstraintPolicy::default(),
        );
        assert_eq!(descriptions(&out), vec!["ok"]);
        assert_eq!(out.unplaced.len(), 1);
        assert_eq!(out.unplaced[0].description, "zero");
    }

    #[test]
    fn test_windows_scanned_chronologically() {
        let tasks = vec![Task::new("one").with_duration(60)];
        let out = pack(
            &tasks,
            &[
                window("2025-07-22", "09:00", "11:00"),
                window("2025-07-21", "15:00", "17:00"),
            ],
            &ConstraintPolicy::default(),
        );
        assert_eq!(out.schedule[0].start_time, ts("2025-07-21T15:00"));
    }

    #[test]
    fn test_first_fit_spills_to_next_window() {
        let tasks = vec![
            Task::new("fills").with_duration(50),
            Task::new("spills").with_duration(30),
        ];
        let out = pack(
            &tasks,
            &[
                window("2025-07-21", "15:00", "16:00"),
                window("2025-07-21", "16:30", "17:30"),
            ],
            &ConstraintPolicy::default(),
        );
        assert_eq!(out.schedule[1].task_description, "spills");
        assert_eq!(out.schedule[1].start_time, ts("2025-07-21T16:30"));
    }

    #[test]
    fn test_meal_injected_after_crossing_task() {
        let tasks = vec![Task::new("Write report").with_duration(45)];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "08:30", "12:00")],
            &ConstraintPolicy::default(),
        );
        assert_eq!(descriptions(&out), vec!["Write report", "Breakfast"]);
        let meal = &out.schedule[1];
        assert_eq!(meal.start_time, ts("2025-07-21T09:25"));
        assert_eq!(meal.end_time, ts("2025-07-21T09:55"));
        assert_eq!(meal.priority, Priority::High);
        assert!(!meal.is_daily_routine);
    }

    #[test]
    fn test_meal_consumes_window_capacity() {
        let tasks = vec![
            Task::new("Standup").with_duration(30),
            Task::new("Review").with_duration(30),
        ];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "11:45", "14:00")],
            &ConstraintPolicy::default(),
        );
        // Standup 11:45-12:15 crosses lunch: lunch 12:25-12:55, review 13:05.
        assert_eq!(descriptions(&out), vec!["Standup", "Lunch", "Review"]);
        assert_eq!(out.schedule[2].start_time, ts("2025-07-21T13:05"));
    }

    #[test]
    fn test_meal_skipped_when_no_room() {
        let tasks = vec![Task::new("Call").with_duration(40)];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "12:00", "13:00")],
            &ConstraintPolicy::default(),
        );
        assert_eq!(descriptions(&out), vec!["Call"]);
    }

    #[test]
    fn test_meal_injected_once_per_day() {
        let tasks = vec![
            Task::new("a").with_duration(20),
            Task::new("b").with_duration(20),
        ];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "12:00", "14:00")],
            &ConstraintPolicy::default(),
        );
        let lunches = out
            .schedule
            .iter()
            .filter(|i| i.task_description == "Lunch")
            .count();
        assert_eq!(lunches, 1);
    }

    #[test]
    fn test_user_meal_task_suppresses_injection() {
        let tasks = vec![Task::new("Lunch with Sam").with_priority(Priority::Low)];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "12:00", "15:00")],
            &ConstraintPolicy::default(),
        );
        assert_eq!(descriptions(&out), vec!["Lunch with Sam"]);
        assert_eq!(out.schedule[0].priority, Priority::High);
    }

    #[test]
    fn test_daily_flag_preserved() {
        let tasks = vec![Task::new("Stretch").with_duration(15).daily()];
        let out = pack(
            &tasks,
            &[window("2025-07-21", "15:00", "16:00")],
            &ConstraintPolicy::default(),
        );
        assert!(out.schedule[0].is_daily_routine);
    }

    #[test]
    fn test_overlapping_windows_do_not_double_book() {
        let tasks = vec![
            Task::new("a").with_duration(60),
            Task::new("b").with_duration(60),
        ];
        let out = pack(
            &tasks,
            &[
                window("2025-07-21", "15:00", "16:30"),
                window("2025-07-21", "15:00", "17:30"),
            ],
            &ConstraintPolicy::default(),
        );
        assert_eq!(out.schedule.len(), 2);
        assert_eq!(out.schedule[1].start_time, ts("2025-07-21T16:10"));
    }

    #[test]
    fn test_pack_around_fixed_items() {
        let policy = ConstraintPolicy::default();
        let fixed = vec![ScheduledItem {
            task_description: "Oracle placed".to_string(),
            start_time: ts("2025-07-21T15:00"),
            end_time: ts("2025-07-21T16:00"),
            priority: Priority::Medium,
            is_daily_routine: false,
        }];
        let out = pack_around(
            &[Task::new("leftover")],
            &[window("2025-07-21", "15:00", "18:00")],
            &fixed,
            &policy,
        );
        assert_eq!(out.schedule.len(), 1);
        assert_eq!(out.schedule[0].start_time, ts("2025-07-21T16:10"));
    }

    fn arb_task() -> impl Strategy<Value = (i32, u8)> {
        (5i32..=150, 0u8..3)
    }

    fn arb_window() -> impl Strategy<Value = (u32, u32, u32)> {
        // (day offset, start minute of day, length)
        (0u32..2, 360u32..1200, 15u32..=300)
    }

    proptest! {
        #[test]
        fn prop_pack_respects_windows_and_buffers(
            raw_tasks in prop::collection::vec(arb_task(), 0..12),
            raw_windows in prop::collection::vec(arb_window(), 1..5),
        ) {
            let policy = ConstraintPolicy::default();
            let tasks: Vec<Task> = raw_tasks
                .iter()
                .enumerate()
                .map(|(i, (minutes, p))| {
                    let priority = match p {
                        0 => Priority::High,
                        1 => Priority::Medium,
                        _ => Priority::Low,
                    };
                    Task::new(format!("task {i}")).with_duration(*minutes).with_priority(priority)
                })
                .collect();
            let base = NaiveDate::from_ymd_opt(2025, 7, 21).unwrap();
            let windows: Vec<AvailabilityWindow> = raw_windows
                .iter()
                .map(|(day, start, len)| {
                    let date = base + chrono::Duration::days(i64::from(*day));
                    let end = (start + len).min(23 * 60 + 59);
                    let st = chrono::NaiveTime::from_hms_opt(start / 60, start % 60, 0).unwrap();
                    let et = chrono::NaiveTime::from_hms_opt(end / 60, end % 60, 0).unwrap();
                    AvailabilityWindow::new(date, st, et).unwrap()
                })
                .collect();

            let out = pack(&tasks, &windows, &policy);

            for item in &out.schedule {
                prop_assert!(item.start_time < item.end_time);
                prop_assert!(windows.iter().any(|w| item.interval().within(&w.interval())));
            }
            for (i, a) in out.schedule.iter().enumerate() {
                for b in out.schedule.iter().skip(i + 1) {
                    prop_assert!(policy.separated(&a.interval(), &b.interval()));
                }
            }

            let placed_tasks = out
                .schedule
                .iter()
                .filter(|i| i.task_description.starts_with("task "))
                .count();
            prop_assert_eq!(placed_tasks + out.unplaced.len(), tasks.len());
        }
    }
}
