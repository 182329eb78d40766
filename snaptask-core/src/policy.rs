//! Constraint policy: the business rules every schedule must satisfy.
//!
//! The packer enforces these by construction, the verifier checks them on
//! oracle output, and oracle prompts are rendered from the same values.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::task::{Priority, ScheduledItem, Task};
use crate::time::{self, Interval};

pub const DEFAULT_BUFFER_MINUTES: i64 = 10;
pub const DEFAULT_MEAL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub const ALL: [Meal; 3] = [Meal::Breakfast, Meal::Lunch, Meal::Dinner];

    /// Description used for an injected meal break.
    pub fn label(self) -> &'static str {
        match self {
            Meal::Breakfast => "Breakfast",
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
        }
    }
}

/// First meal named in a description (case-insensitive), if any.
pub fn mentioned_meal(description: &str) -> Option<Meal> {
    let desc = description.to_lowercase();
    Meal::ALL.into_iter().find(|m| desc.contains(m.keyword()))
}

/// Meals are non-negotiable once scheduled: any description naming one is high priority.
pub fn infer_priority(description: &str, given: Priority) -> Priority {
    if mentioned_meal(description).is_some() {
        Priority::High
    } else {
        given
    }
}

/// A fixed daily time range during which a meal is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealWindow {
    pub meal: Meal,
    #[serde(with = "time::hh_mm")]
    pub start: NaiveTime,
    #[serde(with = "time::hh_mm")]
    pub end: NaiveTime,
}

impl MealWindow {
    fn fixed(meal: Meal, start_hour: u32, end_hour: u32) -> Self {
        Self {
            meal,
            start: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// This meal window on a concrete date; `None` if misconfigured (start >= end).
    pub fn on(&self, date: NaiveDate) -> Option<Interval> {
        Interval::new(time::combine(date, self.start), time::combine(date, self.end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintPolicy {
    /// Idle gap required after every scheduled item.
    pub buffer_minutes: i64,
    pub meal_duration_minutes: i64,
    pub meal_windows: Vec<MealWindow>,
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        Self {
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            meal_duration_minutes: DEFAULT_MEAL_MINUTES,
            meal_windows: vec![
                MealWindow::fixed(Meal::Breakfast, 7, 9),
                MealWindow::fixed(Meal::Lunch, 12, 14),
                MealWindow::fixed(Meal::Dinner, 19, 21),
            ],
        }
    }
}

impl ConstraintPolicy {
    /// Tasks grouped high → medium → low; input order kept within a group.
    ///
    /// Grouping uses the effective priority, so a task named "Lunch with Sam"
    /// sorts with the high group whatever it was submitted with.
    pub fn priority_order<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let mut ordered: Vec<&Task> = tasks.iter().collect();
        ordered.sort_by_key(|t| infer_priority(&t.description, t.priority).rank());
        ordered
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes.max(0))
    }

    /// Meal windows intersecting `slot`, in configured order.
    pub fn meals_crossed(&self, slot: &Interval) -> Vec<MealWindow> {
        self.meal_windows
            .iter()
            .filter(|mw| mw.on(slot.date()).is_some_and(|w| w.overlaps(slot)))
            .copied()
            .collect()
    }

    /// Where a meal break following `task_slot` would go: at
    /// `max(task end + buffer, meal window start)`, provided it fits in `window`.
    pub fn meal_break_slot(
        &self,
        task_slot: &Interval,
        meal: &MealWindow,
        window: &Interval,
    ) -> Option<Interval> {
        let meal_window = meal.on(task_slot.date())?;
        let start = (task_slot.end + self.buffer()).max(meal_window.start);
        let slot = Interval::starting_at(start, self.meal_duration_minutes);
        slot.within(window).then_some(slot)
    }

    pub fn meal_break_item(&self, meal: Meal, slot: Interval) -> ScheduledItem {
        ScheduledItem {
            task_description: meal.label().to_string(),
            start_time: slot.start,
            end_time: slot.end,
            priority: Priority::High,
            is_daily_routine: false,
        }
    }

    /// True when `later` starts at least one buffer after `earlier` ends.
    pub fn respects_buffer(&self, earlier: &Interval, later: &Interval) -> bool {
        later.start >= earlier.end + self.buffer()
    }

    /// True when two items on the same timeline keep the buffer in either order.
    pub fn separated(&self, a: &Interval, b: &Interval) -> bool {
        self.respects_buffer(a, b) || self.respects_buffer(b, a)
    }
}
