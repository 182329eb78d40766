//! Task, availability and schedule models shared by the packer and sanitizer.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::time::{self, Interval};

pub const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Packing rank: lower goes first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Lenient parse for untrusted input: case-insensitive, `None` when unknown.
    pub fn parse_lenient(s: &str) -> Option<Priority> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" | "urgent" => Some(Priority::High),
            "medium" | "med" | "m" | "normal" => Some(Priority::Medium),
            "low" | "l" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

/// A task submitted for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    /// Minutes.
    #[serde(default = "default_duration")]
    pub estimated_duration_minutes: i32,

    #[serde(default)]
    pub is_daily_routine: bool,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            priority: Priority::Medium,
            estimated_duration_minutes: DEFAULT_DURATION_MINUTES,
            is_daily_routine: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.estimated_duration_minutes = minutes;
        self
    }

    pub fn daily(mut self) -> Self {
        self.is_daily_routine = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(ScheduleError::InvalidTask("description must be non-empty".to_string()));
        }
        if self.estimated_duration_minutes <= 0 {
            return Err(ScheduleError::InvalidTask(format!(
                "'{}' has non-positive duration {}",
                self.description, self.estimated_duration_minutes
            )));
        }
        Ok(())
    }
}

/// Wire shape of an availability window (`date`, `start_time`, `end_time` strings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAvailability {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// A free-time window on a given date. `start_time < end_time` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAvailability", into = "RawAvailability")]
pub struct AvailabilityWindow {
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl AvailabilityWindow {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Result<Self> {
        if start_time >= end_time {
            return Err(ScheduleError::InvalidWindow {
                date: date.to_string(),
                start: time::format_time_of_day(start_time),
                end: time::format_time_of_day(end_time),
            });
        }
        Ok(Self {
            date,
            start_time,
            end_time,
        })
    }

    /// Parse from `YYYY-MM-DD` and `HH:MM` strings.
    pub fn parse(date: &str, start_time: &str, end_time: &str) -> Result<Self> {
        Self::new(
            time::parse_date(date)?,
            time::parse_time_of_day(start_time)?,
            time::parse_time_of_day(end_time)?,
        )
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: time::combine(self.date, self.start_time),
            end: time::combine(self.date, self.end_time),
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        self.interval().duration_minutes()
    }
}

impl TryFrom<RawAvailability> for AvailabilityWindow {
    type Error = ScheduleError;

    fn try_from(raw: RawAvailability) -> Result<Self> {
        Self::parse(&raw.date, &raw.start_time, &raw.end_time)
    }
}

impl From<AvailabilityWindow> for RawAvailability {
    fn from(w: AvailabilityWindow) -> Self {
        RawAvailability {
            date: w.date.format("%Y-%m-%d").to_string(),
            start_time: time::format_time_of_day(w.start_time),
            end_time: time::format_time_of_day(w.end_time),
        }
    }
}

/// A placed activity: either a real task or an injected meal break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub task_description: String,
    #[serde(with = "time::wall_clock")]
    pub start_time: NaiveDateTime,
    #[serde(with = "time::wall_clock")]
    pub end_time: NaiveDateTime,
    pub priority: Priority,
    pub is_daily_routine: bool,
}

impl ScheduledItem {
    pub fn from_task(task: &Task, slot: Interval, priority: Priority) -> Self {
        Self {
            task_description: task.description.clone(),
            start_time: slot.start,
            end_time: slot.end,
            priority,
            is_daily_routine: task.is_daily_routine,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }
}

/// A scheduling request as handed over by the application layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults_from_json() {
        let t: Task = serde_json::from_str(r#"{"description": "Read"}"#).unwrap();
        assert_eq!(t.priority, Priority::Medium);
        assert_eq!(t.estimated_duration_minutes, 30);
        assert!(!t.is_daily_routine);
    }

    #[test]
    fn test_task_validation() {
        assert!(Task::new("  ").validate().is_err());
        assert!(Task::new("Read").with_duration(0).validate().is_err());
        assert!(Task::new("Read").validate().is_ok());
    }

    #[test]
    fn test_priority_lenient() {
        assert_eq!(Priority::parse_lenient(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse_lenient("low"), Some(Priority::Low));
        assert_eq!(Priority::parse_lenient("whenever"), None);
        assert!(Priority::High.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_window_rejects_inverted_times() {
        let err = AvailabilityWindow::parse("2025-07-21", "12:00", "09:00").unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidWindow { .. }));
        assert!(AvailabilityWindow::parse("2025-07-21", "09:00", "09:00").is_err());
    }

    #[test]
    fn test_window_serde_round_trip_shape() {
        let w: AvailabilityWindow = serde_json::from_str(
            r#"{"date": "2025-07-21", "start_time": "08:00", "end_time": "12:00"}"#,
        )
        .unwrap();
        assert_eq!(w.duration_minutes(), 240);
        let v = serde_json::to_value(w).unwrap();
        assert_eq!(v["start_time"], "08:00");

        let bad = serde_json::from_str::<AvailabilityWindow>(
            r#"{"date": "2025-07-21", "start_time": "12:00", "end_time": "08:00"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_scheduled_item_timestamps_serialize_iso() {
        let w = AvailabilityWindow::parse("2025-07-21", "09:00", "10:00").unwrap();
        let item = ScheduledItem::from_task(&Task::new("Read"), w.interval(), Priority::Medium);
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["start_time"], "2025-07-21T09:00:00");
        assert_eq!(v["priority"], "medium");
    }
}
