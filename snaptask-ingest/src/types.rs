use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use snaptask_core::task::DEFAULT_DURATION_MINUTES;
use snaptask_core::{Priority, Task};
use tracing::warn;

/// One task as it appears in an input list, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub description: String,
    pub priority: Option<String>,
    pub duration: Option<String>,
    pub daily: Option<String>,
    /// 1-based line or record number, for diagnostics.
    pub line: usize,
}

impl TaskRow {
    /// Normalize into a core task. `None` when the description is blank.
    ///
    /// Unknown priorities fall back to medium and unreadable durations to the
    /// default duration; both are logged.
    pub fn into_task(self) -> Option<Task> {
        let description = self.description.split_whitespace().collect::<Vec<_>>().join(" ");
        if description.is_empty() {
            return None;
        }

        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => Priority::Medium,
            Some(p) => Priority::parse_lenient(p).unwrap_or_else(|| {
                warn!(line = self.line, priority = p, "unknown priority; using medium");
                Priority::Medium
            }),
        };

        let minutes = match self.duration.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_DURATION_MINUTES,
            Some(d) => parse_minutes(d).unwrap_or_else(|| {
                warn!(line = self.line, duration = d, "unreadable duration; using default");
                DEFAULT_DURATION_MINUTES
            }),
        };

        let daily = self.daily.as_deref().is_some_and(truthy);

        let mut task = Task::new(description)
            .with_priority(priority)
            .with_duration(minutes);
        task.is_daily_routine = daily;
        Some(task)
    }
}

static DURATION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(h|hr|hrs|hour|hours|m|min|mins|minute|minutes)?$").ok()
});

/// Minutes from `45`, `45 min`, `2h` and similar. Zero is rejected.
pub fn parse_minutes(s: &str) -> Option<i32> {
    let caps = DURATION_RE.as_ref()?.captures(s.trim())?;
    let n: i32 = caps[1].parse().ok()?;
    let minutes = match caps.get(2).map(|u| u.as_str().to_ascii_lowercase()) {
        Some(u) if u.starts_with('h') => n.checked_mul(60)?,
        _ => n,
    };
    (minutes > 0).then_some(minutes)
}

pub fn truthy(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x" | "daily"
    )
}
