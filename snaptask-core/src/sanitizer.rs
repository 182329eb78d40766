//! Schedule sanitizer for untrusted (oracle-proposed) schedules.
//!
//! Sanitizing normalizes fields and applies the policy's priority rules. It
//! does not move items or repair overlaps; see [`crate::verify`] for the
//! re-validation step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::{infer_priority, mentioned_meal};
use crate::task::{Priority, Task};

pub const UNTITLED_TASK: &str = "Untitled Task";

/// One oracle-proposed item. Fields stay raw JSON until sanitized, so a wrong
/// type in one field never rejects the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    #[serde(default)]
    pub task_description: Option<Value>,
    #[serde(default)]
    pub start_time: Option<Value>,
    #[serde(default)]
    pub end_time: Option<Value>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(default)]
    pub is_daily_routine: Option<Value>,
}

/// A candidate item after normalization. Timestamps are still unverified text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedItem {
    pub task_description: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Priority,
    pub is_daily_routine: bool,
}

/// Normalize a candidate schedule. Output order matches `candidate`.
pub fn sanitize(candidate: &[CandidateItem], original_tasks: &[Task]) -> Vec<SanitizedItem> {
    candidate
        .iter()
        .map(|item| sanitize_item(item, original_tasks))
        .collect()
}

fn sanitize_item(item: &CandidateItem, original_tasks: &[Task]) -> SanitizedItem {
    let task_description = match &item.task_description {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => UNTITLED_TASK.to_string(),
    };

    let given = match &item.priority {
        Some(Value::String(s)) => Priority::parse_lenient(s).unwrap_or_default(),
        _ => Priority::Medium,
    };
    let priority = infer_priority(&task_description, given);

    let origin = find_original(&task_description, original_tasks);
    let mut is_daily_routine = match (&item.is_daily_routine, origin) {
        (Some(v), _) => coerce_bool(v),
        (None, Some(task)) => task.is_daily_routine,
        (None, None) => false,
    };
    // A meal the oracle injected on its own is a recurring break.
    if origin.is_none() && mentioned_meal(&task_description).is_some() {
        is_daily_routine = true;
    }

    SanitizedItem {
        task_description,
        start_time: item.start_time.as_ref().and_then(passthrough),
        end_time: item.end_time.as_ref().and_then(passthrough),
        priority,
        is_daily_routine,
    }
}

fn find_original<'a>(description: &str, original_tasks: &'a [Task]) -> Option<&'a Task> {
    let needle = description.trim();
    original_tasks
        .iter()
        .find(|t| t.description.trim().eq_ignore_ascii_case(needle))
}

fn passthrough(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Truthiness for loosely typed oracle flags.
fn coerce_bool(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "daily"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
