//! Task breakdown reconciliation.
//!
//! The oracle proposes subtasks with approximate durations; reconciliation
//! rescales them so they add up to the parent task's duration exactly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScheduleError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub description: String,
    pub duration_minutes: i32,
}

impl Subtask {
    pub fn new(description: impl Into<String>, duration_minutes: i32) -> Self {
        Self {
            description: description.into(),
            duration_minutes,
        }
    }
}

fn annotation_pattern() -> Result<Regex> {
    Regex::new(r"(?i)\(\s*\d+\s*(?:min|mins|minute|minutes)\s*\)")
        .map_err(|e| ScheduleError::Pattern(e.to_string()))
}

fn rewrite_with(re: &Regex, description: &str, minutes: i32) -> String {
    re.replace_all(description, format!("({minutes} min)").as_str())
        .into_owned()
}

/// Rewrite any `(N min)` annotation in `description` to `minutes`.
pub fn rewrite_annotation(description: &str, minutes: i32) -> Result<String> {
    let re = annotation_pattern()?;
    Ok(rewrite_with(&re, description, minutes))
}

/// Minutes from a `(N min)` annotation in `description`, if present.
pub fn annotated_minutes(description: &str) -> Result<Option<i32>> {
    let re = annotation_pattern()?;
    let Some(m) = re.find(description) else {
        return Ok(None);
    };
    Ok(m.as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok())
}

/// Rescale `subtasks` so their durations sum to `target_total_minutes`.
///
/// - Empty input or `target <= 0`: returned unchanged.
/// - Already summing to `target` with every item at least 1 minute: unchanged.
/// - Otherwise durations are weights (non-positive ones weigh 0; if nothing
///   weighs anything, all items weigh the same). Every item but the last gets
///   `max(1, round(w / sum * target))` and the last absorbs the remainder.
///   If the remainder would drop below 1 minute, the shortfall is taken from
///   the largest earlier items.
/// - If `target` is smaller than the number of subtasks, only the first
///   `target` subtasks are kept, one minute each.
pub fn reconcile(subtasks: &[Subtask], target_total_minutes: i32) -> Result<Vec<Subtask>> {
    if subtasks.is_empty() || target_total_minutes <= 0 {
        debug!(
            count = subtasks.len(),
            target = target_total_minutes,
            "degenerate reconciliation; leaving subtasks as-is"
        );
        return Ok(subtasks.to_vec());
    }

    let target = i64::from(target_total_minutes);
    let raw_sum: i64 = subtasks.iter().map(|s| i64::from(s.duration_minutes)).sum();
    if raw_sum == target && subtasks.iter().all(|s| s.duration_minutes >= 1) {
        return Ok(subtasks.to_vec());
    }

    let re = annotation_pattern()?;
    let n = subtasks.len();
    if target < n as i64 {
        warn!(
            count = n,
            target = target_total_minutes,
            "more subtasks than minutes; truncating"
        );
        return Ok(subtasks
            .iter()
            .take(target as usize)
            .map(|s| with_duration(&re, s, 1))
            .collect());
    }

    let mut weights: Vec<i64> = subtasks
        .iter()
        .map(|s| i64::from(s.duration_minutes.max(0)))
        .collect();
    if weights.iter().all(|&w| w == 0) {
        weights.fill(1);
    }
    let sum: i64 = weights.iter().sum();

    let mut durations: Vec<i64> = weights[..n - 1]
        .iter()
        .map(|&w| {
            let scaled = (w as f64 / sum as f64 * target as f64).round_ties_even() as i64;
            scaled.max(1)
        })
        .collect();

    let running: i64 = durations.iter().sum();
    let mut last = target - running;
    if last < 1 {
        let mut deficit = 1 - last;
        // Largest first; earliest wins ties.
        let mut order: Vec<usize> = (0..durations.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(durations[i]));
        for i in order {
            if deficit == 0 {
                break;
            }
            let take = deficit.min(durations[i] - 1);
            durations[i] -= take;
            deficit -= take;
        }
        last = 1;
    }
    durations.push(last);

    Ok(subtasks
        .iter()
        .zip(durations)
        .map(|(s, d)| with_duration(&re, s, i32::try_from(d).unwrap_or(i32::MAX)))
        .collect())
}

fn with_duration(re: &Regex, s: &Subtask, minutes: i32) -> Subtask {
    Subtask {
        description: rewrite_with(re, &s.description, minutes),
        duration_minutes: minutes,
    }
}
