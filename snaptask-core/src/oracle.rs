//! Reasoning oracle seam.
//!
//! The oracle is anything that turns a prompt into text (an LLM API, a local
//! CLI agent, a canned fixture). Its output is untrusted: responses are parsed
//! into loosely typed candidates here and normalized by the sanitizer,
//! verifier and reconciler.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::breakdown::{annotated_minutes, reconcile, Subtask};
use crate::error::{Result, ScheduleError};
use crate::policy::ConstraintPolicy;
use crate::prompts;
use crate::sanitizer::{sanitize, CandidateItem, SanitizedItem};
use crate::task::{ScheduleRequest, Task};
use crate::verify::{verify, Verification};

pub const DEFAULT_NOTES: &str = "Schedule generated successfully!";

/// Something that answers a prompt with (ideally JSON) text.
pub trait ReasoningOracle {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

impl<T: ReasoningOracle + ?Sized> ReasoningOracle for &T {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).generate(prompt)
    }
}

/// A parsed (not yet sanitized) schedule response.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSchedule {
    pub items: Vec<CandidateItem>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposedSchedule {
    pub sanitized: Vec<SanitizedItem>,
    pub verification: Verification,
    pub notes: String,
}

/// Drop Markdown code fences (```` ```json ```` / ```` ``` ````) around a reply.
pub fn strip_code_fences(raw: &str) -> String {
    raw.trim().replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| ScheduleError::OracleResponseInvalid(format!("not JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ScheduleError::OracleResponseInvalid(
            "expected a JSON object".to_string(),
        )),
    }
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match map.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ScheduleError::OracleResponseInvalid(format!(
            "'{key}' must be an array, got {other}"
        ))),
        None => Err(ScheduleError::OracleResponseInvalid(format!("missing '{key}' key"))),
    }
}

pub fn parse_schedule_response(raw: &str) -> Result<OracleSchedule> {
    let mut obj = parse_object(raw)?;
    let items = take_array(&mut obj, "suggested_schedule")?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value::<CandidateItem>(v).map_err(|e| {
                ScheduleError::OracleResponseInvalid(format!("schedule item {i}: {e}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let notes = match obj.get("notes") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => DEFAULT_NOTES.to_string(),
    };
    Ok(OracleSchedule { items, notes })
}

/// Task descriptions from an extraction reply. Non-string and blank entries are dropped.
pub fn parse_extracted_tasks(raw: &str) -> Result<Vec<String>> {
    let mut obj = parse_object(raw)?;
    Ok(take_array(&mut obj, "tasks")?
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .collect())
}

/// Subtasks from a breakdown reply.
///
/// Items may be objects (`description`, `duration_minutes`) or bare strings;
/// a missing duration falls back to the `(N min)` annotation, else 0.
pub fn parse_breakdown_response(raw: &str) -> Result<Vec<Subtask>> {
    let mut obj = parse_object(raw)?;
    let mut out = Vec::new();
    for (i, v) in take_array(&mut obj, "subtasks")?.into_iter().enumerate() {
        let (description, minutes) = match v {
            Value::String(s) => (s, None),
            Value::Object(map) => {
                let description = match map.get("description") {
                    Some(Value::String(s)) => s.clone(),
                    _ => {
                        return Err(ScheduleError::OracleResponseInvalid(format!(
                            "subtask {i} has no description"
                        )));
                    }
                };
                let minutes = map
                    .get("duration_minutes")
                    .and_then(Value::as_i64)
                    .and_then(|m| i32::try_from(m).ok());
                (description, minutes)
            }
            other => {
                return Err(ScheduleError::OracleResponseInvalid(format!(
                    "subtask {i} must be an object or string, got {other}"
                )));
            }
        };
        let minutes = match minutes {
            Some(m) => m,
            None => annotated_minutes(&description)?.unwrap_or(0),
        };
        out.push(Subtask::new(description, minutes));
    }
    Ok(out)
}

fn ask<O: ReasoningOracle + ?Sized>(oracle: &O, prompt: &str) -> Result<String> {
    debug!(prompt_len = prompt.len(), "querying oracle");
    oracle
        .generate(prompt)
        .map_err(|e| ScheduleError::OracleUnavailable(format!("{e:#}")))
}

/// Ask the oracle for a schedule, then sanitize and verify it.
pub fn propose_schedule<O: ReasoningOracle + ?Sized>(
    oracle: &O,
    request: &ScheduleRequest,
    policy: &ConstraintPolicy,
) -> Result<ProposedSchedule> {
    let raw = ask(oracle, &prompts::schedule_prompt(request, policy))?;
    let parsed = parse_schedule_response(&raw)?;
    let sanitized = sanitize(&parsed.items, &request.tasks);
    let verification = verify(&sanitized, &request.availability, policy);
    info!(
        proposed = sanitized.len(),
        accepted = verification.accepted.len(),
        rejected = verification.rejected.len(),
        "oracle schedule verified"
    );
    Ok(ProposedSchedule {
        sanitized,
        verification,
        notes: parsed.notes,
    })
}

/// Ask the oracle to pull task descriptions out of free text.
pub fn extract_tasks<O: ReasoningOracle + ?Sized>(oracle: &O, text: &str) -> Result<Vec<Task>> {
    let raw = ask(oracle, &prompts::extraction_prompt(text))?;
    Ok(parse_extracted_tasks(&raw)?
        .into_iter()
        .map(Task::new)
        .collect())
}

/// Ask the oracle for subtasks and reconcile them to the task's duration.
pub fn propose_breakdown<O: ReasoningOracle + ?Sized>(oracle: &O, task: &Task) -> Result<Vec<Subtask>> {
    task.validate()?;
    let raw = ask(oracle, &prompts::breakdown_prompt(task))?;
    let subtasks = parse_breakdown_response(&raw)?;
    reconcile(&subtasks, task.estimated_duration_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{AvailabilityWindow, Priority};

    struct CannedOracle(&'static str);

    impl ReasoningOracle for CannedOracle {
        fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct DownOracle;

    impl ReasoningOracle for DownOracle {
        fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_parse_schedule_defaults_notes() {
        let parsed = parse_schedule_response(r#"{"suggested_schedule": [{}]}"#).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.notes, DEFAULT_NOTES);
    }

    #[test]
    fn test_parse_schedule_rejects_bad_shapes() {
        for raw in ["not json", "[1, 2]", r#"{"schedule": []}"#, r#"{"suggested_schedule": {}}"#] {
            let err = parse_schedule_response(raw).unwrap_err();
            assert!(matches!(err, ScheduleError::OracleResponseInvalid(_)), "{raw}");
        }
        let err = parse_schedule_response(r#"{"suggested_schedule": [3]}"#).unwrap_err();
        assert!(matches!(err, ScheduleError::OracleResponseInvalid(_)));
    }

    #[test]
    fn test_parse_extracted_tasks() {
        let tasks = parse_extracted_tasks("```json\n{\"tasks\": [\"Buy milk\", \"  \", 4, \"Call mom\"]}\n```")
            .unwrap();
        assert_eq!(tasks, vec!["Buy milk", "Call mom"]);
    }

    #[test]
    fn test_parse_breakdown_mixed_items() {
        let subs = parse_breakdown_response(
            r#"{"subtasks": [
                {"description": "Outline (10 min)", "duration_minutes": 10},
                "Draft (20 min)",
                {"description": "Polish"}
            ]}"#,
        )
        .unwrap();
        let minutes: Vec<i32> = subs.iter().map(|s| s.duration_minutes).collect();
        assert_eq!(minutes, vec![10, 20, 0]);
    }

    #[test]
    fn test_propose_schedule_sanitizes_and_verifies() {
        let oracle = CannedOracle(
            r#"```json
            {"suggested_schedule": [
                {"task_description": "Write report", "start_time": "2025-07-21T08:30:00", "end_time": "2025-07-21T09:15:00", "priority": "low"},
                {"task_description": "Breakfast", "start_time": "2025-07-21T09:25:00", "end_time": "2025-07-21T09:55:00"},
                {"task_description": "Gym", "start_time": "2025-07-21T18:00:00", "end_time": "2025-07-21T19:00:00"}
            ], "notes": "Stay hydrated!"}
            ```"#,
        );
        let request = ScheduleRequest {
            tasks: vec![Task::new("Write report").with_duration(45)],
            availability: vec![AvailabilityWindow::parse("2025-07-21", "08:00", "12:00").unwrap()],
        };
        let out = propose_schedule(&oracle, &request, &ConstraintPolicy::default()).unwrap();
        assert_eq!(out.notes, "Stay hydrated!");
        assert_eq!(out.sanitized.len(), 3);
        assert_eq!(out.sanitized[1].priority, Priority::High);
        assert!(out.sanitized[1].is_daily_routine);
        assert_eq!(out.verification.accepted.len(), 2);
        assert_eq!(out.verification.rejected.len(), 1);
        assert!(out.verification.missing_tasks(&request.tasks).is_empty());
    }

    #[test]
    fn test_oracle_failure_is_unavailable() {
        let err = propose_schedule(&DownOracle, &ScheduleRequest::default(), &ConstraintPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::OracleUnavailable(m) if m.contains("connection refused")));
    }

    #[test]
    fn test_propose_breakdown_reconciles() {
        let oracle = CannedOracle(
            r#"{"subtasks": [
                {"description": "Outline (10 min)", "duration_minutes": 10},
                {"description": "Draft (20 min)", "duration_minutes": 20},
                {"description": "Polish (10 min)", "duration_minutes": 10}
            ]}"#,
        );
        let subs = propose_breakdown(&oracle, &Task::new("Essay").with_duration(90)).unwrap();
        let minutes: Vec<i32> = subs.iter().map(|s| s.duration_minutes).collect();
        assert_eq!(minutes, vec![22, 45, 23]);
        assert_eq!(subs[1].description, "Draft (45 min)");
    }

    #[test]
    fn test_propose_breakdown_gives_undated_step_a_minute() {
        let oracle = CannedOracle(
            r#"{"subtasks": [
                {"description": "Outline"},
                {"description": "Draft", "duration_minutes": 90}
            ]}"#,
        );
        let subs = propose_breakdown(&oracle, &Task::new("Essay").with_duration(90)).unwrap();
        let minutes: Vec<i32> = subs.iter().map(|s| s.duration_minutes).collect();
        assert_eq!(minutes, vec![1, 89]);
        assert!(subs.iter().all(|s| s.duration_minutes >= 1));
    }

    #[test]
    fn test_extract_tasks_defaults() {
        let oracle = CannedOracle(r#"{"tasks": ["Read chapter 3"]}"#);
        let tasks = extract_tasks(&oracle, "read chapter 3 by friday").unwrap();
        assert_eq!(tasks, vec![Task::new("Read chapter 3")]);
    }
}
