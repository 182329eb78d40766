//! Plain-text task lists, one task per line:
//!
//!   - [high] Write report (45 min) daily
//!   * Call the bank (20m)
//!   3. [ ] Stretch (daily)
//!
//! Bullets, numbering and checkboxes are stripped; `#` starts a comment line.

use anyhow::Result;
use regex::Regex;
use snaptask_core::Task;

use crate::types::TaskRow;

pub fn parse_task_list(text: &str) -> Result<Vec<Task>> {
    let bullet_re = Regex::new(r"^\s*(?:[-*+•]|\d+[.)])(?:\s+|$)")?;
    let checkbox_re = Regex::new(r"^\[\s?[xX]?\]\s*")?;
    let priority_re = Regex::new(r"(?i)\[(high|medium|med|low|urgent|normal)\]")?;
    let duration_re = Regex::new(
        r"(?i)\(\s*(\d+\s*(?:h|hr|hrs|hour|hours|m|min|mins|minute|minutes))\s*\)",
    )?;
    let daily_re = Regex::new(r"(?i)\(daily\)|\bdaily\s*$")?;

    let mut out = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut line = bullet_re.replace(raw, "").into_owned();
        line = checkbox_re.replace(line.trim_start(), "").into_owned();

        let priority = priority_re.captures(&line).map(|c| c[1].to_string());
        line = priority_re.replace_all(&line, " ").into_owned();

        let duration = duration_re.captures(&line).map(|c| c[1].to_string());
        line = duration_re.replace_all(&line, " ").into_owned();

        let daily = daily_re.is_match(&line);
        line = daily_re.replace_all(&line, " ").into_owned();

        let row = TaskRow {
            description: line,
            priority,
            duration,
            daily: daily.then(|| "daily".to_string()),
            line: i + 1,
        };
        if let Some(task) = row.into_task() {
            out.push(task);
        }
    }
    Ok(out)
}
