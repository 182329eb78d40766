//! CSV task lists.
//!
//! Expected columns (any order, case-insensitive, aliases accepted):
//!   description,priority,duration,daily
//! A file whose first row is not a recognizable header is read positionally
//! in that column order.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::StringRecord;
use snaptask_core::Task;

use crate::types::TaskRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    description: usize,
    priority: Option<usize>,
    duration: Option<usize>,
    daily: Option<usize>,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        description: 0,
        priority: Some(1),
        duration: Some(2),
        daily: Some(3),
    };

    fn from_header(record: &StringRecord) -> Option<Columns> {
        let find = |aliases: &[&str]| {
            record.iter().position(|h| {
                let h = h.trim().to_ascii_lowercase();
                aliases.contains(&h.as_str())
            })
        };
        Some(Columns {
            description: find(&["description", "task", "title", "name", "task_description"])?,
            priority: find(&["priority", "prio"]),
            duration: find(&[
                "duration",
                "minutes",
                "duration_minutes",
                "estimated_duration_minutes",
                "estimate",
            ]),
            daily: find(&["daily", "is_daily_routine", "routine", "recurring"]),
        })
    }

    fn row(&self, record: &StringRecord, line: usize) -> TaskRow {
        let cell = |i: Option<usize>| i.and_then(|i| record.get(i)).map(|s| s.trim().to_string());
        TaskRow {
            description: record.get(self.description).unwrap_or("").trim().to_string(),
            priority: cell(self.priority),
            duration: cell(self.duration),
            daily: cell(self.daily),
            line,
        }
    }
}

pub fn parse_tasks_csv(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_tasks_csv_reader(file).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_tasks_csv_str(text: &str) -> Result<Vec<Task>> {
    parse_tasks_csv_reader(text.as_bytes())
}

fn parse_tasks_csv_reader<R: Read>(reader: R) -> Result<Vec<Task>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut columns: Option<Columns> = None;
    let mut out = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("record {}", i + 1))?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let cols = match columns {
            Some(c) => c,
            None => {
                if let Some(c) = Columns::from_header(&record) {
                    columns = Some(c);
                    continue;
                }
                columns = Some(Columns::POSITIONAL);
                Columns::POSITIONAL
            }
        };

        if let Some(task) = cols.row(&record, i + 1).into_task() {
            out.push(task);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptask_core::Priority;

    #[test]
    fn test_header_aliases_any_order() {
        let text = "\
Minutes,Task,Routine,Priority
45,Write report,,high
15 min,Stretch,yes,low
,  ,,
20,,,
";
        let tasks = parse_tasks_csv_str(text).unwrap();
        assert_eq!(
            tasks,
            vec![
                Task::new("Write report").with_priority(Priority::High).with_duration(45),
                Task::new("Stretch").with_priority(Priority::Low).with_duration(15).daily(),
            ]
        );
    }

    #[test]
    fn test_headerless_positional() {
        let text = "Call bank,high,20,no\nMeditate,,10,daily\n";
        let tasks = parse_tasks_csv_str(text).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(tasks[1].is_daily_routine);
        assert_eq!(tasks[1].priority, Priority::Medium);
    }

    #[test]
    fn test_short_rows_use_defaults() {
        let text = "description\nRead\n";
        let tasks = parse_tasks_csv_str(text).unwrap();
        assert_eq!(tasks, vec![Task::new("Read")]);
    }
}
