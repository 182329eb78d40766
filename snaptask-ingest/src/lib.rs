//! snaptask-ingest: task-list ingestion (CSV and plain-text lists) into core tasks.

pub mod parsers;
pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use snaptask_core::Task;
use tracing::info;

pub use parsers::csv_tasks::{parse_tasks_csv, parse_tasks_csv_str};
pub use parsers::plain_text::parse_task_list;
pub use types::TaskRow;

/// Load tasks from a file; `.csv` goes through the CSV parser, anything else
/// is read as a plain-text list.
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let tasks = if is_csv {
        parse_tasks_csv(path)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        parse_task_list(&text)?
    };
    info!(path = %path.display(), count = tasks.len(), "loaded tasks");
    Ok(tasks)
}
