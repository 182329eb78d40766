use anyhow::{Context, Result};
use serde::Serialize;
use snaptask_core::{extract_tasks, propose_breakdown, ReasoningOracle, Subtask, Task};
use std::path::Path;
use tracing::info;

use crate::schedule_cmd::print_json;

pub fn run_import(file: &Path) -> Result<()> {
    let tasks = snaptask_ingest::load_tasks(file)?;
    print_json(&tasks)
}

/// Ask the oracle for tasks in an already-extracted text file.
pub fn run_extract<O: ReasoningOracle + ?Sized>(oracle: &O, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let tasks = extract_tasks(oracle, &text)?;
    info!(count = tasks.len(), "extracted tasks");
    print_json(&tasks)
}

#[derive(Debug, Serialize)]
struct BreakdownReport<'a> {
    task: &'a Task,
    subtasks: Vec<Subtask>,
}

pub fn run_breakdown<O: ReasoningOracle + ?Sized>(oracle: &O, task: &Task) -> Result<()> {
    let subtasks = propose_breakdown(oracle, task)?;
    print_json(&BreakdownReport { task, subtasks })
}
