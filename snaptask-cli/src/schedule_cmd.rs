use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use snaptask_core::time::{parse_date, parse_time_of_day};
use snaptask_core::verify::Rejection;
use snaptask_core::{
    pack, pack_around, propose_schedule, roll_forward, routine_tasks, AvailabilityWindow,
    ConstraintPolicy,
    ReasoningOracle, ScheduleRequest, ScheduledItem, Task, VerifyWarning,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::state::{load_schedule, read_json, save_latest_schedule};

/// Where a schedule request comes from on the command line.
#[derive(clap::Args, Debug, Clone)]
pub struct RequestArgs {
    /// Request JSON with `tasks` and `availability`
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Extra tasks from a CSV or plain-text list
    #[arg(long)]
    pub tasks: Option<PathBuf>,

    /// Extra availability window, e.g. "2025-07-21 08:00-12:00" (repeatable)
    #[arg(long = "window")]
    pub windows: Vec<String>,
}

impl RequestArgs {
    pub fn load(&self) -> Result<ScheduleRequest> {
        let mut req: ScheduleRequest = match &self.request {
            Some(p) => read_json(p)?,
            None => ScheduleRequest::default(),
        };
        if let Some(p) = &self.tasks {
            req.tasks.extend(snaptask_ingest::load_tasks(p)?);
        }
        for w in &self.windows {
            req.availability.push(parse_window_arg(w)?);
        }
        if req.tasks.is_empty() {
            bail!("no tasks given; pass --request or --tasks");
        }
        if req.availability.is_empty() {
            bail!("no availability given; pass --request or --window");
        }
        Ok(req)
    }
}

/// `YYYY-MM-DD HH:MM-HH:MM`
pub fn parse_window_arg(s: &str) -> Result<AvailabilityWindow> {
    let (date, range) = s
        .trim()
        .split_once(char::is_whitespace)
        .with_context(|| format!("window '{s}' should look like '2025-07-21 08:00-12:00'"))?;
    let (start, end) = range
        .trim()
        .split_once('-')
        .with_context(|| format!("window '{s}' is missing a '-' between times"))?;
    Ok(AvailabilityWindow::new(
        parse_date(date)?,
        parse_time_of_day(start)?,
        parse_time_of_day(end)?,
    )?)
}

#[derive(Debug, Serialize)]
pub struct ScheduleReport {
    pub notes: String,
    /// Accepted oracle items plus packer fallback, chronological.
    pub schedule: Vec<ScheduledItem>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<VerifyWarning>,
    /// Tasks the oracle dropped (or had rejected) that the packer placed.
    pub packed_fallback: Vec<String>,
    pub unplaced: Vec<Task>,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn maybe_save(save: bool, items: &[ScheduledItem]) -> Result<()> {
    if save {
        let p = save_latest_schedule(items)?;
        eprintln!("Saved schedule to {}", p.display());
    }
    Ok(())
}

pub fn run_pack(args: &RequestArgs, policy: &ConstraintPolicy, save: bool) -> Result<()> {
    let req = args.load()?;
    let out = pack(&req.tasks, &req.availability, policy);
    info!(
        placed = out.schedule.len(),
        unplaced = out.unplaced.len(),
        "packed schedule"
    );
    maybe_save(save, &out.schedule)?;
    print_json(&out)
}

/// Oracle proposal → sanitize → verify, then optionally pack what is missing.
pub fn oracle_schedule<O: ReasoningOracle + ?Sized>(
    oracle: &O,
    req: &ScheduleRequest,
    policy: &ConstraintPolicy,
    fallback: bool,
) -> Result<ScheduleReport> {
    let proposed = propose_schedule(oracle, req, policy)?;
    let verification = proposed.verification;
    if !verification.is_clean() {
        warn!(
            rejected = verification.rejected.len(),
            warnings = verification.warnings.len(),
            "oracle schedule needed corrections"
        );
    }
    let missing = verification.missing_tasks(&req.tasks);

    let mut schedule = verification.accepted.clone();
    let (packed_fallback, unplaced) = if fallback && !missing.is_empty() {
        let out = pack_around(&missing, &req.availability, &verification.accepted, policy);
        let names = out
            .schedule
            .iter()
            .map(|i| i.task_description.clone())
            .collect();
        schedule.extend(out.schedule);
        (names, out.unplaced)
    } else {
        (vec![], missing)
    };
    schedule.sort_by_key(|i| i.start_time);

    Ok(ScheduleReport {
        notes: proposed.notes,
        schedule,
        rejected: verification.rejected,
        warnings: verification.warnings,
        packed_fallback,
        unplaced,
    })
}

pub fn run_schedule<O: ReasoningOracle + ?Sized>(
    oracle: &O,
    args: &RequestArgs,
    policy: &ConstraintPolicy,
    fallback: bool,
    save: bool,
) -> Result<()> {
    let req = args.load()?;
    let report = oracle_schedule(oracle, &req, policy, fallback)?;
    maybe_save(save, &report.schedule)?;
    print_json(&report)
}

/// Carry daily items to the next day. With `windows`, the routine is re-packed
/// into them instead of keeping its wall-clock times.
pub fn routine_roll(
    items: &[ScheduledItem],
    next: NaiveDate,
    windows: &[AvailabilityWindow],
    policy: &ConstraintPolicy,
) -> Vec<ScheduledItem> {
    if windows.is_empty() {
        return roll_forward(items, next);
    }
    let tasks = routine_tasks(items);
    let out = pack(&tasks, windows, policy);
    for t in &out.unplaced {
        warn!(task = %t.description, "routine item did not fit the new availability");
    }
    out.schedule
}

pub fn run_routine_roll(
    schedule: Option<&Path>,
    date: Option<NaiveDate>,
    windows: &[String],
    policy: &ConstraintPolicy,
    save: bool,
) -> Result<()> {
    let items = load_schedule(schedule)?;
    let windows = windows
        .iter()
        .map(|w| parse_window_arg(w))
        .collect::<Result<Vec<_>>>()?;
    let next = match (date, windows.first()) {
        (Some(d), _) => d,
        (None, Some(w)) => w.date(),
        (None, None) => match items.iter().map(|i| i.date()).max() {
            Some(last) => last + Duration::days(1),
            None => bail!("schedule is empty; pass --date"),
        },
    };
    let rolled = routine_roll(&items, next, &windows, policy);
    info!(date = %next, items = rolled.len(), "rolled daily routine forward");
    maybe_save(save, &rolled)?;
    print_json(&rolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ReplayOracle;

    #[test]
    fn window_arg_parses() {
        let w = parse_window_arg("2025-07-21 08:00-12:00").unwrap();
        assert_eq!(w.duration_minutes(), 240);
        assert!(parse_window_arg("2025-07-21").is_err());
        assert!(parse_window_arg("2025-07-21 12:00-08:00").is_err());
    }

    #[test]
    fn oracle_schedule_packs_missing_tasks() {
        let oracle = ReplayOracle {
            response: r#"{"suggested_schedule": [
                {"task_description": "Read", "start_time": "2025-07-21T15:00:00", "end_time": "2025-07-21T15:30:00"}
            ], "notes": "Drink water after Read!"}"#
                .to_string(),
        };
        let req = ScheduleRequest {
            tasks: vec![Task::new("Read"), Task::new("Write").with_duration(20)],
            availability: vec![parse_window_arg("2025-07-21 15:00-17:00").unwrap()],
        };
        let policy = ConstraintPolicy::default();

        let report = oracle_schedule(&oracle, &req, &policy, true).unwrap();
        let names: Vec<&str> = report
            .schedule
            .iter()
            .map(|i| i.task_description.as_str())
            .collect();
        assert_eq!(names, vec!["Read", "Write"]);
        assert_eq!(report.packed_fallback, vec!["Write"]);
        assert!(report.unplaced.is_empty());

        let report = oracle_schedule(&oracle, &req, &policy, false).unwrap();
        assert_eq!(report.schedule.len(), 1);
        assert_eq!(report.unplaced, vec![Task::new("Write").with_duration(20)]);
    }

    #[test]
    fn routine_roll_repacks_into_new_windows() {
        let items = pack(
            &[
                Task::new("Stretch").with_duration(15).daily(),
                Task::new("Report").with_duration(60),
            ],
            &[parse_window_arg("2025-07-21 15:00-17:00").unwrap()],
            &ConstraintPolicy::default(),
        )
        .schedule;
        let next = parse_date("2025-07-22").unwrap();

        let kept = routine_roll(&items, next, &[], &ConstraintPolicy::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start_time.to_string(), "2025-07-22 15:00:00");

        let windows = [parse_window_arg("2025-07-22 16:00-16:30").unwrap()];
        let moved = routine_roll(&items, next, &windows, &ConstraintPolicy::default());
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].task_description, "Stretch");
        assert!(moved[0].is_daily_routine);
        assert_eq!(moved[0].start_time.to_string(), "2025-07-22 16:00:00");
        assert_eq!(moved[0].end_time.to_string(), "2025-07-22 16:15:00");
    }
}
