use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use snaptask_core::time::parse_timezone;
use snaptask_core::{project_reminders, ReminderIntent};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::load_config;
use crate::state::{ensure_snaptask_home, load_schedule};

#[derive(Subcommand, Debug)]
pub enum RemindersCommand {
    /// Project reminder intents from a schedule and append them to the local queue
    Plan {
        /// Schedule JSON (defaults to the last saved schedule)
        #[arg(long)]
        schedule: Option<PathBuf>,

        /// IANA timezone of the schedule (default: config.reminders.timezone)
        #[arg(long)]
        tz: Option<String>,
    },

    /// List queued reminder intents, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print due, unsent intents as JSON lines for the notification scheduler
    Due {
        /// Include reminders due within the next N minutes
        #[arg(long, default_value_t = 0)]
        within_minutes: i64,

        /// Record printed intents as sent so they are not handed out again
        #[arg(long, default_value_t = false)]
        mark_sent: bool,
    },
}

pub fn run(cmd: RemindersCommand) -> Result<()> {
    match cmd {
        RemindersCommand::Plan { schedule, tz } => plan(schedule.as_deref(), tz),
        RemindersCommand::List { limit } => list(limit),
        RemindersCommand::Due {
            within_minutes,
            mark_sent,
        } => due(within_minutes, mark_sent),
    }
}

fn queue_path() -> Result<PathBuf> {
    Ok(ensure_snaptask_home()?.join("reminders").join("intents.jsonl"))
}

fn sent_keys_path() -> Result<PathBuf> {
    Ok(ensure_snaptask_home()?.join("reminders").join("sent_keys.txt"))
}

fn read_queue(path: &Path) -> Result<Vec<ReminderIntent>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let f = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ReminderIntent>(&line) {
            Ok(ri) => out.push(ri),
            Err(e) => warn!(line = i + 1, error = %e, "skipping unreadable queue entry"),
        }
    }
    Ok(out)
}

fn read_sent_keys(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let f = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(f)
        .lines()
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect())
}

fn open_append(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}

fn plan(schedule: Option<&Path>, tz: Option<String>) -> Result<()> {
    let cfg = load_config()?;
    let items = load_schedule(schedule)?;
    let tz_name = tz.unwrap_or(cfg.reminders.timezone.clone());
    let tz = parse_timezone(&tz_name)?;

    let q = queue_path()?;
    let queued: HashSet<String> = read_queue(&q)?.into_iter().map(|r| r.dedupe_key).collect();

    let intents = project_reminders(&items, tz, Utc::now(), cfg.reminders.policy());
    let mut f = open_append(&q)?;
    let mut added = 0usize;
    for ri in intents.iter().filter(|r| !queued.contains(&r.dedupe_key)) {
        writeln!(f, "{}", serde_json::to_string(ri)?)?;
        added += 1;
    }

    println!(
        "Queued {added} reminder intents ({} already queued) in {}",
        intents.len() - added,
        q.display()
    );
    Ok(())
}

fn list(limit: usize) -> Result<()> {
    let q = queue_path()?;
    let rows = read_queue(&q)?;
    if rows.is_empty() {
        println!("No reminders queued at {}", q.display());
        return Ok(());
    }
    let sent = read_sent_keys(&sent_keys_path()?)?;
    for (i, r) in rows.iter().rev().take(limit).enumerate() {
        let mark = if sent.contains(&r.dedupe_key) { "sent" } else { "queued" };
        println!(
            "{}. [{}] {} at {}",
            i + 1,
            mark,
            r.title,
            r.send_at_utc.to_rfc3339()
        );
    }
    Ok(())
}

/// Intents at or before `cutoff` that have not been handed out yet, oldest first.
fn select_due(
    queue: Vec<ReminderIntent>,
    sent: &HashSet<String>,
    cutoff: DateTime<Utc>,
) -> Vec<ReminderIntent> {
    let mut seen = HashSet::new();
    let mut due: Vec<ReminderIntent> = queue
        .into_iter()
        .filter(|r| r.send_at_utc <= cutoff && !sent.contains(&r.dedupe_key))
        .filter(|r| seen.insert(r.dedupe_key.clone()))
        .collect();
    due.sort_by_key(|r| r.send_at_utc);
    due
}

fn due(within_minutes: i64, mark_sent: bool) -> Result<()> {
    let q = queue_path()?;
    let sk = sent_keys_path()?;
    let cutoff = Utc::now() + Duration::minutes(within_minutes.max(0));
    let due = select_due(read_queue(&q)?, &read_sent_keys(&sk)?, cutoff);

    let mut sent_log = if mark_sent { Some(open_append(&sk)?) } else { None };
    for ri in &due {
        println!("{}", serde_json::to_string(ri)?);
        if let Some(log) = sent_log.as_mut() {
            writeln!(log, "{}", ri.dedupe_key)?;
        }
    }
    Ok(())
}
