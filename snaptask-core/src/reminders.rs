//! Reminder policy + projection for scheduled items.
//!
//! Items are wall-clock; projection resolves them in the user's timezone and
//! emits UTC send times for the notification scheduler.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::task::{Priority, ScheduledItem};
use crate::time::{format_timestamp, wall_clock_to_utc};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderIntent {
    pub intent_id: String,
    pub task_description: String,
    pub title: String,
    pub body: String,
    pub send_at_utc: DateTime<Utc>,
    pub dedupe_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPolicy {
    pub max_per_item: usize,
    /// Lead before start for every item.
    pub lead_minutes: i64,
    /// Extra, earlier lead for high-priority items.
    pub early_lead_minutes: i64,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            max_per_item: 2,
            lead_minutes: 10,
            early_lead_minutes: 60,
        }
    }
}

/// Project scheduled items into reminder intents, sorted by send time.
pub fn project_reminders(
    items: &[ScheduledItem],
    tz: Tz,
    now: DateTime<Utc>,
    policy: ReminderPolicy,
) -> Vec<ReminderIntent> {
    let mut out = Vec::new();
    for item in items {
        out.extend(project_item(item, tz, now, policy));
    }
    out.sort_by_key(|r| r.send_at_utc);
    out
}

fn project_item(
    item: &ScheduledItem,
    tz: Tz,
    now: DateTime<Utc>,
    policy: ReminderPolicy,
) -> Vec<ReminderIntent> {
    let Some(start) = wall_clock_to_utc(item.start_time, tz) else {
        debug!(item = %item.task_description, "start falls in a DST gap; no reminders");
        return vec![];
    };

    let mut leads = Vec::new();
    if item.priority == Priority::High {
        leads.push(policy.early_lead_minutes);
    }
    leads.push(policy.lead_minutes);

    let local_start = format_timestamp(item.start_time);
    let slug = slug(&item.task_description);
    let title = format!("Up next: {}", item.task_description);
    let body = format!(
        "{} starts at {} ({} priority).",
        item.task_description,
        item.start_time.format("%H:%M"),
        item.priority
    );

    let mut out = Vec::new();
    for (i, lead) in leads.into_iter().take(policy.max_per_item).enumerate() {
        let send_at = start - Duration::minutes(lead.max(0));
        if send_at <= now {
            continue;
        }
        out.push(ReminderIntent {
            intent_id: format!("ri-{slug}-{local_start}-{i}"),
            task_description: item.task_description.clone(),
            title: title.clone(),
            body: body.clone(),
            send_at_utc: send_at,
            dedupe_key: format!("{slug}:{}:{i}", send_at.timestamp()),
        });
    }
    out
}

fn slug(description: &str) -> String {
    let mut s = String::new();
    for c in description.trim().chars() {
        if c.is_ascii_alphanumeric() {
            s.push(c.to_ascii_lowercase());
        } else if !s.ends_with('-') {
            s.push('-');
        }
    }
    s.trim_matches('-').to_string()
}
