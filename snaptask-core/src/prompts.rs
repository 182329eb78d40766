//! Oracle prompts, rendered from the constraint policy so the oracle is asked
//! for exactly the rules the packer and verifier enforce.

use std::fmt::Write as _;

use serde_json::json;

use crate::policy::ConstraintPolicy;
use crate::task::{ScheduleRequest, Task};
use crate::time::format_time_of_day;

pub fn schedule_prompt(request: &ScheduleRequest, policy: &ConstraintPolicy) -> String {
    let tasks = serde_json::to_string(&request.tasks).unwrap_or_else(|_| "[]".to_string());
    let availability =
        serde_json::to_string(&request.availability).unwrap_or_else(|_| "[]".to_string());

    let mut meals = String::new();
    for mw in &policy.meal_windows {
        let _ = writeln!(
            meals,
            "   - {}: {} - {}",
            mw.meal.label(),
            format_time_of_day(mw.start),
            format_time_of_day(mw.end)
        );
    }

    let example = json!({
        "task_description": "Finish report",
        "start_time": "2025-07-21T09:00:00",
        "end_time": "2025-07-21T10:30:00",
        "priority": "high",
        "is_daily_routine": false
    });

    format!(
        "You are an expert scheduler. Assign each task below to a time inside one of the \
availability slots. Slots may fall on different dates.

Rules:
1. Schedule 'high' priority tasks first, then 'medium', then 'low'.
2. Schedule every task if possible.
3. Never schedule anything outside the availability slots.
4. Combine the slot date with the time into an ISO 8601 timestamp (YYYY-MM-DDTHH:MM:SS) for start_time and end_time.
5. start_time must be before end_time and no two items may overlap.
6. Keep the is_daily_routine flag of each input task unchanged.
7. Leave a {buffer} minute break after every task.
8. If a task crosses a meal window, add a {meal} minute meal break named after the meal once the task ends, even if it is not in the task list:
{meals}
Input tasks: {tasks}
Availability slots: {availability}

Reply with a single JSON object with keys \"suggested_schedule\" and \"notes\".
\"suggested_schedule\" is an array of objects with \"task_description\", \"start_time\", \"end_time\", the original \"priority\" and the original \"is_daily_routine\" flag.
\"notes\" is a short, warm message for the user: remind them to stay hydrated after each task (name the task) and to eat when a task crosses a meal window.
Example item: {example}
",
        buffer = policy.buffer_minutes,
        meal = policy.meal_duration_minutes,
    )
}

pub fn extraction_prompt(text: &str) -> String {
    format!(
        "Identify every distinct task or to-do item in the text below.
Reply with a single JSON object with one key, \"tasks\": an array of strings, one per task.
If there are no tasks, reply with an empty array.
---
{text}
---
"
    )
}

pub fn breakdown_prompt(task: &Task) -> String {
    format!(
        "Break the task \"{desc}\" into a short list of concrete subtasks.
The subtasks together must take exactly {total} minutes.
Reply with a single JSON object with one key, \"subtasks\": an array of objects with \
\"description\" (ending in a \"(N min)\" annotation) and \"duration_minutes\".
",
        desc = task.description,
        total = task.estimated_duration_minutes,
    )
}
