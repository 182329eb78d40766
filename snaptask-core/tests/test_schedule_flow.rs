use chrono::NaiveDate;
use snaptask_core::{
    pack, pack_around, propose_schedule, roll_forward, ConstraintPolicy, Priority, ReasoningOracle,
    ScheduleRequest,
};

const REQUEST: &str = r#"{
    "tasks": [
        {"description": "Write report", "priority": "medium", "estimated_duration_minutes": 45},
        {"description": "Pay rent", "priority": "high", "estimated_duration_minutes": 15},
        {"description": "Stretch", "priority": "low", "estimated_duration_minutes": 20, "is_daily_routine": true},
        {"description": "Plan trip", "priority": "low", "estimated_duration_minutes": 80}
    ],
    "availability": [
        {"date": "2025-07-22", "start_time": "18:30", "end_time": "20:00"},
        {"date": "2025-07-21", "start_time": "08:30", "end_time": "12:00"}
    ]
}"#;

fn request() -> ScheduleRequest {
    serde_json::from_str(REQUEST).unwrap()
}

struct FixedOracle(String);

impl ReasoningOracle for FixedOracle {
    fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

#[test]
fn pack_request_end_to_end() {
    let req = request();
    let policy = ConstraintPolicy::default();
    let out = pack(&req.tasks, &req.availability, &policy);

    let names: Vec<&str> = out
        .schedule
        .iter()
        .map(|i| i.task_description.as_str())
        .collect();
    // Rent 08:30 crosses breakfast (08:55), report 09:35, stretch 10:30; the trip
    // no longer fits on the 21st.
    assert_eq!(names, vec!["Pay rent", "Breakfast", "Write report", "Stretch", "Plan trip"]);
    assert_eq!(out.schedule[1].priority, Priority::High);
    assert!(out.schedule[3].is_daily_routine);
    assert!(out.unplaced.is_empty());

    // 18:30-19:50 crosses dinner, but a dinner break would overrun the window.
    let trip = &out.schedule[4];
    assert_eq!(trip.date(), NaiveDate::from_ymd_opt(2025, 7, 22).unwrap());

    for (i, a) in out.schedule.iter().enumerate() {
        assert!(req.availability.iter().any(|w| a.interval().within(&w.interval())));
        for b in out.schedule.iter().skip(i + 1) {
            assert!(policy.separated(&a.interval(), &b.interval()));
        }
    }
}

#[test]
fn oracle_schedule_with_packer_fallback() {
    let req = request();
    let policy = ConstraintPolicy::default();
    let oracle = FixedOracle(
        r#"{"suggested_schedule": [
            {"task_description": "Pay rent", "start_time": "2025-07-21T08:30:00", "end_time": "2025-07-21T08:45:00", "priority": "high"},
            {"task_description": "Write report", "start_time": "2025-07-21T08:40:00", "end_time": "2025-07-21T09:25:00", "priority": "medium"},
            {"task_description": "Stretch", "start_time": "2025-07-21T10:00:00", "end_time": "2025-07-21T10:20:00", "is_daily_routine": true}
        ]}"#
        .to_string(),
    );

    let proposed = propose_schedule(&oracle, &req, &policy).unwrap();
    assert_eq!(proposed.notes, "Schedule generated successfully!");
    assert_eq!(proposed.verification.accepted.len(), 2);
    assert_eq!(proposed.verification.rejected.len(), 1);

    let missing = proposed.verification.missing_tasks(&req.tasks);
    let missing_names: Vec<&str> = missing.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(missing_names, vec!["Write report", "Plan trip"]);

    let fallback = pack_around(&missing, &req.availability, &proposed.verification.accepted, &policy);
    assert!(fallback.unplaced.is_empty());
    let mut all = proposed.verification.accepted.clone();
    all.extend(fallback.schedule);
    for (i, a) in all.iter().enumerate() {
        for b in all.iter().skip(i + 1) {
            assert!(policy.separated(&a.interval(), &b.interval()));
        }
    }

    let tomorrow = roll_forward(&all, NaiveDate::from_ymd_opt(2025, 7, 22).unwrap());
    assert_eq!(tomorrow.len(), 1);
    assert_eq!(tomorrow[0].task_description, "Stretch");
}
