use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use dayplan::backlog::{ArchiveReason, Backlog};
use dayplan::config::{UserConfig, WeekHours};
use dayplan::day::Day;
use dayplan::events::{EventRegistry, NewEvent};
use dayplan::models::{Color, Task, TimeSpan, HOURS_EPSILON};
use dayplan::scheduler::{CapacityPlan, Scheduler};
use dayplan::{BuildSummary, ScheduleManager, TaskUpdate};
use std::collections::BTreeMap;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// 2024-01-01 is a Monday.
fn monday() -> NaiveDate {
    date(2024, 1, 1)
}

fn config(hours: f64) -> UserConfig {
    UserConfig { max_days: 14, hours: WeekHours::uniform(hours), archive_days: 30 }
}

fn span(on: NaiveDate, start: (u32, u32), end: (u32, u32)) -> TimeSpan {
    TimeSpan::new(
        NaiveDateTime::new(on, NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap()),
        NaiveDateTime::new(on, NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap()),
    )
}

fn placed_hours(manager: &ScheduleManager, task_id: u32) -> f64 {
    manager
        .schedule()
        .iter()
        .flat_map(|d| d.subtasks())
        .filter(|s| s.task_id == task_id)
        .map(|s| s.hours)
        .sum()
}

fn assert_invariants(manager: &ScheduleManager) {
    for day in manager.schedule() {
        let sum: f64 = day.subtasks().iter().map(|s| s.hours).sum();
        assert!((day.size() - sum).abs() < 1e-6, "day {} size mismatch", day.id());
        if !day.has_overflow() {
            assert!(day.size() <= day.usable_capacity() + 1e-6, "day {} over capacity", day.id());
        }
    }
    let ids: Vec<u32> = manager
        .backlog()
        .iter()
        .map(|t| t.id)
        .chain(manager.archive().iter().map(|e| e.task.id))
        .collect();
    for id in ids {
        let task = manager.task(id).unwrap();
        assert!(task.hours_remaining >= 0.0);
        assert!((placed_hours(manager, id) - task.hours_allocated()).abs() < 1e-6, "task {} hours mismatch", id);
    }
}

#[test]
fn test_split_across_two_days() {
    let mut m = ScheduleManager::new(config(2.0));
    let id = m.add_task("Report", 3.0, date(2024, 1, 3), None).unwrap().id;

    let summary = m.build_schedule_on(monday());

    assert_eq!(summary.days, 2);
    assert_eq!(summary.infeasible, 0);
    let days = m.schedule();
    assert_eq!(days[0].date(), monday());
    assert!((days[0].size() - 2.0).abs() < HOURS_EPSILON);
    assert!((days[1].size() - 1.0).abs() < HOURS_EPSILON);
    assert!(!days[0].has_overflow() && !days[1].has_overflow());
    assert!(m.backlog().is_empty());
    assert_eq!(m.archive()[0].task.id, id);
    assert_eq!(m.archive()[0].reason, ArchiveReason::Allocated);
    assert_invariants(&m);
}

#[test]
fn test_infeasible_task_overflows() {
    let mut m = ScheduleManager::new(config(2.0));
    let id = m.add_task("Thesis", 10.0, date(2024, 1, 2), None).unwrap().id;

    let summary = m.build_schedule_on(monday());

    assert_eq!(summary.days, 2);
    assert_eq!(summary.infeasible, 1);
    assert_eq!(m.infeasible_count(), 1);
    for day in m.schedule() {
        assert_eq!(day.subtasks().len(), 1);
        assert!(day.subtasks()[0].overflow);
        assert!((day.subtasks()[0].hours - 2.0).abs() < HOURS_EPSILON);
    }

    let entry = m.archive()[0];
    assert_eq!(entry.task.id, id);
    assert_eq!(entry.reason, ArchiveReason::Infeasible);
    assert!(entry.task.infeasible);
    assert!((entry.task.hours_remaining - 6.0).abs() < HOURS_EPSILON);
    assert_eq!(m.overflowed_tasks().len(), 1);
    assert_invariants(&m);
}

#[test]
fn test_infeasible_task_keeps_every_day_until_due() {
    let mut m = ScheduleManager::new(config(2.0));
    let id = m.add_task("Thesis", 10.0, date(2024, 1, 4), None).unwrap().id;

    let summary = m.build_schedule_on(monday());

    assert_eq!(summary.days, 4);
    assert_eq!(summary.infeasible, 1);
    assert!((placed_hours(&m, id) - 8.0).abs() < HOURS_EPSILON);
    assert!(m.schedule().iter().all(|d| d.has_overflow()));
    assert!(m.backlog().is_empty());
    assert_eq!(m.archive()[0].reason, ArchiveReason::Infeasible);
    assert_invariants(&m);
}

#[test]
fn test_competing_infeasible_tasks_use_all_capacity_before_deadlines() {
    let mut m = ScheduleManager::new(config(2.0));
    let huge = m.add_task("Huge", 5.0, date(2024, 1, 2), None).unwrap().id;
    let big = m.add_task("Big", 5.0, date(2024, 1, 3), None).unwrap().id;

    let summary = m.build_schedule_on(monday());

    assert_eq!(summary.days, 3);
    assert_eq!(summary.infeasible, 2);
    assert_eq!(summary.pending, 0);
    assert!((placed_hours(&m, huge) - 4.0).abs() < HOURS_EPSILON);
    assert!((placed_hours(&m, big) - 2.0).abs() < HOURS_EPSILON);
    assert_eq!(m.schedule()[2].date(), date(2024, 1, 3));
    assert!(m.archive().iter().all(|e| e.reason == ArchiveReason::Infeasible));
    assert_invariants(&m);
}

#[test]
fn test_recurring_event_reduces_capacity() {
    let mut m = ScheduleManager::new(config(8.0));
    m.add_event(NewEvent {
        name: "Standup".into(),
        color: Color::Black,
        span: span(monday(), (9, 0), (10, 0)),
        recurring: true,
        weekdays: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
    })
    .unwrap();
    m.add_task("Deep work", 7.0, monday(), None).unwrap();

    m.build_schedule_on(monday());

    let day = &m.schedule()[0];
    assert_eq!(day.events().len(), 1);
    assert!((day.size() - 7.0).abs() < HOURS_EPSILON);
    assert!(!day.has_overflow());
    assert!(!day.has_spare_hours());
    assert_eq!(m.infeasible_count(), 0);
}

#[test]
fn test_empty_backlog_builds_nothing() {
    let mut m = ScheduleManager::new(config(2.0));
    let summary = m.build_schedule_on(monday());
    assert_eq!(summary, BuildSummary::default());
    assert!(m.schedule_is_empty());
}

#[test]
fn test_earliest_due_first_and_stable_ties() {
    let mut m = ScheduleManager::new(config(2.0));
    let late = m.add_task("Late", 1.0, date(2024, 1, 5), None).unwrap().id;
    let first = m.add_task("First", 1.0, date(2024, 1, 3), None).unwrap().id;
    let second = m.add_task("Second", 1.0, date(2024, 1, 3), None).unwrap().id;

    let order: Vec<u32> = m.backlog().iter().map(|t| t.id).collect();
    assert_eq!(order, vec![first, second, late]);

    m.build_schedule_on(monday());

    let day0: Vec<u32> = m.schedule()[0].subtasks().iter().map(|s| s.task_id).collect();
    assert_eq!(day0, vec![first, second]);
    let day1: Vec<u32> = m.schedule()[1].subtasks().iter().map(|s| s.task_id).collect();
    assert_eq!(day1, vec![late]);
    assert_invariants(&m);
}

#[test]
fn test_fractional_hours_fill_exactly() {
    let mut m = ScheduleManager::new(config(2.0));
    m.add_task("A", 1.5, date(2024, 1, 1), None).unwrap();
    m.add_task("B", 0.5, date(2024, 1, 1), None).unwrap();

    let summary = m.build_schedule_on(monday());

    assert_eq!(summary.infeasible, 0);
    assert_eq!(summary.days, 1);
    assert_eq!(m.schedule()[0].subtasks().len(), 2);
    assert!(!m.schedule()[0].has_spare_hours());
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut m = ScheduleManager::new(config(3.0));
    m.add_task("A", 4.0, date(2024, 1, 3), None).unwrap();
    m.add_task("B", 9.0, date(2024, 1, 2), None).unwrap();
    m.add_task("C", 2.5, date(2024, 1, 8), None).unwrap();

    let first = m.build_schedule_on(monday());
    let days = m.schedule().to_vec();
    let state = m.to_state();

    let second = m.build_schedule_on(monday());

    assert_eq!(first, second);
    assert_eq!(m.schedule(), days.as_slice());
    assert_eq!(m.to_state(), state);
    assert_invariants(&m);
}

#[test]
fn test_allocated_task_stays_archived_across_builds() {
    let mut m = ScheduleManager::new(config(2.0));
    let id = m.add_task("Short", 1.0, date(2024, 1, 4), None).unwrap().id;

    m.build_schedule_on(monday());
    m.build_schedule_on(monday());

    assert!(m.backlog().is_empty());
    assert_eq!(m.archive().len(), 1);
    assert_eq!(m.archive()[0].task.id, id);
}

#[test]
fn test_past_due_tasks_are_expired() {
    let mut m = ScheduleManager::new(config(2.0));
    let old = m.add_task("Missed", 1.0, date(2023, 12, 30), None).unwrap().id;
    let today = m.add_task("Today", 1.0, monday(), None).unwrap().id;

    m.build_schedule_on(monday());

    assert_eq!(m.schedule().len(), 1);
    let placed: Vec<u32> = m.schedule()[0].subtasks().iter().map(|s| s.task_id).collect();
    assert_eq!(placed, vec![today]);
    let expired = m.archive().into_iter().find(|e| e.task.id == old).unwrap();
    assert_eq!(expired.reason, ArchiveReason::Expired);

    // Expired tasks are not revived by a later build.
    m.build_schedule_on(monday());
    let expired = m.archive().into_iter().find(|e| e.task.id == old).unwrap();
    assert_eq!(expired.reason, ArchiveReason::Expired);
    assert!(!m.backlog().iter().any(|t| t.id == old));
}

#[test]
fn test_expired_tasks_are_purged_after_retention() {
    let mut m = ScheduleManager::new(UserConfig { archive_days: 5, ..config(2.0) });
    m.add_task("Old", 1.0, date(2024, 1, 1), None).unwrap();

    m.build_schedule_on(date(2024, 1, 3));
    assert_eq!(m.num_tasks(), 1);

    m.build_schedule_on(date(2024, 1, 10));
    assert_eq!(m.num_tasks(), 0);
}

#[test]
fn test_custom_hours_override_weekday() {
    let mut m = ScheduleManager::new(config(2.0));
    m.set_custom_hours(monday(), 0.0).unwrap();
    let id = m.add_task("Later", 2.0, date(2024, 1, 2), None).unwrap().id;

    m.build_schedule_on(monday());

    assert_eq!(m.schedule().len(), 2);
    assert!(m.schedule()[0].subtasks().is_empty());
    assert_eq!(m.schedule()[1].subtasks()[0].task_id, id);
    assert_eq!(m.infeasible_count(), 0);
}

#[test]
fn test_one_off_event_blocks_its_date() {
    let mut m = ScheduleManager::new(config(4.0));
    m.add_event(NewEvent {
        name: "Dentist".into(),
        color: Color::Red,
        span: span(monday(), (8, 0), (12, 0)),
        recurring: false,
        weekdays: vec![],
    })
    .unwrap();
    let id = m.add_task("Essay", 3.0, date(2024, 1, 2), None).unwrap().id;

    m.build_schedule_on(monday());

    assert_eq!(m.schedule()[0].events().len(), 1);
    assert!(m.schedule()[0].subtasks().is_empty());
    assert_eq!(m.schedule()[1].subtasks()[0].task_id, id);
    assert!(m.schedule()[1].events().is_empty());
}

#[test]
fn test_horizon_leaves_work_pending() {
    let mut m = ScheduleManager::new(UserConfig { max_days: 2, ..config(2.0) });
    let id = m.add_task("Big", 10.0, date(2024, 1, 31), None).unwrap().id;

    let summary = m.build_schedule_on(monday());

    assert_eq!(summary.days, 2);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.infeasible, 0);
    let task = m.task(id).unwrap();
    assert!((task.hours_remaining - 6.0).abs() < HOURS_EPSILON);
    assert_invariants(&m);
}

#[test]
fn test_modified_task_is_replanned() {
    let mut m = ScheduleManager::new(config(2.0));
    let id = m.add_task("Report", 3.0, date(2024, 1, 3), None).unwrap().id;
    m.build_schedule_on(monday());
    assert!(m.backlog().is_empty());

    let task = m
        .modify_task(id, TaskUpdate { hours: Some(5.0), ..Default::default() })
        .unwrap();
    assert!((task.hours_remaining - 5.0).abs() < HOURS_EPSILON);
    assert_eq!(m.backlog().len(), 1);

    m.build_schedule_on(monday());
    assert!((placed_hours(&m, id) - 5.0).abs() < HOURS_EPSILON);
    assert_eq!(m.schedule().len(), 3);
    assert_invariants(&m);
}

#[test]
fn test_invariants_with_mixed_backlog() {
    let mut m = ScheduleManager::new(UserConfig { max_days: 5, ..config(3.0) });
    m.set_custom_hours(date(2024, 1, 2), 1.0).unwrap();
    m.add_task("A", 2.5, date(2024, 1, 2), None).unwrap();
    m.add_task("B", 7.0, date(2024, 1, 3), None).unwrap();
    m.add_task("C", 4.0, date(2024, 1, 10), None).unwrap();
    m.add_task("D", 0.25, date(2024, 1, 1), None).unwrap();
    m.add_task("E", 12.0, date(2024, 2, 1), None).unwrap();

    m.build_schedule_on(monday());

    assert_invariants(&m);
    assert!(m.schedule().len() <= 5);
}

fn task(id: u32, hours: f64, due: NaiveDate) -> Task {
    Task::new(id, format!("Task {}", id), hours, due, None, "2024-01-01T00:00:00".into())
}

fn weekdays_only(hours: f64) -> UserConfig {
    UserConfig {
        hours: WeekHours { saturday: 0.0, sunday: 0.0, ..WeekHours::uniform(hours) },
        ..config(hours)
    }
}

#[test]
fn test_assign_day_expires_past_due_task() {
    let cfg = config(4.0);
    let custom = BTreeMap::new();
    let events = EventRegistry::new();
    let scheduler = Scheduler::new(CapacityPlan::new(&cfg, &custom, &events));

    let mut day = Day::new(0, date(2024, 1, 5), 4.0);
    let mut backlog: Backlog = vec![task(1, 2.0, date(2024, 1, 3)), task(2, 1.0, date(2024, 1, 6))]
        .into_iter()
        .collect();

    let outcome = scheduler.assign_day(&mut day, &mut backlog);

    assert_eq!(outcome.infeasible, 1);
    assert_eq!(outcome.archived.len(), 2);
    assert_eq!(outcome.archived[0].task.id, 1);
    assert_eq!(outcome.archived[0].reason, ArchiveReason::Expired);
    assert!((outcome.archived[0].task.hours_remaining - 2.0).abs() < HOURS_EPSILON);
    assert_eq!(outcome.archived[1].reason, ArchiveReason::Allocated);
    assert_eq!(day.subtasks().len(), 1);
    assert_eq!(day.subtasks()[0].task_id, 2);
    assert!(backlog.is_empty());
}

#[test]
fn test_assign_day_does_not_recount_flagged_task() {
    let cfg = config(4.0);
    let custom = BTreeMap::new();
    let events = EventRegistry::new();
    let scheduler = Scheduler::new(CapacityPlan::new(&cfg, &custom, &events));

    let mut flagged = task(1, 6.0, date(2024, 1, 3));
    flagged.infeasible = true;
    let mut day = Day::new(0, date(2024, 1, 4), 4.0);
    let mut backlog: Backlog = vec![flagged].into_iter().collect();

    let outcome = scheduler.assign_day(&mut day, &mut backlog);

    assert_eq!(outcome.infeasible, 0);
    assert_eq!(outcome.archived[0].reason, ArchiveReason::Infeasible);
    assert!(day.subtasks().is_empty());
}

#[test]
fn test_hours_available_skips_weekend() {
    let cfg = weekdays_only(8.0);
    let custom = BTreeMap::new();
    let events = EventRegistry::new();
    let scheduler = Scheduler::new(CapacityPlan::new(&cfg, &custom, &events));

    // Friday through the following Monday
    let friday = Day::new(0, date(2024, 1, 5), 8.0);
    assert_eq!(scheduler.hours_available(&friday, date(2024, 1, 8), f64::INFINITY), 16.0);
    assert_eq!(scheduler.hours_available(&friday, date(2024, 1, 4), f64::INFINITY), 0.0);

    let mut day = Day::new(0, date(2024, 1, 5), 8.0);
    let mut backlog: Backlog = vec![task(1, 20.0, date(2024, 1, 8))].into_iter().collect();
    let outcome = scheduler.assign_day(&mut day, &mut backlog);

    assert_eq!(outcome.infeasible, 1);
    assert!(day.has_overflow());
    assert_eq!(backlog.len(), 1);
    assert!(backlog.peek().unwrap().infeasible);
}

#[test]
fn test_hours_available_discounts_later_events() {
    let cfg = config(8.0);
    let custom = BTreeMap::new();
    let mut events = EventRegistry::new();
    events
        .add(NewEvent {
            name: "Lab".into(),
            color: Color::Violet,
            span: span(date(2024, 1, 2), (9, 0), (13, 0)),
            recurring: true,
            weekdays: vec![Weekday::Tue],
        })
        .unwrap();
    let scheduler = Scheduler::new(CapacityPlan::new(&cfg, &custom, &events));

    let day = Day::new(0, monday(), 8.0);
    assert_eq!(scheduler.hours_available(&day, date(2024, 1, 2), f64::INFINITY), 12.0);

    let mut day = Day::new(0, monday(), 8.0);
    let mut backlog: Backlog = vec![task(1, 13.0, date(2024, 1, 2))].into_iter().collect();
    let outcome = scheduler.assign_day(&mut day, &mut backlog);

    assert_eq!(outcome.infeasible, 1);
    assert!(outcome.archived.is_empty());
    assert!((day.size() - 8.0).abs() < HOURS_EPSILON);
    assert!((backlog.peek().unwrap().hours_remaining - 5.0).abs() < HOURS_EPSILON);
}

#[test]
fn test_hours_available_stops_once_need_is_covered() {
    let cfg = config(8.0);
    let custom = BTreeMap::new();
    let events = EventRegistry::new();
    let scheduler = Scheduler::new(CapacityPlan::new(&cfg, &custom, &events));

    let day = Day::new(0, monday(), 8.0);
    let far = date(2024, 12, 31);
    assert_eq!(scheduler.hours_available(&day, far, 3.0), 8.0);
    assert_eq!(scheduler.hours_available(&day, far, 20.0), 24.0);
}
