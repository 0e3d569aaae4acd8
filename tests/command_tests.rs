use dayplan::backlog::ArchiveReason;
use dayplan::commands::*;
use dayplan::models::Recurrence;
use dayplan::storage::{load_state_from, PlannerState};
use dayplan::PlannerError;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// Use a mutex to ensure tests run serially since they modify environment variables
static TEST_MUTEX: Mutex<()> = Mutex::new(());

fn with_test_db<F>(f: F)
where
    F: FnOnce(PathBuf),
{
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("plan.json");
    env::set_var("DAYPLAN_DB", &db_path);
    env::set_var("DAYPLAN_CONFIG", dir.path().join("config.toml"));

    f(db_path);

    env::remove_var("DAYPLAN_DB");
    env::remove_var("DAYPLAN_CONFIG");
}

fn state(path: &Path) -> PlannerState {
    load_state_from(path).unwrap()
}

#[test]
fn test_add_and_list() {
    with_test_db(|path| {
        cmd_task_add("Test Task".into(), 1.5, "2999-12-01".into(), None, true).unwrap();

        let s = state(&path);
        assert_eq!(s.tasks.len(), 1);
        assert_eq!(s.tasks[0].name, "Test Task");
        assert_eq!(s.tasks[0].total_hours, 1.5);
        cmd_task_list(true).unwrap();
    });
}

#[test]
fn test_add_rejects_bad_due_date() {
    with_test_db(|path| {
        let err = cmd_task_add("Task".into(), 1.0, "someday".into(), None, true).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidArgument(_)));
        assert!(!path.exists());
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|path| {
        cmd_card_add("Work".into(), "green".into(), true).unwrap();
        cmd_task_add("Draft".into(), 2.0, "2999-12-01".into(), None, true).unwrap();
        let id = state(&path).tasks[0].id;

        cmd_task_edit(id, Some("Final".into()), Some(3.0), None, Some(1), false, true).unwrap();
        let task = state(&path).tasks[0].clone();
        assert_eq!(task.name, "Final");
        assert_eq!(task.total_hours, 3.0);
        assert_eq!(task.card, Some(1));

        cmd_task_edit(id, None, None, None, None, true, true).unwrap();
        assert_eq!(state(&path).tasks[0].card, None);
    });
}

#[test]
fn test_remove_task() {
    with_test_db(|path| {
        cmd_task_add("Gone".into(), 1.0, "2999-12-01".into(), None, true).unwrap();
        let id = state(&path).tasks[0].id;

        cmd_task_remove(vec![id], true).unwrap();
        assert!(state(&path).tasks.is_empty());
        assert!(matches!(cmd_task_remove(vec![id], true), Err(PlannerError::NotFound { .. })));
    });
}

#[test]
fn test_remove_several_tasks_at_once() {
    with_test_db(|path| {
        for name in ["A", "B", "C"] {
            cmd_task_add(name.into(), 1.0, "2999-12-01".into(), None, true).unwrap();
        }

        cmd_task_remove(vec![3, 1, 3], true).unwrap();
        let s = state(&path);
        assert_eq!(s.tasks.len(), 1);
        assert_eq!(s.tasks[0].name, "B");

        // one unknown id leaves every task in place
        let err = cmd_task_remove(vec![2, 9], true).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound { kind: "Task", id: 9 }));
        assert_eq!(state(&path).tasks.len(), 1);
    });
}

#[test]
fn test_show_commands() {
    with_test_db(|_path| {
        cmd_card_add("Home".into(), "ORANGE".into(), true).unwrap();
        cmd_task_add("Laundry".into(), 1.0, "2999-12-01".into(), Some(1), true).unwrap();
        cmd_task_add("Dishes".into(), 0.5, "2999-12-02".into(), None, true).unwrap();
        cmd_event_add("Gym".into(), "RED".into(), "7am".into(), "8am".into(), None, Some("tue".into()), true).unwrap();
        cmd_build(true).unwrap();

        cmd_task_show(vec![1, 2]).unwrap();
        cmd_card_show(vec![1]).unwrap();
        cmd_event_show(vec![1]).unwrap();

        assert!(matches!(cmd_task_show(vec![1, 7]), Err(PlannerError::NotFound { kind: "Task", id: 7 })));
        assert!(matches!(cmd_card_show(vec![4]), Err(PlannerError::NotFound { kind: "Card", .. })));
        assert!(matches!(cmd_event_show(vec![2]), Err(PlannerError::NotFound { kind: "Event", .. })));
    });
}

#[test]
fn test_export_then_import() {
    with_test_db(|path| {
        cmd_card_add("Work".into(), "GREEN".into(), true).unwrap();
        cmd_task_add("Slides".into(), 3.0, "2999-12-01".into(), Some(1), true).unwrap();
        cmd_event_add("Sync".into(), "BLUE".into(), "10:00".into(), "11:00".into(), None, Some("fri".into()), true).unwrap();
        let before = state(&path);

        let backup = path.with_file_name("backup").join("plan-backup.json");
        cmd_export(&backup, true).unwrap();
        assert_eq!(load_state_from(&backup).unwrap(), before);

        cmd_reset(true).unwrap();
        assert!(!path.exists());

        cmd_import(&backup, true).unwrap();
        assert_eq!(state(&path), before);
        cmd_task_add("Notes".into(), 1.0, "2999-12-02".into(), None, true).unwrap();
        assert_eq!(state(&path).tasks.iter().map(|t| t.id).max(), Some(2));
    });
}

#[test]
fn test_import_rejects_missing_or_corrupt_file() {
    with_test_db(|path| {
        let missing = path.with_file_name("absent.json");
        assert!(matches!(cmd_import(&missing, true), Err(PlannerError::InvalidArgument(_))));

        let corrupt = path.with_file_name("corrupt.json");
        std::fs::write(&corrupt, "[1, 2").unwrap();
        assert!(matches!(cmd_import(&corrupt, true), Err(PlannerError::Json(_))));
        assert!(!path.exists());
    });
}

#[test]
fn test_config_and_report() {
    with_test_db(|path| {
        cmd_config().unwrap();

        let config = env::var("DAYPLAN_CONFIG").unwrap();
        std::fs::write(&config, "max_days = 3\n[hours]\nsunday = 2\nsaturday = 2\n").unwrap();
        cmd_config().unwrap();

        cmd_task_add("Small".into(), 1.0, "2999-12-01".into(), None, true).unwrap();
        cmd_report().unwrap();
        let s = state(&path);
        assert_eq!(s.archive.len(), 1);
        assert_eq!(s.archive[0].reason, ArchiveReason::Allocated);

        std::fs::write(&config, "max_days = 0").unwrap();
        assert!(matches!(cmd_config(), Err(PlannerError::Config(_))));
    });
}

#[test]
fn test_card_remove_clears_tasks() {
    with_test_db(|path| {
        cmd_card_add("School".into(), "LIGHT_BLUE".into(), true).unwrap();
        cmd_task_add("Essay".into(), 1.0, "2999-12-01".into(), Some(1), true).unwrap();
        assert!(cmd_card_add("Bad".into(), "PLAID".into(), true).is_err());

        cmd_card_remove(vec![1], true).unwrap();

        let s = state(&path);
        assert!(s.cards.is_empty());
        assert_eq!(s.tasks[0].card, None);
    });
}

#[test]
fn test_event_add_and_remove() {
    with_test_db(|path| {
        cmd_event_add("Standup".into(), "BLACK".into(), "9am".into(), "9:30am".into(), None, Some("mon,wed".into()), true).unwrap();
        cmd_event_add("Dentist".into(), "RED".into(), "14:00".into(), "16:00".into(), Some("2999-01-02".into()), None, true).unwrap();

        let s = state(&path);
        assert_eq!(s.events.len(), 2);
        let standup = s.events.iter().find(|e| e.name == "Standup").unwrap();
        assert!(matches!(standup.recurrence, Recurrence::Weekly(ref d) if d.len() == 2));
        assert_eq!(standup.hours(), 0.5);
        cmd_event_list().unwrap();

        cmd_event_remove(vec![standup.id], true).unwrap();
        assert_eq!(state(&path).events.len(), 1);
        assert!(cmd_event_add("Bad".into(), "RED".into(), "10:00".into(), "9:00".into(), None, None, true).is_err());
    });
}

#[test]
fn test_build_archives_scheduled_tasks() {
    with_test_db(|path| {
        cmd_build(true).unwrap();
        assert!(!path.exists());

        cmd_task_add("Small".into(), 1.0, "2999-12-01".into(), None, true).unwrap();
        cmd_build(true).unwrap();

        let s = state(&path);
        assert!(s.tasks.is_empty());
        assert_eq!(s.archive.len(), 1);
        assert_eq!(s.archive[0].reason, ArchiveReason::Allocated);

        cmd_sched().unwrap();
        cmd_subtask().unwrap();
        assert_eq!(state(&path), s);
    });
}

#[test]
fn test_custom_hours() {
    with_test_db(|path| {
        cmd_hours("2999-01-01".into(), Some(4.0), false, true).unwrap();
        let s = state(&path);
        assert_eq!(s.custom_hours.values().copied().collect::<Vec<_>>(), vec![4.0]);

        assert!(cmd_hours("2999-01-01".into(), Some(30.0), false, true).is_err());

        cmd_hours("2999-01-01".into(), None, true, true).unwrap();
        assert!(state(&path).custom_hours.is_empty());
    });
}

#[test]
fn test_reset_deletes_database() {
    with_test_db(|path| {
        cmd_task_add("Task".into(), 1.0, "2999-12-01".into(), None, true).unwrap();
        assert!(path.exists());

        cmd_reset(true).unwrap();
        assert!(!path.exists());
    });
}

#[test]
fn test_invalid_config_is_reported() {
    with_test_db(|_path| {
        let config = env::var("DAYPLAN_CONFIG").unwrap();
        std::fs::write(&config, "max_days = 0").unwrap();

        let err = cmd_task_list(false).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    });
}
