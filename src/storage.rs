use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backlog::ArchivedTask;
use crate::error::Result;
use crate::models::{Card, CardId, Event, EventId, Task, TaskId};

/// Everything the planner persists between invocations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlannerState {
    #[serde(default = "first_id")]
    pub next_task_id: TaskId,
    #[serde(default = "first_id")]
    pub next_card_id: CardId,
    #[serde(default = "first_id")]
    pub next_event_id: EventId,
    /// Tasks still waiting for hours.
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub archive: Vec<ArchivedTask>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Per-date capacity overrides.
    #[serde(default)]
    pub custom_hours: BTreeMap<NaiveDate, f64>,
}

fn first_id() -> u32 {
    1
}

impl Default for PlannerState {
    fn default() -> Self {
        PlannerState {
            next_task_id: first_id(),
            next_card_id: first_id(),
            next_event_id: first_id(),
            tasks: Vec::new(),
            archive: Vec::new(),
            cards: Vec::new(),
            events: Vec::new(),
            custom_hours: BTreeMap::new(),
        }
    }
}

/// Returns the path to the planner database file (`plan.json`).
///
/// The path is determined in the following order:
/// 1. `DAYPLAN_DB` environment variable.
/// 2. `~/.local/share/dayplan/plan.json` (on Linux).
/// 3. `./plan.json` (fallback).
pub fn db_path() -> PathBuf {
    std::env::var("DAYPLAN_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("dayplan");
        p.push("plan.json");
        p
    })
}

/// Loads planner state from the default database file.
pub fn load_state() -> Result<PlannerState> {
    load_state_from(&db_path())
}

/// Loads planner state from `path`.
///
/// A missing file is an empty planner; an unreadable or malformed one is an error.
pub fn load_state_from(path: &Path) -> Result<PlannerState> {
    if !path.exists() {
        return Ok(PlannerState::default());
    }
    let mut f = OpenOptions::new().read(true).open(path)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    let state = serde_json::from_str(&s)?;
    Ok(state)
}

/// Saves planner state to the default database file.
pub fn save_state(state: &PlannerState) -> Result<()> {
    save_state_to(&db_path(), state)
}

/// Overwrites `path` with `state`, creating parent directories as needed.
pub fn save_state_to(path: &Path, state: &PlannerState) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    let s = serde_json::to_string_pretty(state)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Deletes the planner database file.
pub fn delete_database() -> std::io::Result<()> {
    let path = db_path();
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
