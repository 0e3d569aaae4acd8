//! The schedule orchestrator.
//!
//! `ScheduleManager` owns every piece of planner state: the backlog, the
//! archive, cards, events, per-date hour overrides and the day sequence of
//! the last build. All mutation goes through `&mut self`, so a build can
//! never interleave with an edit.

use std::collections::BTreeMap;

use chrono::{Duration, Local, NaiveDate};

use crate::backlog::{ArchiveReason, ArchivedTask, Archive, Backlog};
use crate::config::UserConfig;
use crate::day::Day;
use crate::error::{PlannerError, Result};
use crate::events::{EventRegistry, NewEvent};
use crate::models::{Card, CardId, Color, Event, EventId, Task, TaskId};
use crate::scheduler::{CapacityPlan, Scheduler};
use crate::storage::PlannerState;

/// Requested changes to a task. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub hours: Option<f64>,
    pub due: Option<NaiveDate>,
    /// `Some(None)` removes the card.
    pub card: Option<Option<CardId>>,
}

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildSummary {
    pub days: usize,
    pub infeasible: usize,
    pub archived: usize,
    pub pending: usize,
}

/// Totals over the current backlog, archive and schedule.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanReport {
    pub pending: usize,
    pub scheduled: usize,
    pub infeasible: usize,
    pub expired: usize,
    pub cards: usize,
    pub events: usize,
    pub days: usize,
    /// Hours placed on days, overflow included.
    pub planned_hours: f64,
    pub overflow_hours: f64,
}

#[derive(Debug, Clone)]
pub struct ScheduleManager {
    config: UserConfig,
    backlog: Backlog,
    archive: Archive,
    cards: BTreeMap<CardId, Card>,
    events: EventRegistry,
    custom_hours: BTreeMap<NaiveDate, f64>,
    schedule: Vec<Day>,
    infeasible_count: usize,
    next_task_id: TaskId,
    next_card_id: CardId,
}

fn validate_name(kind: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlannerError::invalid(format!("{kind} name must not be empty")));
    }
    Ok(name.to_string())
}

fn validate_hours(hours: f64) -> Result<f64> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(PlannerError::invalid(format!("hours must be positive, got {hours}")));
    }
    Ok(hours)
}

impl ScheduleManager {
    pub fn new(config: UserConfig) -> Self {
        ScheduleManager {
            config,
            backlog: Backlog::new(),
            archive: Archive::new(),
            cards: BTreeMap::new(),
            events: EventRegistry::new(),
            custom_hours: BTreeMap::new(),
            schedule: Vec::new(),
            infeasible_count: 0,
            next_task_id: 1,
            next_card_id: 1,
        }
    }

    /// Restores a manager from persisted state.
    pub fn from_state(config: UserConfig, state: PlannerState) -> Self {
        let max_task = state
            .tasks
            .iter()
            .map(|t| t.id)
            .chain(state.archive.iter().map(|e| e.task.id))
            .max()
            .unwrap_or(0);
        let max_card = state.cards.iter().map(|c| c.id).max().unwrap_or(0);
        ScheduleManager {
            config,
            backlog: state.tasks.into_iter().collect(),
            archive: state.archive.into_iter().collect(),
            cards: state.cards.into_iter().map(|c| (c.id, c)).collect(),
            events: EventRegistry::from_events(state.events, state.next_event_id),
            custom_hours: state.custom_hours,
            schedule: Vec::new(),
            infeasible_count: 0,
            next_task_id: state.next_task_id.max(max_task + 1),
            next_card_id: state.next_card_id.max(max_card + 1),
        }
    }

    /// Snapshot of everything worth persisting. Days are recomputed, not stored.
    pub fn to_state(&self) -> PlannerState {
        PlannerState {
            next_task_id: self.next_task_id,
            next_card_id: self.next_card_id,
            next_event_id: self.events.next_id(),
            tasks: self.backlog.sorted().into_iter().cloned().collect(),
            archive: self.archive.iter().cloned().collect(),
            cards: self.cards.values().cloned().collect(),
            events: self.events.iter().cloned().collect(),
            custom_hours: self.custom_hours.clone(),
        }
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    // ---- tasks ----

    pub fn add_task(&mut self, name: &str, hours: f64, due: NaiveDate, card: Option<CardId>) -> Result<&Task> {
        let name = validate_name("task", name)?;
        let hours = validate_hours(hours)?;
        if let Some(card_id) = card {
            self.card(card_id)?;
        }
        let id = self.next_task_id;
        self.next_task_id += 1;
        self.backlog.push(Task::new(id, name, hours, due, card, Local::now().to_rfc3339()));
        tracing::debug!(task_id = id, hours, %due, "task added");
        self.task(id)
    }

    /// Applies `update` to a task.
    ///
    /// A new hour estimate or due date drops the task's placements and
    /// returns it to the backlog, even from the archive.
    pub fn modify_task(&mut self, id: TaskId, update: TaskUpdate) -> Result<&Task> {
        let name = update.name.as_deref().map(|n| validate_name("task", n)).transpose()?;
        let hours = update.hours.map(validate_hours).transpose()?;
        if let Some(Some(card_id)) = update.card {
            self.card(card_id)?;
        }
        let in_backlog = self.backlog.contains(id);
        if !in_backlog && self.archive.get(id).is_none() {
            return Err(PlannerError::task_not_found(id));
        }

        let replan = hours.is_some() || update.due.is_some();
        let apply = |task: &mut Task| {
            if let Some(name) = name {
                task.name = name;
            }
            if let Some(hours) = hours {
                task.total_hours = hours;
            }
            if let Some(due) = update.due {
                task.due_date = due;
            }
            if let Some(card) = update.card {
                task.card = card;
            }
            if replan {
                task.reset();
            }
        };

        if in_backlog {
            self.backlog.update(id, apply);
        } else if replan {
            if let Some(mut entry) = self.archive.remove(id) {
                apply(&mut entry.task);
                self.backlog.push(entry.task);
            }
        } else if let Some(entry) = self.archive.get_mut(id) {
            apply(&mut entry.task);
        }
        tracing::debug!(task_id = id, replan, "task modified");
        self.task(id)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        if let Some(task) = self.backlog.remove(id) {
            return Ok(task);
        }
        self.archive
            .remove(id)
            .map(|e| e.task)
            .ok_or_else(|| PlannerError::task_not_found(id))
    }

    /// Looks a task up in the backlog, then the archive.
    pub fn task(&self, id: TaskId) -> Result<&Task> {
        self.backlog
            .get(id)
            .or_else(|| self.archive.get(id).map(|e| &e.task))
            .ok_or_else(|| PlannerError::task_not_found(id))
    }

    /// Pending tasks, earliest due first.
    pub fn backlog(&self) -> Vec<&Task> {
        self.backlog.sorted()
    }

    /// Archived tasks, earliest due first.
    pub fn archive(&self) -> Vec<&ArchivedTask> {
        self.archive.sorted()
    }

    pub fn num_tasks(&self) -> usize {
        self.backlog.len() + self.archive.len()
    }

    pub fn num_active_tasks(&self) -> usize {
        self.backlog.len() + self.archive.iter().filter(|e| e.reason.is_build_outcome()).count()
    }

    /// Tasks the last build could not fit before their due date.
    pub fn overflowed_tasks(&self) -> Vec<&Task> {
        self.archive
            .sorted()
            .into_iter()
            .map(|e| &e.task)
            .filter(|t| t.infeasible)
            .collect()
    }

    /// Where a task sits: `None` while pending, else its archive reason.
    pub fn task_status(&self, id: TaskId) -> Result<Option<ArchiveReason>> {
        if self.backlog.contains(id) {
            return Ok(None);
        }
        self.archive
            .get(id)
            .map(|e| Some(e.reason))
            .ok_or_else(|| PlannerError::task_not_found(id))
    }

    /// Summarises the planner as of the last build.
    pub fn report(&self) -> PlanReport {
        let mut report = PlanReport {
            pending: self.backlog.len(),
            cards: self.cards.len(),
            events: self.events.len(),
            days: self.schedule.len(),
            ..PlanReport::default()
        };
        for entry in self.archive.iter() {
            match entry.reason {
                ArchiveReason::Allocated => report.scheduled += 1,
                ArchiveReason::Infeasible => report.infeasible += 1,
                ArchiveReason::Expired => report.expired += 1,
            }
        }
        for subtask in self.schedule.iter().flat_map(|d| d.subtasks()) {
            report.planned_hours += subtask.hours;
            if subtask.overflow {
                report.overflow_hours += subtask.hours;
            }
        }
        report
    }

    // ---- cards ----

    pub fn add_card(&mut self, name: &str, color: Color) -> Result<&Card> {
        let name = validate_name("card", name)?;
        let id = self.next_card_id;
        self.next_card_id += 1;
        self.cards.insert(id, Card { id, name, color });
        self.card(id)
    }

    pub fn modify_card(&mut self, id: CardId, name: Option<&str>, color: Option<Color>) -> Result<&Card> {
        let name = name.map(|n| validate_name("card", n)).transpose()?;
        let card = self.cards.get_mut(&id).ok_or_else(|| PlannerError::card_not_found(id))?;
        if let Some(name) = name {
            card.name = name;
        }
        if let Some(color) = color {
            card.color = color;
        }
        Ok(&*card)
    }

    /// Removes a card and clears it from every task that carried it.
    pub fn delete_card(&mut self, id: CardId) -> Result<Card> {
        let card = self.cards.remove(&id).ok_or_else(|| PlannerError::card_not_found(id))?;
        let tasks = self.backlog.drain_sorted();
        for mut task in tasks {
            if task.card == Some(id) {
                task.card = None;
            }
            self.backlog.push(task);
        }
        let archived: Vec<TaskId> = self
            .archive
            .iter()
            .filter(|e| e.task.card == Some(id))
            .map(|e| e.task.id)
            .collect();
        for task_id in archived {
            if let Some(entry) = self.archive.get_mut(task_id) {
                entry.task.card = None;
            }
        }
        Ok(card)
    }

    pub fn card(&self, id: CardId) -> Result<&Card> {
        self.cards.get(&id).ok_or_else(|| PlannerError::card_not_found(id))
    }

    pub fn cards(&self) -> Vec<&Card> {
        self.cards.values().collect()
    }

    // ---- events ----

    pub fn add_event(&mut self, request: NewEvent) -> Result<&Event> {
        self.events.add(request)
    }

    pub fn delete_event(&mut self, id: EventId) -> Result<Event> {
        self.events.remove(id)
    }

    pub fn event(&self, id: EventId) -> Result<&Event> {
        self.events.get(id).ok_or_else(|| PlannerError::event_not_found(id))
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    // ---- capacity overrides ----

    /// Overrides the weekday capacity for a single date.
    pub fn set_custom_hours(&mut self, date: NaiveDate, hours: f64) -> Result<()> {
        if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
            return Err(PlannerError::invalid(format!("hours must be between 0 and 24, got {hours}")));
        }
        self.custom_hours.insert(date, hours);
        Ok(())
    }

    pub fn clear_custom_hours(&mut self, date: NaiveDate) -> Option<f64> {
        self.custom_hours.remove(&date)
    }

    pub fn custom_hours(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.custom_hours
    }

    // ---- schedule ----

    pub fn schedule(&self) -> &[Day] {
        &self.schedule
    }

    pub fn schedule_is_empty(&self) -> bool {
        self.schedule.is_empty()
    }

    pub fn infeasible_count(&self) -> usize {
        self.infeasible_count
    }

    /// Rebuilds the schedule starting from the local date.
    pub fn build_schedule(&mut self) -> BuildSummary {
        self.build_schedule_on(Local::now().date_naive())
    }

    /// Rebuilds the whole day sequence starting at `today`.
    pub fn build_schedule_on(&mut self, today: NaiveDate) -> BuildSummary {
        tracing::info!(%today, tasks = self.num_active_tasks(), "building schedule");
        self.reset_schedule();
        self.archive_past_due(today);
        self.purge_archive(today);

        let plan = CapacityPlan::new(&self.config, &self.custom_hours, &self.events);
        let scheduler = Scheduler::new(plan);
        let mut archived = 0;
        let mut day_id = 0;
        while !self.backlog.is_empty() && day_id < self.config.max_days {
            let date = today + Duration::days(i64::from(day_id));
            let mut day = Day::new(day_id, date, plan.raw_hours(date));
            for event in self.events.on_date(date) {
                day.add_event(event.clone());
            }

            let outcome = scheduler.assign_day(&mut day, &mut self.backlog);
            tracing::debug!(
                day = day_id,
                %date,
                filled = day.size(),
                capacity = day.capacity(),
                archived = outcome.archived.len(),
                "day assigned"
            );
            self.infeasible_count += outcome.infeasible;
            archived += outcome.archived.len();
            for entry in outcome.archived {
                self.archive.push(entry.task, entry.reason);
            }
            self.schedule.push(day);
            day_id += 1;
        }

        let summary = BuildSummary {
            days: self.schedule.len(),
            infeasible: self.infeasible_count,
            archived,
            pending: self.backlog.len(),
        };
        tracing::info!(
            days = summary.days,
            infeasible = summary.infeasible,
            pending = summary.pending,
            "schedule built"
        );
        summary
    }

    /// Clears the previous build. Tasks archived as outcomes of that build
    /// go back to the backlog so they are planned again from scratch.
    fn reset_schedule(&mut self) {
        self.schedule.clear();
        for entry in self.archive.take_where(|e| e.reason.is_build_outcome()) {
            self.backlog.push(entry.task);
        }
        self.backlog.reset();
        self.infeasible_count = 0;
        self.events.sort_individual();
    }

    /// Moves every task due before `today` into the archive.
    fn archive_past_due(&mut self, today: NaiveDate) {
        while let Some(head) = self.backlog.peek() {
            if head.due_date >= today {
                break;
            }
            if let Some(task) = self.backlog.pop() {
                tracing::debug!(task_id = task.id, due = %task.due_date, "archiving past-due task");
                self.archive.push(task, ArchiveReason::Expired);
            }
        }
    }

    /// Drops expired entries older than the retention window.
    fn purge_archive(&mut self, today: NaiveDate) {
        let cutoff = today - Duration::days(i64::from(self.config.archive_days));
        let dropped = self
            .archive
            .take_where(|e| e.reason == ArchiveReason::Expired && e.task.due_date < cutoff);
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), %cutoff, "purged expired tasks");
        }
    }
}
