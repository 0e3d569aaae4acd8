use chrono::{Local, NaiveDate};
use ratatui::widgets::TableState;

use crate::commands::{open_manager, save_manager};
use crate::error::Result;
use crate::manager::ScheduleManager;
use crate::models::{CardId, Color, TaskId};
use crate::parse::parse_due;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Adding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Schedule,
    Tasks,
    Cards,
}

/// One line of the schedule view.
pub enum ScheduleRow {
    Day { date: NaiveDate, filled: f64, capacity: f64, overflow: bool },
    Work { name: String, hours: f64, due: Option<NaiveDate>, overflow: bool },
    Event { name: String, color: Color, start: String, end: String },
}

pub struct TaskRow {
    pub id: TaskId,
    pub name: String,
    pub card: Option<(String, Color)>,
    pub due: NaiveDate,
    pub hours: f64,
    pub status: &'static str,
}

pub struct CardRow {
    pub id: CardId,
    pub name: String,
    pub color: Color,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub name: String,
    pub due: String,
    pub step: usize, // 0: Name, 1: Due, 2: Hours
}

pub struct App {
    pub manager: ScheduleManager,
    pub schedule_rows: Vec<ScheduleRow>,
    pub task_rows: Vec<TaskRow>,
    pub card_rows: Vec<CardRow>,
    pub schedule_state: TableState,
    pub task_state: TableState,
    pub card_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub add_state: AddState,
    /// Last action result shown in the help bar.
    pub status: String,
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}

impl App {
    /// Loads the planner and builds a fresh schedule.
    pub fn new() -> Result<App> {
        let manager = open_manager()?;
        let mut app = App {
            manager,
            schedule_rows: Vec::new(),
            task_rows: Vec::new(),
            card_rows: Vec::new(),
            schedule_state: TableState::default(),
            task_state: TableState::default(),
            card_state: TableState::default(),
            view_mode: ViewMode::Schedule,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            add_state: AddState::default(),
            status: String::new(),
        };
        app.rebuild();
        Ok(app)
    }

    fn current(&mut self) -> (&mut TableState, usize) {
        match self.view_mode {
            ViewMode::Schedule => (&mut self.schedule_state, self.schedule_rows.len()),
            ViewMode::Tasks => (&mut self.task_state, self.task_rows.len()),
            ViewMode::Cards => (&mut self.card_state, self.card_rows.len()),
        }
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (state, len) = self.current();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (state, len) = self.current();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Cycles Schedule -> Tasks -> Cards.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Schedule => ViewMode::Tasks,
            ViewMode::Tasks => ViewMode::Cards,
            ViewMode::Cards => ViewMode::Schedule,
        };
    }

    /// Rebuilds the schedule from today, saves, and refreshes every view.
    pub fn rebuild(&mut self) {
        self.try_rebuild();
    }

    /// Same as [`App::rebuild`], returning whether the save went through.
    fn try_rebuild(&mut self) -> bool {
        let summary = self.manager.build_schedule();
        let saved = match save_manager(&self.manager) {
            Ok(()) if summary.infeasible > 0 => {
                self.status = format!(
                    "{} day(s) planned, {} task(s) cannot meet their due date",
                    summary.days, summary.infeasible
                );
                true
            }
            Ok(()) => {
                self.status = format!("{} day(s) planned, {} pending", summary.days, summary.pending);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save planner state");
                self.status = format!("Failed to save: {}", e);
                false
            }
        };
        self.reload();
        saved
    }

    /// Refreshes the display rows from the manager.
    pub fn reload(&mut self) {
        let m = &self.manager;

        self.schedule_rows.clear();
        for day in m.schedule() {
            self.schedule_rows.push(ScheduleRow::Day {
                date: day.date(),
                filled: day.size(),
                capacity: day.usable_capacity().max(0.0),
                overflow: day.has_overflow(),
            });
            for e in day.events() {
                self.schedule_rows.push(ScheduleRow::Event {
                    name: e.name.clone(),
                    color: e.color,
                    start: e.span.start.format("%H:%M").to_string(),
                    end: e.span.end.format("%H:%M").to_string(),
                });
            }
            for s in day.subtasks() {
                let task = m.task(s.task_id).ok();
                self.schedule_rows.push(ScheduleRow::Work {
                    name: task.map(|t| t.name.clone()).unwrap_or_else(|| "(deleted)".into()),
                    hours: s.hours,
                    due: task.map(|t| t.due_date),
                    overflow: s.overflow,
                });
            }
        }

        let card_of = |id: Option<CardId>| {
            id.and_then(|c| m.card(c).ok()).map(|c| (c.name.clone(), c.color))
        };
        self.task_rows = m
            .backlog()
            .into_iter()
            .map(|t| (t, "Pending"))
            .chain(m.archive().into_iter().map(|e| (&e.task, e.reason.as_str())))
            .map(|(t, status)| TaskRow {
                id: t.id,
                name: t.name.clone(),
                card: card_of(t.card),
                due: t.due_date,
                hours: t.total_hours,
                status,
            })
            .collect();
        self.task_rows.sort_by_key(|r| (r.due, r.id));

        self.card_rows = m
            .cards()
            .into_iter()
            .map(|c| CardRow { id: c.id, name: c.name.clone(), color: c.color })
            .collect();

        clamp_selection(&mut self.schedule_state, self.schedule_rows.len());
        clamp_selection(&mut self.task_state, self.task_rows.len());
        clamp_selection(&mut self.card_state, self.card_rows.len());
    }

    /// Deletes the selected task or card and rebuilds.
    pub fn delete_selected(&mut self) {
        let result = match self.view_mode {
            ViewMode::Tasks => match self.task_state.selected().and_then(|i| self.task_rows.get(i)).map(|r| r.id) {
                Some(id) => self.manager.delete_task(id).map(|t| format!("Task {} removed", t.id)),
                None => return,
            },
            ViewMode::Cards => match self.card_state.selected().and_then(|i| self.card_rows.get(i)).map(|r| r.id) {
                Some(id) => self.manager.delete_card(id).map(|c| format!("Card {} removed", c.id)),
                None => return,
            },
            ViewMode::Schedule => return,
        };
        match result {
            Ok(message) => {
                if self.try_rebuild() {
                    self.status = message;
                }
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        if self.view_mode != ViewMode::Tasks { return; }
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Handles input for the "Add Task" wizard.
    pub fn handle_input(&mut self) {
        if self.input_mode != InputMode::Adding { return; }
        match self.add_state.step {
            0 => { // Name
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.name = self.input_buffer.clone();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => { // Due
                let today = Local::now().date_naive();
                match parse_due(&self.input_buffer, today) {
                    Ok(_) => {
                        self.add_state.due = self.input_buffer.clone();
                        self.add_state.step += 1;
                        self.input_buffer.clear();
                    }
                    Err(e) => self.status = e.to_string(),
                }
            }
            2 => { // Hours
                let Ok(hours) = self.input_buffer.trim().parse::<f64>() else {
                    self.status = format!("'{}' is not a number of hours", self.input_buffer);
                    return;
                };
                let today = Local::now().date_naive();
                let added = parse_due(&self.add_state.due, today)
                    .and_then(|due| self.manager.add_task(&self.add_state.name, hours, due, None).map(|t| t.id));
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                match added {
                    Ok(_) => self.rebuild(),
                    Err(e) => self.status = e.to_string(),
                }
            }
            _ => {}
        }
    }
}
