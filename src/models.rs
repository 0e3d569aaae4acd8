use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

pub type TaskId = u32;
pub type CardId = u32;
pub type EventId = u32;

/// Tolerance used when comparing hour quantities.
pub const HOURS_EPSILON: f64 = 1e-9;

/// A unit of work with an effort estimate and a due date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, assigned in creation order.
    pub id: TaskId,
    /// The name or description of the task.
    pub name: String,
    /// Estimated hours required to complete the task.
    pub total_hours: f64,
    /// Hours not yet placed on a day in the current build.
    pub hours_remaining: f64,
    /// The due date of the task.
    pub due_date: NaiveDate,
    /// Optional card (label) the task belongs to.
    #[serde(default)]
    pub card: Option<CardId>,
    /// Timestamp when the task was created (ISO 8601).
    pub created_at: String,
    /// Set by a build that could not fit the task before its due date.
    #[serde(default)]
    pub infeasible: bool,
}

impl Task {
    pub fn new(id: TaskId, name: String, hours: f64, due_date: NaiveDate, card: Option<CardId>, created_at: String) -> Self {
        Task {
            id,
            name,
            total_hours: hours,
            hours_remaining: hours,
            due_date,
            card,
            created_at,
            infeasible: false,
        }
    }

    /// Drops every placement from a previous build.
    pub fn reset(&mut self) {
        self.hours_remaining = self.total_hours;
        self.infeasible = false;
    }

    /// Hours already placed on days in the current build.
    pub fn hours_allocated(&self) -> f64 {
        self.total_hours - self.hours_remaining
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.hours_remaining <= HOURS_EPSILON
    }

    /// Takes `hours` off the remaining effort and returns the fragment record.
    pub(crate) fn allocate(&mut self, hours: f64, overflow: bool) -> SubTask {
        assert!(hours > 0.0, "subtask hours must be positive, got {hours}");
        let remaining = self.hours_remaining - hours;
        assert!(
            remaining >= -HOURS_EPSILON,
            "task {} over-allocated: {} remaining, {} requested",
            self.id,
            self.hours_remaining,
            hours
        );
        self.hours_remaining = remaining.max(0.0);
        SubTask { task_id: self.id, hours, overflow }
    }
}

/// A day-bound fragment of a task's effort.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SubTask {
    pub task_id: TaskId,
    pub hours: f64,
    /// Placed despite exceeding the day's capacity or missing the task's deadline.
    pub overflow: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Violet,
    Black,
    LightCoral,
    LightGreen,
    LightBlue,
}

impl Color {
    pub const ALL: [Color; 11] = [
        Color::Red,
        Color::Orange,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Indigo,
        Color::Violet,
        Color::Black,
        Color::LightCoral,
        Color::LightGreen,
        Color::LightBlue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Orange => "ORANGE",
            Color::Yellow => "YELLOW",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
            Color::Indigo => "INDIGO",
            Color::Violet => "VIOLET",
            Color::Black => "BLACK",
            Color::LightCoral => "LIGHT_CORAL",
            Color::LightGreen => "LIGHT_GREEN",
            Color::LightBlue => "LIGHT_BLUE",
        }
    }

    /// RGB value used by the table and TUI renderers.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Color::Red => (220, 50, 47),
            Color::Orange => (255, 140, 0),
            Color::Yellow => (230, 200, 0),
            Color::Green => (60, 170, 60),
            Color::Blue => (38, 110, 210),
            Color::Indigo => (75, 0, 130),
            Color::Violet => (148, 80, 200),
            Color::Black => (90, 90, 90),
            Color::LightCoral => (240, 128, 128),
            Color::LightGreen => (144, 238, 144),
            Color::LightBlue => (135, 206, 250),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Color::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown color '{}'", s))
    }
}

/// A label applied to tasks and events.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub color: Color,
}

/// Start and end instants of an event within a single day.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSpan {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        TimeSpan { start, end }
    }

    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Occurs once, on the date of the event's span.
    Once,
    /// Repeats every week on the listed days.
    Weekly(Vec<Weekday>),
}

/// Fixed calendar occupancy; consumes capacity but is never split or moved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub color: Color,
    pub span: TimeSpan,
    pub recurrence: Recurrence,
}

impl Event {
    pub fn hours(&self) -> f64 {
        self.span.hours()
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, Recurrence::Weekly(_))
    }

    /// Whether the event takes place on `date`.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        match &self.recurrence {
            Recurrence::Once => self.span.date() == date,
            Recurrence::Weekly(days) => days.contains(&date.weekday()),
        }
    }
}
