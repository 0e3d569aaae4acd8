use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Event, SubTask, Task, HOURS_EPSILON};

/// One calendar day's capacity ledger.
///
/// `size` only counts subtask hours. Attached events are treated as
/// capacity that was consumed before any subtask was placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Day {
    id: u32,
    date: NaiveDate,
    capacity: f64,
    size: f64,
    subtasks: Vec<SubTask>,
    events: Vec<Event>,
}

impl Day {
    pub fn new(id: u32, date: NaiveDate, capacity: f64) -> Self {
        Day {
            id,
            date,
            capacity: capacity.max(0.0),
            size: 0.0,
            subtasks: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Raw hours configured for this day, before events.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Hours filled by subtasks.
    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn subtasks(&self) -> &[SubTask] {
        &self.subtasks
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn event_hours(&self) -> f64 {
        self.events.iter().map(Event::hours).sum()
    }

    /// Capacity left for subtasks once events are taken out.
    pub fn usable_capacity(&self) -> f64 {
        self.capacity - self.event_hours()
    }

    pub fn spare_hours(&self) -> f64 {
        (self.usable_capacity() - self.size).max(0.0)
    }

    pub fn has_spare_hours(&self) -> bool {
        self.spare_hours() > HOURS_EPSILON
    }

    pub fn has_overflow(&self) -> bool {
        self.subtasks.iter().any(|s| s.overflow)
    }

    /// Places `hours` of `task` on this day and decrements the task's remaining effort.
    pub fn add_subtask(&mut self, task: &mut Task, hours: f64, overflow: bool) {
        let subtask = task.allocate(hours, overflow);
        self.subtasks.push(subtask);
        self.size += hours;
    }
}
