//! Registry of fixed calendar events.
//!
//! Recurring events are indexed by weekday in seven buckets, Sunday first.
//! One event that repeats on several days is stored once and referenced
//! by id from each bucket. One-off events live in a list that is sorted
//! by start time at the beginning of every build.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{PlannerError, Result};
use crate::models::{Color, Event, EventId, Recurrence, TimeSpan};

/// Request to register a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub color: Color,
    pub span: TimeSpan,
    pub recurring: bool,
    pub weekdays: Vec<Weekday>,
}

#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: BTreeMap<EventId, Event>,
    recurring: [Vec<EventId>; 7],
    individual: Vec<EventId>,
    next_id: EventId,
}

fn bucket(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

impl EventRegistry {
    pub fn new() -> Self {
        EventRegistry { next_id: 1, ..Self::default() }
    }

    /// Rebuilds the indexes from a flat list of stored events.
    pub fn from_events(events: Vec<Event>, next_id: EventId) -> Self {
        let mut registry = EventRegistry { next_id: next_id.max(1), ..Self::default() };
        for event in events {
            registry.next_id = registry.next_id.max(event.id + 1);
            registry.index(event);
        }
        registry
    }

    fn index(&mut self, event: Event) {
        match &event.recurrence {
            Recurrence::Weekly(days) => {
                for day in days {
                    self.recurring[bucket(*day)].push(event.id);
                }
            }
            Recurrence::Once => self.individual.push(event.id),
        }
        self.events.insert(event.id, event);
    }

    pub fn next_id(&self) -> EventId {
        self.next_id
    }

    /// Validates and registers an event. Nothing changes on error.
    pub fn add(&mut self, request: NewEvent) -> Result<&Event> {
        let NewEvent { name, color, span, recurring, mut weekdays } = request;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PlannerError::invalid("event name must not be empty"));
        }
        if span.end <= span.start {
            return Err(PlannerError::invalid(format!(
                "event must end after it starts ({} - {})",
                span.start.time(),
                span.end.time()
            )));
        }
        if span.end.date() != span.start.date() {
            return Err(PlannerError::invalid("event must start and end on the same day"));
        }

        let recurrence = if recurring {
            if weekdays.is_empty() {
                return Err(PlannerError::invalid("recurring event needs at least one weekday"));
            }
            weekdays.sort_by_key(|d| d.num_days_from_sunday());
            weekdays.dedup();
            Recurrence::Weekly(weekdays)
        } else {
            if !weekdays.is_empty() {
                return Err(PlannerError::invalid("event is non-recurring but has recurrent days"));
            }
            Recurrence::Once
        };

        let id = self.next_id;
        self.next_id += 1;
        self.index(Event { id, name, color, span, recurrence });
        tracing::debug!(event_id = id, "event added");
        Ok(&self.events[&id])
    }

    pub fn remove(&mut self, id: EventId) -> Result<Event> {
        let event = self.events.remove(&id).ok_or_else(|| PlannerError::event_not_found(id))?;
        for ids in self.recurring.iter_mut() {
            ids.retain(|e| *e != id);
        }
        self.individual.retain(|e| *e != id);
        Ok(event)
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn recurring_on(&self, day: Weekday) -> impl Iterator<Item = &Event> {
        self.recurring[bucket(day)].iter().filter_map(|id| self.events.get(id))
    }

    /// One-off events in their current list order.
    pub fn individual(&self) -> impl Iterator<Item = &Event> {
        self.individual.iter().filter_map(|id| self.events.get(id))
    }

    pub fn sort_individual(&mut self) {
        let events = &self.events;
        self.individual
            .sort_by_key(|id| events.get(id).map(|e| (e.span.start, e.id)));
    }

    /// Recurring events for the weekday of `date`, then one-off events on that date.
    pub fn on_date(&self, date: NaiveDate) -> Vec<&Event> {
        self.recurring_on(date.weekday())
            .chain(self.individual().filter(|e| e.occurs_on(date)))
            .collect()
    }

    pub fn hours_on(&self, date: NaiveDate) -> f64 {
        self.recurring_on(date.weekday())
            .chain(self.individual().filter(|e| e.occurs_on(date)))
            .map(Event::hours)
            .sum()
    }
}
