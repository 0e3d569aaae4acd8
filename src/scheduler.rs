use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::backlog::{ArchiveReason, ArchivedTask, Backlog};
use crate::config::UserConfig;
use crate::day::Day;
use crate::events::EventRegistry;
use crate::models::HOURS_EPSILON;

/// Hours available on any date, before and after fixed events.
#[derive(Debug, Clone, Copy)]
pub struct CapacityPlan<'a> {
    config: &'a UserConfig,
    custom_hours: &'a BTreeMap<NaiveDate, f64>,
    events: &'a EventRegistry,
}

impl<'a> CapacityPlan<'a> {
    pub fn new(
        config: &'a UserConfig,
        custom_hours: &'a BTreeMap<NaiveDate, f64>,
        events: &'a EventRegistry,
    ) -> Self {
        CapacityPlan { config, custom_hours, events }
    }

    /// Configured hours: a per-date override if one exists, else the weekday value.
    pub fn raw_hours(&self, date: NaiveDate) -> f64 {
        self.custom_hours
            .get(&date)
            .copied()
            .unwrap_or_else(|| self.config.hours_for(date.weekday()))
    }

    /// Hours left for tasks once the day's events are taken out.
    pub fn usable_hours(&self, date: NaiveDate) -> f64 {
        (self.raw_hours(date) - self.events.hours_on(date)).max(0.0)
    }
}

/// What one call to [`Scheduler::assign_day`] removed from the backlog.
#[derive(Debug, Default)]
pub struct DayOutcome {
    pub archived: Vec<ArchivedTask>,
    /// Tasks that could not meet their due date on this day.
    pub infeasible: usize,
}

/// Fills a day's spare hours with the earliest-due backlog work.
pub struct Scheduler<'a> {
    plan: CapacityPlan<'a>,
}

impl<'a> Scheduler<'a> {
    pub fn new(plan: CapacityPlan<'a>) -> Self {
        Scheduler { plan }
    }

    /// Hours a task could still get from `day` through `due`, inclusive.
    ///
    /// `day` contributes its current spare hours; later dates contribute
    /// their full usable capacity. Counting stops once `need` is covered.
    pub fn hours_available(&self, day: &Day, due: NaiveDate, need: f64) -> f64 {
        if due < day.date() {
            return 0.0;
        }
        let mut total = day.spare_hours();
        for date in day.date().iter_days().skip(1).take_while(|d| *d <= due) {
            if total + HOURS_EPSILON >= need {
                break;
            }
            total += self.plan.usable_hours(date);
        }
        total
    }

    /// Packs backlog tasks into `day` until it is full or the backlog is empty.
    ///
    /// A task that only partly fits goes back on the backlog with its
    /// remaining hours reduced. A task that cannot meet its due date is
    /// flagged once and keeps taking overflow hours every day through its
    /// due date; it is archived as `Infeasible` after that.
    pub fn assign_day(&self, day: &mut Day, backlog: &mut Backlog) -> DayOutcome {
        let mut outcome = DayOutcome::default();
        if day.usable_capacity() <= HOURS_EPSILON {
            tracing::debug!(day = day.id(), date = %day.date(), "no usable capacity");
            return outcome;
        }

        while day.has_spare_hours() {
            let Some(mut task) = backlog.pop() else {
                break;
            };
            debug_assert!(!task.is_fully_allocated(), "task {} is fully allocated but pending", task.id);

            if task.due_date < day.date() {
                let reason = if task.infeasible {
                    ArchiveReason::Infeasible
                } else {
                    tracing::warn!(task_id = task.id, due = %task.due_date, "task is past due, archiving");
                    outcome.infeasible += 1;
                    ArchiveReason::Expired
                };
                outcome.archived.push(ArchivedTask { task, reason });
                continue;
            }

            let need = task.hours_remaining;
            let spare = day.spare_hours();

            if !task.infeasible && need > self.hours_available(day, task.due_date, need) + HOURS_EPSILON {
                tracing::warn!(
                    task_id = task.id,
                    need,
                    due = %task.due_date,
                    "deadline cannot be met, scheduling as much as possible"
                );
                task.infeasible = true;
                outcome.infeasible += 1;
            }

            if task.infeasible {
                day.add_subtask(&mut task, need.min(spare), true);
                if task.is_fully_allocated() || task.due_date == day.date() {
                    outcome.archived.push(ArchivedTask { task, reason: ArchiveReason::Infeasible });
                    continue;
                }
                backlog.push(task);
                break;
            }

            if need <= spare + HOURS_EPSILON {
                day.add_subtask(&mut task, need, false);
                outcome.archived.push(ArchivedTask { task, reason: ArchiveReason::Allocated });
            } else {
                day.add_subtask(&mut task, spare, false);
                backlog.push(task);
                break;
            }
        }
        outcome
    }
}
