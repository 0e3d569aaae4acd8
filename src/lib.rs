//! Day-by-day task distribution.
//!
//! The planner spreads a backlog of due-dated, hour-estimated tasks over the
//! coming days. It fills each day's spare capacity, works around fixed events,
//! and flags tasks whose deadline cannot be met.

pub mod backlog;
pub mod commands;
pub mod config;
pub mod day;
pub mod error;
pub mod events;
pub mod manager;
pub mod models;
pub mod parse;
pub mod scheduler;
pub mod storage;
pub mod tui;

pub use error::{PlannerError, Result};
pub use manager::{BuildSummary, PlanReport, ScheduleManager, TaskUpdate};
