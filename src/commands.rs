use std::io::{self, Write};
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};

use crate::backlog::ArchiveReason;
use crate::config::{config_path, UserConfig};
use crate::error::{PlannerError, Result};
use crate::events::NewEvent;
use crate::manager::{ScheduleManager, TaskUpdate};
use crate::models::{Color, Event, Recurrence, Task, TimeSpan};
use crate::parse::{parse_date, parse_due, parse_time, parse_weekdays};
use crate::storage::{delete_database, load_state, load_state_from, save_state, save_state_to};

/// Loads the configuration and persisted state into a manager.
pub fn open_manager() -> Result<ScheduleManager> {
    let config = UserConfig::load()?;
    let state = load_state()?;
    Ok(ScheduleManager::from_state(config, state))
}

pub fn save_manager(manager: &ScheduleManager) -> Result<()> {
    save_state(&manager.to_state())
}

fn table_color(color: Color) -> TableColor {
    let (r, g, b) = color.rgb();
    TableColor::Rgb { r, g, b }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).add_attribute(Attribute::Bold)).collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Sorts ids and drops repeats so each one is handled once.
fn unique_ids(mut ids: Vec<u32>) -> Vec<u32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn detail_table(kind: &str, id: u32) -> Table {
    let mut table = new_table();
    let id = id.to_string();
    table.set_header(header(&[kind, id.as_str()]));
    table
}

fn card_label(manager: &ScheduleManager, card: Option<u32>) -> Cell {
    match card.and_then(|id| manager.card(id).ok()) {
        Some(c) => Cell::new(&c.name).fg(table_color(c.color)),
        None => Cell::new(""),
    }
}

/// Adds a new task to the backlog.
pub fn cmd_task_add(name: String, hours: f64, due: String, card: Option<u32>, silent: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let due_date = parse_due(&due, today)?;
    let mut manager = open_manager()?;
    let id = manager.add_task(&name, hours, due_date, card)?.id;
    save_manager(&manager)?;
    if !silent { println!("Task added (id = {})", id); }
    Ok(())
}

/// Edits an existing task's details.
///
/// Changing the hours or due date puts the task back into the backlog.
pub fn cmd_task_edit(
    id: u32,
    name: Option<String>,
    hours: Option<f64>,
    due: Option<String>,
    card: Option<u32>,
    no_card: bool,
    silent: bool,
) -> Result<()> {
    let today = Local::now().date_naive();
    let due = due.map(|d| parse_due(&d, today)).transpose()?;
    let card = if no_card { Some(None) } else { card.map(Some) };
    let mut manager = open_manager()?;
    manager.modify_task(id, TaskUpdate { name, hours, due, card })?;
    save_manager(&manager)?;
    if !silent { println!("Task {} updated.", id); }
    Ok(())
}

/// Removes tasks from the backlog or the archive.
///
/// Every id is checked before anything is deleted.
pub fn cmd_task_remove(ids: Vec<u32>, silent: bool) -> Result<()> {
    let ids = unique_ids(ids);
    let mut manager = open_manager()?;
    for &id in &ids {
        manager.task(id)?;
    }
    for &id in &ids {
        manager.delete_task(id)?;
    }
    save_manager(&manager)?;
    if !silent {
        for id in &ids { println!("Task {} removed.", id); }
    }
    Ok(())
}

/// Prints every field of the given tasks.
pub fn cmd_task_show(ids: Vec<u32>) -> Result<()> {
    let ids = unique_ids(ids);
    let manager = open_manager()?;
    for &id in &ids {
        manager.task(id)?;
    }
    let today = Local::now().date_naive();
    for id in ids {
        let task = manager.task(id)?;
        let status = manager.task_status(id)?.map_or("Pending", |r| r.as_str());
        let days_left = (task.due_date - today).num_days();

        let mut table = detail_table("Task", id);
        table.add_row(vec![Cell::new("Name"), Cell::new(&task.name)]);
        table.add_row(vec![Cell::new("Card"), card_label(&manager, task.card)]);
        table.add_row(vec![Cell::new("Due"), Cell::new(format!("{} ({}d)", task.due_date, days_left))]);
        table.add_row(vec![Cell::new("Hours"), Cell::new(format!("{:.1}", task.total_hours))]);
        table.add_row(vec![Cell::new("Unplaced"), Cell::new(format!("{:.1}", task.hours_remaining))]);
        table.add_row(vec![
            Cell::new("Status"),
            Cell::new(status).fg(if task.infeasible { TableColor::Red } else { TableColor::Reset }),
        ]);
        table.add_row(vec![Cell::new("Created"), Cell::new(&task.created_at)]);
        println!("{table}");
    }
    Ok(())
}

/// Lists pending tasks, earliest due first. `all` also shows the archive.
pub fn cmd_task_list(all: bool) -> Result<()> {
    let manager = open_manager()?;
    let today = Local::now().date_naive();
    let backlog = manager.backlog();
    let archive = manager.archive();
    if backlog.is_empty() && (!all || archive.is_empty()) {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = new_table();
    table.set_header(header(&["ID", "Name", "Card", "Due", "Time Left", "Hours", "Status"]));

    let mut rows: Vec<(&Task, Option<ArchiveReason>)> =
        backlog.into_iter().map(|t| (t, None)).collect();
    if all {
        rows.extend(archive.into_iter().map(|e| (&e.task, Some(e.reason))));
    }

    for (t, reason) in rows {
        let days_left = (t.due_date - today).num_days();
        let time_left_str = if days_left < 0 {
            format!("{}d overdue", days_left.abs())
        } else if days_left == 0 {
            "Today".to_string()
        } else {
            format!("{}d", days_left)
        };
        let status = reason.map_or("Pending", |r| r.as_str());
        let status_color = match reason {
            None => TableColor::Yellow,
            Some(ArchiveReason::Allocated) => TableColor::Green,
            Some(ArchiveReason::Infeasible) => TableColor::Red,
            Some(ArchiveReason::Expired) => TableColor::Grey,
        };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name),
            card_label(&manager, t.card),
            Cell::new(t.due_date),
            Cell::new(time_left_str).fg(if days_left < 0 { TableColor::Red } else { TableColor::Reset }),
            Cell::new(format!("{:.1}", t.total_hours)),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Adds a new card.
pub fn cmd_card_add(name: String, color: String, silent: bool) -> Result<()> {
    let color: Color = color.parse().map_err(PlannerError::InvalidArgument)?;
    let mut manager = open_manager()?;
    let id = manager.add_card(&name, color)?.id;
    save_manager(&manager)?;
    if !silent { println!("Added Card {}.", id); }
    Ok(())
}

pub fn cmd_card_edit(id: u32, name: Option<String>, color: Option<String>, silent: bool) -> Result<()> {
    let color = color
        .map(|c| c.parse::<Color>())
        .transpose()
        .map_err(PlannerError::InvalidArgument)?;
    let mut manager = open_manager()?;
    manager.modify_card(id, name.as_deref(), color)?;
    save_manager(&manager)?;
    if !silent { println!("Card {} updated.", id); }
    Ok(())
}

/// Removes cards; tasks that carried them lose their label.
pub fn cmd_card_remove(ids: Vec<u32>, silent: bool) -> Result<()> {
    let ids = unique_ids(ids);
    let mut manager = open_manager()?;
    for &id in &ids {
        manager.card(id)?;
    }
    for &id in &ids {
        manager.delete_card(id)?;
    }
    save_manager(&manager)?;
    if !silent {
        for id in &ids { println!("Card {} removed.", id); }
    }
    Ok(())
}

pub fn cmd_card_show(ids: Vec<u32>) -> Result<()> {
    let ids = unique_ids(ids);
    let manager = open_manager()?;
    for &id in &ids {
        manager.card(id)?;
    }
    for id in ids {
        let card = manager.card(id)?;
        let tasks = manager
            .backlog()
            .into_iter()
            .chain(manager.archive().into_iter().map(|e| &e.task))
            .filter(|t| t.card == Some(id))
            .count();

        let mut table = detail_table("Card", id);
        table.add_row(vec![Cell::new("Name"), Cell::new(&card.name)]);
        table.add_row(vec![Cell::new("Color"), Cell::new(card.color).fg(table_color(card.color))]);
        table.add_row(vec![Cell::new("Tasks"), Cell::new(tasks)]);
        println!("{table}");
    }
    Ok(())
}

pub fn cmd_card_list() -> Result<()> {
    let manager = open_manager()?;
    let cards = manager.cards();
    if cards.is_empty() {
        println!("No cards found.");
        return Ok(());
    }
    let mut table = new_table();
    table.set_header(header(&["ID", "Name", "Color"]));
    for c in cards {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(c.color).fg(table_color(c.color)),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Registers a fixed event.
///
/// With `days` the event repeats weekly on those days; otherwise it happens
/// once on `date` (today when omitted).
pub fn cmd_event_add(
    name: String,
    color: String,
    start: String,
    end: String,
    date: Option<String>,
    days: Option<String>,
    silent: bool,
) -> Result<()> {
    let color: Color = color.parse().map_err(PlannerError::InvalidArgument)?;
    let start = parse_time(&start)?;
    let end = parse_time(&end)?;
    let recurring = days.is_some();
    let weekdays = days.map(|d| parse_weekdays(&d)).transpose()?.unwrap_or_default();
    let on = match date {
        Some(d) => parse_date(&d)?,
        None => Local::now().date_naive(),
    };
    let span = TimeSpan::new(NaiveDateTime::new(on, start), NaiveDateTime::new(on, end));

    let mut manager = open_manager()?;
    let id = manager
        .add_event(NewEvent { name, color, span, recurring, weekdays })?
        .id;
    save_manager(&manager)?;
    if !silent { println!("Added Event {}.", id); }
    Ok(())
}

pub fn cmd_event_remove(ids: Vec<u32>, silent: bool) -> Result<()> {
    let ids = unique_ids(ids);
    let mut manager = open_manager()?;
    for &id in &ids {
        manager.event(id)?;
    }
    for &id in &ids {
        manager.delete_event(id)?;
    }
    save_manager(&manager)?;
    if !silent {
        for id in &ids { println!("Event {} removed.", id); }
    }
    Ok(())
}

fn event_when(event: &Event) -> String {
    match &event.recurrence {
        Recurrence::Once => event.span.date().to_string(),
        Recurrence::Weekly(days) => days.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(","),
    }
}

pub fn cmd_event_list() -> Result<()> {
    let manager = open_manager()?;
    let events = manager.events();
    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }
    let mut table = new_table();
    table.set_header(header(&["ID", "Name", "When", "Start", "End", "Hours"]));
    for e in events.iter() {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(&e.name).fg(table_color(e.color)),
            Cell::new(event_when(e)),
            Cell::new(e.span.start.format("%H:%M")),
            Cell::new(e.span.end.format("%H:%M")),
            Cell::new(format!("{:.2}", e.hours())),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_event_show(ids: Vec<u32>) -> Result<()> {
    let ids = unique_ids(ids);
    let manager = open_manager()?;
    for &id in &ids {
        manager.event(id)?;
    }
    for id in ids {
        let event = manager.event(id)?;
        let mut table = detail_table("Event", id);
        table.add_row(vec![Cell::new("Name"), Cell::new(&event.name).fg(table_color(event.color))]);
        table.add_row(vec![
            Cell::new("Repeats"),
            Cell::new(if event.is_recurring() { "weekly" } else { "once" }),
        ]);
        table.add_row(vec![Cell::new("When"), Cell::new(event_when(event))]);
        table.add_row(vec![Cell::new("Start"), Cell::new(event.span.start.format("%H:%M"))]);
        table.add_row(vec![Cell::new("End"), Cell::new(event.span.end.format("%H:%M"))]);
        table.add_row(vec![Cell::new("Hours"), Cell::new(format!("{:.2}", event.hours()))]);
        println!("{table}");
    }
    Ok(())
}

/// Overrides (or with `clear`, restores) the capacity of one date.
pub fn cmd_hours(date: String, hours: Option<f64>, clear: bool, silent: bool) -> Result<()> {
    let date = parse_due(&date, Local::now().date_naive())?;
    let mut manager = open_manager()?;
    match (clear, hours) {
        (true, _) => {
            manager.clear_custom_hours(date);
            if !silent { println!("Custom hours for {} cleared.", date); }
        }
        (false, Some(h)) => {
            manager.set_custom_hours(date, h)?;
            if !silent { println!("{} set to {:.1}h.", date, h); }
        }
        (false, None) => {
            match manager.custom_hours().get(&date) {
                Some(h) => println!("{}: {:.1}h (custom)", date, h),
                None => println!("{}: no custom hours", date),
            }
            return Ok(());
        }
    }
    save_manager(&manager)?;
    Ok(())
}

/// Rebuilds the schedule from today and saves the resulting backlog and archive.
pub fn cmd_build(silent: bool) -> Result<()> {
    let mut manager = open_manager()?;
    if manager.num_active_tasks() == 0 {
        if !silent { println!("No active Tasks to schedule"); }
        return Ok(());
    }
    let summary = manager.build_schedule();
    save_manager(&manager)?;
    if !silent {
        println!(
            "Schedule built: {} day(s), {} task(s) still pending.",
            summary.days, summary.pending
        );
        if summary.infeasible > 0 {
            println!("{} task(s) cannot meet their due date:", summary.infeasible);
            for t in manager.overflowed_tasks() {
                println!("  {} {} (due {}, {:.1}h unplaced)", t.id, t.name, t.due_date, t.hours_remaining);
            }
        }
    }
    Ok(())
}

/// Builds and prints the day-by-day schedule.
pub fn cmd_sched() -> Result<()> {
    let mut manager = open_manager()?;
    manager.build_schedule();
    save_manager(&manager)?;
    if manager.schedule_is_empty() {
        println!("Schedule is empty...");
        return Ok(());
    }

    let mut table = new_table();
    table.set_header(header(&["Day", "Date", "Work", "Events", "Filled", "Capacity"]));
    for day in manager.schedule() {
        let work: Vec<String> = day
            .subtasks()
            .iter()
            .map(|s| {
                let name = manager.task(s.task_id).map(|t| t.name.as_str()).unwrap_or("(deleted)");
                let flag = if s.overflow { " OVERFLOW" } else { "" };
                format!("{} {:.1}h{}", name, s.hours, flag)
            })
            .collect();
        let events: Vec<String> = day
            .events()
            .iter()
            .map(|e| format!("{} {}-{}", e.name, e.span.start.format("%H:%M"), e.span.end.format("%H:%M")))
            .collect();
        let filled = Cell::new(format!("{:.1}", day.size()))
            .fg(if day.has_overflow() { TableColor::Red } else { TableColor::Reset });
        table.add_row(vec![
            Cell::new(day.id()),
            Cell::new(day.date().format("%a %Y-%m-%d")),
            Cell::new(work.join("\n")),
            Cell::new(events.join("\n")),
            filled,
            Cell::new(format!("{:.1}", day.usable_capacity().max(0.0))),
        ]);
    }
    println!("{table}");
    if manager.infeasible_count() > 0 {
        println!("{} task(s) cannot meet their due date.", manager.infeasible_count());
    }
    Ok(())
}

/// Lists every subtask of the current schedule, one row per fragment.
pub fn cmd_subtask() -> Result<()> {
    let mut manager = open_manager()?;
    manager.build_schedule();
    save_manager(&manager)?;
    let mut table = new_table();
    table.set_header(header(&["Date", "Task", "Name", "Hours", "Due", "Overflow"]));
    let mut any = false;
    for day in manager.schedule() {
        for s in day.subtasks() {
            any = true;
            let task = manager.task(s.task_id).ok();
            table.add_row(vec![
                Cell::new(day.date()),
                Cell::new(s.task_id),
                Cell::new(task.map(|t| t.name.as_str()).unwrap_or("(deleted)")),
                Cell::new(format!("{:.1}", s.hours)),
                Cell::new(task.map(|t| t.due_date.to_string()).unwrap_or_default()),
                Cell::new(if s.overflow { "yes" } else { "" }).fg(TableColor::Red),
            ]);
        }
    }
    if any {
        println!("{table}");
    } else {
        println!("No subtasks scheduled.");
    }
    Ok(())
}

/// Resets the database by deleting all tasks, cards and events.
pub fn cmd_reset(force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks, cards and events? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    delete_database()?;
    println!("Database reset successfully.");
    Ok(())
}

/// Replaces the planner database with the state saved in `path`.
pub fn cmd_import(path: &Path, silent: bool) -> Result<()> {
    if !path.is_file() {
        return Err(PlannerError::invalid(format!("{} is not a file", path.display())));
    }
    let config = UserConfig::load()?;
    let state = load_state_from(path)?;
    let manager = ScheduleManager::from_state(config, state);
    save_manager(&manager)?;
    tracing::info!(path = %path.display(), tasks = manager.num_tasks(), "state imported");
    if !silent {
        println!(
            "Imported {} task(s), {} card(s) and {} event(s) from {}.",
            manager.num_tasks(),
            manager.cards().len(),
            manager.events().len(),
            path.display()
        );
    }
    Ok(())
}

/// Writes the planner database to `path` in the same JSON format.
pub fn cmd_export(path: &Path, silent: bool) -> Result<()> {
    let manager = open_manager()?;
    save_state_to(path, &manager.to_state())?;
    if !silent { println!("Exported {} task(s) to {}.", manager.num_tasks(), path.display()); }
    Ok(())
}

/// Prints the configuration in effect and where it was read from.
pub fn cmd_config() -> Result<()> {
    let path = config_path();
    let config = UserConfig::load()?;
    if path.exists() {
        println!("Configuration: {}", path.display());
    } else {
        println!("Configuration: {} (not found, using defaults)", path.display());
    }

    let mut table = new_table();
    table.set_header(header(&["Setting", "Value"]));
    table.add_row(vec![Cell::new("max_days"), Cell::new(config.max_days)]);
    table.add_row(vec![Cell::new("archive_days"), Cell::new(config.archive_days)]);
    for (day, hours) in config.hours.entries() {
        table.add_row(vec![Cell::new(format!("hours.{}", day)), Cell::new(format!("{:.1}", hours))]);
    }
    println!("{table}");
    Ok(())
}

/// Rebuilds and prints backlog, archive and schedule totals.
pub fn cmd_report() -> Result<()> {
    let mut manager = open_manager()?;
    manager.build_schedule();
    save_manager(&manager)?;
    let report = manager.report();

    let mut table = new_table();
    table.set_header(header(&["Item", "Count"]));
    table.add_row(vec![Cell::new("Pending tasks"), Cell::new(report.pending)]);
    table.add_row(vec![Cell::new("Scheduled tasks"), Cell::new(report.scheduled)]);
    table.add_row(vec![
        Cell::new("Infeasible tasks"),
        Cell::new(report.infeasible).fg(if report.infeasible > 0 { TableColor::Red } else { TableColor::Reset }),
    ]);
    table.add_row(vec![Cell::new("Expired tasks"), Cell::new(report.expired)]);
    table.add_row(vec![Cell::new("Cards"), Cell::new(report.cards)]);
    table.add_row(vec![Cell::new("Events"), Cell::new(report.events)]);
    table.add_row(vec![Cell::new("Days planned"), Cell::new(report.days)]);
    table.add_row(vec![Cell::new("Hours planned"), Cell::new(format!("{:.1}", report.planned_hours))]);
    table.add_row(vec![Cell::new("Overflow hours"), Cell::new(format!("{:.1}", report.overflow_hours))]);
    println!("{table}");
    Ok(())
}
