use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use chrono::Local;
use crate::models::Color as LabelColor;
use super::app::{App, InputMode, ScheduleRow, ViewMode};

fn label_style(color: LabelColor) -> Style {
    let (r, g, b) = color.rgb();
    Style::default().fg(Color::Rgb(r, g, b))
}

fn header_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn highlight_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray)
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    match app.view_mode {
        ViewMode::Schedule => {
            let rows: Vec<Row> = app
                .schedule_rows
                .iter()
                .map(|r| match r {
                    ScheduleRow::Day { date, filled, capacity, overflow } => {
                        let style = if *overflow {
                            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                        };
                        Row::new(vec![
                            Cell::from(date.format("%a %Y-%m-%d").to_string()),
                            Cell::from(""),
                            Cell::from(format!("{:.1}/{:.1}", filled, capacity)),
                            Cell::from(""),
                        ]).style(style)
                    }
                    ScheduleRow::Event { name, color, start, end } => Row::new(vec![
                        Cell::from(format!("  {}", name)),
                        Cell::from("event"),
                        Cell::from(format!("{}-{}", start, end)),
                        Cell::from(""),
                    ]).style(label_style(*color)),
                    ScheduleRow::Work { name, hours, due, overflow } => {
                        let style = if *overflow {
                            Style::default().fg(Color::Red)
                        } else {
                            Style::default()
                        };
                        Row::new(vec![
                            Cell::from(format!("  {}", name)),
                            Cell::from(if *overflow { "overflow" } else { "task" }),
                            Cell::from(format!("{:.1}h", hours)),
                            Cell::from(due.map(|d| d.to_string()).unwrap_or_default()),
                        ]).style(style)
                    }
                })
                .collect();

            let widths = [
                Constraint::Min(24),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(12),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Day / Item", "Kind", "Hours", "Due"])
                    .style(header_style())
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("dayplan - Schedule"))
                .row_highlight_style(highlight_style())
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.schedule_state);
        }
        ViewMode::Tasks => {
            let today = Local::now().date_naive();

            let rows: Vec<Row> = app
                .task_rows
                .iter()
                .map(|t| {
                    let days_left = (t.due - today).num_days();
                    let time_left_str = if days_left < 0 {
                        format!("{}d overdue", days_left.abs())
                    } else if days_left == 0 {
                        "Today".to_string()
                    } else {
                        format!("{}d", days_left)
                    };

                    let style = match t.status {
                        "Infeasible" | "Expired" => Style::default().fg(Color::Red),
                        "Pending" => Style::default().fg(Color::Yellow),
                        _ => Style::default().fg(Color::Green),
                    };
                    let card = match &t.card {
                        Some((name, color)) => Cell::from(name.clone()).style(label_style(*color)),
                        None => Cell::from(""),
                    };

                    Row::new(vec![
                        Cell::from(t.id.to_string()),
                        Cell::from(t.name.clone()),
                        card,
                        Cell::from(t.due.to_string()),
                        Cell::from(time_left_str),
                        Cell::from(format!("{:.1}", t.hours)),
                        Cell::from(t.status),
                    ]).style(style)
                })
                .collect();

            let widths = [
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(6),
                Constraint::Length(10),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["ID", "Name", "Card", "Due", "Time Left", "Hours", "Status"])
                    .style(header_style())
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("dayplan - Tasks"))
                .row_highlight_style(highlight_style())
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.task_state);
        }
        ViewMode::Cards => {
            let rows: Vec<Row> = app
                .card_rows
                .iter()
                .map(|c| {
                    Row::new(vec![
                        Cell::from(c.id.to_string()),
                        Cell::from(c.name.clone()).style(label_style(c.color)),
                        Cell::from(c.color.as_str()),
                    ])
                })
                .collect();

            let widths = [
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(14),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["ID", "Name", "Color"])
                    .style(header_style())
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("dayplan - Cards"))
                .row_highlight_style(highlight_style())
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.card_state);
        }
    }

    let keys = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Schedule => "q: Quit | v: View | b: Build | j/k: Move",
            ViewMode::Tasks => "q: Quit | v: View | b: Build | a: Add | d: Del | j/k: Move",
            ViewMode::Cards => "q: Quit | v: View | b: Build | d: Del | j/k: Move",
        },
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };
    let help_text = if app.status.is_empty() {
        keys.to_string()
    } else {
        format!("{}  ::  {}", keys, app.status)
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[1]);

    if app.input_mode == InputMode::Adding {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.add_state.step {
            0 => "Add Task: Enter Name",
            1 => "Add Task: Enter Due Date (YYYY-MM-DD, tmrw, fri)",
            2 => "Add Task: Enter Hours",
            _ => "Add Task",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
