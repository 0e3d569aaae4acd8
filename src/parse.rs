//! Parsers for the date, time and weekday arguments accepted on the command line.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

use crate::error::{PlannerError, Result};

fn parse_weekday_name(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "sun" | "sunday" => Some(Weekday::Sun),
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}

/// Next date falling on `day`, counting `today` itself.
fn next_weekday(today: NaiveDate, day: Weekday) -> NaiveDate {
    let ahead = (7 + day.num_days_from_sunday() - today.weekday().num_days_from_sunday()) % 7;
    today + Duration::days(i64::from(ahead))
}

/// Parses a due date relative to `today`.
///
/// Accepts `YYYY-MM-DD`, `eod` (today), `tmrw`, `eow` (the coming Saturday)
/// and weekday names, which resolve to their next occurrence including today.
pub fn parse_due(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = s.trim();
    match trimmed.to_lowercase().as_str() {
        "eod" | "today" => return Ok(today),
        "tmrw" | "tomorrow" => return Ok(today + Duration::days(1)),
        "eow" => return Ok(next_weekday(today, Weekday::Sat)),
        _ => {}
    }
    if let Some(day) = parse_weekday_name(trimmed) {
        return Ok(next_weekday(today, day));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|e| {
        PlannerError::invalid(format!("invalid due date '{}': {}. Use YYYY-MM-DD", trimmed, e))
    })
}

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| PlannerError::invalid(format!("invalid date '{}': {}. Use YYYY-MM-DD", s.trim(), e)))
}

/// Parses a time of day: `HH:MM` (24-hour), `9am`, `9:30pm`.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let lower = s.trim().to_lowercase();
    let invalid = || PlannerError::invalid(format!("invalid time '{}'. Use HH:MM, 9am or 9:30pm", s.trim()));

    let (body, meridiem) = if let Some(b) = lower.strip_suffix("am") {
        (b, Some(false))
    } else if let Some(b) = lower.strip_suffix("pm") {
        (b, Some(true))
    } else {
        (lower.as_str(), None)
    };

    let (hour_str, minute_str) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None => (body, "0"),
    };
    if hour_str.is_empty() || minute_str.is_empty() {
        return Err(invalid());
    }
    let mut hour: u32 = hour_str.parse().map_err(|_| invalid())?;
    let minute: u32 = minute_str.parse().map_err(|_| invalid())?;

    if let Some(pm) = meridiem {
        if !(1..=12).contains(&hour) {
            return Err(invalid());
        }
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
    } else if !body.contains(':') {
        // a bare number without am/pm is ambiguous
        return Err(invalid());
    }

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Parses a comma separated weekday list such as `mon,wed,fri`.
pub fn parse_weekdays(s: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = parse_weekday_name(part)
            .ok_or_else(|| PlannerError::invalid(format!("unknown weekday '{}'", part)))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        return Err(PlannerError::invalid("weekday list is empty"));
    }
    Ok(days)
}
