// due.rs
//
// Due-date input for the form. Everything resolves to a calendar day
// relative to `today`; the result is handed on as `YYYY-MM-DD`.

use crate::error::Error;
use chrono::{Datelike, Duration as Dur, NaiveDate, Weekday};

/// Parses what the user typed into the due-date field.
///
/// Accepts `YYYY-MM-DD`, `MM-DD` (this year), `today`, `tomorrow`/`tmr`,
/// a weekday name (the next one after today), `next <weekday>`,
/// `this <weekday>`, `week`/`next week`, `N days|weeks` and
/// `in N days|weeks`. Empty input means no due date.
pub fn parse_due_date(input: &str, today: NaiveDate) -> Result<Option<NaiveDate>, Error> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return Ok(None);
    }

    let words: Vec<&str> = input.split_whitespace().collect();

    let date = match words.as_slice() {
        ["today"] => Some(today),
        ["tomorrow"] | ["tmr"] => today.succ_opt(),

        [day] if is_weekday(day) => weekday_after(day, today, 0),
        ["next", day] if is_weekday(day) => weekday_after(day, today, 7),
        ["this", day] if is_weekday(day) => this_week(day, today),

        ["week"] | ["next", "week"] => today.checked_add_signed(Dur::days(7)),

        ["in", num, unit] | [num, unit] => offset(num, unit).and_then(|d| today.checked_add_signed(d)),

        [date] => parse_date(date, today),

        _ => None,
    };

    date.map(Some).ok_or_else(|| {
        Error::Validation(format!(
            "Unrecognized due date '{}'. Try YYYY-MM-DD, tomorrow, friday or in 3 days",
            input
        ))
    })
}

/// The day as the form field shows it.
pub fn format_due_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn is_weekday(s: &str) -> bool {
    parse_weekday_name(s).is_some()
}

fn parse_weekday_name(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn days_from_monday(day: Weekday) -> i64 {
    i64::from(day.num_days_from_monday())
}

// Next occurrence strictly after today, pushed `extra` days further.
fn weekday_after(day: &str, today: NaiveDate, extra: i64) -> Option<NaiveDate> {
    let target = parse_weekday_name(day)?;
    let mut days = days_from_monday(target) - days_from_monday(today.weekday());
    if days <= 0 {
        days += 7;
    }
    today.checked_add_signed(Dur::days(days + extra))
}

// Same calendar week; a day already past this week means today.
fn this_week(day: &str, today: NaiveDate) -> Option<NaiveDate> {
    let target = parse_weekday_name(day)?;
    let days = days_from_monday(target) - days_from_monday(today.weekday());
    today.checked_add_signed(Dur::days(days.max(0)))
}

// None for unknown units and for counts chrono cannot represent.
fn offset(num: &str, unit: &str) -> Option<Dur> {
    let n: i64 = num.parse().ok().filter(|n| *n >= 0)?;
    let days = match unit {
        "day" | "days" | "d" => n,
        "week" | "weeks" | "w" => n.checked_mul(7)?,
        _ => return None,
    };
    Dur::try_days(days)
}

fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-{}", today.year(), input), "%Y-%m-%d"))
        .ok()
}
