//! Decoder for the `onmouseover` payload of the week view's event cells.
//!
//! A payload looks like
//! `return overlib('<b>08:30 - 10:30</b><br>200A 00.144<br>Hoorcollege', CAPTION, 'Analyse')`:
//! a script call whose first string argument is a small HTML snippet. One of
//! its lines holds the time range, the others describe the activity.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::{error::ScrapeError, models::EventDetails, text_manipulators::first_string_argument};

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[:.hu](\d{2})\s*(?:-|–|tot)\s*(\d{1,2})[:.hu](\d{2})").unwrap()
});
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

pub fn parse_course_moment(payload: &str) -> Result<EventDetails, ScrapeError> {
    let snippet = first_string_argument(payload).ok_or_else(|| {
        ScrapeError::parse(format!("event payload is not a script call: {payload:?}"))
    })?;

    let lines: Vec<String> = LINE_BREAK
        .split(&snippet)
        .map(|line| {
            TAG.replace_all(line, " ")
                .replace("&nbsp;", " ")
                .replace('\u{a0}', " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let (index, caps) = lines
        .iter()
        .enumerate()
        .find_map(|(index, line)| TIME_RANGE.captures(line).map(|caps| (index, caps)))
        .ok_or_else(|| ScrapeError::parse(format!("no time range in event payload {payload:?}")))?;

    let start = time_from(&caps[1], &caps[2])?;
    // Late events are written to end at `24:00`, which is midnight of the next day.
    let end = match (&caps[3], &caps[4]) {
        ("24", "00") => NaiveTime::MIN,
        (hour, minute) => time_from(hour, minute)?,
    };
    if end < start && end != NaiveTime::MIN {
        return Err(ScrapeError::parse(format!(
            "event ends before it starts: {start} - {end}"
        )));
    }

    // Whatever shares the line with the time range is description too.
    let remainder = TIME_RANGE.replace(&lines[index], "").trim().to_string();
    let descriptor = lines
        .iter()
        .enumerate()
        .map(|(i, line)| if i == index { remainder.as_str() } else { line.as_str() })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(EventDetails {
        start,
        end,
        descriptor,
    })
}

fn time_from(hour: &str, minute: &str) -> Result<NaiveTime, ScrapeError> {
    let invalid = || ScrapeError::parse(format!("invalid time {hour}:{minute} in event payload"));
    let hour = hour.parse().map_err(|_| invalid())?;
    let minute = minute.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}
