//! Decoder for the free-text dates in the week view's column headers.
//!
//! The catalog writes headers in Dutch, usually as `maandag 5 oktober`, and
//! often leaves the year out. Numeric (`05/10/2015`, `5.10`) and ISO
//! (`2015-10-05`) dates are accepted too, optionally followed by a time of day
//! (`08:30`, `8u30`).

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

use crate::error::ScrapeError;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());
static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[./-](\d{1,2})(?:[./-](\d{4}|\d{2}))?\b").unwrap()
});
static TEXTUAL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s+([a-z]+)\.?(?:\s+(\d{4}))?").unwrap());
static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[:u](\d{2})\b").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]+").unwrap());

const WEEKDAYS: [(&str, &str, Weekday); 7] = [
    ("maandag", "ma", Weekday::Mon),
    ("dinsdag", "di", Weekday::Tue),
    ("woensdag", "wo", Weekday::Wed),
    ("donderdag", "do", Weekday::Thu),
    ("vrijdag", "vr", Weekday::Fri),
    ("zaterdag", "za", Weekday::Sat),
    ("zondag", "zo", Weekday::Sun),
];

fn month_number(word: &str) -> Option<u32> {
    let month = match word {
        "januari" | "jan" => 1,
        "februari" | "feb" => 2,
        "maart" | "mrt" | "maa" => 3,
        "april" | "apr" => 4,
        "mei" => 5,
        "juni" | "jun" => 6,
        "juli" | "jul" => 7,
        "augustus" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "oktober" | "okt" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_named_in(text: &str) -> Option<Weekday> {
    WORD.find_iter(text).find_map(|word| {
        WEEKDAYS
            .iter()
            .find(|(full, short, _)| word.as_str() == *full || word.as_str() == *short)
            .map(|(_, _, weekday)| *weekday)
    })
}

/// Decodes a header like `maandag 5 oktober` into a date and time.
///
/// `reference` fills in a missing year: the candidate year whose weekday agrees
/// with the weekday named in the text wins, ties go to the date closest to the
/// reference. Headers without a time of day decode to midnight.
pub fn parse_date(text: &str, reference: NaiveDate) -> Result<NaiveDateTime, ScrapeError> {
    let format_error = || ScrapeError::DateFormat {
        text: text.to_string(),
    };

    let lowered = text.replace('\u{a0}', " ").to_lowercase();

    let mut time = NaiveTime::MIN;
    let mut rest = lowered.clone();
    if let Some(caps) = TIME_OF_DAY.captures(&lowered) {
        let hour = caps[1].parse().map_err(|_| format_error())?;
        let minute = caps[2].parse().map_err(|_| format_error())?;
        time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(format_error)?;
        rest.replace_range(caps.get(0).map_or(0..0, |m| m.range()), " ");
    }

    let (day, month, year) = date_parts(&rest).ok_or_else(format_error)?;

    let date = match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => infer_year(day, month, weekday_named_in(&rest), reference),
    }
    .ok_or_else(format_error)?;

    Ok(date.and_time(time))
}

/// Day, month and (if written) year, in the first format that matches.
fn date_parts(text: &str) -> Option<(u32, u32, Option<i32>)> {
    if let Some(caps) = ISO_DATE.captures(text) {
        return Some((
            caps[3].parse().ok()?,
            caps[2].parse().ok()?,
            Some(caps[1].parse().ok()?),
        ));
    }

    if let Some(caps) = NUMERIC_DATE.captures(text) {
        let year = match caps.get(3) {
            Some(year) => Some(expand_year(year.as_str())?),
            None => None,
        };
        return Some((caps[1].parse().ok()?, caps[2].parse().ok()?, year));
    }

    TEXTUAL_DATE.captures_iter(text).find_map(|caps| {
        let month = month_number(&caps[2])?;
        let year = match caps.get(3) {
            Some(year) => Some(year.as_str().parse().ok()?),
            None => None,
        };
        Some((caps[1].parse().ok()?, month, year))
    })
}

fn expand_year(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    Some(if digits.len() == 2 { 2000 + year } else { year })
}

fn infer_year(
    day: u32,
    month: u32,
    weekday: Option<Weekday>,
    reference: NaiveDate,
) -> Option<NaiveDate> {
    (reference.year() - 1..=reference.year() + 1)
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .min_by_key(|candidate| {
            let weekday_mismatch = weekday.is_some_and(|weekday| candidate.weekday() != weekday);
            let distance = (*candidate - reference).num_days().abs();
            (weekday_mismatch, distance)
        })
}
