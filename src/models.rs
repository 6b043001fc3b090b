use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::Serialize;

/// One scheduled occurrence of a course activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseMoment {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub descriptor: String,
}

/// What an event cell's payload carries: everything but the date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub descriptor: String,
}

impl EventDetails {
    /// Dates the event with the day of the column it was found in.
    pub fn on(self, date: NaiveDate) -> CourseMoment {
        CourseMoment {
            date,
            start: self.start,
            end: self.end,
            descriptor: self.descriptor,
        }
    }
}

/// A single entry of the catalog's search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseHit {
    pub title: String,
    pub url: String,
}

/// Monday to Sunday, inclusive, around some date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn containing(date: NaiveDate) -> Self {
        let offset = u64::from(date.weekday().num_days_from_monday());
        let start = date - Days::new(offset);
        Self {
            start,
            end: start + Days::new(6),
        }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(7)
    }
}
