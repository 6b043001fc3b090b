//! Extracts the course moments of one calendar week from the catalog's
//! week view.
//!
//! The course-detail page links to the schedule through a `javascript:`
//! wrapper. Behind it sits a grid with one column per day: each column has a
//! `.menu` header carrying the (Dutch) date and one `.event` cell per
//! occurrence, whose `onmouseover` payload holds time and description.

use std::sync::LazyLock;

use chrono::NaiveDate;
use log::{debug, info};
use scraper::{ElementRef, Html, Selector};

use crate::{
    browser::Browser,
    date_parser::parse_date,
    error::ScrapeError,
    models::{CourseMoment, WeekWindow},
    moment_parser::parse_course_moment,
    text_manipulators::{extract_text, first_href, get_html_link_to_page, schedule_url},
};

static CONTENT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#content").unwrap());
static DURATION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.duur").unwrap());
static DAY_COLUMN_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[align="middle"]"#).unwrap());
static DAY_HEADER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".menu").unwrap());
static EVENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".event").unwrap());

const EVENT_PAYLOAD_ATTR: &str = "onmouseover";

pub struct WeekScraper<'a, B> {
    pub browser: &'a mut B,
}

impl<'a, B: Browser> WeekScraper<'a, B> {
    pub fn new(browser: &'a mut B) -> Self {
        Self { browser }
    }

    /// All moments of the Monday to Sunday week containing `week_date`, in
    /// day order.
    pub async fn course_moments(
        &mut self,
        course_url: &str,
        week_date: NaiveDate,
    ) -> Result<Vec<CourseMoment>, ScrapeError> {
        let week_html = self.course_html_at_week(course_url).await?;
        moments_in_markup(&week_html, week_date)
    }

    /// Direct URL of the week view linked from a course-detail page.
    pub async fn course_schedule_url(&mut self, course_url: &str) -> Result<String, ScrapeError> {
        let html = self.browser.fetch(course_url).await?;
        let href = schedule_href(&html)?;
        let url = get_html_link_to_page(course_url, &schedule_url(&href)?)?;
        debug!("Schedule of {course_url} is at {url}");
        Ok(url)
    }

    async fn course_html_at_week(&mut self, course_url: &str) -> Result<String, ScrapeError> {
        let schedule_url = self.course_schedule_url(course_url).await?;
        self.browser.wait_for_redirection(&schedule_url).await?;
        self.browser.page_source()
    }
}

/// The raw (possibly script-wrapped) schedule link of a course-detail page.
pub fn schedule_href(html: &str) -> Result<String, ScrapeError> {
    let document = Html::parse_document(html);
    let content = document
        .select(&CONTENT_SELECTOR)
        .next()
        .ok_or_else(|| ScrapeError::parse("course page has no div#content"))?;
    let duration = content
        .select(&DURATION_SELECTOR)
        .next()
        .ok_or_else(|| ScrapeError::parse("course page has no span.duur"))?;
    first_href(duration)
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::parse("span.duur holds no schedule link"))
}

/// Runs the per-day extraction over week-view markup that is already at hand.
pub fn moments_in_markup(
    week_html: &str,
    week_date: NaiveDate,
) -> Result<Vec<CourseMoment>, ScrapeError> {
    let window = WeekWindow::containing(week_date);
    let document = Html::parse_document(week_html);

    let mut moments = vec![];
    for day in window.days() {
        let day_moments = moments_for_day(&document, day)?;
        debug!("{} moments on {day}", day_moments.len());
        moments.extend(day_moments);
    }

    info!(
        "Found {} moments in week {} - {}",
        moments.len(),
        window.start,
        window.end
    );
    Ok(moments)
}

/// Events of the first column whose header decodes to `day`. A week view
/// without such a column (weekends are often left out) yields nothing.
fn moments_for_day(document: &Html, day: NaiveDate) -> Result<Vec<CourseMoment>, ScrapeError> {
    let wanted = day_key(day);
    for column in document.select(&DAY_COLUMN_SELECTOR) {
        let Some(header) = column.select(&DAY_HEADER_SELECTOR).next() else {
            continue;
        };
        let header_date = parse_date(&extract_text(header), day)?;
        if day_key(header_date.date()) != wanted {
            continue;
        }

        return column
            .select(&EVENT_SELECTOR)
            .map(|event| event_moment(event, day))
            .collect();
    }
    Ok(vec![])
}

fn event_moment(event: ElementRef, day: NaiveDate) -> Result<CourseMoment, ScrapeError> {
    let payload = event.value().attr(EVENT_PAYLOAD_ATTR).ok_or_else(|| {
        ScrapeError::parse(format!("event cell on {day} has no {EVENT_PAYLOAD_ATTR} payload"))
    })?;
    Ok(parse_course_moment(payload)?.on(day))
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
