use anyhow::Context;
use chrono::{Local, NaiveDate};
use dotenv::dotenv;
use std::env;

extern crate env_logger;
extern crate log;

use log::LevelFilter;

use log::info;

use weekrooster::ScrapingContext;

const USAGE: &str = "usage: weekrooster <course query> [YYYY-MM-DD]";

fn parse_args() -> anyhow::Result<(String, NaiveDate)> {
    let mut args = env::args().skip(1);
    let query = args.next().context(USAGE)?;
    let week_date = match args.next() {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("invalid date {date:?}; {USAGE}"))?,
        None => Local::now().date_naive(),
    };
    Ok((query, week_date))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let (query, week_date) = parse_args()?;
    let mut context = ScrapingContext::new()?;

    let (course_url, moments) = context
        .course_moments_for_query(&query, week_date)
        .await
        .with_context(|| format!("failed to scrape the week of {week_date} for {query:?}"))?;
    info!("Course page: {course_url}");

    println!("{}", serde_json::to_string_pretty(&moments)?);
    Ok(())
}
