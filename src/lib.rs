mod ratelimit;
mod requests;

pub mod browser;
pub mod config;
pub mod course_search_scraper;
pub mod date_parser;
pub mod error;
pub mod models;
pub mod moment_parser;
pub mod scraping_context;
pub mod text_manipulators;
pub mod week_scraper;

pub use browser::{Browser, HttpBrowser, StaticPages};
pub use config::{CatalogConfig, ScrapingConfig};
pub use course_search_scraper::CourseSearchScraper;
pub use error::ScrapeError;
pub use models::{CourseHit, CourseMoment, EventDetails, WeekWindow};
pub use requests::RequestClient;
pub use scraping_context::ScrapingContext;
pub use week_scraper::WeekScraper;
