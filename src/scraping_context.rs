use chrono::NaiveDate;
use log::info;

use crate::{
    browser::{Browser, HttpBrowser},
    config::{CatalogConfig, ScrapingConfig},
    course_search_scraper::CourseSearchScraper,
    error::ScrapeError,
    models::CourseMoment,
    requests::RequestClient,
    week_scraper::WeekScraper,
};

/// Owns the catalog settings and the browser both scrapers share.
pub struct ScrapingContext<B> {
    pub catalog: CatalogConfig,
    pub browser: B,
}

impl ScrapingContext<HttpBrowser> {
    /// Context over plain HTTP, configured from the environment.
    pub fn new() -> anyhow::Result<Self> {
        let scraping_config = ScrapingConfig::new()?;
        let request_client = RequestClient::new(
            scraping_config.request_timeout,
            scraping_config.max_redirects,
        )?;
        let browser = HttpBrowser::new(
            request_client,
            scraping_config.max_redirects,
            scraping_config.js_settle,
        );
        Ok(Self::with_browser(scraping_config.catalog, browser))
    }
}

impl<B: Browser> ScrapingContext<B> {
    pub fn with_browser(catalog: CatalogConfig, browser: B) -> Self {
        Self { catalog, browser }
    }

    pub fn course_search_scraper(&mut self) -> CourseSearchScraper<'_, B> {
        CourseSearchScraper::new(&self.catalog, &mut self.browser)
    }

    pub fn week_scraper(&mut self) -> WeekScraper<'_, B> {
        WeekScraper::new(&mut self.browser)
    }

    /// Resolves `query` and extracts the moments of the week around `week_date`.
    pub async fn course_moments_for_query(
        &mut self,
        query: &str,
        week_date: NaiveDate,
    ) -> Result<(String, Vec<CourseMoment>), ScrapeError> {
        let course_url = self.course_search_scraper().course_url(query).await?;
        let moments = self
            .week_scraper()
            .course_moments(&course_url, week_date)
            .await?;
        info!("{} moments for {query:?} around {week_date}", moments.len());
        Ok((course_url, moments))
    }
}
