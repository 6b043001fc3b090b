use std::sync::LazyLock;

use log::{info, warn};
use scraper::{Html, Selector};
use url::{Url, form_urlencoded};

use crate::{
    browser::Browser,
    config::CatalogConfig,
    error::ScrapeError,
    models::CourseHit,
    text_manipulators::{extract_text, first_href, get_html_link_to_page},
};

static RESULTS_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#results").unwrap());
static HIT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".search-result").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".title").unwrap());

/// Search page URL for `query`. The catalog's client-side router reads the
/// parameters from the fragment and rejects `+` for spaces, hence `%20`.
pub fn course_query_url(catalog: &CatalogConfig, query: &str) -> Result<String, ScrapeError> {
    let mut url = Url::parse(&catalog.base_url)?.join(&catalog.search_path)?;
    let params = form_urlencoded::Serializer::new(String::new())
        .append_pair("q", query)
        .append_pair("idx", "ALL")
        .append_pair("jaar", &catalog.year.to_string())
        .append_pair("isvertaling", "0")
        .finish()
        // The serializer writes spaces as `+` and a literal `+` as `%2B`.
        .replace('+', "%20");
    url.set_fragment(Some(&format!("/?{params}")));
    Ok(url.to_string())
}

/// Resolves free-text queries to course-detail pages.
pub struct CourseSearchScraper<'a, B> {
    pub catalog: &'a CatalogConfig,
    pub browser: &'a mut B,
}

impl<'a, B: Browser> CourseSearchScraper<'a, B> {
    pub fn new(catalog: &'a CatalogConfig, browser: &'a mut B) -> Self {
        Self { catalog, browser }
    }

    async fn results_page(&mut self, query: &str) -> Result<String, ScrapeError> {
        let query_url = course_query_url(self.catalog, query)?;
        info!("Searching catalog for {query:?}: {query_url}");
        // The result list is filled in by script after the page loads.
        self.browser.wait_for_js(&query_url).await?;
        self.browser.page_source()
    }

    /// URL of the first search result's course-detail page.
    pub async fn course_url(&mut self, query: &str) -> Result<String, ScrapeError> {
        let html = self.results_page(query).await?;
        let url = first_search_result(&html, &self.catalog.base_url, query)?;
        info!("Resolved {query:?} to {url}");
        Ok(url)
    }

    /// Every search result with a title link, in page order.
    pub async fn search(&mut self, query: &str) -> Result<Vec<CourseHit>, ScrapeError> {
        let html = self.results_page(query).await?;
        parse_search_results(&html, &self.catalog.base_url, query)
    }
}

fn results_container(document: &Html) -> Result<scraper::ElementRef<'_>, ScrapeError> {
    document
        .select(&RESULTS_SELECTOR)
        .next()
        .ok_or_else(|| ScrapeError::parse("search page has no div#results"))
}

pub fn first_search_result(html: &str, base_url: &str, query: &str) -> Result<String, ScrapeError> {
    let document = Html::parse_document(html);
    let hit = results_container(&document)?
        .select(&HIT_SELECTOR)
        .next()
        .ok_or_else(|| ScrapeError::NotFound {
            query: query.to_string(),
        })?;
    let href = hit
        .select(&TITLE_SELECTOR)
        .next()
        .and_then(first_href)
        .ok_or_else(|| ScrapeError::parse("first search result has no title link"))?;
    get_html_link_to_page(base_url, href)
}

pub fn parse_search_results(
    html: &str,
    base_url: &str,
    query: &str,
) -> Result<Vec<CourseHit>, ScrapeError> {
    let document = Html::parse_document(html);
    let mut hits = vec![];
    for hit in results_container(&document)?.select(&HIT_SELECTOR) {
        let Some(title) = hit.select(&TITLE_SELECTOR).next() else {
            warn!("Skipping search result without a title");
            continue;
        };
        let Some(href) = first_href(title) else {
            warn!("Skipping search result {:?} without a link", extract_text(title));
            continue;
        };
        hits.push(CourseHit {
            title: extract_text(title),
            url: get_html_link_to_page(base_url, href)?,
        });
    }

    if hits.is_empty() {
        return Err(ScrapeError::NotFound {
            query: query.to_string(),
        });
    }
    Ok(hits)
}
