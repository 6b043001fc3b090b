use std::time::Duration;

use anyhow::Context;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, de::DeserializeOwned};

pub type Year = i32;

pub const DEFAULT_CATALOG_BASE_URL: &str = "https://onderwijsaanbod.kuleuven.be";
pub const DEFAULT_CATALOG_SEARCH_PATH: &str = "/oa/find/";

/// The env vars read for scraping. All of them are optional.
#[derive(Debug, Deserialize)]
pub struct ScrapingEnv {
    #[serde(default = "default_catalog_base_url")]
    catalog_base_url: String,
    #[serde(default = "default_catalog_search_path")]
    catalog_search_path: String,
    catalog_year: Option<Year>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    max_redirects: usize,
    #[serde(default)]
    js_settle_millis: u64,
}

fn default_catalog_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

fn default_catalog_search_path() -> String {
    DEFAULT_CATALOG_SEARCH_PATH.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

/// Where the catalog lives and which academic year to search in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub base_url: String,
    pub search_path: String,
    pub year: Year,
}

impl CatalogConfig {
    pub fn new(year: Year) -> Self {
        Self {
            base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            search_path: DEFAULT_CATALOG_SEARCH_PATH.to_string(),
            year,
        }
    }
}

pub struct ScrapingConfig {
    pub catalog: CatalogConfig,
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub js_settle: Duration,
}

impl ScrapingConfig {
    pub fn new() -> anyhow::Result<Self> {
        let scraping_env = ScrapingEnv::load_from_env()?;
        Ok(Self::from_env(scraping_env, Local::now().date_naive()))
    }

    fn from_env(scraping_env: ScrapingEnv, today: NaiveDate) -> Self {
        Self {
            catalog: CatalogConfig {
                base_url: scraping_env.catalog_base_url,
                search_path: scraping_env.catalog_search_path,
                year: scraping_env
                    .catalog_year
                    .unwrap_or_else(|| academic_year(today)),
            },
            request_timeout: Duration::from_secs(scraping_env.request_timeout_secs),
            max_redirects: scraping_env.max_redirects,
            js_settle: Duration::from_millis(scraping_env.js_settle_millis),
        }
    }
}

/// The catalog files an academic year under the calendar year it starts in
/// (September).
pub fn academic_year(date: NaiveDate) -> Year {
    if date.month() >= 9 {
        date.year()
    } else {
        date.year() - 1
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_academic_year() {
        assert_eq!(academic_year(date(2015, 10, 5)), 2015);
        assert_eq!(academic_year(date(2016, 3, 1)), 2015);
        assert_eq!(academic_year(date(2016, 9, 1)), 2016);
    }

    #[test]
    fn test_env_defaults() {
        let scraping_env: ScrapingEnv = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        let config = ScrapingConfig::from_env(scraping_env, date(2015, 10, 5));
        assert_eq!(config.catalog, CatalogConfig::new(2015));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert!(config.js_settle.is_zero());
    }

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("CATALOG_BASE_URL".to_string(), "http://localhost:8080".to_string()),
            ("CATALOG_YEAR".to_string(), "2015".to_string()),
            ("JS_SETTLE_MILLIS".to_string(), "500".to_string()),
        ];
        let scraping_env: ScrapingEnv = envy::from_iter(vars).unwrap();
        let config = ScrapingConfig::from_env(scraping_env, date(2024, 10, 1));
        assert_eq!(config.catalog.base_url, "http://localhost:8080");
        assert_eq!(config.catalog.year, 2015);
        assert_eq!(config.js_settle, Duration::from_millis(500));
    }
}
