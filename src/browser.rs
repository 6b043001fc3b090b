//! Page loading seam between the scrapers and the outside world.
//!
//! The catalog relies on client-side redirects and asynchronously filled
//! result lists, so the scrapers don't just GET a URL: they ask a [`Browser`]
//! to load it, wait for it to settle and then read back the final markup.

use std::{collections::HashMap, sync::LazyLock, time::Duration};

use log::{debug, warn};
use regex::Regex;
use scraper::{Html, Selector};

use crate::{
    error::ScrapeError,
    requests::{FetchedPage, RequestClient},
    text_manipulators::get_html_link_to_page,
};

#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Plain download of a page, without touching the current page.
    async fn fetch(&mut self, url: &str) -> Result<String, ScrapeError>;

    /// Loads `url` and follows its redirection chain until it settles.
    async fn wait_for_redirection(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Loads `url` and waits for script-driven content to settle.
    async fn wait_for_js(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Markup of the page loaded last.
    fn page_source(&self) -> Result<String, ScrapeError>;
}

static META_REFRESH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[http-equiv][content]").unwrap());
static SCRIPT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static SCRIPT_REDIRECT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:location(?:\.href)?\s*=\s*|location\.(?:replace|assign)\(\s*)["']([^"']+)["']"#,
    )
    .unwrap()
});

/// Target of a `<meta http-equiv="refresh">` or a scripted `location` change.
pub fn client_side_redirect(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let meta_target = document
        .select(&META_REFRESH_SELECTOR)
        .filter(|meta| {
            meta.value()
                .attr("http-equiv")
                .is_some_and(|equiv| equiv.eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(|content| {
            content.split(';').find_map(|part| {
                let part = part.trim();
                let (key, value) = part.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("url")
                    .then(|| value.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            })
        });
    if meta_target.is_some() {
        return meta_target;
    }

    document.select(&SCRIPT_SELECTOR).find_map(|script| {
        let code = script.text().collect::<String>();
        SCRIPT_REDIRECT_REGEX.captures_iter(&code).find_map(|caps| {
            let at = caps.get(0)?.start();
            runs_on_load(&code[..at]).then(|| caps[1].to_string())
        })
    })
}

/// Whether a statement preceded by `before` runs as soon as the script loads.
/// Anything inside braces (functions, handlers, conditionals) or behind a
/// condition or arrow on the same statement only runs on some later event.
fn runs_on_load(before: &str) -> bool {
    let depth = before.chars().fold(0i32, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    });
    let statement = before
        .rsplit([';', '{', '}', '\n'])
        .next()
        .unwrap_or_default();
    depth == 0 && matches!(statement.trim(), "" | "window." | "document." | "self." | "top.")
}

/// A browser over plain HTTP. Redirects (HTTP, meta refresh and simple
/// `location` scripts) are followed, scripts are not executed.
pub struct HttpBrowser {
    client: RequestClient,
    max_redirects: usize,
    js_settle: Duration,
    current: Option<FetchedPage>,
}

impl HttpBrowser {
    pub fn new(client: RequestClient, max_redirects: usize, js_settle: Duration) -> Self {
        Self {
            client,
            max_redirects,
            js_settle,
            current: None,
        }
    }
}

impl Browser for HttpBrowser {
    async fn fetch(&mut self, url: &str) -> Result<String, ScrapeError> {
        Ok(self.client.fetch_page(url).await?.body)
    }

    async fn wait_for_redirection(&mut self, url: &str) -> Result<(), ScrapeError> {
        let mut page = self.client.fetch_page(url).await?;
        let mut hops = 0;
        while let Some(target) = client_side_redirect(&page.body) {
            let next = get_html_link_to_page(&page.url, &target)?;
            if next == page.url {
                break;
            }
            if hops == self.max_redirects {
                warn!("Gave up following redirects from {url} after {hops} hops");
                return Err(ScrapeError::Io {
                    message: format!("too many redirects starting at {url}"),
                });
            }
            debug!("Following client-side redirect {} -> {next}", page.url);
            page = self.client.fetch_page(&next).await?;
            hops += 1;
        }
        self.current = Some(page);
        Ok(())
    }

    async fn wait_for_js(&mut self, url: &str) -> Result<(), ScrapeError> {
        let page = self.client.fetch_page(url).await?;
        if !self.js_settle.is_zero() {
            tokio::time::sleep(self.js_settle).await;
        }
        self.current = Some(page);
        Ok(())
    }

    fn page_source(&self) -> Result<String, ScrapeError> {
        self.current
            .as_ref()
            .map(|page| page.body.clone())
            .ok_or(ScrapeError::NoPageLoaded)
    }
}

const STATIC_MAX_REDIRECTS: usize = 10;

/// Serves pages from memory. Used to replay saved catalog pages and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    current: Option<String>,
    visited: Vec<String>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    /// Every URL requested so far, in order, redirect hops included.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    fn load(&mut self, url: &str, follow_redirects: bool) -> Result<String, ScrapeError> {
        let mut url = url.to_string();
        for _ in 0..=STATIC_MAX_REDIRECTS {
            self.visited.push(url.clone());
            match self.redirects.get(&url) {
                Some(target) if follow_redirects => url = target.clone(),
                _ => {
                    return self.pages.get(&url).cloned().ok_or_else(|| ScrapeError::Io {
                        message: format!("{url} returned status 404 Not Found"),
                    });
                }
            }
        }
        Err(ScrapeError::Io {
            message: format!("too many redirects starting at {url}"),
        })
    }
}

impl Browser for StaticPages {
    async fn fetch(&mut self, url: &str) -> Result<String, ScrapeError> {
        self.load(url, true)
    }

    async fn wait_for_redirection(&mut self, url: &str) -> Result<(), ScrapeError> {
        let html = self.load(url, true)?;
        self.current = Some(html);
        Ok(())
    }

    async fn wait_for_js(&mut self, url: &str) -> Result<(), ScrapeError> {
        let html = self.load(url, true)?;
        self.current = Some(html);
        Ok(())
    }

    fn page_source(&self) -> Result<String, ScrapeError> {
        self.current.clone().ok_or(ScrapeError::NoPageLoaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    #[test]
    fn test_meta_refresh_redirect() {
        let html = r#"<html><head><meta http-equiv="Refresh" content="0; URL='/rooster/week?id=7'"></head></html>"#;
        assert_eq!(client_side_redirect(html), Some("/rooster/week?id=7".to_string()));
    }

    #[test]
    fn test_script_redirect() {
        let html = r#"<script>window.location.href = "https://x.be/week";</script>"#;
        assert_eq!(client_side_redirect(html), Some("https://x.be/week".to_string()));

        let html = r#"<script>location.replace('/week')</script>"#;
        assert_eq!(client_side_redirect(html), Some("/week".to_string()));
    }

    #[test]
    fn test_navigation_handlers_are_not_redirects() {
        let html = r#"
            <script>function volgendeWeek() { window.location.href = '/rooster/week?w=42'; }</script>
            <script>if (oud) location.replace('/rooster/oud');</script>
            <table><tr><td align="middle"><span class="menu">maandag 5 oktober</span></td></tr></table>"#;
        assert_eq!(client_side_redirect(html), None);
    }

    #[test]
    fn test_script_redirect_after_handler() {
        let html = r#"<script>
            function vorigeWeek() { location.href = '/rooster/week?w=40'; }
            window.location = '/rooster/week?w=41';
        </script>"#;
        assert_eq!(client_side_redirect(html), Some("/rooster/week?w=41".to_string()));
    }

    #[test]
    fn test_no_redirect() {
        assert_eq!(client_side_redirect("<html><body>rooster</body></html>"), None);
    }

    #[tokio::test]
    async fn test_static_pages_follow_redirects() {
        let mut browser = StaticPages::new()
            .with_redirect("https://x.be/a", "https://x.be/b")
            .with_page("https://x.be/b", "<p>week</p>");

        assert_eq!(browser.page_source(), Err(ScrapeError::NoPageLoaded));
        browser.wait_for_redirection("https://x.be/a").await.unwrap();
        assert_eq!(browser.page_source().unwrap(), "<p>week</p>");
        assert_eq!(browser.visited(), ["https://x.be/a", "https://x.be/b"]);
    }

    #[tokio::test]
    async fn test_static_pages_missing_page() {
        let mut browser = StaticPages::new();
        assert!(matches!(
            browser.wait_for_js("https://x.be/none").await,
            Err(ScrapeError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_pages_redirect_loop() {
        let mut browser = StaticPages::new()
            .with_redirect("https://x.be/a", "https://x.be/b")
            .with_redirect("https://x.be/b", "https://x.be/a");
        assert!(browser.fetch("https://x.be/a").await.is_err());
    }

    /// Serves `pages` by path on a local port until the test ends.
    async fn serve(pages: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let pages: HashMap<_, _> = pages.into_iter().collect();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/");
                let response = match pages.get(path) {
                    Some(body) => format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    ),
                    None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string(),
                };
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        base
    }

    fn http_browser(max_redirects: usize) -> HttpBrowser {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpBrowser::new(RequestClient::with_client(client), max_redirects, Duration::ZERO)
    }

    const WEEK_PAGE: &str = r#"<html><body>
        <script>function volgendeWeek() { location.href = '/rooster/week?w=42'; }</script>
        <table><tr><td align="middle"><span class="menu">maandag 5 oktober</span></td></tr></table>
        </body></html>"#;

    #[tokio::test]
    async fn test_http_browser_follows_relative_redirects() {
        let base = serve(vec![
            (
                "/sched/123",
                r#"<meta http-equiv="refresh" content="0; url=rooster/start?id=123">"#,
            ),
            (
                "/sched/rooster/start?id=123",
                "<script>location.replace('../../rooster/week?w=41');</script>",
            ),
            ("/rooster/week?w=41", WEEK_PAGE),
        ])
        .await;

        let mut browser = http_browser(10);
        browser
            .wait_for_redirection(&format!("{base}/sched/123"))
            .await
            .unwrap();
        assert_eq!(browser.page_source().unwrap(), WEEK_PAGE);
    }

    #[tokio::test]
    async fn test_http_browser_stops_at_self_redirect() {
        let page = r#"<meta http-equiv="refresh" content="30; url=/rooster/week">"#;
        let base = serve(vec![("/rooster/week", page)]).await;

        let mut browser = http_browser(10);
        browser
            .wait_for_redirection(&format!("{base}/rooster/week"))
            .await
            .unwrap();
        assert_eq!(browser.page_source().unwrap(), page);
    }

    #[tokio::test]
    async fn test_http_browser_redirect_limit_is_an_error() {
        let base = serve(vec![
            ("/a", r#"<meta http-equiv="refresh" content="0; url=/b">"#),
            ("/b", r#"<meta http-equiv="refresh" content="0; url=/a">"#),
        ])
        .await;

        let mut browser = http_browser(3);
        let result = browser.wait_for_redirection(&format!("{base}/a")).await;
        assert!(matches!(
            result,
            Err(ScrapeError::Io { message }) if message.contains("too many redirects")
        ));
        assert_eq!(browser.page_source(), Err(ScrapeError::NoPageLoaded));
    }

    #[tokio::test]
    async fn test_http_browser_missing_page() {
        let base = serve(vec![]).await;
        let mut browser = http_browser(10);
        assert!(matches!(
            browser.fetch(&format!("{base}/nergens")).await,
            Err(ScrapeError::Io { .. })
        ));
    }
}
