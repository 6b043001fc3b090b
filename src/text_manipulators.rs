use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::ScrapeError;

static HREF_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[href]").unwrap());

/// Text content of a node with whitespace (including `&nbsp;`) collapsed.
pub fn extract_text(node: ElementRef) -> String {
    node.text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `href` of the node itself or, failing that, of its first descendant with one.
pub fn first_href<'a>(node: ElementRef<'a>) -> Option<&'a str> {
    node.value().attr("href").or_else(|| {
        node.select(&HREF_SELECTOR)
            .next()
            .and_then(|link| link.value().attr("href"))
    })
}

/// Resolves an href found on `page_url` into an absolute URL.
pub fn get_html_link_to_page(page_url: &str, href: &str) -> Result<String, ScrapeError> {
    let base = Url::parse(page_url)?;
    Ok(base.join(href.trim())?.to_string())
}

/// First string literal passed to a script call, e.g. `fn('a', 'b')` gives `a`.
///
/// Handles both quote styles and backslash escapes inside the literal.
pub fn first_string_argument(call: &str) -> Option<String> {
    let open = call.find('(')?;
    let mut chars = call[open + 1..].chars();

    let quote = loop {
        match chars.next()? {
            c @ ('\'' | '"') => break c,
            c if c.is_whitespace() => continue,
            // The first argument isn't a string literal.
            _ => return None,
        }
    };

    let mut literal = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => literal.push(chars.next()?),
            c if c == quote => return Some(literal),
            c => literal.push(c),
        }
    }
    None
}

/// Unwraps a `javascript:openSchedule('<url>')` style href into the plain URL.
pub fn schedule_url(href: &str) -> Result<String, ScrapeError> {
    let href = href.trim();
    let is_script = href
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"));
    if !is_script {
        return Ok(href.to_string());
    }

    first_string_argument(href)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ScrapeError::parse(format!("no url inside schedule link {href:?}")))
}
