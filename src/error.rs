//! Error type shared by the resolver, the week extractor and the browsers.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// The search ran but produced no results.
    #[error("no course found for query {query:?}")]
    NotFound { query: String },

    /// Markup or an event payload doesn't have the expected structure.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A date header couldn't be decoded.
    #[error("unrecognized date: {text:?}")]
    DateFormat { text: String },

    /// Network failure or an unsuccessful HTTP status.
    #[error("network error: {message}")]
    Io { message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("invalid url: {message}")]
    InvalidUrl { message: String },

    /// `page_source` was asked for before anything was loaded.
    #[error("no page has been loaded yet")]
    NoPageLoaded,
}

impl ScrapeError {
    pub fn parse(message: impl Into<String>) -> Self {
        ScrapeError::Parse {
            message: message.into(),
        }
    }

    /// Transport failures may go away on a second attempt; structural ones won't.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::Io { .. } | ScrapeError::Timeout { .. })
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout {
                url: err
                    .url()
                    .map(|url| url.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
            }
        } else {
            ScrapeError::Io {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(err: url::ParseError) -> Self {
        ScrapeError::InvalidUrl {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ScrapeError::Timeout { url: "x".into() }.is_retryable());
        assert!(ScrapeError::Io { message: "reset".into() }.is_retryable());
        assert!(!ScrapeError::parse("missing div#content").is_retryable());
        assert!(!ScrapeError::NotFound { query: "x".into() }.is_retryable());
    }

    #[test]
    fn test_url_error_conversion() {
        let err: ScrapeError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }
}
