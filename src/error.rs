//! Service-level errors
//!
//! The extractor itself never fails; these cover the request and the
//! browser session around it.

use thiserror::Error;

pub const MISSING_URL_MESSAGE: &str = "Missing URL query parameter.";
pub const INVALID_URL_MESSAGE: &str = "Invalid URL query parameter.";
pub const SCRAPE_FAILED_MESSAGE: &str = "Failed to scrape download links. Please try again.";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("missing source url")]
    MissingSourceUrl,

    #[error("invalid source url {url:?}: {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    /// Launch, navigation or page failure in the browser session.
    #[error("browser session failed: {0:#}")]
    Browser(#[from] anyhow::Error),
}

impl ScrapeError {
    /// Input errors are the client's fault and are never retried.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingSourceUrl | Self::InvalidSourceUrl { .. })
    }

    /// Message safe to return to clients; browser details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingSourceUrl => MISSING_URL_MESSAGE,
            Self::InvalidSourceUrl { .. } => INVALID_URL_MESSAGE,
            Self::Browser(_) => SCRAPE_FAILED_MESSAGE,
        }
    }
}

/// Validate a client-supplied source URL and return it trimmed.
///
/// Only absolute http(s) URLs are accepted. The text is otherwise kept as
/// sent, since it doubles as the referer of every extracted link.
pub fn parse_source_url(raw: Option<&str>) -> Result<String, ScrapeError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or(ScrapeError::MissingSourceUrl)?;

    let parsed = url::Url::parse(raw).map_err(|e| ScrapeError::InvalidSourceUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(ScrapeError::InvalidSourceUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
