//! HTML extraction modules
//!
//! `document` wraps the parsed page; `link_extractor` holds the heuristics
//! that turn it into download links.

mod document;
mod link_extractor;

pub use document::*;
pub use link_extractor::*;

use serde::{Deserialize, Serialize};

use crate::session::{Cookie, SessionContext};

/// Extraction request for callers that hand over raw HTML (FFI, CLI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Page the HTML was captured from; also the referer of every link
    pub source_url: String,
    pub user_agent: String,
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub context_policy: ContextPolicy,
    #[serde(default)]
    pub max_sibling_scan: Option<usize>,
}

impl ExtractionRequest {
    pub fn session(&self) -> SessionContext {
        SessionContext::new(&self.source_url, &self.user_agent, self.cookies.clone())
    }

    pub fn config(&self) -> ExtractorConfig {
        ExtractorConfig {
            context_policy: self.context_policy,
            max_sibling_scan: self.max_sibling_scan,
        }
    }

    /// Parse `html` and run the extractor configured by this request.
    pub fn run(&self, html: &str) -> ExtractionResult {
        let document = DocumentView::parse(html, &self.source_url);
        LinkExtractor::new(self.config()).extract(&document, &self.session())
    }
}

/// JSON body returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Links {
        #[serde(rename = "downloadLinks")]
        download_links: Vec<DownloadLink>,
    },
    Error {
        error: String,
    },
}

impl ScrapeResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

impl From<ExtractionResult> for ScrapeResponse {
    fn from(result: ExtractionResult) -> Self {
        match result {
            ExtractionResult::Found { links } => Self::Links {
                download_links: links,
            },
            ExtractionResult::NotFound { reason } => Self::Error { error: reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: ExtractionRequest = serde_json::from_value(json!({
            "source_url": "https://films.example/m/1",
            "user_agent": "ua"
        }))
        .unwrap();

        assert!(request.cookies.is_empty());
        assert_eq!(request.context_policy, ContextPolicy::SiblingScan);
        assert_eq!(request.max_sibling_scan, None);
    }

    #[test]
    fn test_request_run_with_style_policy() {
        let request: ExtractionRequest = serde_json::from_value(json!({
            "source_url": "https://films.example/m/1",
            "user_agent": "ua",
            "cookies": [{"name": "sid", "value": "xyz"}],
            "context_policy": "style-attribute"
        }))
        .unwrap();

        let html = r#"<div class="mast" style="text-align:left;"><a href="/f">480p [350 Mb]</a></div>"#;
        let result = request.run(html);
        let links = result.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://films.example/f");
        assert_eq!(links[0].size, "350 Mb");
        assert_eq!(links[0].headers.cookie, "sid=xyz");
    }

    #[test]
    fn test_response_shapes() {
        let not_found = ScrapeResponse::from(ExtractionResult::from_links(vec![]));
        assert_eq!(
            serde_json::to_value(&not_found).unwrap(),
            json!({"error": "No matching download links found"})
        );

        let session = SessionContext::new("https://r.example/", "ua", vec![Cookie::new("a", "1")]);
        let found = ScrapeResponse::from(ExtractionResult::from_links(vec![DownloadLink {
            resolution: "720p".to_string(),
            size: String::new(),
            url: "https://r.example/f".to_string(),
            headers: session.request_headers(),
        }]));
        assert_eq!(
            serde_json::to_value(&found).unwrap(),
            json!({"downloadLinks": [{
                "resolution": "720p",
                "size": "",
                "url": "https://r.example/f",
                "headers": {"referer": "https://r.example/", "user-agent": "ua", "cookie": "a=1"}
            }]})
        );
    }
}
