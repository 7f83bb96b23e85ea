//! Browser session that turns a page URL into rendered HTML plus session metadata.
//!
//! The [`PageLoader`] trait is the seam between the HTTP layer and the
//! browser engine (Chromium via chromiumoxide); tests substitute a stub.

pub mod chromium;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::extractors::{DocumentView, ExtractionResult, LinkExtractor};
use crate::session::{Cookie, SessionContext};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// What a page has to reach before it is captured.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum WaitStrategy {
    /// Load event, then no new network resources for the idle window.
    #[default]
    NetworkIdle,
    /// Load event, then a fixed settle delay for client-side redirects and popups.
    DomContent,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub user_agent: String,
    pub wait: WaitStrategy,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub idle_window: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            wait: WaitStrategy::NetworkIdle,
            navigation_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_millis(5000),
            idle_window: Duration::from_millis(500),
        }
    }
}

/// Everything read out of a browser session before it was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub html: String,
    /// URL after redirects; links resolve against it.
    pub final_url: String,
    /// As reported by `navigator.userAgent`.
    pub user_agent: String,
    pub cookies: Vec<Cookie>,
}

impl LoadedPage {
    pub fn session(&self, source_url: &str) -> SessionContext {
        SessionContext::new(source_url, &self.user_agent, self.cookies.clone())
    }

    /// Run `extractor` over the captured page.
    ///
    /// Synchronous so the parsed document never lives across an await.
    pub fn extract(&self, source_url: &str, extractor: &LinkExtractor) -> ExtractionResult {
        let document = DocumentView::parse(&self.html, &self.final_url);
        extractor.extract(&document, &self.session(source_url))
    }
}

#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Navigate to `url` and capture the rendered page.
    ///
    /// Implementations release their browser session before returning,
    /// whether the load succeeded or not.
    async fn load(&self, url: &str) -> Result<LoadedPage>;
}
