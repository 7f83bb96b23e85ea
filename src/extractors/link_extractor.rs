//! Download-link extraction from `div.mast` entries
//!
//! Pages list their downloads as `div.mast` blocks mixed in with ads and
//! app promotions. A block is only trusted when its surroundings mark it
//! (see [`ContextPolicy`]); its first anchor must then name a known
//! resolution and must not be a mobile-app link.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::document::{DocumentView, ElementView};
use crate::session::{RequestHeaders, SessionContext};

pub const CONTAINER_SELECTOR: &str = "div.mast";

/// Sibling classes that claim a following container.
pub const MARKER_CLASSES: [&str; 2] = ["jatt", "jatt1"];

/// Exact inline style carried by genuine containers.
pub const LEFT_ALIGNED_STYLE: &str = "text-align:left;";

/// Matched case-sensitively against the anchor text.
pub const RESOLUTION_TOKENS: [&str; 6] = ["HDRip", "BluRay", "240p", "480p", "720p", "1080p"];

const APP_LINK_MARKER: &str = "android app";
const TRAILING_APP_LINK_MARKER: &str = "download/watch in android app";

pub const NO_MATCH_REASON: &str = "No matching download links found";

/// How a container proves it is a real download entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ContextPolicy {
    /// Some preceding sibling carries a `jatt`/`jatt1` class.
    #[default]
    SiblingScan,
    /// The container's `style` is exactly `text-align:left;`.
    StyleAttribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub context_policy: ContextPolicy,
    /// Upper bound on siblings visited by the sibling scan. `None` walks
    /// back to the first child of the parent.
    #[serde(default)]
    pub max_sibling_scan: Option<usize>,
}

/// One extracted link with the headers needed to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub resolution: String,
    /// e.g. `700 Mb`, or empty when the entry has no size annotation.
    pub size: String,
    pub url: String,
    pub headers: RequestHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Always holds at least one link.
    Found { links: Vec<DownloadLink> },
    NotFound { reason: String },
}

impl ExtractionResult {
    pub fn from_links(links: Vec<DownloadLink>) -> Self {
        if links.is_empty() {
            Self::NotFound {
                reason: NO_MATCH_REASON.to_string(),
            }
        } else {
            Self::Found { links }
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn links(&self) -> &[DownloadLink] {
        match self {
            Self::Found { links } => links,
            Self::NotFound { .. } => &[],
        }
    }
}

/// A container whose first anchor passed the content rules.
struct Candidate<'a> {
    container: ElementView<'a>,
    anchor: ElementView<'a>,
    resolution: String,
}

impl Candidate<'_> {
    fn into_link(self, headers: RequestHeaders) -> DownloadLink {
        DownloadLink {
            size: parse_size(&self.container.text()),
            url: self.anchor.href(),
            resolution: self.resolution,
            headers,
        }
    }
}

/// Stateless extractor; one instance can serve any number of documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkExtractor {
    config: ExtractorConfig,
}

impl LinkExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, document: &DocumentView, session: &SessionContext) -> ExtractionResult {
        let containers = select_containers(document);
        let total = containers.len();

        let claimed: Vec<ElementView<'_>> = containers
            .into_iter()
            .filter(|c| self.is_claimed(c))
            .collect();
        let claimed_count = claimed.len();

        let mut candidates: Vec<Candidate<'_>> =
            claimed.into_iter().filter_map(screen_content).collect();
        drop_trailing_app_link(&mut candidates);

        let headers = session.request_headers();
        let links: Vec<DownloadLink> = candidates
            .into_iter()
            .map(|c| c.into_link(headers.clone()))
            .collect();

        debug!(
            policy = ?self.config.context_policy,
            containers = total,
            claimed = claimed_count,
            links = links.len(),
            "extracted download links"
        );

        ExtractionResult::from_links(links)
    }

    fn is_claimed(&self, container: &ElementView<'_>) -> bool {
        match self.config.context_policy {
            ContextPolicy::SiblingScan => {
                has_marker_sibling(container, self.config.max_sibling_scan)
            }
            ContextPolicy::StyleAttribute => has_left_aligned_style(container),
        }
    }
}

/// Extract with the default configuration for `policy`.
pub fn extract(
    document: &DocumentView,
    session: &SessionContext,
    policy: ContextPolicy,
) -> ExtractionResult {
    LinkExtractor::new(ExtractorConfig {
        context_policy: policy,
        max_sibling_scan: None,
    })
    .extract(document, session)
}

/// Every `div.mast` in the document, in document order.
pub fn select_containers(document: &DocumentView) -> Vec<ElementView<'_>> {
    document.select(CONTAINER_SELECTOR)
}

fn has_marker_sibling(container: &ElementView<'_>, max_scan: Option<usize>) -> bool {
    let mut visited = 0;
    let mut sibling = container.previous_sibling();

    while let Some(el) = sibling {
        if max_scan.is_some_and(|max| visited >= max) {
            break;
        }
        if el.classes().any(|c| MARKER_CLASSES.contains(&c)) {
            return true;
        }
        visited += 1;
        sibling = el.previous_sibling();
    }

    false
}

fn has_left_aligned_style(container: &ElementView<'_>) -> bool {
    container
        .attr("style")
        .is_some_and(|style| style.trim() == LEFT_ALIGNED_STYLE)
}

fn screen_content(container: ElementView<'_>) -> Option<Candidate<'_>> {
    let anchor = container.anchors().next()?;
    let text = anchor.text();

    if text.to_lowercase().contains(APP_LINK_MARKER) {
        trace!(text = %text, "skipping app link");
        return None;
    }
    if !RESOLUTION_TOKENS.iter().any(|token| text.contains(token)) {
        trace!(text = %text, "skipping anchor without resolution");
        return None;
    }

    Some(Candidate {
        container,
        anchor,
        resolution: text,
    })
}

// Only the final entry is checked: promo blocks sit at the end of the list
// and may mention a resolution in their first anchor.
fn drop_trailing_app_link(candidates: &mut Vec<Candidate<'_>>) {
    let trailing_promo = candidates
        .last()
        .and_then(|c| c.container.anchors().last())
        .is_some_and(|a| a.text().to_lowercase().contains(TRAILING_APP_LINK_MARKER));

    if trailing_promo {
        trace!("dropping trailing app promotion");
        candidates.pop();
    }
}

/// First `[<digits> Mb]` annotation in `text`, without the brackets.
pub fn parse_size(text: &str) -> String {
    let re = match Regex::new(r"\[(\d+ Mb)\]") {
        Ok(r) => r,
        Err(_) => return String::new(),
    };

    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
