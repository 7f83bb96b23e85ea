//! Read-only view over a rendered page
//!
//! Wraps a parsed `scraper::Html` document and exposes the handful of
//! structural queries the link heuristics need: tag, classes, attributes,
//! rendered text, element siblings/parent/children and descendant anchors.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A parsed page plus the base URL its links resolve against.
pub struct DocumentView {
    html: Html,
    base_url: Option<Url>,
}

impl DocumentView {
    /// Parse page HTML captured from `page_url`.
    ///
    /// A `<base href>` element, when present, takes precedence over the
    /// page URL for link resolution, as it does in a browser.
    pub fn parse(html: &str, page_url: &str) -> Self {
        let html = Html::parse_document(html);
        let page = Url::parse(page_url).ok();
        let declared = declared_base(&html);

        let base_url = match (page, declared) {
            (Some(page), Some(href)) => Some(page.join(&href).unwrap_or(page)),
            (None, Some(href)) => Url::parse(&href).ok(),
            (page, None) => page,
        };

        Self { html, base_url }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Elements matching a CSS selector, in document order.
    /// An invalid selector matches nothing.
    pub fn select(&self, selector_str: &str) -> Vec<ElementView<'_>> {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        self.html
            .select(&selector)
            .map(|element| ElementView {
                element,
                base: self.base_url.as_ref(),
            })
            .collect()
    }
}

fn declared_base(html: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;

    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
}

/// A single element of a [`DocumentView`].
#[derive(Clone, Copy)]
pub struct ElementView<'a> {
    element: ElementRef<'a>,
    base: Option<&'a Url>,
}

impl<'a> ElementView<'a> {
    fn wrap(&self, element: ElementRef<'a>) -> Self {
        Self {
            element,
            base: self.base,
        }
    }

    pub fn tag(&self) -> &'a str {
        self.element.value().name()
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.element.value().classes()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes().any(|c| c == name)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.element.value().attrs()
    }

    /// Rendered text of the element and its descendants.
    ///
    /// Runs of HTML whitespace collapse to a single space and the ends are
    /// trimmed. Non-breaking spaces are content and survive as `\u{a0}`.
    pub fn text(&self) -> String {
        let raw: String = self.element.text().collect();
        raw.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Nearest preceding sibling that is an element (text and comments skipped).
    pub fn previous_sibling(&self) -> Option<ElementView<'a>> {
        self.element
            .prev_siblings()
            .find_map(ElementRef::wrap)
            .map(|el| self.wrap(el))
    }

    pub fn parent(&self) -> Option<ElementView<'a>> {
        self.element
            .parent()
            .and_then(ElementRef::wrap)
            .map(|el| self.wrap(el))
    }

    pub fn children(&self) -> impl Iterator<Item = ElementView<'a>> + 'a {
        let base = self.base;
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(move |element| ElementView { element, base })
    }

    /// Descendant hyperlinks in document order.
    pub fn anchors(&self) -> impl Iterator<Item = ElementView<'a>> + 'a {
        let base = self.base;
        self.element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "a")
            .map(move |element| ElementView { element, base })
    }

    /// The `href` attribute resolved against the document base.
    ///
    /// Values that cannot be resolved are returned unchanged; a missing
    /// attribute yields an empty string.
    pub fn href(&self) -> String {
        let Some(raw) = self.attr("href") else {
            return String::new();
        };

        match self.base {
            Some(base) => base
                .join(raw.trim())
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}
