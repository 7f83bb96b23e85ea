//! HTTP API tests against a stub page loader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use download_link_parser::browser::{LoadedPage, PageLoader};
use download_link_parser::server::{router, AppState};
use download_link_parser::{ContextPolicy, Cookie, ExtractorConfig, LinkExtractor};

const SOURCE: &str = "https://films.example/movie/42";

/// Serves one fixed page and counts how often it was asked.
struct StubLoader {
    html: &'static str,
    fail: bool,
    loads: AtomicUsize,
}

impl StubLoader {
    fn page(html: &'static str) -> Arc<Self> {
        Arc::new(Self {
            html,
            fail: false,
            loads: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            html: "",
            fail: true,
            loads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PageLoader for StubLoader {
    async fn load(&self, url: &str) -> Result<LoadedPage> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("navigation timed out after 60000ms");
        }
        Ok(LoadedPage {
            html: self.html.to_string(),
            final_url: url.to_string(),
            user_agent: "Mozilla/5.0 HeadlessChrome/120.0.0.0".to_string(),
            cookies: vec![Cookie::new("a", "1"), Cookie::new("b", "2")],
        })
    }
}

async fn get(loader: Arc<StubLoader>, policy: ContextPolicy, uri: &str) -> (StatusCode, Vec<u8>) {
    let extractor = LinkExtractor::new(ExtractorConfig {
        context_policy: policy,
        max_sibling_scan: None,
    });
    let app = router(Arc::new(AppState::new(loader, extractor)));

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(loader: Arc<StubLoader>, policy: ContextPolicy, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(loader, policy, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn links_uri() -> String {
    format!("/get-download-links?url={SOURCE}")
}

#[tokio::test]
async fn test_single_entry_with_size() {
    let loader = StubLoader::page(
        r#"<html><body>
            <div class="jatt">Download Links</div>
            <div class="mast">
                <a href="/dl/720">720p HDRip</a>
                <span>Size [900 Mb]</span>
            </div>
        </body></html>"#,
    );

    let (status, body) = get_json(loader.clone(), ContextPolicy::SiblingScan, &links_uri()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"downloadLinks": [{
            "resolution": "720p HDRip",
            "size": "900 Mb",
            "url": "https://films.example/dl/720",
            "headers": {
                "referer": SOURCE,
                "user-agent": "Mozilla/5.0 HeadlessChrome/120.0.0.0",
                "cookie": "a=1; b=2"
            }
        }]})
    );
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_claimed_containers_is_404() {
    let loader = StubLoader::page(
        r#"<html><body>
            <div class="banner"></div>
            <div class="mast"><a href="/dl/480">480p</a></div>
            <div class="mast" style="text-align:center;"><a href="/dl/720">720p</a></div>
        </body></html>"#,
    );

    for policy in [ContextPolicy::SiblingScan, ContextPolicy::StyleAttribute] {
        let (status, body) = get_json(loader.clone(), policy, &links_uri()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "No matching download links found"}));
    }
}

#[tokio::test]
async fn test_app_link_dropped() {
    let loader = StubLoader::page(
        r#"<html><body>
            <div class="jatt1"></div>
            <div class="mast"><a href="/dl/240">240p</a></div>
            <div class="mast"><a href="/app">Android App</a></div>
        </body></html>"#,
    );

    let (status, body) = get_json(loader, ContextPolicy::SiblingScan, &links_uri()).await;
    assert_eq!(status, StatusCode::OK);

    let links = body["downloadLinks"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["resolution"], "240p");
}

#[tokio::test]
async fn test_style_policy_order_preserved() {
    let loader = StubLoader::page(
        r#"<html><body>
            <div class="mast" style="text-align:left;"><a href="/dl/1080">1080p [2100 Mb]</a></div>
            <div class="mast" style="text-align:left;"><a href="/dl/480">480p BluRay x264</a></div>
        </body></html>"#,
    );

    let (status, body) = get_json(loader, ContextPolicy::StyleAttribute, &links_uri()).await;
    assert_eq!(status, StatusCode::OK);

    let resolutions: Vec<&str> = body["downloadLinks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["resolution"].as_str().unwrap())
        .collect();
    assert_eq!(resolutions, ["1080p [2100 Mb]", "480p BluRay x264"]);
    assert_eq!(body["downloadLinks"][0]["size"], "2100 Mb");
    assert_eq!(body["downloadLinks"][1]["size"], "");
}

#[tokio::test]
async fn test_missing_url_rejected_before_loading() {
    let loader = StubLoader::page("<html></html>");

    for uri in ["/get-download-links", "/get-download-links?url="] {
        let (status, body) = get_json(loader.clone(), ContextPolicy::SiblingScan, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing URL query parameter."}));
    }

    let (status, body) = get_json(
        loader.clone(),
        ContextPolicy::SiblingScan,
        "/get-download-links?url=not-a-url",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid URL query parameter."}));

    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_browser_failure_is_500_with_generic_message() {
    let loader = StubLoader::failing();

    let (status, body) = get_json(loader.clone(), ContextPolicy::SiblingScan, &links_uri()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "Failed to scrape download links. Please try again."})
    );
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ping() {
    let (status, body) = get(
        StubLoader::page(""),
        ContextPolicy::SiblingScan,
        "/ping",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}
