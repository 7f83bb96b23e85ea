//! HTTP API
//!
//! `GET /get-download-links?url=<page>` loads the page in a browser, runs
//! the link extractor and returns `{downloadLinks}` or `{error}`.
//! `GET /ping` answers `pong`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::browser::PageLoader;
use crate::error::{parse_source_url, ScrapeError};
use crate::extractors::{LinkExtractor, ScrapeResponse};

pub struct AppState {
    pub loader: Arc<dyn PageLoader>,
    pub extractor: LinkExtractor,
}

impl AppState {
    pub fn new(loader: Arc<dyn PageLoader>, extractor: LinkExtractor) -> Self {
        Self { loader, extractor }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinksQuery {
    pub url: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/get-download-links", get(get_download_links))
        .route("/ping", get(ping))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = if self.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ScrapeResponse::error(self.public_message()))).into_response()
    }
}

async fn get_download_links(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LinksQuery>,
) -> Result<(StatusCode, Json<ScrapeResponse>), ScrapeError> {
    let source_url = parse_source_url(query.url.as_deref()).inspect_err(|e| {
        warn!(error = %e, "rejected request");
    })?;
    info!(url = %source_url, "scrape requested");

    let page = state.loader.load(&source_url).await.map_err(|e| {
        let err = ScrapeError::from(e);
        error!(url = %source_url, error = %err, "scrape failed");
        err
    })?;

    let result = page.extract(&source_url, &state.extractor);
    let status = if result.is_found() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    info!(url = %source_url, links = result.links().len(), "scrape finished");

    Ok((status, Json(result.into())))
}

async fn ping() -> &'static str {
    "pong"
}
