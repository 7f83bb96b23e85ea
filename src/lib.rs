//! Download-link extraction for mast-layout film pages
//!
//! Provides:
//! - a pure extractor picking download anchors out of `div.mast` blocks
//! - a Chromium page loader capturing HTML, cookies and user-agent
//! - an HTTP API (`/get-download-links`, `/ping`)
//! - an FFI interface for hosts that already hold rendered HTML

pub mod browser;
pub mod config;
pub mod error;
pub mod extractors;
pub mod ffi;
pub mod logging;
pub mod server;
pub mod session;

pub use error::ScrapeError;
pub use extractors::*;
pub use ffi::*;
pub use session::*;
