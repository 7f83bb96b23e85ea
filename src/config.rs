//! Command-line and environment configuration
//!
//! Every option can be given as a flag or through the environment (a
//! `.env` file is loaded at start-up).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::browser::{LoadOptions, WaitStrategy, DEFAULT_USER_AGENT};
use crate::extractors::{ContextPolicy, ExtractionRequest, ExtractorConfig};
use crate::session::Cookie;

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    /// Port the HTTP API listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address the HTTP API binds to
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    #[command(flatten)]
    pub browser: BrowserArgs,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}

impl ServeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct BrowserArgs {
    /// Chromium executable; searched on PATH when unset
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    #[arg(long, env = "WAIT_STRATEGY", value_enum, default_value_t = WaitStrategy::NetworkIdle)]
    pub wait_strategy: WaitStrategy,

    #[arg(long, env = "NAVIGATION_TIMEOUT_SECS", default_value_t = 60)]
    pub navigation_timeout_secs: u64,

    /// Delay after load for the dom-content strategy
    #[arg(long, env = "SETTLE_DELAY_MS", default_value_t = 5000)]
    pub settle_delay_ms: u64,
}

impl BrowserArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            user_agent: self.user_agent.clone(),
            wait: self.wait_strategy,
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            ..LoadOptions::default()
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExtractorArgs {
    /// How a `div.mast` container proves it is a genuine download entry
    #[arg(long, env = "CONTEXT_POLICY", value_enum, default_value_t = ContextPolicy::SiblingScan)]
    pub context_policy: ContextPolicy,

    /// Stop the sibling scan after this many siblings (unbounded when unset)
    #[arg(long, env = "MAX_SIBLING_SCAN")]
    pub max_sibling_scan: Option<usize>,
}

impl ExtractorArgs {
    pub fn config(&self) -> ExtractorConfig {
        ExtractorConfig {
            context_policy: self.context_policy,
            max_sibling_scan: self.max_sibling_scan,
        }
    }
}

/// Offline extraction over a saved page.
#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Saved HTML of the rendered page
    pub file: PathBuf,

    /// URL the page was captured from
    #[arg(long)]
    pub source_url: String,

    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Session cookie as name=value; repeat in capture order
    #[arg(long = "cookie", value_parser = parse_cookie)]
    pub cookies: Vec<Cookie>,

    #[command(flatten)]
    pub extractor: ExtractorArgs,
}

impl ExtractArgs {
    pub fn request(&self) -> ExtractionRequest {
        let config = self.extractor.config();
        ExtractionRequest {
            source_url: self.source_url.clone(),
            user_agent: self.user_agent.clone(),
            cookies: self.cookies.clone(),
            context_policy: config.context_policy,
            max_sibling_scan: config.max_sibling_scan,
        }
    }
}

fn parse_cookie(raw: &str) -> Result<Cookie, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("cookie name is empty in {raw:?}"));
    }
    Ok(Cookie::new(name, value.trim()))
}
