//! Tracing subscriber setup.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "download_link_parser=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVE))
        .map_err(|e| anyhow!("invalid log filter: {e}"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
