use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use download_link_parser::browser::chromium::{find_chromium, ChromiumLoader};
use download_link_parser::config::{ExtractArgs, ServeConfig};
use download_link_parser::logging::{init_logging, LogFormat};
use download_link_parser::server::{self, AppState};
use download_link_parser::{LinkExtractor, ScrapeResponse};

#[derive(Parser)]
#[command(
    name = "download-link-parser",
    about = "Extract download links from mast-layout film pages",
    version
)]
struct Cli {
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// HTTP API options, used when no subcommand is given
    #[command(flatten)]
    serve: ServeConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract links from a saved HTML page and print the JSON response
    Extract(ExtractArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match cli.command {
        Some(Commands::Extract(args)) => run_extract(&args),
        None => run_server(cli.serve).await,
    }
}

async fn run_server(config: ServeConfig) -> Result<()> {
    let chromium = find_chromium(config.browser.chromium_path.as_deref())
        .context("Chromium not found. Set CHROMIUM_PATH or install chromium.")?;
    info!(chromium = %chromium.display(), "using browser");

    let loader = ChromiumLoader::new(chromium, config.browser.load_options());
    info!(wait = ?loader.options().wait, "browser wait strategy");
    let extractor = LinkExtractor::new(config.extractor.config());
    info!(policy = ?extractor.config().context_policy, "context policy");

    let state = Arc::new(AppState::new(Arc::new(loader), extractor));
    server::serve(config.addr(), state).await
}

fn run_extract(args: &ExtractArgs) -> Result<()> {
    let html = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let response = ScrapeResponse::from(args.request().run(&html));
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
