//! upsolve CLI
//!
//! Collects unsolved problems from the configured judges and exports them.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use upsolve::{
    error::Result,
    models::{Config, Platform},
    pipeline,
    services::PlatformCrawler,
    storage::{LocalExporter, ProblemExporter},
    utils::{
        self,
        http::ReqwestTransport,
        retry::{RetryPolicy, RetryingHttpClient},
    },
};

/// upsolve - unsolved problem collector
#[derive(Parser, Debug)]
#[command(
    name = "upsolve",
    version,
    about = "Collect unsolved competitive-programming problems ranked by clist rating"
)]
struct Cli {
    /// Path to storage directory containing config.toml
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl, dedup, rate, sort and export
    Run {
        /// Platforms to crawl, in order (default: pipeline.order)
        #[arg(short, long = "platform")]
        platforms: Vec<Platform>,

        /// Skip clist rating lookups
        #[arg(long)]
        no_rating: bool,
    },

    /// Crawl, dedup, sort and export without ratings
    Crawl {
        #[arg(short, long = "platform")]
        platforms: Vec<Platform>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging from the verbosity flag or the configured level.
///
/// `RUST_LOG` still overrides both.
fn init_logging(verbose: bool, level: Option<&str>) {
    let filter = if verbose {
        log::LevelFilter::Debug
    } else {
        level
            .map(utils::log::level_filter)
            .unwrap_or(log::LevelFilter::Info)
    };
    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn http_client(config: &Config) -> Result<RetryingHttpClient> {
    let transport = ReqwestTransport::from_config(&config.http)?;
    Ok(RetryingHttpClient::new(
        Arc::new(transport),
        RetryPolicy::from(&config.http),
    ))
}

async fn collect_and_export(
    config: &Config,
    platforms: Vec<Platform>,
    with_rating: bool,
) -> Result<()> {
    let platforms = if platforms.is_empty() {
        config.enabled_platforms()
    } else {
        platforms
    };
    log::info!(
        "Platforms: {}",
        platforms
            .iter()
            .map(Platform::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let exporter = LocalExporter::from_config(&config.export)?;
    let http = http_client(config)?;
    let outcome = pipeline::run_pipeline(config, &platforms, http, with_rating).await?;

    let summary = exporter.export(&outcome.problems).await?;
    utils::log::summary("Run", &outcome.report.summary_items());
    for file in &summary.files {
        utils::log::sub_item(&format!("Wrote {}", file.display()));
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let loaded = Config::load(&config_path);
    init_logging(
        cli.verbose,
        loaded.as_ref().ok().map(|c| c.logging.level.as_str()),
    );

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", config_path.display());
            config
        }
        Err(e) if matches!(cli.command, Command::Validate) => {
            log::error!("Cannot read {}: {}", config_path.display(), e);
            return Err(e);
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            Config::default()
        }
    };

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Command::Run {
            platforms,
            no_rating,
        } => collect_and_export(&config, platforms, !no_rating).await?,

        Command::Crawl { platforms } => collect_and_export(&config, platforms, false).await?,

        Command::Validate => {
            log::info!("✓ Config OK");
            let http = http_client(&config)?;
            for platform in Platform::ALL {
                if !config.platforms.is_enabled(platform) {
                    log::info!("  {}: disabled", platform);
                    continue;
                }
                match PlatformCrawler::from_config(platform, &config, http.clone()) {
                    Ok(_) => log::info!("  {}: ready", platform),
                    Err(e) => log::warn!("  {}: {}", platform, e),
                }
            }
            if config.clist.enabled && config.clist.api_key.is_none() {
                log::warn!("  clist: no api_key, lookups will be unauthenticated");
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
