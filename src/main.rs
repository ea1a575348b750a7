//! Main entry point for the mediagrab CLI

use anyhow::Context;
use clap::Parser;
use mediagrab::cli::output::{create_progress_callback, OutputFormatter};
use mediagrab::cli::{Args, Command, DownloadArgs, ServeArgs};
use mediagrab::core::{default_grabbers, BatchRunner};
use mediagrab::download::ProgressCallback;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging()?;

    // Parse command line arguments
    let args = Args::parse();

    info!("Starting mediagrab with args: {:?}", args);

    // Initialize output formatter
    let formatter = Arc::new(OutputFormatter::new(args.verbosity_level()));

    match args.command {
        Command::Download(download) => handle_download(download, formatter).await,
        Command::Serve(serve) => handle_serve(serve, formatter).await,
    }
}

/// Run one batch over the URL file
async fn handle_download(args: DownloadArgs, formatter: Arc<OutputFormatter>) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let config = args.into_run_config().context("invalid download options")?;
    debug!("Run configuration: {:?}", config);
    formatter.info(&format!(
        "Reading {} (size ceiling {})",
        config.input_file.display(),
        config.size_ceiling
    ));
    formatter.debug(&format!("Config directory: {}", config.config_dir.display()));

    // Configure progress callback
    let progress = if config.show_progress {
        let callback: ProgressCallback = Arc::new(create_progress_callback(formatter.clone()));
        Some(callback)
    } else {
        None
    };

    let grabbers = default_grabbers(&config, progress)?;
    let outcome = BatchRunner::new(config, grabbers).run().await;
    // A spinner (no declared length) never completes on its own.
    formatter.finish_progress("done");

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            formatter.error(&format!("Batch aborted: {}", e));
            return Err(e).context("batch aborted");
        }
    };
    info!("Batch completed: {} file(s)", summary.grabbed.len());

    formatter.print_batch_summary(&summary.grabbed, summary.invalid.len(), start_time.elapsed());
    Ok(())
}

/// Serve the submission form until Ctrl+C
async fn handle_serve(args: ServeArgs, formatter: Arc<OutputFormatter>) -> anyhow::Result<()> {
    let config = args.into_serve_config();
    formatter.print_server_start(&format!("{}:{}", config.host, config.port));

    mediagrab::server::serve(config).await.context("running form server")?;
    Ok(())
}

/// Initialize logging system
fn init_logging() -> anyhow::Result<()> {
    // Get log level from environment or default to info
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    // Parse log level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
