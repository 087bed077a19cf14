mod args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sonicsync_core::{
    load_layered_config, validate_config, Catalog, FfmpegTransformer, MediaTransform,
    SanitizedConfig, SubsonicClient, SyncSession,
};

use args::Args;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("sonicsync: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so the progress lines on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = &args.config {
        info!("Loading configuration from {:?}", path);
    }
    let config = load_layered_config(args.config.as_deref(), args.to_overrides())
        .context("Failed to load configuration")?;

    validate_config(&config).context("Configuration validation failed")?;

    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default(),
        "Configuration loaded"
    );

    let catalog = SubsonicClient::new(&config.server).context("Failed to create Subsonic client")?;
    info!("Using catalog: {} at {}", catalog.name(), config.server.url);
    catalog
        .ping()
        .await
        .with_context(|| format!("Cannot reach {}", config.server.url))?;

    let transformer = FfmpegTransformer::new(config.converter.clone());
    transformer
        .validate()
        .await
        .context("ffmpeg/ffprobe are not usable")?;

    let cancel = CancellationToken::new();
    let session = SyncSession::new(
        Arc::new(catalog),
        Arc::new(transformer),
        config.sync.root_dir.clone(),
        config.sync.target(),
        config.scheduler(),
    )
    .with_cancellation(cancel.clone());

    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    warn!("Interrupted, cancelling unfinished tracks");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }
    });

    let result = session
        .run(config.sync.playlist.as_deref(), |line| println!("{}", line))
        .await;

    // Stop the signal watcher whether or not the run succeeded
    cancel.cancel();
    let _ = watcher.await;

    let summary = result.context("Sync failed")?;
    println!("{}", summary);

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
