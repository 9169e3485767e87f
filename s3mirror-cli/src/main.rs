//! `s3mirror`: mirror an S3 prefix into a local directory.
//!
//! Takes no arguments; everything comes from the environment (see
//! `MirrorConfig::from_env`). Ctrl-C or SIGTERM stops new downloads, lets
//! in-flight ones finish, and still flushes recorded outcomes.

use anyhow::Context;
use s3mirror_sync::{MirrorConfig, SyncEngine, cancel_channel};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    match run().await {
        Ok(()) => {
            info!("application has shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = MirrorConfig::from_env();
    let engine = SyncEngine::from_config(&config)
        .await
        .context("failed to create sync engine")?;

    let (cancel_tx, cancel_rx) = cancel_channel();
    tokio::spawn(forward_shutdown_signal(cancel_tx));

    let summary = engine.run(cancel_rx).await.context("sync failed")?;
    info!(
        "listed {}, planned {}, downloaded {}, failed {}, skipped {}",
        summary.listed, summary.planned, summary.succeeded, summary.failed, summary.skipped
    );
    if summary.unflushed > 0 {
        warn!("{} outcomes were not persisted", summary.unflushed);
    }
    Ok(())
}

/// Raises the cancel signal on the first interrupt or terminate signal.
async fn forward_shutdown_signal(cancel_tx: watch::Sender<bool>) {
    wait_for_shutdown_signal().await;
    info!("received interrupt signal, finishing in-flight downloads");
    let _ = cancel_tx.send(true);
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
