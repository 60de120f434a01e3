//! `winserve serve`: run the server until interrupted.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::CliError;
use crate::server::{HeadlessDevice, WindowServer};

/// Execute the serve command.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the signal handler
/// cannot be installed.
pub fn execute(config: &ServerConfig) -> Result<(), CliError> {
    let runtime = super::runtime()?;
    runtime.block_on(serve(config))
}

async fn serve(config: &ServerConfig) -> Result<(), CliError> {
    let device = Arc::new(HeadlessDevice::new(config.screen.width, config.screen.height));
    let (handle, task) = WindowServer::spawn(config, device.clone());
    tracing::info!(
        width = config.screen.width,
        height = config.screen.height,
        pool = config.messaging.pool_size,
        "serve: window server running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("serve: shutting down");

    if let Err(err) = handle.shutdown().await {
        tracing::warn!(error = %err, "serve: server did not acknowledge shutdown");
    }
    if let Err(err) = task.await {
        tracing::warn!(error = %err, "serve: server task failed");
    }
    tracing::info!(flushed = device.take_updates().len(), "serve: stopped");
    Ok(())
}
