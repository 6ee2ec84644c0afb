use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task;
use tracing::{error, info, warn};

use crate::broker::connection::handle_connection;
use crate::broker::dispatch::dispatch;
use crate::config::Config;
use crate::core::registry::Registry;

/// Starts the broker on the configured bind address and serves forever.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.server.bind_addr).await?;
    info!("broker listening on {}", config.server.bind_addr);
    serve_on(listener, config).await
}

/// Accept loop over an already-bound listener.
///
/// Split out from [`serve`] so embedders and tests can bind an ephemeral
/// port first. Spawns the dispatcher, then hands each accepted connection to
/// its own handler task; per-connection failures are logged and contained.
pub async fn serve_on(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let (registry, created) = Registry::new();
    let registry = Arc::new(registry);

    task::spawn(dispatch(
        Arc::clone(&registry),
        created,
        config.delivery.clone(),
    ));

    loop {
        let (stream, peer) = listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
        }
        info!(peer = %peer, "client connected");

        let registry = Arc::clone(&registry);
        task::spawn(async move {
            if let Err(e) = handle_connection(stream, registry).await {
                error!(peer = %peer, error = ?e, "connection handler failed");
            }
        });
    }
}
