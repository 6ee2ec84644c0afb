use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::core::error::DecodeError;
use crate::core::protocol::{read_frame, FrameKind};
use crate::core::registry::Registry;
use crate::core::subscriber::Subscriber;

/// Drives one client connection from its first frame to close.
///
/// The first decoded frame fixes the connection's role: a join hands the
/// socket over to the dispatcher as a [`Subscriber`]; a publish keeps this
/// task reading and enqueuing frames until the client hangs up. Decode
/// failures close this connection only, never the broker.
pub async fn handle_connection(mut stream: TcpStream, registry: Arc<Registry>) -> anyhow::Result<()> {
    let peer = stream.peer_addr()?.to_string();

    let first = loop {
        match read_frame(&mut stream).await {
            Ok(Some(msg)) => break msg,
            // Zero-length frame: idle connection, keep waiting.
            Ok(None) => continue,
            Err(DecodeError::ConnectionClosed) => {
                debug!(peer = %peer, "connection closed before first frame");
                return Ok(());
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "dropping connection on bad first frame");
                return Ok(());
            }
        }
    };

    match first.kind {
        FrameKind::Join => {
            info!(peer = %peer, queue = %first.queue_name, "subscriber joined");
            let subscriber = Arc::new(Subscriber::new(peer, stream));
            registry.add_subscriber(&first.queue_name, subscriber);
            // The dispatcher owns the socket from here; no more client-driven
            // reads on this connection.
            Ok(())
        }
        FrameKind::Publish => {
            debug!(peer = %peer, queue = %first.queue_name, "publisher connected");
            registry.publish(&first.queue_name, Bytes::from(first.message));
            publish_loop(stream, registry, &peer).await
        }
    }
}

async fn publish_loop(
    mut stream: TcpStream,
    registry: Arc<Registry>,
    peer: &str,
) -> anyhow::Result<()> {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(msg)) if msg.kind == FrameKind::Publish => {
                debug!(peer = %peer, queue = %msg.queue_name, bytes = msg.message.len(), "publish");
                registry.publish(&msg.queue_name, Bytes::from(msg.message));
            }
            Ok(Some(msg)) => {
                warn!(peer = %peer, queue = %msg.queue_name, "join frame on a publishing connection; closing");
                return Ok(());
            }
            Ok(None) => continue,
            Err(DecodeError::ConnectionClosed) => {
                info!(peer = %peer, "publisher disconnected");
                return Ok(());
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "closing publisher on decode failure");
                return Ok(());
            }
        }
    }
}
