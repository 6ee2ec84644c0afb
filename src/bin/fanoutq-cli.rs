//! CLI client for a running fanoutq broker.
//!
//! `pub` sends one message (or a stream of random ones with `--repeat`),
//! `sub` joins a queue, prints every delivery and answers each with the
//! 13-byte ack token.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};
use tracing::info;

use fanoutq::core::protocol::{encode_frame, read_delivery, WireMessage, ACK_TOKEN};

#[derive(Debug, Parser)]
#[command(name = "fanoutq-cli", version, about = "fanoutq CLI: publish and subscribe")]
struct Cli {
    /// Address of the broker (host:port)
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish to a queue
    Pub {
        /// Queue name
        queue: String,
        /// Message payload (enclose in quotes for spaces)
        message: Option<String>,
        /// Publish this many random payloads instead of a single message
        #[arg(short, long)]
        repeat: Option<u32>,
        /// Delay between repeated publishes
        #[arg(long, default_value_t = 20)]
        interval_ms: u64,
    },
    /// Join a queue and print every delivery
    Sub {
        /// Queue name
        queue: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut stream = TcpStream::connect(cli.addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to {}: {e}", cli.addr))?;

    match cli.command {
        Command::Pub {
            queue,
            message,
            repeat,
            interval_ms,
        } => match repeat {
            None => {
                let message = message
                    .ok_or_else(|| anyhow::anyhow!("either a message or --repeat is required"))?;
                let frame = encode_frame(&WireMessage::publish(queue.as_str(), message));
                stream.write_all(&frame).await?;
                stream.flush().await?;
            }
            Some(count) => {
                for n in 0..count {
                    let payload = random_payload(10);
                    let frame = encode_frame(&WireMessage::publish(queue.as_str(), payload));
                    stream.write_all(&frame).await?;
                    if n + 1 < count {
                        sleep(Duration::from_millis(interval_ms)).await;
                    }
                }
                stream.flush().await?;
                info!("published {count} messages to {queue}");
            }
        },
        Command::Sub { queue } => {
            let frame = encode_frame(&WireMessage::join(queue.as_str()));
            stream.write_all(&frame).await?;
            info!("joined queue {queue}");

            loop {
                match read_delivery(&mut stream).await {
                    Ok(Some(payload)) => {
                        println!("{}", String::from_utf8_lossy(&payload));
                        stream.write_all(&ACK_TOKEN).await?;
                    }
                    Ok(None) => continue,
                    Err(e) => return Err(anyhow::anyhow!("broker connection lost: {e}")),
                }
            }
        }
    }

    Ok(())
}

/// Random printable payload for load-style publishing.
fn random_payload(len: usize) -> String {
    let mut payload = uuid::Uuid::new_v4().simple().to_string();
    payload.truncate(len);
    payload
}
