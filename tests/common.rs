//! Shared harness: boots an in-process broker on an ephemeral port and talks
//! to it over raw TCP frames.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Once;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

use fanoutq::config::Config;
use fanoutq::core::protocol::{encode_frame, read_delivery, WireMessage, ACK_TOKEN};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        fanoutq::logging::init_logging();
    });
}

/// Boots a broker task with the given config; returns its address.
pub async fn spawn_broker(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = fanoutq::serve_on(listener, config).await;
    });
    addr
}

/// Connects and sends a join frame for `queue`.
pub async fn join(addr: SocketAddr, queue: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(&encode_frame(&WireMessage::join(queue)))
        .await
        .unwrap();
    stream
}

pub async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}

pub async fn publish(stream: &mut TcpStream, queue: &str, message: &str) {
    stream
        .write_all(&encode_frame(&WireMessage::publish(queue, message)))
        .await
        .unwrap();
}

/// Reads the next delivery frame, failing the test after five seconds.
pub async fn recv_delivery(stream: &mut TcpStream) -> Bytes {
    timeout(Duration::from_secs(5), read_delivery(stream))
        .await
        .expect("timed out waiting for delivery")
        .expect("broker connection failed")
        .expect("unexpected zero-length delivery")
}

pub async fn send_ack(stream: &mut TcpStream) {
    stream.write_all(&ACK_TOKEN).await.unwrap();
}
