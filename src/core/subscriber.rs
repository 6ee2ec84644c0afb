use std::io::ErrorKind;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use crate::core::error::DeliveryError;
use crate::core::protocol::{encode_delivery, ACK_LEN};

/// Delivery health of one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Live,
    Unreachable,
    Closed,
}

const HEALTH_LIVE: u8 = 0;
const HEALTH_UNREACHABLE: u8 = 1;
const HEALTH_CLOSED: u8 = 2;

/// A connection that joined a queue and receives broadcast deliveries.
///
/// Owns its socket outright: once a connection joins, the dispatcher's writes
/// and the client's ack replies are the only traffic on it. Health is tracked
/// explicitly so the registry can prune dead entries instead of delivering
/// into the void forever.
#[derive(Debug)]
pub struct Subscriber {
    id: String,
    stream: Mutex<TcpStream>,
    health: AtomicU8,
    strikes: AtomicU32,
}

impl Subscriber {
    pub fn new(id: impl Into<String>, stream: TcpStream) -> Self {
        Self {
            id: id.into(),
            stream: Mutex::new(stream),
            health: AtomicU8::new(HEALTH_LIVE),
            strikes: AtomicU32::new(0),
        }
    }

    /// Peer address string, used as the subscriber's identity in logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn health(&self) -> Health {
        match self.health.load(Ordering::Relaxed) {
            HEALTH_LIVE => Health::Live,
            HEALTH_UNREACHABLE => Health::Unreachable,
            _ => Health::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.health() == Health::Closed
    }

    /// Closed subscribers are pruned immediately; unreachable ones after
    /// `max_strikes` consecutive failed rounds.
    pub fn should_prune(&self, max_strikes: u32) -> bool {
        self.is_closed() || self.strikes.load(Ordering::Relaxed) >= max_strikes
    }

    fn mark_live(&self) {
        self.health.store(HEALTH_LIVE, Ordering::Relaxed);
        self.strikes.store(0, Ordering::Relaxed);
    }

    fn mark_unreachable(&self) {
        self.health.store(HEALTH_UNREACHABLE, Ordering::Relaxed);
        self.strikes.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_closed(&self) {
        self.health.store(HEALTH_CLOSED, Ordering::Relaxed);
    }

    /// Sends one delivery frame, then waits for the [`ACK_LEN`]-byte ack.
    ///
    /// The socket is held for the whole exchange; the ack read is bounded by
    /// `ack_timeout` so a stalled subscriber can only delay its own round.
    pub async fn deliver(
        &self,
        payload: &Bytes,
        ack_timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let mut stream = self.stream.lock().await;

        let frame = encode_delivery(payload);
        if let Err(e) = stream.write_all(&frame).await {
            return Err(self.classify(e));
        }

        let mut ack = [0u8; ACK_LEN];
        match timeout(ack_timeout, stream.read_exact(&mut ack)).await {
            Ok(Ok(_)) => {
                self.mark_live();
                Ok(())
            }
            Ok(Err(e)) => Err(self.classify(e)),
            Err(_) => {
                self.mark_unreachable();
                Err(DeliveryError::Unreachable)
            }
        }
    }

    fn classify(&self, e: std::io::Error) -> DeliveryError {
        match e.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                self.mark_closed();
                DeliveryError::Closed
            }
            _ => {
                self.mark_unreachable();
                DeliveryError::Failed(e)
            }
        }
    }
}
