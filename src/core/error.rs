use std::fmt;
use std::io;

/// Failure while reading a frame off a client connection.
///
/// Always connection-scoped: the handler closes the offending connection and
/// the broker keeps serving everyone else.
#[derive(Debug)]
pub enum DecodeError {
    /// Peer closed the connection, either cleanly at a frame boundary or
    /// mid-frame (truncated read).
    ConnectionClosed,
    /// Declared frame length exceeds the per-frame cap.
    Oversized(usize),
    /// Frame body did not parse into a wire message.
    Malformed(String),
    /// Socket error other than EOF.
    Io(io::Error),
}

impl std::error::Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::ConnectionClosed => write!(f, "connection closed"),
            DecodeError::Oversized(len) => write!(f, "frame length {len} exceeds cap"),
            DecodeError::Malformed(reason) => write!(f, "malformed frame: {reason}"),
            DecodeError::Io(e) => write!(f, "socket error: {e}"),
        }
    }
}

/// Outcome of a failed delivery attempt to a single subscriber.
///
/// Recorded by the dispatcher; repeated failures get the subscriber pruned.
#[derive(Debug)]
pub enum DeliveryError {
    /// No acknowledgment arrived within the configured timeout.
    Unreachable,
    /// Subscriber closed its connection.
    Closed,
    /// Write or ack read failed on the socket.
    Failed(io::Error),
}

impl std::error::Error for DeliveryError {}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Unreachable => write!(f, "subscriber did not ack in time"),
            DeliveryError::Closed => write!(f, "subscriber disconnected"),
            DeliveryError::Failed(e) => write!(f, "delivery failed: {e}"),
        }
    }
}
