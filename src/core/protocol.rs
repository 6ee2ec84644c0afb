//! Length-prefixed wire protocol shared by the broker and its clients.
//!
//! Three frame shapes travel over a connection:
//!
//! * control/data (client → broker): 4-byte little-endian length, then a JSON
//!   envelope with fields `Type` (`"join"` or `"pub"`), `QueueName`, `Message`
//! * delivery (broker → subscriber): 4-byte little-endian length, then the
//!   raw message payload with no envelope
//! * ack (subscriber → broker): exactly [`ACK_LEN`] raw bytes, no prefix
//!
//! A zero-length prefix from a live socket is an idle no-op, not an error.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::core::error::DecodeError;

/// Cap on a single frame body, to protect against malformed clients.
pub const MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Every delivery is acknowledged with exactly this many raw bytes.
pub const ACK_LEN: usize = 13;

/// Canonical ack token sent by the bundled CLI subscriber. The broker checks
/// only the length, never the content.
pub const ACK_TOKEN: [u8; ACK_LEN] = *b"ACKNOWLEDGED\n";

/// Role a control frame assigns to its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    #[serde(rename = "join")]
    Join,
    #[serde(rename = "pub")]
    Publish,
}

/// Control/data envelope carried inside a length-prefixed frame.
///
/// Serde renames pin the JSON field names to the wire format; changing them
/// breaks interoperability with existing clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "Type")]
    pub kind: FrameKind,
    #[serde(rename = "QueueName")]
    pub queue_name: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl WireMessage {
    /// A join frame: subscribe the sending connection to `queue_name`.
    pub fn join(queue_name: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Join,
            queue_name: queue_name.into(),
            message: String::new(),
        }
    }

    /// A publish frame: enqueue `message` onto `queue_name`.
    pub fn publish(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Publish,
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }
}

/// Serializes a control frame: JSON envelope behind a little-endian prefix.
pub fn encode_frame(msg: &WireMessage) -> Vec<u8> {
    let body = serde_json::to_vec(msg).expect("WireMessage serialization is infallible");
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as i32).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Serializes a delivery frame: raw payload behind a little-endian prefix.
pub fn encode_delivery(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Reads one control frame.
///
/// Returns `Ok(None)` for a zero-length frame (idle connection, keep reading)
/// and [`DecodeError::ConnectionClosed`] when the peer hangs up, including
/// mid-frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<WireMessage>, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let body = match read_prefixed(reader).await? {
        Some(body) => body,
        None => return Ok(None),
    };

    let msg: WireMessage = serde_json::from_slice(&body)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if msg.queue_name.is_empty() {
        return Err(DecodeError::Malformed("empty queue name".to_string()));
    }
    Ok(Some(msg))
}

/// Reads one delivery frame (subscriber side): raw payload, no envelope.
pub async fn read_delivery<R>(reader: &mut R) -> Result<Option<Bytes>, DecodeError>
where
    R: AsyncRead + Unpin,
{
    Ok(read_prefixed(reader).await?.map(Bytes::from))
}

/// Reads a length prefix and the body it declares. `None` for a zero length.
async fn read_prefixed<R>(reader: &mut R) -> Result<Option<Vec<u8>>, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(closed_or_io)?;

    let len = i32::from_le_bytes(len_buf);
    if len == 0 {
        return Ok(None);
    }
    if len < 0 {
        return Err(DecodeError::Malformed(format!("negative frame length {len}")));
    }
    let len = len as usize;
    if len > MAX_FRAME_LEN {
        return Err(DecodeError::Oversized(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(closed_or_io)?;
    Ok(Some(body))
}

fn closed_or_io(e: std::io::Error) -> DecodeError {
    match e.kind() {
        ErrorKind::UnexpectedEof => DecodeError::ConnectionClosed,
        _ => DecodeError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_frame_round_trips() {
        let msg = WireMessage::publish("orders", "hello");
        let frame = encode_frame(&msg);

        let mut reader = &frame[..];
        let decoded = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn join_frame_round_trips_with_empty_message() {
        let msg = WireMessage::join("orders");
        let frame = encode_frame(&msg);

        let mut reader = &frame[..];
        let decoded = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(decoded.kind, FrameKind::Join);
        assert_eq!(decoded.queue_name, "orders");
        assert!(decoded.message.is_empty());
    }

    #[test]
    fn envelope_uses_wire_field_names() {
        let json = serde_json::to_string(&WireMessage::publish("orders", "x")).unwrap();
        assert!(json.contains(r#""Type":"pub""#), "got {json}");
        assert!(json.contains(r#""QueueName":"orders""#), "got {json}");
        assert!(json.contains(r#""Message":"x""#), "got {json}");

        let json = serde_json::to_string(&WireMessage::join("q")).unwrap();
        assert!(json.contains(r#""Type":"join""#), "got {json}");
    }

    #[test]
    fn length_prefix_is_little_endian() {
        let frame = encode_delivery(b"abc");
        assert_eq!(&frame[..4], &3i32.to_le_bytes());
        assert_eq!(&frame[4..], b"abc");
    }

    #[tokio::test]
    async fn zero_length_frame_is_idle_not_error() {
        let frame = 0i32.to_le_bytes();
        let mut reader = &frame[..];
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_at_prefix_is_connection_closed() {
        let mut reader = &[][..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(DecodeError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn truncated_body_is_connection_closed() {
        let mut frame = 10i32.to_le_bytes().to_vec();
        frame.extend_from_slice(b"abc");
        let mut reader = &frame[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(DecodeError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let mut frame = 3i32.to_le_bytes().to_vec();
        frame.extend_from_slice(b"{{{");
        let mut reader = &frame[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(DecodeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn negative_length_is_malformed() {
        let frame = (-5i32).to_le_bytes();
        let mut reader = &frame[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(DecodeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let frame = ((MAX_FRAME_LEN + 1) as i32).to_le_bytes();
        let mut reader = &frame[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(DecodeError::Oversized(_))
        ));
    }

    #[tokio::test]
    async fn empty_queue_name_is_rejected() {
        let body = br#"{"Type":"pub","QueueName":"","Message":"x"}"#;
        let mut frame = (body.len() as i32).to_le_bytes().to_vec();
        frame.extend_from_slice(body);
        let mut reader = &frame[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(DecodeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn delivery_frame_round_trips() {
        let frame = encode_delivery(b"payload");
        let mut reader = &frame[..];
        let payload = read_delivery(&mut reader).await.unwrap().unwrap();
        assert_eq!(&payload[..], b"payload");
    }

    #[test]
    fn ack_token_is_thirteen_bytes() {
        assert_eq!(ACK_TOKEN.len(), ACK_LEN);
    }
}
