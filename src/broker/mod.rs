//! TCP server engine: accept loop, per-connection handlers and the
//! per-queue dispatchers that move messages from queues to subscribers.

pub mod connection;
pub mod dispatch;
pub mod server;

pub use server::{serve, serve_on};
